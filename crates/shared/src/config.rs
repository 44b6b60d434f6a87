//! Application configuration management.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::{AppError, AppResult};

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    pub server: ServerConfig,
    /// Leave administration configuration.
    pub leave: LeaveConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Leave administration configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LeaveConfig {
    /// Team coverage thresholds; set by the policy administrator.
    pub coverage: CoverageConfig,
    /// Age after which a pending request is escalated.
    #[serde(default = "default_escalation_sla_hours")]
    pub escalation_sla_hours: u64,
    /// How long a writer waits for a balance key before reporting contention.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
    /// Internal retries on contention before surfacing the conflict.
    #[serde(default = "default_max_lock_retries")]
    pub max_lock_retries: u32,
    /// Interval of the background accrual loop.
    #[serde(default = "default_accrual_interval_secs")]
    pub accrual_interval_secs: u64,
    /// JSON file with published leave type definitions.
    pub policy_file: Option<String>,
    /// JSON file with the employee directory fixture.
    pub directory_file: Option<String>,
    /// Public holidays honoured by day counting.
    #[serde(default)]
    pub public_holidays: Vec<NaiveDate>,
}

/// Coverage thresholds in percent of the department absent on a day.
#[derive(Debug, Clone, Deserialize)]
pub struct CoverageConfig {
    /// At or above this share the day is a warning.
    pub warning_percent: Decimal,
    /// Above this share the day is critical.
    pub critical_percent: Decimal,
}

fn default_escalation_sla_hours() -> u64 {
    48
}

fn default_lock_timeout_ms() -> u64 {
    250
}

fn default_max_lock_retries() -> u32 {
    3
}

fn default_accrual_interval_secs() -> u64 {
    3600
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded or is inconsistent.
    pub fn load() -> AppResult<Self> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("FURLOUGH").separator("__"))
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field constraints serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Configuration` describing the first violation.
    pub fn validate(&self) -> AppResult<()> {
        self.leave.coverage.validate()?;
        if self.leave.lock_timeout_ms == 0 {
            return Err(AppError::Configuration(
                "leave.lock_timeout_ms must be positive".to_string(),
            ));
        }
        if self.leave.accrual_interval_secs == 0 {
            return Err(AppError::Configuration(
                "leave.accrual_interval_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl CoverageConfig {
    /// Thresholds must be percentages with warning not above critical.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Configuration` when the thresholds are out of order or range.
    pub fn validate(&self) -> AppResult<()> {
        let range = Decimal::ZERO..=Decimal::ONE_HUNDRED;
        if !range.contains(&self.warning_percent) || !range.contains(&self.critical_percent) {
            return Err(AppError::Configuration(
                "coverage thresholds must be between 0 and 100".to_string(),
            ));
        }
        if self.warning_percent > self.critical_percent {
            return Err(AppError::Configuration(format!(
                "coverage warning threshold {} exceeds critical threshold {}",
                self.warning_percent, self.critical_percent
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn leave_config(warning: Decimal, critical: Decimal) -> LeaveConfig {
        LeaveConfig {
            coverage: CoverageConfig {
                warning_percent: warning,
                critical_percent: critical,
            },
            escalation_sla_hours: default_escalation_sla_hours(),
            lock_timeout_ms: default_lock_timeout_ms(),
            max_lock_retries: default_max_lock_retries(),
            accrual_interval_secs: default_accrual_interval_secs(),
            policy_file: None,
            directory_file: None,
            public_holidays: Vec::new(),
        }
    }

    fn app_config(leave: LeaveConfig) -> AppConfig {
        AppConfig {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
            },
            leave,
        }
    }

    #[test]
    fn test_validate_accepts_ordered_thresholds() {
        assert!(app_config(leave_config(dec!(30), dec!(50))).validate().is_ok());
        assert!(app_config(leave_config(dec!(40), dec!(40))).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_inverted_thresholds() {
        let err = app_config(leave_config(dec!(60), dec!(50)))
            .validate()
            .unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
        assert!(err.to_string().contains("exceeds critical"));
    }

    #[test]
    fn test_validate_rejects_out_of_range_threshold() {
        let err = app_config(leave_config(dec!(30), dec!(150)))
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("between 0 and 100"));
    }

    #[test]
    fn test_validate_rejects_zero_lock_timeout() {
        let mut leave = leave_config(dec!(30), dec!(50));
        leave.lock_timeout_ms = 0;
        assert!(app_config(leave).validate().is_err());
    }

    #[test]
    fn test_load_from_environment() {
        temp_env::with_vars(
            [
                ("FURLOUGH__SERVER__PORT", Some("9090")),
                ("FURLOUGH__LEAVE__COVERAGE__WARNING_PERCENT", Some("25")),
                ("FURLOUGH__LEAVE__COVERAGE__CRITICAL_PERCENT", Some("45")),
                ("FURLOUGH__LEAVE__MAX_LOCK_RETRIES", Some("5")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.server.port, 9090);
                assert_eq!(config.server.host, "0.0.0.0");
                assert_eq!(config.leave.coverage.warning_percent, dec!(25));
                assert_eq!(config.leave.coverage.critical_percent, dec!(45));
                assert_eq!(config.leave.max_lock_retries, 5);
                assert_eq!(config.leave.escalation_sla_hours, 48);
                assert!(config.leave.public_holidays.is_empty());
            },
        );
    }
}
