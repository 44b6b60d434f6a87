//! Application-wide error types.
//!
//! Domain failures have their own enums in `furlough-core`; `AppError` covers
//! what sits outside the domain: loading configuration and rejecting
//! malformed input before it reaches a domain operation.

use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Errors raised outside the leave domain.
#[derive(Debug, Error)]
pub enum AppError {
    /// Input failed a shape check (empty reason, bad field).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration could not be loaded or is inconsistent.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Configuration(_) => 500,
        }
    }

    /// SCREAMING_SNAKE code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(AppError::Validation("reason is empty".into()), 400, "VALIDATION_ERROR")]
    #[case(AppError::Configuration("port".into()), 500, "CONFIGURATION_ERROR")]
    fn test_status_and_code(#[case] error: AppError, #[case] status: u16, #[case] code: &str) {
        assert_eq!(error.status_code(), status);
        assert_eq!(error.error_code(), code);
    }

    #[test]
    fn test_config_errors_convert() {
        let err = AppError::from(config::ConfigError::Message("missing leave.coverage".into()));
        assert_eq!(err.to_string(), "Configuration error: missing leave.coverage");
    }
}
