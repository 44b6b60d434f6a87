//! Eligibility rule interpreter.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::employee::{EmployeeProfile, EmploymentType};

/// A single eligibility rule. A leave type lists rules that must all pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum EligibilityRule {
    /// The employee has completed at least this many months of service.
    MinimumServiceMonths {
        /// Required completed months.
        months: u32,
    },
    /// The employee's employment type is one of these.
    EmploymentTypes {
        /// Accepted employment types.
        allowed: Vec<EmploymentType>,
    },
    /// The employee works in one of these jurisdictions (case-insensitive).
    Jurisdictions {
        /// Accepted jurisdiction codes.
        allowed: Vec<String>,
    },
}

impl EligibilityRule {
    /// Evaluates the rule against an employee on a date.
    #[must_use]
    pub fn is_satisfied(&self, employee: &EmployeeProfile, as_of: NaiveDate) -> bool {
        match self {
            Self::MinimumServiceMonths { months } => employee.service_months(as_of) >= *months,
            Self::EmploymentTypes { allowed } => allowed.contains(&employee.employment_type),
            Self::Jurisdictions { allowed } => allowed
                .iter()
                .any(|code| code.eq_ignore_ascii_case(&employee.jurisdiction)),
        }
    }

    /// Human readable description used in refusal messages.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::MinimumServiceMonths { months } => {
                format!("requires {months} months of service")
            }
            Self::EmploymentTypes { allowed } => {
                let names: Vec<_> = allowed.iter().map(EmploymentType::as_str).collect();
                format!("requires employment type in [{}]", names.join(", "))
            }
            Self::Jurisdictions { allowed } => {
                format!("requires jurisdiction in [{}]", allowed.join(", "))
            }
        }
    }
}

/// Outcome of evaluating every rule of a leave type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibilityOutcome {
    /// Descriptions of the rules that failed.
    pub failures: Vec<String>,
}

impl EligibilityOutcome {
    /// True when no rule failed.
    #[must_use]
    pub fn is_eligible(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Evaluates all rules; inactive employees always fail.
#[must_use]
pub fn evaluate(
    rules: &[EligibilityRule],
    employee: &EmployeeProfile,
    as_of: NaiveDate,
) -> EligibilityOutcome {
    let mut failures = Vec::new();
    if !employee.active {
        failures.push("employee is not active".to_string());
    }
    failures.extend(
        rules
            .iter()
            .filter(|rule| !rule.is_satisfied(employee, as_of))
            .map(EligibilityRule::describe),
    );
    EligibilityOutcome { failures }
}
