//! Employee facts the leave core reads from the directory.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use furlough_shared::types::{DepartmentId, EmployeeId};

use crate::workflow::ApproverRole;

/// Employment type used by eligibility rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentType {
    /// Permanent full-time.
    FullTime,
    /// Permanent part-time.
    PartTime,
    /// Fixed-term contract.
    Contract,
    /// Internship.
    Intern,
    /// Casual engagement.
    Casual,
}

impl EmploymentType {
    /// Returns the string representation of the employment type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FullTime => "full_time",
            Self::PartTime => "part_time",
            Self::Contract => "contract",
            Self::Intern => "intern",
            Self::Casual => "casual",
        }
    }
}

impl std::fmt::Display for EmploymentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Read-only employee profile supplied by the employee directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmployeeProfile {
    /// Employee ID.
    pub id: EmployeeId,
    /// Display name.
    pub name: String,
    /// Department the employee belongs to.
    pub department_id: DepartmentId,
    /// First day of employment.
    pub hire_date: NaiveDate,
    /// Employment type.
    pub employment_type: EmploymentType,
    /// Legal jurisdiction (e.g. "AU-NSW").
    pub jurisdiction: String,
    /// Direct manager, if any.
    pub manager_id: Option<EmployeeId>,
    /// The manager lets short requests approve themselves.
    #[serde(default)]
    pub auto_approval_delegated: bool,
    /// Organisation-wide approver roles this employee holds.
    #[serde(default)]
    pub approver_roles: Vec<ApproverRole>,
    /// Inactive employees are never eligible and never accrue.
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl EmployeeProfile {
    /// Completed months of service on `as_of`.
    #[must_use]
    pub fn service_months(&self, as_of: NaiveDate) -> u32 {
        completed_months(self.hire_date, as_of)
    }

    /// Returns true if the employee holds the given approver role.
    #[must_use]
    pub fn holds_role(&self, role: ApproverRole) -> bool {
        self.approver_roles.contains(&role)
    }
}

/// Completed calendar months between two dates (0 when `to` precedes `from`).
#[must_use]
pub fn completed_months(from: NaiveDate, to: NaiveDate) -> u32 {
    if to < from {
        return 0;
    }
    let mut months = (i64::from(to.year()) - i64::from(from.year())) * 12
        + i64::from(to.month())
        - i64::from(from.month());
    if to.day() < from.day() {
        months -= 1;
    }
    u32::try_from(months.max(0)).unwrap_or(u32::MAX)
}
