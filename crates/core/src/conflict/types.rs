//! Conflict report types.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use furlough_shared::CoverageConfig;
use furlough_shared::types::{DepartmentId, EmployeeId, LeaveRequestId, LeaveTypeId};

use crate::policy::DateRange;

/// Risk level of a finding or a whole report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// No risk.
    #[default]
    Healthy,
    /// Approver attention advised.
    Warning,
    /// Blocks submission unless overridden.
    Critical,
}

impl Severity {
    /// Returns the string representation of the severity.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a finding is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    /// Too much of the department absent.
    Coverage,
    /// The range overlaps a blackout period.
    Blackout,
    /// Too close to another request of the same type.
    MinimumGap,
}

/// One detected risk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictFinding {
    /// What the finding is about.
    pub kind: FindingKind,
    /// How serious it is.
    pub severity: Severity,
    /// Human readable description.
    pub message: String,
    /// Other employees involved.
    pub affected_employees: Vec<EmployeeId>,
    /// Dates affected.
    pub dates: Vec<NaiveDate>,
}

/// Coverage for one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCoverage {
    /// The day.
    pub date: NaiveDate,
    /// Other employees on approved leave.
    pub absent: u32,
    /// Department headcount.
    pub headcount: u32,
    /// `absent / headcount` in percent.
    pub absent_percent: Decimal,
    /// Classification against the thresholds.
    pub severity: Severity,
}

/// Result of a conflict analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictReport {
    /// Department analysed.
    pub department_id: DepartmentId,
    /// Dates analysed.
    pub range: DateRange,
    /// Detected risks.
    pub findings: Vec<ConflictFinding>,
    /// Per-day coverage series.
    pub daily: Vec<DailyCoverage>,
    /// Highest severity among the findings.
    pub severity: Severity,
}

impl ConflictReport {
    /// The first critical finding of `kind`, if any.
    #[must_use]
    pub fn critical(&self, kind: FindingKind) -> Option<&ConflictFinding> {
        self.findings
            .iter()
            .find(|finding| finding.kind == kind && finding.severity == Severity::Critical)
    }

    /// Returns true if any finding is critical.
    #[must_use]
    pub fn has_critical(&self) -> bool {
        self.severity == Severity::Critical
    }
}

/// Input to a conflict analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictQuery {
    /// Department to analyse.
    pub department_id: DepartmentId,
    /// Candidate dates.
    pub range: DateRange,
    /// The candidate employee; their own approved absences are not counted.
    pub employee_id: Option<EmployeeId>,
    /// The candidate leave type, for blackout and gap checks.
    pub leave_type_id: Option<LeaveTypeId>,
    /// A request to leave out of the scan (e.g. the one being re-analysed).
    pub exclude_request: Option<LeaveRequestId>,
}

/// An approved absence in the department.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Absence {
    /// The request.
    pub request_id: LeaveRequestId,
    /// Who is absent.
    pub employee_id: EmployeeId,
    /// The leave type.
    pub leave_type_id: LeaveTypeId,
    /// Dates absent.
    pub range: DateRange,
}

/// Coverage thresholds in percent absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoverageThresholds {
    /// At or above this the day is a warning.
    pub warning_percent: Decimal,
    /// Above this the day is critical.
    pub critical_percent: Decimal,
}

impl CoverageThresholds {
    /// Classifies a day's absent share.
    #[must_use]
    pub fn classify(&self, absent_percent: Decimal) -> Severity {
        if absent_percent > self.critical_percent {
            Severity::Critical
        } else if absent_percent >= self.warning_percent {
            Severity::Warning
        } else {
            Severity::Healthy
        }
    }
}

impl From<&CoverageConfig> for CoverageThresholds {
    fn from(config: &CoverageConfig) -> Self {
        Self {
            warning_percent: config.warning_percent,
            critical_percent: config.critical_percent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(dec!(0), Severity::Healthy)]
    #[case(dec!(29.99), Severity::Healthy)]
    #[case(dec!(30), Severity::Warning)]
    #[case(dec!(50), Severity::Warning)]
    #[case(dec!(50.01), Severity::Critical)]
    #[case(dec!(100), Severity::Critical)]
    fn test_classify(#[case] percent: Decimal, #[case] expected: Severity) {
        let thresholds = CoverageThresholds {
            warning_percent: dec!(30),
            critical_percent: dec!(50),
        };
        assert_eq!(thresholds.classify(percent), expected);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::Warning);
        assert!(Severity::Warning > Severity::Healthy);
        assert_eq!(Severity::Warning.to_string(), "warning");
    }
}
