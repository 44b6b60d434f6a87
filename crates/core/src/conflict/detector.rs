//! Team coverage, blackout and gap analysis.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use furlough_shared::types::EmployeeId;

use super::types::{
    Absence, ConflictFinding, ConflictQuery, ConflictReport, CoverageThresholds, DailyCoverage,
    FindingKind, Severity,
};
use crate::policy::LeaveType;

/// Stateless conflict analysis over a department's approved absences.
#[derive(Debug, Clone, Copy)]
pub struct ConflictDetector {
    thresholds: CoverageThresholds,
}

impl ConflictDetector {
    /// Creates a detector with configured thresholds.
    #[must_use]
    pub const fn new(thresholds: CoverageThresholds) -> Self {
        Self { thresholds }
    }

    /// Configured thresholds.
    #[must_use]
    pub const fn thresholds(&self) -> CoverageThresholds {
        self.thresholds
    }

    /// Analyses `query` against the department's approved `absences`.
    ///
    /// Coverage is the share of the department already on approved leave on
    /// each day; the candidate's own absence is not counted. `leave_type`
    /// enables the blackout and minimum-gap checks. Never fails: an empty
    /// department is treated as a headcount of one.
    #[must_use]
    pub fn analyze(
        &self,
        query: &ConflictQuery,
        headcount: u32,
        absences: &[Absence],
        leave_type: Option<&LeaveType>,
    ) -> ConflictReport {
        let relevant: Vec<&Absence> = absences
            .iter()
            .filter(|absence| Some(absence.request_id) != query.exclude_request)
            .collect();

        let daily = self.daily_coverage(query, headcount, &relevant);
        let mut findings = coverage_findings(query, &daily, &relevant);
        if let Some(leave_type) = leave_type {
            findings.extend(blackout_findings(query, leave_type));
            findings.extend(gap_findings(query, leave_type, &relevant));
        }

        let severity = findings
            .iter()
            .map(|finding| finding.severity)
            .max()
            .unwrap_or_default();

        ConflictReport {
            department_id: query.department_id,
            range: query.range,
            findings,
            daily,
            severity,
        }
    }

    fn daily_coverage(
        &self,
        query: &ConflictQuery,
        headcount: u32,
        absences: &[&Absence],
    ) -> Vec<DailyCoverage> {
        let headcount = headcount.max(1);
        query
            .range
            .dates()
            .map(|date| {
                let others = absentees_on(date, absences, query.employee_id).len();
                let absent = u32::try_from(others).unwrap_or(u32::MAX);
                let absent_percent = (Decimal::from(absent) * Decimal::ONE_HUNDRED
                    / Decimal::from(headcount))
                .round_dp(2);
                DailyCoverage {
                    date,
                    absent,
                    headcount,
                    absent_percent,
                    severity: self.thresholds.classify(absent_percent),
                }
            })
            .collect()
    }
}

/// Distinct employees other than `candidate` absent on `date`.
fn absentees_on(
    date: NaiveDate,
    absences: &[&Absence],
    candidate: Option<EmployeeId>,
) -> BTreeSet<EmployeeId> {
    absences
        .iter()
        .filter(|absence| absence.range.contains(date) && Some(absence.employee_id) != candidate)
        .map(|absence| absence.employee_id)
        .collect()
}

fn coverage_findings(
    query: &ConflictQuery,
    daily: &[DailyCoverage],
    absences: &[&Absence],
) -> Vec<ConflictFinding> {
    [Severity::Critical, Severity::Warning]
        .into_iter()
        .filter_map(|severity| {
            let days: Vec<&DailyCoverage> = daily.iter().filter(|day| day.severity == severity).collect();
            let worst = days.iter().map(|day| day.absent_percent).max()?;
            let affected: BTreeSet<EmployeeId> = days
                .iter()
                .flat_map(|day| absentees_on(day.date, absences, query.employee_id))
                .collect();
            Some(ConflictFinding {
                kind: FindingKind::Coverage,
                severity,
                message: format!(
                    "{} day(s) at {severity} coverage, up to {worst}% of the department absent",
                    days.len()
                ),
                affected_employees: affected.into_iter().collect(),
                dates: days.iter().map(|day| day.date).collect(),
            })
        })
        .collect()
}

fn blackout_findings<'a>(
    query: &'a ConflictQuery,
    leave_type: &'a LeaveType,
) -> impl Iterator<Item = ConflictFinding> + 'a {
    leave_type
        .blackouts_overlapping(&query.range)
        .filter_map(move |period| {
            let overlap = period.range.intersection(&query.range)?;
            Some(ConflictFinding {
                kind: FindingKind::Blackout,
                severity: Severity::Critical,
                message: format!("overlaps blackout period \"{}\" ({})", period.name, period.range),
                affected_employees: Vec::new(),
                dates: overlap.dates().collect(),
            })
        })
}

fn gap_findings(
    query: &ConflictQuery,
    leave_type: &LeaveType,
    absences: &[&Absence],
) -> Vec<ConflictFinding> {
    let (Some(min_gap), Some(employee_id)) = (leave_type.min_gap_days, query.employee_id) else {
        return Vec::new();
    };
    absences
        .iter()
        .filter(|absence| absence.employee_id == employee_id && absence.leave_type_id == leave_type.id)
        .filter(|absence| absence.range.gap_days(&query.range) < i64::from(min_gap))
        .map(|absence| ConflictFinding {
            kind: FindingKind::MinimumGap,
            severity: Severity::Warning,
            message: format!(
                "{} day(s) from approved {} leave {}; minimum gap is {min_gap}",
                absence.range.gap_days(&query.range),
                leave_type.code,
                absence.range
            ),
            affected_employees: vec![employee_id],
            dates: absence.range.dates().collect(),
        })
        .collect()
}
