//! Submission guards.
//!
//! Each guard is a pure check returning the typed refusal. The lifecycle
//! service runs them in order and stops at the first failure.

use chrono::NaiveDate;

use furlough_shared::types::{Days, EmployeeId, LeaveRequestId};

use crate::conflict::{ConflictReport, FindingKind};
use crate::policy::{DateRange, LeaveType};
use crate::workflow::approval::ApproverRole;
use crate::workflow::error::WorkflowError;

/// Minimum notice, waived for emergencies that carry a justification.
pub fn check_notice(
    leave_type: &LeaveType,
    start: NaiveDate,
    today: NaiveDate,
    emergency: bool,
    justification: Option<&str>,
) -> Result<(), WorkflowError> {
    if emergency {
        return match justification {
            Some(text) if !text.trim().is_empty() => Ok(()),
            _ => Err(WorkflowError::EmergencyJustificationRequired),
        };
    }
    let given = (start - today).num_days();
    if given < i64::from(leave_type.min_notice_days) {
        return Err(WorkflowError::NoticePeriodViolation {
            required: leave_type.min_notice_days,
            given,
        });
    }
    Ok(())
}

/// `0 < days <= max_consecutive` and `days <= max_duration`.
pub fn check_duration(leave_type: &LeaveType, days: Days) -> Result<(), WorkflowError> {
    if !days.is_positive() {
        return Err(WorkflowError::DurationBoundsViolation(
            "request covers no chargeable days".to_string(),
        ));
    }
    if let Some(max) = leave_type.max_consecutive_days
        && days > max
    {
        return Err(WorkflowError::DurationBoundsViolation(format!(
            "{days} days exceeds the maximum of {max} consecutive days"
        )));
    }
    if let Some(max) = leave_type.max_duration_days
        && days > max
    {
        return Err(WorkflowError::DurationBoundsViolation(format!(
            "{days} days exceeds the maximum duration of {max} days"
        )));
    }
    Ok(())
}

/// No date may be booked twice: refuses overlap with the employee's other
/// pending or approved requests of any type.
pub fn check_overlap(
    range: &DateRange,
    others: &[(LeaveRequestId, DateRange)],
) -> Result<(), WorkflowError> {
    match others.iter().find(|(_, other)| other.overlaps(range)) {
        Some((id, _)) => Err(WorkflowError::OverlappingRequest(*id)),
        None => Ok(()),
    }
}

/// Minimum gap from the employee's other approved or pending requests of the same type.
pub fn check_minimum_gap(
    leave_type: &LeaveType,
    range: &DateRange,
    others: &[DateRange],
) -> Result<(), WorkflowError> {
    let Some(required) = leave_type.min_gap_days else {
        return Ok(());
    };
    match others
        .iter()
        .map(|other| other.gap_days(range))
        .filter(|gap| *gap < i64::from(required))
        .min()
    {
        Some(gap) => Err(WorkflowError::MinimumGapViolation { required, gap }),
        None => Ok(()),
    }
}

/// Nobody decides, or overrides conflicts on, their own request.
pub fn check_not_requester(requester: EmployeeId, actor: EmployeeId, operation: &str) -> Result<(), WorkflowError> {
    if actor == requester {
        return Err(WorkflowError::NotAuthorized(format!(
            "employees may not {operation} their own request"
        )));
    }
    Ok(())
}

/// Critical findings block unless overridden by an HR or director role holder.
pub fn check_conflicts(
    report: &ConflictReport,
    override_role: Option<ApproverRole>,
) -> Result<(), WorkflowError> {
    if override_role.is_some_and(|role| role.can_override_conflicts()) {
        return Ok(());
    }
    if let Some(finding) = report.critical(FindingKind::Blackout) {
        return Err(WorkflowError::BlackoutConflict(finding.message.clone()));
    }
    if let Some(finding) = report.critical(FindingKind::Coverage) {
        return Err(WorkflowError::CoverageConflict(finding.message.clone()));
    }
    Ok(())
}

/// Returns true if the request needs a medical certificate.
#[must_use]
pub fn requires_medical_certificate(leave_type: &LeaveType, days: Days) -> bool {
    leave_type
        .medical_certificate_after_days
        .is_some_and(|threshold| days > threshold)
}

/// Returns true if the request may skip the approval chain.
#[must_use]
pub fn qualifies_for_auto_approval(
    leave_type: &LeaveType,
    days: Days,
    report: &ConflictReport,
    manager_delegated: bool,
) -> bool {
    manager_delegated
        && !report.has_critical()
        && leave_type
            .auto_approve_threshold_days
            .is_some_and(|threshold| days <= threshold)
}
