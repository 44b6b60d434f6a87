//! The leave request aggregate and its submission input.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use furlough_shared::types::{Days, DepartmentId, EmployeeId, LeaveRequestId, LeaveTypeId};

use crate::conflict::ConflictReport;
use crate::policy::{DateRange, DayPeriod, LeaveType, PolicyError};
use crate::workflow::approval::ApprovalChain;
use crate::workflow::types::{ConflictOverride, LeaveStatus, Priority, WorkflowAction};

/// An approver's request to proceed despite critical conflicts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideInput {
    /// The approver supplying the override.
    pub approver_id: EmployeeId,
    /// Why.
    pub reason: Option<String>,
}

/// Input for creating a leave request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveRequestInput {
    /// The requesting employee.
    pub employee_id: EmployeeId,
    /// The leave type.
    pub leave_type_id: LeaveTypeId,
    /// First day (inclusive).
    pub start_date: NaiveDate,
    /// Last day (inclusive).
    pub end_date: NaiveDate,
    /// Full or half first day.
    #[serde(default)]
    pub start_period: DayPeriod,
    /// Full or half last day.
    #[serde(default)]
    pub end_period: DayPeriod,
    /// Free-text reason.
    #[serde(default)]
    pub reason: Option<String>,
    /// Emergency requests skip the notice period.
    #[serde(default)]
    pub emergency: bool,
    /// Required for emergencies.
    #[serde(default)]
    pub emergency_justification: Option<String>,
    /// Priority shown to approvers.
    #[serde(default)]
    pub priority: Priority,
    /// Override for critical conflicts.
    #[serde(default)]
    pub conflict_override: Option<OverrideInput>,
}

/// A leave request. Never deleted; cancellation is terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveRequest {
    /// Unique identifier.
    pub id: LeaveRequestId,
    /// The requesting employee.
    pub employee_id: EmployeeId,
    /// The employee's department at submission.
    pub department_id: DepartmentId,
    /// The leave type.
    pub leave_type_id: LeaveTypeId,
    /// Policy version the request was evaluated against.
    pub leave_type_version: u32,
    /// Requested dates.
    pub range: DateRange,
    /// Full or half first day.
    pub start_period: DayPeriod,
    /// Full or half last day.
    pub end_period: DayPeriod,
    /// Days the request consumes.
    pub chargeable_days: Days,
    /// Free-text reason.
    pub reason: Option<String>,
    /// Emergency flag.
    pub emergency: bool,
    /// Emergency justification.
    pub emergency_justification: Option<String>,
    /// Priority.
    pub priority: Priority,
    /// Current status.
    pub status: LeaveStatus,
    /// Approval state machine.
    pub approval: ApprovalChain,
    /// Latest conflict analysis.
    pub conflict_report: Option<ConflictReport>,
    /// Override of critical conflicts, if any.
    pub conflict_override: Option<ConflictOverride>,
    /// A medical certificate must be attached before final approval.
    pub medical_certificate_required: bool,
    /// A medical certificate has been attached.
    pub medical_certificate_attached: bool,
    /// Approved without the chain under delegation.
    pub auto_approved: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
    /// Submission time.
    pub submitted_at: Option<DateTime<Utc>>,
    /// Final approval time.
    pub approved_at: Option<DateTime<Utc>>,
    /// Final approver.
    pub approved_by: Option<EmployeeId>,
    /// Rejection time.
    pub rejected_at: Option<DateTime<Utc>>,
    /// Who rejected.
    pub rejected_by: Option<EmployeeId>,
    /// Why.
    pub rejection_reason: Option<String>,
    /// Cancellation time.
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Who cancelled.
    pub cancelled_by: Option<EmployeeId>,
    /// Last escalation time.
    pub escalated_at: Option<DateTime<Utc>>,
}

impl LeaveRequest {
    /// Creates a draft from submission input.
    pub fn draft(
        input: &LeaveRequestInput,
        department_id: DepartmentId,
        leave_type: &LeaveType,
        chargeable_days: Days,
        approval: ApprovalChain,
        now: DateTime<Utc>,
    ) -> Result<Self, PolicyError> {
        Ok(Self {
            id: LeaveRequestId::new(),
            employee_id: input.employee_id,
            department_id,
            leave_type_id: leave_type.id,
            leave_type_version: leave_type.version,
            range: DateRange::new(input.start_date, input.end_date)?,
            start_period: input.start_period,
            end_period: input.end_period,
            chargeable_days,
            reason: input.reason.clone(),
            emergency: input.emergency,
            emergency_justification: input.emergency_justification.clone(),
            priority: input.priority,
            status: LeaveStatus::Draft,
            approval,
            conflict_report: None,
            conflict_override: None,
            medical_certificate_required: false,
            medical_certificate_attached: false,
            auto_approved: false,
            created_at: now,
            updated_at: now,
            submitted_at: None,
            approved_at: None,
            approved_by: None,
            rejected_at: None,
            rejected_by: None,
            rejection_reason: None,
            cancelled_at: None,
            cancelled_by: None,
            escalated_at: None,
        })
    }

    /// Applies a validated transition and its audit fields.
    pub fn apply(&mut self, action: &WorkflowAction) {
        match action {
            WorkflowAction::Submit { submitted_at, .. } => {
                self.submitted_at = Some(*submitted_at);
                self.updated_at = *submitted_at;
            }
            WorkflowAction::Approve {
                approved_by,
                approved_at,
                ..
            } => {
                self.approved_by = *approved_by;
                self.approved_at = Some(*approved_at);
                self.auto_approved = approved_by.is_none();
                self.updated_at = *approved_at;
            }
            WorkflowAction::Reject {
                rejected_by,
                rejected_at,
                rejection_reason,
                ..
            } => {
                self.rejected_by = Some(*rejected_by);
                self.rejected_at = Some(*rejected_at);
                self.rejection_reason = Some(rejection_reason.clone());
                self.updated_at = *rejected_at;
            }
            WorkflowAction::Cancel {
                cancelled_by,
                cancelled_at,
                ..
            } => {
                self.cancelled_by = Some(*cancelled_by);
                self.cancelled_at = Some(*cancelled_at);
                self.updated_at = *cancelled_at;
            }
        }
        self.status = action.new_status();
    }

    /// Returns true if the request has waited `sla` for a decision since it
    /// was submitted or last escalated.
    #[must_use]
    pub fn is_overdue(&self, now: DateTime<Utc>, sla: Duration) -> bool {
        self.status == LeaveStatus::Pending
            && self
                .escalated_at
                .or(self.submitted_at)
                .is_some_and(|since| now - since >= sla)
    }

    /// Records an escalation.
    pub fn mark_escalated(&mut self, reassign_to: Option<EmployeeId>, at: DateTime<Utc>) {
        self.approval.escalate(reassign_to);
        self.escalated_at = Some(at);
        self.updated_at = at;
    }

    /// Escalation level of the approval chain.
    #[must_use]
    pub fn escalation_level(&self) -> u32 {
        self.approval.escalation_level
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{ApprovalRequirements, DayCountingRule};
    use crate::workflow::approval::ApproverAssignment;

    fn input(start: NaiveDate, end: NaiveDate) -> LeaveRequestInput {
        LeaveRequestInput {
            employee_id: EmployeeId::new(),
            leave_type_id: LeaveTypeId::new(),
            start_date: start,
            end_date: end,
            start_period: DayPeriod::Full,
            end_period: DayPeriod::Full,
            reason: Some("holiday".to_string()),
            emergency: false,
            emergency_justification: None,
            priority: Priority::Normal,
            conflict_override: None,
        }
    }

    fn draft(now: DateTime<Utc>) -> LeaveRequest {
        let leave_type = LeaveType::new("ANNUAL", "Annual Leave", DayCountingRule::WORKING_DAYS);
        LeaveRequest::draft(
            &input(
                NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
                NaiveDate::from_ymd_opt(2026, 6, 5).unwrap(),
            ),
            DepartmentId::new(),
            &leave_type,
            Days::whole(5),
            ApprovalChain::build(&ApprovalRequirements::default(), &ApproverAssignment::default()),
            now,
        )
        .unwrap()
    }

    #[test]
    fn test_draft_rejects_inverted_dates() {
        let leave_type = LeaveType::new("ANNUAL", "Annual Leave", DayCountingRule::WORKING_DAYS);
        let result = LeaveRequest::draft(
            &input(
                NaiveDate::from_ymd_opt(2026, 6, 5).unwrap(),
                NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
            ),
            DepartmentId::new(),
            &leave_type,
            Days::whole(5),
            ApprovalChain::build(&ApprovalRequirements::default(), &ApproverAssignment::default()),
            Utc::now(),
        );
        assert!(matches!(result, Err(PolicyError::InvalidDateRange { .. })));
    }

    #[test]
    fn test_apply_sets_audit_fields() {
        let now = Utc::now();
        let mut request = draft(now);
        assert_eq!(request.status, LeaveStatus::Draft);

        request.apply(&WorkflowAction::Submit {
            new_status: LeaveStatus::Pending,
            submitted_by: request.employee_id,
            submitted_at: now,
        });
        assert_eq!(request.status, LeaveStatus::Pending);
        assert_eq!(request.submitted_at, Some(now));

        request.apply(&WorkflowAction::Approve {
            new_status: LeaveStatus::Approved,
            approved_by: None,
            approved_at: now,
        });
        assert_eq!(request.status, LeaveStatus::Approved);
        assert!(request.auto_approved);
    }

    #[test]
    fn test_overdue_after_sla_and_again_after_escalation() {
        let submitted = Utc::now();
        let mut request = draft(submitted);
        request.apply(&WorkflowAction::Submit {
            new_status: LeaveStatus::Pending,
            submitted_by: request.employee_id,
            submitted_at: submitted,
        });
        let sla = Duration::hours(48);
        assert!(!request.is_overdue(submitted + Duration::hours(47), sla));
        assert!(request.is_overdue(submitted + Duration::hours(48), sla));

        request.mark_escalated(None, submitted + Duration::hours(48));
        assert_eq!(request.escalation_level(), 1);
        assert!(!request.is_overdue(submitted + Duration::hours(60), sla));
        assert!(request.is_overdue(submitted + Duration::hours(96), sla));
    }
}
