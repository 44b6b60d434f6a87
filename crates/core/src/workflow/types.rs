//! Workflow domain types for the leave request lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use furlough_shared::types::EmployeeId;

use super::approval::ApproverRole;

/// Leave request status.
///
/// The valid transitions are:
/// - Draft → Pending (submit)
/// - Draft → Cancelled (discard)
/// - Pending → Approved (final approval or auto-approval)
/// - Pending → Rejected (reject)
/// - Pending → Cancelled (cancel, releases the reservation)
/// - Approved → Cancelled (cancel, reverses usage)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaveStatus {
    /// Being drafted; holds no balance.
    Draft,
    /// Submitted; balance reserved.
    Pending,
    /// Approved; balance used.
    Approved,
    /// Rejected (terminal).
    Rejected,
    /// Cancelled (terminal).
    Cancelled,
}

impl LeaveStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Returns true if no further transition exists.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Cancelled)
    }

    /// Returns true if the request currently holds balance.
    #[must_use]
    pub fn holds_balance(&self) -> bool {
        matches!(self, Self::Pending | Self::Approved)
    }
}

impl fmt::Display for LeaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Request priority, shown to approvers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Can wait.
    Low,
    /// Default.
    #[default]
    Normal,
    /// Needs attention soon.
    High,
    /// Needs attention now.
    Urgent,
}

/// An authorized approver's decision to proceed despite a critical conflict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictOverride {
    /// Who overrode.
    pub approver_id: EmployeeId,
    /// The role that authorized it.
    pub role: ApproverRole,
    /// Why.
    pub reason: Option<String>,
    /// When.
    pub at: DateTime<Utc>,
}

/// Workflow action representing a state transition with audit data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowAction {
    /// Draft submitted for approval.
    Submit {
        /// New status (Pending).
        new_status: LeaveStatus,
        /// The requesting employee.
        submitted_by: EmployeeId,
        /// Timestamp.
        submitted_at: DateTime<Utc>,
    },
    /// Request approved (final step or auto-approval).
    Approve {
        /// New status (Approved).
        new_status: LeaveStatus,
        /// Final approver, `None` for auto-approval.
        approved_by: Option<EmployeeId>,
        /// Timestamp.
        approved_at: DateTime<Utc>,
    },
    /// Request rejected.
    Reject {
        /// New status (Rejected).
        new_status: LeaveStatus,
        /// The approver.
        rejected_by: EmployeeId,
        /// Timestamp.
        rejected_at: DateTime<Utc>,
        /// Reason (required).
        rejection_reason: String,
    },
    /// Request cancelled or draft discarded.
    Cancel {
        /// New status (Cancelled).
        new_status: LeaveStatus,
        /// Who cancelled.
        cancelled_by: EmployeeId,
        /// Timestamp.
        cancelled_at: DateTime<Utc>,
    },
}

impl WorkflowAction {
    /// Returns the new status after this action.
    #[must_use]
    pub fn new_status(&self) -> LeaveStatus {
        match self {
            Self::Submit { new_status, .. }
            | Self::Approve { new_status, .. }
            | Self::Reject { new_status, .. }
            | Self::Cancel { new_status, .. } => *new_status,
        }
    }

    /// Returns the action name for audit records.
    #[must_use]
    pub fn action_name(&self) -> &'static str {
        match self {
            Self::Submit { .. } => "submitted",
            Self::Approve { .. } => "approved",
            Self::Reject { .. } => "rejected",
            Self::Cancel { .. } => "cancelled",
        }
    }
}
