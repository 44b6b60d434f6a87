//! Workflow service for leave request state transitions.
//!
//! This module implements the core state machine logic for moving a
//! leave request through the lifecycle. Ledger effects are the caller's
//! concern; this module only validates edges and builds audit data.

use chrono::{DateTime, Utc};

use furlough_shared::types::EmployeeId;

use crate::workflow::error::WorkflowError;
use crate::workflow::types::{LeaveStatus, WorkflowAction};

/// Stateless service for leave request transitions.
///
/// All methods are associated functions that validate a transition and
/// return the `WorkflowAction` with its audit trail information.
pub struct WorkflowService;

impl WorkflowService {
    /// Submit a draft for approval.
    ///
    /// # Returns
    /// * `Ok(WorkflowAction::Submit)` if the request is a draft
    /// * `Err(WorkflowError::InvalidTransition)` otherwise
    pub fn submit(
        current_status: LeaveStatus,
        submitted_by: EmployeeId,
        submitted_at: DateTime<Utc>,
    ) -> Result<WorkflowAction, WorkflowError> {
        Self::ensure(current_status, LeaveStatus::Pending)?;
        Ok(WorkflowAction::Submit {
            new_status: LeaveStatus::Pending,
            submitted_by,
            submitted_at,
        })
    }

    /// Approve a pending request. `approved_by` is `None` for auto-approval.
    ///
    /// # Returns
    /// * `Ok(WorkflowAction::Approve)` if the request is pending
    /// * `Err(WorkflowError::InvalidTransition)` otherwise
    pub fn approve(
        current_status: LeaveStatus,
        approved_by: Option<EmployeeId>,
        approved_at: DateTime<Utc>,
    ) -> Result<WorkflowAction, WorkflowError> {
        Self::ensure(current_status, LeaveStatus::Approved)?;
        Ok(WorkflowAction::Approve {
            new_status: LeaveStatus::Approved,
            approved_by,
            approved_at,
        })
    }

    /// Reject a pending request.
    ///
    /// # Returns
    /// * `Ok(WorkflowAction::Reject)` if the request is pending
    /// * `Err(WorkflowError::RejectionReasonRequired)` if the reason is blank
    /// * `Err(WorkflowError::InvalidTransition)` otherwise
    pub fn reject(
        current_status: LeaveStatus,
        rejected_by: EmployeeId,
        rejected_at: DateTime<Utc>,
        rejection_reason: String,
    ) -> Result<WorkflowAction, WorkflowError> {
        if rejection_reason.trim().is_empty() {
            return Err(WorkflowError::RejectionReasonRequired);
        }
        Self::ensure(current_status, LeaveStatus::Rejected)?;
        Ok(WorkflowAction::Reject {
            new_status: LeaveStatus::Rejected,
            rejected_by,
            rejected_at,
            rejection_reason,
        })
    }

    /// Cancel a draft, pending or approved request.
    ///
    /// # Returns
    /// * `Ok(WorkflowAction::Cancel)` if the request is not terminal
    /// * `Err(WorkflowError::InvalidTransition)` otherwise
    pub fn cancel(
        current_status: LeaveStatus,
        cancelled_by: EmployeeId,
        cancelled_at: DateTime<Utc>,
    ) -> Result<WorkflowAction, WorkflowError> {
        Self::ensure(current_status, LeaveStatus::Cancelled)?;
        Ok(WorkflowAction::Cancel {
            new_status: LeaveStatus::Cancelled,
            cancelled_by,
            cancelled_at,
        })
    }

    /// Check if a status transition is valid.
    ///
    /// Valid transitions:
    /// - Draft → Pending (submit)
    /// - Draft → Cancelled (discard)
    /// - Pending → Approved (approve)
    /// - Pending → Rejected (reject)
    /// - Pending → Cancelled (cancel)
    /// - Approved → Cancelled (cancel)
    #[must_use]
    pub fn is_valid_transition(from: LeaveStatus, to: LeaveStatus) -> bool {
        matches!(
            (from, to),
            (LeaveStatus::Draft, LeaveStatus::Pending | LeaveStatus::Cancelled)
                | (
                    LeaveStatus::Pending,
                    LeaveStatus::Approved | LeaveStatus::Rejected | LeaveStatus::Cancelled
                )
                | (LeaveStatus::Approved, LeaveStatus::Cancelled)
        )
    }

    fn ensure(from: LeaveStatus, to: LeaveStatus) -> Result<(), WorkflowError> {
        if Self::is_valid_transition(from, to) {
            Ok(())
        } else {
            Err(WorkflowError::InvalidTransition { from, to })
        }
    }
}
