//! Workflow error types for the leave request lifecycle.

use thiserror::Error;

use furlough_shared::types::{EmployeeId, LeaveRequestId};

use crate::ledger::LedgerError;
use crate::policy::PolicyError;
use crate::workflow::types::LeaveStatus;

/// Errors that can occur during workflow operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WorkflowError {
    // ========== Lookup Errors ==========
    /// Leave request not found.
    #[error("Leave request not found: {0}")]
    RequestNotFound(LeaveRequestId),

    /// Employee not found in the directory.
    #[error("Employee not found: {0}")]
    EmployeeNotFound(EmployeeId),

    // ========== State Errors ==========
    /// Attempted a transition that is not an enumerated edge.
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        /// The current status.
        from: LeaveStatus,
        /// The attempted target status.
        to: LeaveStatus,
    },

    // ========== Guard Errors ==========
    /// An eligibility rule failed.
    #[error("Employee is not eligible: {}", reasons.join("; "))]
    Ineligible {
        /// Failed rules.
        reasons: Vec<String>,
    },

    /// Not enough notice before the start date.
    #[error("At least {required} days of notice required, {given} given")]
    NoticePeriodViolation {
        /// Required notice in days.
        required: u32,
        /// Notice given in days.
        given: i64,
    },

    /// Emergency requests must say why.
    #[error("Emergency requests require a justification")]
    EmergencyJustificationRequired,

    /// Chargeable days outside the leave type's bounds.
    #[error("Duration out of bounds: {0}")]
    DurationBoundsViolation(String),

    /// Too close to another request of the same type.
    #[error("Requests of this type must be {required} days apart, found {gap}")]
    MinimumGapViolation {
        /// Required gap in days.
        required: u32,
        /// Actual gap in days.
        gap: i64,
    },

    /// The dates overlap another of the employee's pending or approved requests.
    #[error("Dates overlap leave request {0}")]
    OverlappingRequest(LeaveRequestId),

    /// The request overlaps a blackout period.
    #[error("Blackout conflict: {0}")]
    BlackoutConflict(String),

    /// Team coverage would fall to a critical level.
    #[error("Coverage conflict: {0}")]
    CoverageConflict(String),

    /// A medical certificate must be attached before final approval.
    #[error("A medical certificate is required before approval")]
    MedicalCertificateRequired,

    // ========== Authorization Errors ==========
    /// The actor may not perform the operation.
    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    /// Rejection reason is required but was not provided.
    #[error("Rejection reason is required")]
    RejectionReasonRequired,

    // ========== Passthrough ==========
    /// Ledger failure (insufficient balance, contention, invariant).
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Policy failure (unknown leave type, invalid dates).
    #[error(transparent)]
    Policy(#[from] PolicyError),

    /// A collaborator (directory, audit log) failed.
    #[error("Collaborator unavailable: {0}")]
    Collaborator(String),
}

impl WorkflowError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::RequestNotFound(_) => "REQUEST_NOT_FOUND",
            Self::EmployeeNotFound(_) => "EMPLOYEE_NOT_FOUND",
            Self::InvalidTransition { .. } => "INVALID_STATE_TRANSITION",
            Self::Ineligible { .. } => "INELIGIBLE",
            Self::NoticePeriodViolation { .. } => "NOTICE_PERIOD_VIOLATION",
            Self::EmergencyJustificationRequired => "EMERGENCY_JUSTIFICATION_REQUIRED",
            Self::DurationBoundsViolation(_) => "DURATION_BOUNDS_VIOLATION",
            Self::MinimumGapViolation { .. } => "MINIMUM_GAP_VIOLATION",
            Self::OverlappingRequest(_) => "OVERLAPPING_REQUEST",
            Self::BlackoutConflict(_) => "BLACKOUT_CONFLICT",
            Self::CoverageConflict(_) => "COVERAGE_CONFLICT",
            Self::MedicalCertificateRequired => "MEDICAL_CERTIFICATE_REQUIRED",
            Self::NotAuthorized(_) => "NOT_AUTHORIZED",
            Self::RejectionReasonRequired => "REJECTION_REASON_REQUIRED",
            Self::Ledger(e) => e.error_code(),
            Self::Policy(e) => e.error_code(),
            Self::Collaborator(_) => "COLLABORATOR_UNAVAILABLE",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - validation errors
            Self::EmergencyJustificationRequired | Self::RejectionReasonRequired => 400,

            // 403 Forbidden - authorization errors
            Self::NotAuthorized(_) => 403,

            // 404 Not Found
            Self::RequestNotFound(_) | Self::EmployeeNotFound(_) => 404,

            // 409 Conflict - state and conflict errors
            Self::InvalidTransition { .. }
            | Self::OverlappingRequest(_)
            | Self::BlackoutConflict(_)
            | Self::CoverageConflict(_) => 409,

            // 422 Unprocessable Entity - guard failures
            Self::Ineligible { .. }
            | Self::NoticePeriodViolation { .. }
            | Self::DurationBoundsViolation(_)
            | Self::MinimumGapViolation { .. }
            | Self::MedicalCertificateRequired => 422,

            // 503 Service Unavailable
            Self::Collaborator(_) => 503,

            Self::Ledger(e) => e.http_status_code(),
            Self::Policy(e) => e.http_status_code(),
        }
    }

    /// Returns true if the operation may succeed when retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Ledger(e) => e.is_retryable(),
            Self::Collaborator(_) => true,
            _ => false,
        }
    }
}
