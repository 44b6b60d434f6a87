//! Ledger error types.

use thiserror::Error;

use furlough_shared::types::{Days, LeaveRequestId};

use crate::policy::PolicyError;

/// Errors that can occur during ledger operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Not enough available balance.
    #[error("Insufficient balance: {available} days available, {requested} requested")]
    InsufficientBalance {
        /// Days available.
        available: Days,
        /// Days requested.
        requested: Days,
    },

    /// Amount is zero, negative or otherwise unusable.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// The leave type does not allow cash-out.
    #[error("Leave type {0} is not eligible for cash-out")]
    CashOutNotAllowed(String),

    // ========== Posting State Errors ==========
    /// The at-most-once posting was already made.
    #[error("Already posted: {0}")]
    AlreadyPosted(String),

    /// No reservation exists for the request.
    #[error("No reservation found for request {0}")]
    ReservationNotFound(LeaveRequestId),

    /// The reservation is in a state that does not allow the operation.
    #[error("Reservation for request {request_id} is {state}; cannot {operation}")]
    InvalidReservationState {
        /// The request.
        request_id: LeaveRequestId,
        /// Current reservation state.
        state: &'static str,
        /// Attempted operation.
        operation: &'static str,
    },

    /// No ledger exists for the key.
    #[error("No balance found for {0}")]
    BalanceNotFound(String),

    // ========== Concurrency Errors ==========
    /// The balance key is locked by another writer.
    #[error("Concurrent modification detected, please retry")]
    ConcurrentModification,

    // ========== Integrity Errors ==========
    /// A mutation would break a balance invariant.
    #[error("Balance invariant violated for {key}: {detail}")]
    InvariantViolation {
        /// Balance key.
        key: String,
        /// What broke.
        detail: String,
    },

    /// Replaying the ledger does not reproduce the stored balance.
    #[error("Ledger replay mismatch for {key} at sequence {sequence}")]
    ReplayMismatch {
        /// Balance key.
        key: String,
        /// First diverging entry.
        sequence: u64,
    },

    /// Policy lookup or date arithmetic failed.
    #[error(transparent)]
    Policy(#[from] PolicyError),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::CashOutNotAllowed(_) => "CASH_OUT_NOT_ALLOWED",
            Self::AlreadyPosted(_) => "ALREADY_POSTED",
            Self::ReservationNotFound(_) => "RESERVATION_NOT_FOUND",
            Self::InvalidReservationState { .. } => "INVALID_RESERVATION_STATE",
            Self::BalanceNotFound(_) => "BALANCE_NOT_FOUND",
            Self::ConcurrentModification => "CONCURRENT_MODIFICATION_CONFLICT",
            Self::InvariantViolation { .. } => "INVARIANT_VIOLATION",
            Self::ReplayMismatch { .. } => "REPLAY_MISMATCH",
            Self::Policy(e) => e.error_code(),
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - validation errors
            Self::InvalidAmount(_) => 400,

            // 404 Not Found
            Self::ReservationNotFound(_) | Self::BalanceNotFound(_) => 404,

            // 409 Conflict - state errors
            Self::AlreadyPosted(_)
            | Self::InvalidReservationState { .. }
            | Self::ConcurrentModification => 409,

            // 422 Unprocessable Entity - business rule violations
            Self::InsufficientBalance { .. } | Self::CashOutNotAllowed(_) => 422,

            // 500 Internal Server Error
            Self::InvariantViolation { .. } | Self::ReplayMismatch { .. } => 500,

            Self::Policy(e) => e.http_status_code(),
        }
    }

    /// Returns true if the operation may succeed when retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification)
    }
}
