//! Policy store errors.

use chrono::NaiveDate;
use thiserror::Error;

use furlough_shared::types::LeaveTypeId;

/// Errors raised by the policy store and date helpers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PolicyError {
    /// No published version of the leave type exists.
    #[error("Leave type not found: {0}")]
    LeaveTypeNotFound(LeaveTypeId),

    /// The requested version was never published.
    #[error("Leave type {id} has no version {version}")]
    LeaveTypeVersionNotFound {
        /// Leave type ID.
        id: LeaveTypeId,
        /// Requested version.
        version: u32,
    },

    /// The definition violates a policy invariant.
    #[error("Invalid leave policy: {0}")]
    InvalidPolicy(String),

    /// End date precedes start date.
    #[error("Invalid date range: {end} is before {start}")]
    InvalidDateRange {
        /// Start date.
        start: NaiveDate,
        /// End date.
        end: NaiveDate,
    },
}

impl PolicyError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::LeaveTypeNotFound(_) => "LEAVE_TYPE_NOT_FOUND",
            Self::LeaveTypeVersionNotFound { .. } => "LEAVE_TYPE_VERSION_NOT_FOUND",
            Self::InvalidPolicy(_) => "INVALID_POLICY",
            Self::InvalidDateRange { .. } => "INVALID_DATE_RANGE",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::LeaveTypeNotFound(_) | Self::LeaveTypeVersionNotFound { .. } => 404,
            Self::InvalidPolicy(_) => 422,
            Self::InvalidDateRange { .. } => 400,
        }
    }
}
