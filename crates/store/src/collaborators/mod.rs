//! External collaborators consumed through traits.
//!
//! The leave core never owns employee profiles, message delivery or the
//! audit trail; it talks to them through these seams.

pub mod audit;
pub mod directory;
pub mod notification;

use thiserror::Error;

use furlough_core::workflow::WorkflowError;

pub use audit::{AuditEvent, AuditLog, AuditRecord, InMemoryAuditLog};
pub use directory::{EmployeeDirectory, InMemoryDirectory};
pub use notification::{ChannelNotifier, NotificationDispatcher, NotificationEvent};

/// A collaborator call failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CollaboratorError {
    /// The collaborator could not be reached.
    #[error("{service} unavailable: {detail}")]
    Unavailable {
        /// Which collaborator.
        service: &'static str,
        /// What went wrong.
        detail: String,
    },

    /// Fixture or payload could not be decoded.
    #[error("Invalid {service} data: {detail}")]
    InvalidData {
        /// Which collaborator.
        service: &'static str,
        /// What went wrong.
        detail: String,
    },
}

impl From<CollaboratorError> for WorkflowError {
    fn from(err: CollaboratorError) -> Self {
        Self::Collaborator(err.to_string())
    }
}
