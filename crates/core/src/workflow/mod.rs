//! Leave request lifecycle.
//!
//! This module provides:
//! - Leave status state machine (Draft → Pending → Approved / Rejected / Cancelled)
//! - Per-request approval chain (manager → HR → director)
//! - Submission guards (notice, duration, gap, conflicts)
//! - The leave request aggregate

pub mod approval;
pub mod error;
pub mod guards;
pub mod request;
pub mod service;
pub mod types;

#[cfg(test)]
mod service_props;

pub use approval::{
    ApprovalChain, ApprovalStep, ApproverAssignment, ApproverRole, StepDecision, required_roles,
};
pub use error::WorkflowError;
pub use request::{LeaveRequest, LeaveRequestInput, OverrideInput};
pub use service::WorkflowService;
pub use types::{ConflictOverride, LeaveStatus, Priority, WorkflowAction};
