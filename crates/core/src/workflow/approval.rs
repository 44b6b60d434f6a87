//! Per-request approval chain.
//!
//! The chain is a small state machine: an ordered list of steps, the index of
//! the step awaiting a decision, and the escalation level.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use furlough_shared::types::EmployeeId;

use crate::employee::EmployeeProfile;
use crate::policy::ApprovalRequirements;
use crate::workflow::error::WorkflowError;

/// Approver role, ordered from lowest to highest authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApproverRole {
    /// The employee's direct manager.
    Manager = 0,
    /// Human resources.
    Hr = 1,
    /// Director.
    Director = 2,
}

impl ApproverRole {
    /// Parse a role from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "manager" => Some(Self::Manager),
            "hr" => Some(Self::Hr),
            "director" => Some(Self::Director),
            _ => None,
        }
    }

    /// Returns the string representation of the role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manager => "manager",
            Self::Hr => "hr",
            Self::Director => "director",
        }
    }

    /// Returns true if the role may override critical conflicts.
    #[must_use]
    pub fn can_override_conflicts(&self) -> bool {
        matches!(self, Self::Hr | Self::Director)
    }
}

impl std::fmt::Display for ApproverRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ordered roles required by a leave type; an empty set means manager only.
#[must_use]
pub fn required_roles(requirements: &ApprovalRequirements) -> Vec<ApproverRole> {
    let roles: Vec<ApproverRole> = [
        (requirements.manager, ApproverRole::Manager),
        (requirements.hr, ApproverRole::Hr),
        (requirements.director, ApproverRole::Director),
    ]
    .into_iter()
    .filter_map(|(required, role)| required.then_some(role))
    .collect();

    if roles.is_empty() {
        vec![ApproverRole::Manager]
    } else {
        roles
    }
}

/// Decision recorded on a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepDecision {
    /// Not decided yet.
    Awaiting,
    /// Approved by an approver.
    Approved,
    /// Rejected by an approver.
    Rejected,
    /// Approved automatically under delegation.
    AutoApproved,
}

/// One approval step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalStep {
    /// Role the step requires.
    pub role: ApproverRole,
    /// Employee assigned to decide, if one is known.
    pub approver_id: Option<EmployeeId>,
    /// Decision so far.
    pub decision: StepDecision,
    /// Who decided.
    pub decided_by: Option<EmployeeId>,
    /// When.
    pub decided_at: Option<DateTime<Utc>>,
}

/// Approvers resolved from the employee directory for a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApproverAssignment {
    /// The employee's manager.
    pub manager: Option<EmployeeId>,
    /// An HR approver.
    pub hr: Option<EmployeeId>,
    /// A director.
    pub director: Option<EmployeeId>,
}

impl ApproverAssignment {
    fn for_role(&self, role: ApproverRole) -> Option<EmployeeId> {
        match role {
            ApproverRole::Manager => self.manager,
            ApproverRole::Hr => self.hr,
            ApproverRole::Director => self.director,
        }
    }
}

/// The approval state machine of one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalChain {
    /// Steps in order.
    pub steps: Vec<ApprovalStep>,
    /// Index of the step awaiting a decision (`steps.len()` once complete).
    pub current: usize,
    /// Times the request has been escalated.
    pub escalation_level: u32,
}

impl ApprovalChain {
    /// Builds the chain for a leave type's requirements.
    #[must_use]
    pub fn build(requirements: &ApprovalRequirements, approvers: &ApproverAssignment) -> Self {
        let steps = required_roles(requirements)
            .into_iter()
            .map(|role| ApprovalStep {
                role,
                approver_id: approvers.for_role(role),
                decision: StepDecision::Awaiting,
                decided_by: None,
                decided_at: None,
            })
            .collect();
        Self {
            steps,
            current: 0,
            escalation_level: 0,
        }
    }

    /// The step awaiting a decision.
    #[must_use]
    pub fn current_step(&self) -> Option<&ApprovalStep> {
        self.steps.get(self.current)
    }

    /// The step after the current one.
    #[must_use]
    pub fn next_step(&self) -> Option<&ApprovalStep> {
        self.steps.get(self.current + 1)
    }

    /// Returns true if every step has been approved.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.current >= self.steps.len()
            && self
                .steps
                .iter()
                .all(|step| matches!(step.decision, StepDecision::Approved | StepDecision::AutoApproved))
    }

    /// Returns true if the current step is the last one.
    #[must_use]
    pub fn is_final_step(&self) -> bool {
        self.current + 1 == self.steps.len()
    }

    /// Checks that `actor` may decide the current step.
    ///
    /// The assigned approver may always decide. HR and director steps may also
    /// be decided by any holder of that role.
    pub fn authorize(&self, actor: &EmployeeProfile) -> Result<&ApprovalStep, WorkflowError> {
        let step = self
            .current_step()
            .ok_or_else(|| WorkflowError::NotAuthorized("approval chain is complete".to_string()))?;
        let assigned = step.approver_id == Some(actor.id);
        let role_holder = step.role != ApproverRole::Manager && actor.holds_role(step.role);
        if assigned || role_holder {
            Ok(step)
        } else {
            Err(WorkflowError::NotAuthorized(format!(
                "{} is not the {} approver for this request",
                actor.id, step.role
            )))
        }
    }

    /// Records approval of the current step; returns true when the chain completes.
    pub fn approve(&mut self, actor: &EmployeeProfile, at: DateTime<Utc>) -> Result<bool, WorkflowError> {
        self.authorize(actor)?;
        self.decide(StepDecision::Approved, actor.id, at);
        self.current += 1;
        Ok(self.is_complete())
    }

    /// Records rejection at the current step.
    pub fn reject(&mut self, actor: &EmployeeProfile, at: DateTime<Utc>) -> Result<(), WorkflowError> {
        self.authorize(actor)?;
        self.decide(StepDecision::Rejected, actor.id, at);
        Ok(())
    }

    /// Marks every remaining step auto-approved.
    pub fn auto_approve(&mut self, at: DateTime<Utc>) {
        for step in self.steps.iter_mut().skip(self.current) {
            step.decision = StepDecision::AutoApproved;
            step.decided_at = Some(at);
        }
        self.current = self.steps.len();
    }

    /// Bumps the escalation level and reassigns the current step.
    pub fn escalate(&mut self, reassign_to: Option<EmployeeId>) {
        self.escalation_level += 1;
        if let (Some(step), Some(approver)) = (self.steps.get_mut(self.current), reassign_to) {
            step.approver_id = Some(approver);
        }
    }

    fn decide(&mut self, decision: StepDecision, actor: EmployeeId, at: DateTime<Utc>) {
        if let Some(step) = self.steps.get_mut(self.current) {
            step.decision = decision;
            step.decided_by = Some(actor);
            step.decided_at = Some(at);
        }
    }
}
