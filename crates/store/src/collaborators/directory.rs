//! Employee directory: read-only profile and org-chart lookups.

use async_trait::async_trait;
use dashmap::DashMap;

use furlough_core::employee::EmployeeProfile;
use furlough_core::workflow::ApproverRole;
use furlough_shared::types::{DepartmentId, EmployeeId};

use super::CollaboratorError;

/// Read-only employee lookups.
#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    /// Profile of `id`, if known.
    async fn employee(&self, id: EmployeeId) -> Result<Option<EmployeeProfile>, CollaboratorError>;

    /// Active employees in `department`.
    async fn department_headcount(&self, department: DepartmentId) -> Result<u32, CollaboratorError>;

    /// Managers above `id`, nearest first.
    async fn manager_chain(&self, id: EmployeeId) -> Result<Vec<EmployeeId>, CollaboratorError>;

    /// Active holders of an organisation-wide approver role.
    async fn approvers_with_role(&self, role: ApproverRole) -> Result<Vec<EmployeeId>, CollaboratorError>;

    /// Every known profile.
    async fn employees(&self) -> Result<Vec<EmployeeProfile>, CollaboratorError>;
}

/// Directory backed by an in-process map, loaded from a JSON fixture.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    profiles: DashMap<EmployeeId, EmployeeProfile>,
}

impl InMemoryDirectory {
    /// Creates a directory holding `profiles`.
    #[must_use]
    pub fn new(profiles: impl IntoIterator<Item = EmployeeProfile>) -> Self {
        let directory = Self::default();
        for profile in profiles {
            directory.upsert(profile);
        }
        directory
    }

    /// Parses a JSON array of profiles.
    pub fn from_json(json: &str) -> Result<Self, CollaboratorError> {
        let profiles: Vec<EmployeeProfile> =
            serde_json::from_str(json).map_err(|e| CollaboratorError::InvalidData {
                service: "employee directory",
                detail: e.to_string(),
            })?;
        Ok(Self::new(profiles))
    }

    /// Inserts or replaces a profile.
    pub fn upsert(&self, profile: EmployeeProfile) {
        self.profiles.insert(profile.id, profile);
    }

    /// Removes a profile, returning it if present.
    pub fn remove(&self, id: EmployeeId) -> Option<EmployeeProfile> {
        self.profiles.remove(&id).map(|(_, profile)| profile)
    }
}

#[async_trait]
impl EmployeeDirectory for InMemoryDirectory {
    async fn employee(&self, id: EmployeeId) -> Result<Option<EmployeeProfile>, CollaboratorError> {
        Ok(self.profiles.get(&id).map(|entry| entry.value().clone()))
    }

    async fn department_headcount(&self, department: DepartmentId) -> Result<u32, CollaboratorError> {
        let count = self
            .profiles
            .iter()
            .filter(|entry| entry.active && entry.department_id == department)
            .count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn manager_chain(&self, id: EmployeeId) -> Result<Vec<EmployeeId>, CollaboratorError> {
        let mut chain = Vec::new();
        let mut current = self.profiles.get(&id).and_then(|entry| entry.manager_id);
        while let Some(manager) = current {
            // Cyclic fixtures stop at the first repeat.
            if manager == id || chain.contains(&manager) {
                break;
            }
            chain.push(manager);
            current = self.profiles.get(&manager).and_then(|entry| entry.manager_id);
        }
        Ok(chain)
    }

    async fn approvers_with_role(&self, role: ApproverRole) -> Result<Vec<EmployeeId>, CollaboratorError> {
        let mut holders: Vec<EmployeeId> = self
            .profiles
            .iter()
            .filter(|entry| entry.active && entry.holds_role(role))
            .map(|entry| entry.id)
            .collect();
        holders.sort_unstable();
        Ok(holders)
    }

    async fn employees(&self) -> Result<Vec<EmployeeProfile>, CollaboratorError> {
        Ok(self.profiles.iter().map(|entry| entry.value().clone()).collect())
    }
}
