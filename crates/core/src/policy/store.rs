//! Versioned, in-process policy store.

use std::sync::Arc;

use chrono::NaiveDate;
use dashmap::DashMap;

use furlough_shared::types::{Days, LeaveTypeId};

use super::calendar::{DayPeriod, HolidayCalendar};
use super::eligibility::{self, EligibilityOutcome};
use super::error::PolicyError;
use super::types::{DateRange, LeaveType};
use crate::employee::EmployeeProfile;

/// Published leave type versions keyed by leave type ID.
///
/// Versions are immutable once published; readers receive shared handles.
#[derive(Debug, Default)]
pub struct PolicyStore {
    versions: DashMap<LeaveTypeId, Vec<Arc<LeaveType>>>,
    calendar: HolidayCalendar,
}

impl PolicyStore {
    /// Creates an empty store counting days against `calendar`.
    #[must_use]
    pub fn new(calendar: HolidayCalendar) -> Self {
        Self {
            versions: DashMap::new(),
            calendar,
        }
    }

    /// The holiday calendar used for day counting.
    #[must_use]
    pub fn calendar(&self) -> &HolidayCalendar {
        &self.calendar
    }

    /// Validates and stores a new version of `leave_type`.
    ///
    /// The version number is assigned by the store; the value on the input is ignored.
    pub fn publish(&self, mut leave_type: LeaveType) -> Result<u32, PolicyError> {
        leave_type.validate()?;
        let mut versions = self.versions.entry(leave_type.id).or_default();
        let version = u32::try_from(versions.len())
            .map_err(|_| PolicyError::InvalidPolicy("too many versions".to_string()))?
            + 1;
        leave_type.version = version;
        versions.push(Arc::new(leave_type));
        Ok(version)
    }

    /// Latest published version of a leave type.
    pub fn get_leave_type(&self, id: LeaveTypeId) -> Result<Arc<LeaveType>, PolicyError> {
        self.versions
            .get(&id)
            .and_then(|versions| versions.last().cloned())
            .ok_or(PolicyError::LeaveTypeNotFound(id))
    }

    /// A specific published version of a leave type.
    pub fn get_leave_type_version(
        &self,
        id: LeaveTypeId,
        version: u32,
    ) -> Result<Arc<LeaveType>, PolicyError> {
        let versions = self
            .versions
            .get(&id)
            .ok_or(PolicyError::LeaveTypeNotFound(id))?;
        version
            .checked_sub(1)
            .and_then(|index| versions.get(usize::try_from(index).ok()?).cloned())
            .ok_or(PolicyError::LeaveTypeVersionNotFound { id, version })
    }

    /// Latest version of every published leave type.
    #[must_use]
    pub fn leave_types(&self) -> Vec<Arc<LeaveType>> {
        self.versions
            .iter()
            .filter_map(|entry| entry.value().last().cloned())
            .collect()
    }

    /// Evaluates the leave type's eligibility rules for `employee`.
    #[must_use]
    pub fn evaluate_eligibility(
        &self,
        employee: &EmployeeProfile,
        leave_type: &LeaveType,
        as_of: NaiveDate,
    ) -> EligibilityOutcome {
        eligibility::evaluate(&leave_type.eligibility, employee, as_of)
    }

    /// Returns true if `employee` may take `leave_type` on `as_of`.
    #[must_use]
    pub fn is_eligible(
        &self,
        employee: &EmployeeProfile,
        leave_type: &LeaveType,
        as_of: NaiveDate,
    ) -> bool {
        self.evaluate_eligibility(employee, leave_type, as_of)
            .is_eligible()
    }

    /// Chargeable days for a request under the leave type's counting rule.
    #[must_use]
    pub fn count_chargeable_days(
        &self,
        range: &DateRange,
        start_period: DayPeriod,
        end_period: DayPeriod,
        leave_type: &LeaveType,
    ) -> Days {
        self.calendar
            .count_chargeable_days(range, start_period, end_period, leave_type.day_counting)
    }
}
