//! Balance components and the per-key running balance.

use std::ops::{Add, Neg};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use furlough_shared::types::{Days, EmployeeId, LeaveTypeId};

use super::entry::EntryKind;

/// Identifies one balance: an employee's entitlement to one leave type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BalanceKey {
    /// The employee.
    pub employee_id: EmployeeId,
    /// The leave type.
    pub leave_type_id: LeaveTypeId,
}

impl BalanceKey {
    /// Creates a key.
    #[must_use]
    pub const fn new(employee_id: EmployeeId, leave_type_id: LeaveTypeId) -> Self {
        Self {
            employee_id,
            leave_type_id,
        }
    }
}

impl std::fmt::Display for BalanceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.employee_id, self.leave_type_id)
    }
}

/// The four stored balance components.
///
/// Used both for the balance itself and for the signed delta a ledger entry applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceComponents {
    /// Days earned in the current policy year.
    pub accrued: Days,
    /// Days carried in from the previous policy year.
    pub carry_forward: Days,
    /// Days consumed by approved leave.
    pub used: Days,
    /// Days held by pending requests.
    pub pending: Days,
}

impl BalanceComponents {
    /// A delta touching only `accrued`.
    #[must_use]
    pub fn accrued(days: Days) -> Self {
        Self {
            accrued: days,
            ..Self::default()
        }
    }

    /// A delta touching only `carry_forward`.
    #[must_use]
    pub fn carry_forward(days: Days) -> Self {
        Self {
            carry_forward: days,
            ..Self::default()
        }
    }

    /// A delta touching only `pending`.
    #[must_use]
    pub fn pending(days: Days) -> Self {
        Self {
            pending: days,
            ..Self::default()
        }
    }

    /// Moves `days` from pending into used (negative moves them back).
    #[must_use]
    pub fn usage(days: Days) -> Self {
        Self {
            used: days,
            pending: -days,
            ..Self::default()
        }
    }

    /// `accrued + carry_forward - used - pending`.
    #[must_use]
    pub fn available(&self) -> Days {
        self.accrued + self.carry_forward - self.used - self.pending
    }

    /// `accrued + carry_forward - used`: what is left ignoring reservations.
    #[must_use]
    pub fn settled(&self) -> Days {
        self.accrued + self.carry_forward - self.used
    }

    /// Carry-forward not yet consumed; usage draws from carry-forward first.
    #[must_use]
    pub fn unconsumed_carry_forward(&self) -> Days {
        (self.carry_forward - self.used.min(self.carry_forward)).non_negative()
    }

    /// Every component and the available balance are non-negative.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        !self.accrued.is_negative()
            && !self.carry_forward.is_negative()
            && !self.used.is_negative()
            && !self.pending.is_negative()
            && !self.available().is_negative()
    }
}

impl Add for BalanceComponents {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            accrued: self.accrued + rhs.accrued,
            carry_forward: self.carry_forward + rhs.carry_forward,
            used: self.used + rhs.used,
            pending: self.pending + rhs.pending,
        }
    }
}

impl Neg for BalanceComponents {
    type Output = Self;

    fn neg(self) -> Self {
        Self {
            accrued: -self.accrued,
            carry_forward: -self.carry_forward,
            used: -self.used,
            pending: -self.pending,
        }
    }
}

/// Year-to-date counters, reset when a new policy year opens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearToDate {
    /// Days accrued this year.
    pub accrued: Days,
    /// Days used this year.
    pub used: Days,
    /// Days forfeited this year.
    pub forfeited: Days,
    /// Days cashed out this year.
    pub cashed_out: Days,
}

/// Current balance for one key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveBalance {
    /// Balance key.
    pub key: BalanceKey,
    /// Stored components.
    pub components: BalanceComponents,
    /// Year-to-date counters.
    pub ytd: YearToDate,
    /// Start of the policy year the counters belong to.
    pub policy_year_start: Option<NaiveDate>,
    /// Available balance below this triggers a low-balance notification.
    pub low_balance_threshold: Days,
    /// Number of ledger entries applied.
    pub version: u64,
}

impl LeaveBalance {
    /// An empty balance.
    #[must_use]
    pub fn new(key: BalanceKey, low_balance_threshold: Days) -> Self {
        Self {
            key,
            components: BalanceComponents::default(),
            ytd: YearToDate::default(),
            policy_year_start: None,
            low_balance_threshold,
            version: 0,
        }
    }

    /// Derived available balance.
    #[must_use]
    pub fn available(&self) -> Days {
        self.components.available()
    }

    /// Returns true if available has fallen below the low-balance threshold.
    #[must_use]
    pub fn is_low(&self) -> bool {
        self.available() < self.low_balance_threshold
    }

    /// Applies one entry's delta and its kind-driven year-to-date effect.
    pub fn apply(&mut self, kind: EntryKind, delta: &BalanceComponents, policy_year_start: NaiveDate) {
        self.components = self.components + *delta;
        match kind {
            EntryKind::Accrual => self.ytd.accrued += delta.accrued,
            EntryKind::Usage => self.ytd.used += delta.used,
            EntryKind::Forfeiture => self.ytd.forfeited -= delta.accrued + delta.carry_forward,
            EntryKind::CashOut => self.ytd.cashed_out -= delta.accrued + delta.carry_forward,
            EntryKind::CarryOver => {
                self.ytd = YearToDate::default();
                self.policy_year_start = Some(policy_year_start);
            }
            EntryKind::Reservation | EntryKind::Release | EntryKind::Adjustment => {}
        }
        if self.policy_year_start.is_none() {
            self.policy_year_start = Some(policy_year_start);
        }
        self.version += 1;
    }
}
