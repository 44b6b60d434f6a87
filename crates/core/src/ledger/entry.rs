//! Immutable ledger entries.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use furlough_shared::types::{AccrualRunId, Days, EmployeeId, LeaveRequestId, LedgerEntryId};

use super::balance::{BalanceComponents, BalanceKey, YearToDate};

/// What a ledger entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Periodic earning.
    Accrual,
    /// Approved leave taken (negative when reversed).
    Usage,
    /// Days held for a pending request.
    Reservation,
    /// A reservation given back.
    Release,
    /// Manual correction.
    Adjustment,
    /// Opening of a new policy year.
    CarryOver,
    /// Days lost at year end or on carry-forward expiry.
    Forfeiture,
    /// Days converted to pay.
    CashOut,
}

impl EntryKind {
    /// Returns the string representation of the entry kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accrual => "accrual",
            Self::Usage => "usage",
            Self::Reservation => "reservation",
            Self::Release => "release",
            Self::Adjustment => "adjustment",
            Self::CarryOver => "carry_over",
            Self::Forfeiture => "forfeiture",
            Self::CashOut => "cash_out",
        }
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What caused an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntrySource {
    /// A leave request's reservation, usage or release.
    Request {
        /// The request.
        request_id: LeaveRequestId,
    },
    /// A scheduled or manual accrual posting for one period.
    Accrual {
        /// The run that posted it, if any.
        run_id: Option<AccrualRunId>,
        /// First day of the period.
        period_start: NaiveDate,
        /// Last day of the period.
        period_end: NaiveDate,
    },
    /// Year-end carry-forward into the policy year starting on `year_start`.
    CarryForward {
        /// First day of the new policy year.
        year_start: NaiveDate,
    },
    /// Expiry of carried days in the policy year starting on `year_start`.
    CarryForwardExpiry {
        /// First day of the policy year.
        year_start: NaiveDate,
    },
    /// A manual posting by an administrator.
    Manual {
        /// Who posted it.
        actor: EmployeeId,
    },
}

/// Identifies a posting that may happen at most once per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostingKey {
    /// Accrual for the period ending on this date.
    Accrual(NaiveDate),
    /// Carry-forward into the year starting on this date.
    CarryForward(NaiveDate),
    /// Carry-forward expiry in the year starting on this date.
    Expiry(NaiveDate),
}

impl EntrySource {
    /// The at-most-once posting this source represents, if any.
    #[must_use]
    pub fn posting_key(&self) -> Option<PostingKey> {
        match self {
            Self::Accrual { period_end, .. } => Some(PostingKey::Accrual(*period_end)),
            Self::CarryForward { year_start } => Some(PostingKey::CarryForward(*year_start)),
            Self::CarryForwardExpiry { year_start } => Some(PostingKey::Expiry(*year_start)),
            Self::Request { .. } | Self::Manual { .. } => None,
        }
    }
}

impl std::fmt::Display for PostingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Accrual(period_end) => write!(f, "accrual period ending {period_end}"),
            Self::CarryForward(year_start) => write!(f, "carry-forward into {year_start}"),
            Self::Expiry(year_start) => write!(f, "carry-forward expiry for {year_start}"),
        }
    }
}

/// An immutable ledger entry.
///
/// `amount` is the signed headline quantity of the entry: positive for
/// accruals, reservations and usage; negative for releases, reversals,
/// forfeitures and cash-outs; either sign for adjustments. For a carry-over
/// it is the number of days carried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique identifier.
    pub id: LedgerEntryId,
    /// Position in the key's ledger, starting at 1.
    pub sequence: u64,
    /// Balance key.
    pub key: BalanceKey,
    /// Policy version the entry was computed with.
    pub policy_version: u32,
    /// Policy year the entry is booked against.
    pub policy_year_start: NaiveDate,
    /// When the entry was recorded.
    pub recorded_at: DateTime<Utc>,
    /// Entry kind.
    pub kind: EntryKind,
    /// Signed headline amount.
    pub amount: Days,
    /// Component delta applied.
    pub delta: BalanceComponents,
    /// Components after this entry.
    pub balance_after: BalanceComponents,
    /// Year-to-date counters after this entry.
    pub ytd_after: YearToDate,
    /// What caused the entry.
    pub source: EntrySource,
    /// Optional note.
    pub memo: Option<String>,
}
