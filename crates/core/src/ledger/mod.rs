//! Per-employee leave balance ledger.
//!
//! This module implements the balance accounting:
//! - Balance components and the derived available balance
//! - Immutable ledger entries with component deltas and snapshots
//! - The per-key `LeaveAccount` aggregate (reservations, usage, accruals,
//!   carry-forward, expiry, cash-out, adjustments)
//! - Accrual amount computation
//! - Error types for ledger operations

pub mod account;
pub mod accrual;
pub mod balance;
pub mod entry;
pub mod error;

#[cfg(test)]
mod account_props;

pub use account::{replay_entries, CashOutOutcome, LeaveAccount, PostingContext, Reservation, ReservationState};
pub use accrual::{accrual_amount, cap_amount, tenure_rate};
pub use balance::{BalanceComponents, BalanceKey, LeaveBalance, YearToDate};
pub use entry::{EntryKind, EntrySource, LedgerEntry, PostingKey};
pub use error::LedgerError;
