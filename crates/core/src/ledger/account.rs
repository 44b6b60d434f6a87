//! The per-key ledger aggregate.
//!
//! A `LeaveAccount` owns one key's balance, its entries, and the bookkeeping
//! needed for idempotent postings. Every operation computes the new state on a
//! copy of the balance and appends entries only if every intermediate state
//! satisfies the balance invariants.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Months, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use furlough_shared::types::{AccrualRunId, Days, EmployeeId, LeaveRequestId, LedgerEntryId};

use super::accrual::{accrual_amount, cap_amount};
use super::balance::{BalanceComponents, BalanceKey, LeaveBalance};
use super::entry::{EntryKind, EntrySource, LedgerEntry, PostingKey};
use super::error::LedgerError;
use crate::employee::EmployeeProfile;
use crate::policy::{DateRange, LeaveType, policy_year_containing};

/// Where a request's days are in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationState {
    /// Held in pending.
    Reserved,
    /// Moved into used.
    Committed,
    /// Given back before use.
    Released,
    /// Usage reversed and given back.
    Reversed,
}

impl ReservationState {
    /// Returns the string representation of the state.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reserved => "reserved",
            Self::Committed => "committed",
            Self::Released => "released",
            Self::Reversed => "reversed",
        }
    }
}

/// A request's reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    /// Days held.
    pub days: Days,
    /// Current state.
    pub state: ReservationState,
}

/// Per-posting context supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostingContext {
    /// Policy version in force.
    pub policy_version: u32,
    /// Policy year the postings are booked against.
    pub policy_year_start: NaiveDate,
    /// Wall-clock time of the posting.
    pub recorded_at: DateTime<Utc>,
}

impl PostingContext {
    /// Context for `leave_type` on `today`.
    pub fn new(leave_type: &LeaveType, today: NaiveDate, recorded_at: DateTime<Utc>) -> Result<Self, LedgerError> {
        Ok(Self {
            policy_version: leave_type.version,
            policy_year_start: policy_year_containing(today, leave_type.policy_year_start_month)?.start,
            recorded_at,
        })
    }

    fn in_year(self, policy_year_start: NaiveDate) -> Self {
        Self {
            policy_year_start,
            ..self
        }
    }
}

/// An entry before it is sequenced and applied.
#[derive(Debug, Clone)]
struct Posting {
    kind: EntryKind,
    amount: Days,
    delta: BalanceComponents,
    source: EntrySource,
    memo: Option<String>,
}

/// Result of a cash-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CashOutOutcome {
    /// Entries appended.
    pub entries: Vec<LedgerEntry>,
    /// Payable day-equivalents (`days * cash-out rate`).
    pub payable: Decimal,
}

/// One key's ledger.
#[derive(Debug, Clone)]
pub struct LeaveAccount {
    balance: LeaveBalance,
    entries: Vec<LedgerEntry>,
    posted: HashSet<PostingKey>,
    reservations: HashMap<LeaveRequestId, Reservation>,
}

impl LeaveAccount {
    /// An empty account.
    #[must_use]
    pub fn new(key: BalanceKey, low_balance_threshold: Days) -> Self {
        Self {
            balance: LeaveBalance::new(key, low_balance_threshold),
            entries: Vec::new(),
            posted: HashSet::new(),
            reservations: HashMap::new(),
        }
    }

    /// Balance key.
    #[must_use]
    pub fn key(&self) -> BalanceKey {
        self.balance.key
    }

    /// Current balance.
    #[must_use]
    pub fn balance(&self) -> &LeaveBalance {
        &self.balance
    }

    /// All entries in sequence order.
    #[must_use]
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// A request's reservation, if any.
    #[must_use]
    pub fn reservation(&self, request_id: LeaveRequestId) -> Option<Reservation> {
        self.reservations.get(&request_id).copied()
    }

    /// Returns true if the at-most-once posting has been made.
    #[must_use]
    pub fn is_posted(&self, key: PostingKey) -> bool {
        self.posted.contains(&key)
    }

    /// Updates the low-balance threshold from the current policy.
    pub fn set_low_balance_threshold(&mut self, threshold: Days) {
        self.balance.low_balance_threshold = threshold;
    }

    /// Holds `days` of available balance for a pending request.
    ///
    /// Re-reserving the same request for the same days is a no-op.
    pub fn reserve(
        &mut self,
        request_id: LeaveRequestId,
        days: Days,
        ctx: PostingContext,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        if !days.is_positive() {
            return Err(LedgerError::InvalidAmount(format!(
                "reservation must be positive, got {days}"
            )));
        }
        if let Some(existing) = self.reservation(request_id) {
            if existing.state == ReservationState::Reserved && existing.days == days {
                return Ok(Vec::new());
            }
            return Err(LedgerError::InvalidReservationState {
                request_id,
                state: existing.state.as_str(),
                operation: "reserve",
            });
        }

        let available = self.balance.available();
        if available < days {
            return Err(LedgerError::InsufficientBalance {
                available,
                requested: days,
            });
        }

        let entries = self.commit(
            vec![Posting {
                kind: EntryKind::Reservation,
                amount: days,
                delta: BalanceComponents::pending(days),
                source: EntrySource::Request { request_id },
                memo: None,
            }],
            ctx,
        )?;
        self.reservations.insert(
            request_id,
            Reservation {
                days,
                state: ReservationState::Reserved,
            },
        );
        Ok(entries)
    }

    /// Converts a request's reservation into usage. Idempotent.
    pub fn commit_usage(
        &mut self,
        request_id: LeaveRequestId,
        ctx: PostingContext,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        let reservation = self
            .reservation(request_id)
            .ok_or(LedgerError::ReservationNotFound(request_id))?;
        match reservation.state {
            ReservationState::Committed => return Ok(Vec::new()),
            ReservationState::Reserved => {}
            state => {
                return Err(LedgerError::InvalidReservationState {
                    request_id,
                    state: state.as_str(),
                    operation: "commit usage",
                });
            }
        }

        let entries = self.commit(
            vec![Posting {
                kind: EntryKind::Usage,
                amount: reservation.days,
                delta: BalanceComponents::usage(reservation.days),
                source: EntrySource::Request { request_id },
                memo: None,
            }],
            ctx,
        )?;
        self.set_reservation_state(request_id, ReservationState::Committed);
        Ok(entries)
    }

    /// Gives back an uncommitted reservation. Idempotent.
    pub fn release(
        &mut self,
        request_id: LeaveRequestId,
        ctx: PostingContext,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        let reservation = self
            .reservation(request_id)
            .ok_or(LedgerError::ReservationNotFound(request_id))?;
        match reservation.state {
            ReservationState::Released => return Ok(Vec::new()),
            ReservationState::Reserved => {}
            state => {
                return Err(LedgerError::InvalidReservationState {
                    request_id,
                    state: state.as_str(),
                    operation: "release",
                });
            }
        }

        let entries = self.commit(vec![release_posting(request_id, reservation.days)], ctx)?;
        self.set_reservation_state(request_id, ReservationState::Released);
        Ok(entries)
    }

    /// Compensates committed usage: a negative usage entry followed by a release.
    ///
    /// Idempotent.
    pub fn reverse_usage(
        &mut self,
        request_id: LeaveRequestId,
        ctx: PostingContext,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        let reservation = self
            .reservation(request_id)
            .ok_or(LedgerError::ReservationNotFound(request_id))?;
        match reservation.state {
            ReservationState::Reversed => return Ok(Vec::new()),
            ReservationState::Committed => {}
            state => {
                return Err(LedgerError::InvalidReservationState {
                    request_id,
                    state: state.as_str(),
                    operation: "reverse usage",
                });
            }
        }

        let days = reservation.days;
        let entries = self.commit(
            vec![
                Posting {
                    kind: EntryKind::Usage,
                    amount: -days,
                    delta: BalanceComponents::usage(-days),
                    source: EntrySource::Request { request_id },
                    memo: Some("usage reversed on cancellation".to_string()),
                },
                release_posting(request_id, days),
            ],
            ctx,
        )?;
        self.set_reservation_state(request_id, ReservationState::Reversed);
        Ok(entries)
    }

    /// Posts the accrual for one period.
    ///
    /// The amount is computed from policy, capped at the accrual cap and
    /// posted even when it is zero so the period is marked as done.
    pub fn post_accrual(
        &mut self,
        leave_type: &LeaveType,
        employee: &EmployeeProfile,
        period: &DateRange,
        run_id: Option<AccrualRunId>,
        ctx: PostingContext,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        let posting_key = PostingKey::Accrual(period.end);
        if self.is_posted(posting_key) {
            return Err(LedgerError::AlreadyPosted(posting_key.to_string()));
        }

        let earned = accrual_amount(leave_type, employee, period);
        let amount = cap_amount(
            earned,
            leave_type.accrual_cap,
            self.balance.components.settled(),
        );
        let memo = (amount < earned).then(|| format!("capped from {earned}"));
        let year = policy_year_containing(period.end, leave_type.policy_year_start_month)?;

        self.commit(
            vec![Posting {
                kind: EntryKind::Accrual,
                amount,
                delta: BalanceComponents::accrued(amount),
                source: EntrySource::Accrual {
                    run_id,
                    period_start: period.start,
                    period_end: period.end,
                },
                memo,
            }],
            ctx.in_year(year.start),
        )
    }

    /// Opens the policy year containing `as_of`, carrying unused days forward.
    ///
    /// Returns no entries when the ledger has no earlier year to close.
    pub fn apply_carry_forward(
        &mut self,
        leave_type: &LeaveType,
        as_of: NaiveDate,
        ctx: PostingContext,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        let year_start = policy_year_containing(as_of, leave_type.policy_year_start_month)?.start;
        let posting_key = PostingKey::CarryForward(year_start);
        if self.is_posted(posting_key) {
            return Err(LedgerError::AlreadyPosted(posting_key.to_string()));
        }
        match self.balance.policy_year_start {
            Some(opened) if opened < year_start => {}
            _ => return Ok(Vec::new()),
        }

        let current = self.balance.components;
        let settled = current.settled();
        let unused = (settled - current.pending).non_negative();
        let carried = if leave_type.carry_forward.enabled {
            unused.min(leave_type.carry_forward.max_days)
        } else {
            Days::ZERO
        };
        let excess = unused - carried;
        let source = EntrySource::CarryForward { year_start };

        let mut postings = vec![Posting {
            kind: EntryKind::CarryOver,
            amount: carried,
            delta: BalanceComponents {
                accrued: settled - carried - current.accrued,
                carry_forward: carried - current.carry_forward,
                used: -current.used,
                pending: Days::ZERO,
            },
            source: source.clone(),
            memo: None,
        }];
        if leave_type.use_it_or_lose_it && excess.is_positive() {
            postings.push(Posting {
                kind: EntryKind::Forfeiture,
                amount: -excess,
                delta: BalanceComponents::accrued(-excess),
                source,
                memo: Some("unused days beyond carry-forward limit".to_string()),
            });
        }

        self.commit(postings, ctx.in_year(year_start))
    }

    /// Forfeits carried days not consumed once the expiry window has elapsed.
    ///
    /// Returns no entries before the expiry date, when the policy has no expiry
    /// window, or when the current year was not opened by a carry-forward.
    pub fn expire_carry_forward(
        &mut self,
        leave_type: &LeaveType,
        as_of: NaiveDate,
        ctx: PostingContext,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        let Some(expiry_months) = leave_type.carry_forward.expiry_months else {
            return Ok(Vec::new());
        };
        let year_start = policy_year_containing(as_of, leave_type.policy_year_start_month)?.start;
        let posting_key = PostingKey::Expiry(year_start);
        if self.is_posted(posting_key) {
            return Err(LedgerError::AlreadyPosted(posting_key.to_string()));
        }
        let expires_on = year_start
            .checked_add_months(Months::new(expiry_months))
            .ok_or_else(|| LedgerError::InvalidAmount("carry-forward expiry out of range".to_string()))?;
        if as_of < expires_on
            || !self.is_posted(PostingKey::CarryForward(year_start))
        {
            return Ok(Vec::new());
        }

        let current = self.balance.components;
        let forfeited = current
            .unconsumed_carry_forward()
            .min(current.available().non_negative());

        self.commit(
            vec![Posting {
                kind: EntryKind::Forfeiture,
                amount: -forfeited,
                delta: BalanceComponents::carry_forward(-forfeited),
                source: EntrySource::CarryForwardExpiry { year_start },
                memo: Some(format!("carry-forward expired on {expires_on}")),
            }],
            ctx.in_year(year_start),
        )
    }

    /// Converts available days into pay, drawing on carry-forward first.
    pub fn cash_out(
        &mut self,
        leave_type: &LeaveType,
        days: Days,
        actor: EmployeeId,
        ctx: PostingContext,
    ) -> Result<CashOutOutcome, LedgerError> {
        if !leave_type.cash_out.eligible {
            return Err(LedgerError::CashOutNotAllowed(leave_type.code.clone()));
        }
        if !days.is_positive() {
            return Err(LedgerError::InvalidAmount(format!(
                "cash-out must be positive, got {days}"
            )));
        }
        let current = self.balance.components;
        let available = current.available();
        if available < days {
            return Err(LedgerError::InsufficientBalance {
                available,
                requested: days,
            });
        }

        let from_carry_forward = days.min(current.unconsumed_carry_forward());
        let from_accrued = days - from_carry_forward;
        let entries = self.commit(
            vec![Posting {
                kind: EntryKind::CashOut,
                amount: -days,
                delta: BalanceComponents {
                    accrued: -from_accrued,
                    carry_forward: -from_carry_forward,
                    ..BalanceComponents::default()
                },
                source: EntrySource::Manual { actor },
                memo: None,
            }],
            ctx,
        )?;
        Ok(CashOutOutcome {
            entries,
            payable: days.value() * leave_type.cash_out.rate,
        })
    }

    /// Manual correction against accrued.
    pub fn adjust(
        &mut self,
        days: Days,
        reason: &str,
        actor: EmployeeId,
        ctx: PostingContext,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        if days.is_zero() {
            return Err(LedgerError::InvalidAmount("adjustment must not be zero".to_string()));
        }
        let available = self.balance.available();
        if days.is_negative() && available < days.abs() {
            return Err(LedgerError::InsufficientBalance {
                available,
                requested: days.abs(),
            });
        }
        if days.is_negative() && self.balance.components.accrued < days.abs() {
            return Err(LedgerError::InvalidAmount(format!(
                "adjustment {days} exceeds accrued {}",
                self.balance.components.accrued
            )));
        }

        self.commit(
            vec![Posting {
                kind: EntryKind::Adjustment,
                amount: days,
                delta: BalanceComponents::accrued(days),
                source: EntrySource::Manual { actor },
                memo: Some(reason.to_string()),
            }],
            ctx,
        )
    }

    /// Replays every entry from zero and compares against the stored snapshots.
    pub fn verify_replay(&self) -> Result<(), LedgerError> {
        replay_entries(&self.balance, &self.entries)
    }

    /// Applies `postings` to a copy of the balance; appends them only if every
    /// intermediate state is consistent.
    fn commit(&mut self, postings: Vec<Posting>, ctx: PostingContext) -> Result<Vec<LedgerEntry>, LedgerError> {
        let mut next = self.balance.clone();
        let mut entries = Vec::with_capacity(postings.len());

        for posting in postings {
            next.apply(posting.kind, &posting.delta, ctx.policy_year_start);
            if !next.components.is_consistent() {
                return Err(LedgerError::InvariantViolation {
                    key: self.balance.key.to_string(),
                    detail: format!(
                        "{} of {} leaves accrued={} carry_forward={} used={} pending={}",
                        posting.kind,
                        posting.amount,
                        next.components.accrued,
                        next.components.carry_forward,
                        next.components.used,
                        next.components.pending
                    ),
                });
            }
            entries.push(LedgerEntry {
                id: LedgerEntryId::new(),
                sequence: next.version,
                key: next.key,
                policy_version: ctx.policy_version,
                policy_year_start: ctx.policy_year_start,
                recorded_at: ctx.recorded_at,
                kind: posting.kind,
                amount: posting.amount,
                delta: posting.delta,
                balance_after: next.components,
                ytd_after: next.ytd,
                source: posting.source,
                memo: posting.memo,
            });
        }

        self.posted
            .extend(entries.iter().filter_map(|entry| entry.source.posting_key()));
        self.entries.extend(entries.iter().cloned());
        self.balance = next;
        Ok(entries)
    }

    fn set_reservation_state(&mut self, request_id: LeaveRequestId, state: ReservationState) {
        if let Some(reservation) = self.reservations.get_mut(&request_id) {
            reservation.state = state;
        }
    }
}

fn release_posting(request_id: LeaveRequestId, days: Days) -> Posting {
    Posting {
        kind: EntryKind::Release,
        amount: -days,
        delta: BalanceComponents::pending(-days),
        source: EntrySource::Request { request_id },
        memo: None,
    }
}

/// Replays `entries` from zero, checking each entry's sequence and
/// snapshots, then compares the result with `balance`.
pub fn replay_entries(balance: &LeaveBalance, entries: &[LedgerEntry]) -> Result<(), LedgerError> {
    let mut replayed = LeaveBalance::new(balance.key, balance.low_balance_threshold);
    for (expected_sequence, entry) in (1u64..).zip(entries) {
        replayed.apply(entry.kind, &entry.delta, entry.policy_year_start);
        if entry.sequence != expected_sequence
            || replayed.components != entry.balance_after
            || replayed.ytd != entry.ytd_after
        {
            return Err(LedgerError::ReplayMismatch {
                key: balance.key.to_string(),
                sequence: entry.sequence,
            });
        }
    }
    if replayed != *balance {
        return Err(LedgerError::ReplayMismatch {
            key: balance.key.to_string(),
            sequence: balance.version,
        });
    }
    Ok(())
}
