//! Balance ledger repository.
//!
//! One [`LeaveAccount`] per balance key, each behind its own lock in a
//! [`LockArena`]. Mutations run on the locked account, which applies them
//! all-or-nothing; the account is republished when the guard drops so
//! `get_balance` and `entries` read without blocking writers.
//!
//! Entries are append-only, so every published view of a key shares one
//! entry log and a republish copies only the entries posted since the last.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::NaiveDate;

use furlough_core::employee::EmployeeProfile;
use furlough_core::ledger::{
    replay_entries, BalanceKey, CashOutOutcome, LeaveAccount, LeaveBalance, LedgerEntry, LedgerError, PostingContext,
};
use furlough_core::policy::{DateRange, LeaveType, PolicyStore};
use furlough_shared::types::{AccrualRunId, Days, EmployeeId, LeaveRequestId, LeaveTypeId};

use crate::arena::{ArenaGuard, LockArena, LockSettings, Publish};
use crate::clock::Clock;
use crate::collaborators::{AuditEvent, AuditLog, AuditRecord};

/// Exclusive access to one balance key.
pub type AccountGuard = ArenaGuard<BalanceKey, LeaveAccount>;

/// Published state of one account.
pub struct AccountView {
    balance: LeaveBalance,
    log: Arc<RwLock<Vec<LedgerEntry>>>,
    len: usize,
}

impl AccountView {
    /// Balance as of this view.
    #[must_use]
    pub fn balance(&self) -> &LeaveBalance {
        &self.balance
    }

    /// Entries as of this view, in sequence order.
    #[must_use]
    pub fn entries(&self) -> Vec<LedgerEntry> {
        let log = self.log.read().unwrap_or_else(PoisonError::into_inner);
        log[..self.len].to_vec()
    }

    /// Replays this view's entries against its balance.
    pub fn verify_replay(&self) -> Result<(), LedgerError> {
        let log = self.log.read().unwrap_or_else(PoisonError::into_inner);
        replay_entries(&self.balance, &log[..self.len])
    }
}

impl Publish for LeaveAccount {
    type Snapshot = AccountView;

    fn publish(&self, previous: Option<&AccountView>) -> AccountView {
        let log = previous.map_or_else(|| Arc::new(RwLock::new(Vec::new())), |view| Arc::clone(&view.log));
        let entries = self.entries();
        {
            let mut shared = log.write().unwrap_or_else(PoisonError::into_inner);
            let published = shared.len();
            if published < entries.len() {
                shared.extend_from_slice(&entries[published..]);
            }
        }
        AccountView {
            balance: self.balance().clone(),
            log,
            len: entries.len(),
        }
    }
}

/// Logs invariant violations before they surface.
pub(crate) fn observe<T>(key: BalanceKey, result: Result<T, LedgerError>) -> Result<T, LedgerError> {
    if let Err(LedgerError::InvariantViolation { detail, .. }) = &result {
        tracing::error!(%key, %detail, "ledger invariant violated, mutation discarded");
    }
    result
}

/// Per-key locked ledger of leave balances.
pub struct BalanceLedger {
    accounts: LockArena<BalanceKey, LeaveAccount>,
    policies: Arc<PolicyStore>,
    audit: Arc<dyn AuditLog>,
    clock: Arc<dyn Clock>,
}

impl BalanceLedger {
    /// Creates an empty ledger.
    pub fn new(
        policies: Arc<PolicyStore>,
        audit: Arc<dyn AuditLog>,
        clock: Arc<dyn Clock>,
        settings: LockSettings,
    ) -> Self {
        Self {
            accounts: LockArena::new(settings),
            policies,
            audit,
            clock,
        }
    }

    /// The policy store postings are computed against.
    #[must_use]
    pub fn policies(&self) -> &Arc<PolicyStore> {
        &self.policies
    }

    /// Locks the account for `employee_id` under `leave_type`, opening it if new.
    pub async fn lock_account(
        &self,
        employee_id: EmployeeId,
        leave_type: &LeaveType,
    ) -> Result<AccountGuard, LedgerError> {
        let key = BalanceKey::new(employee_id, leave_type.id);
        let threshold = leave_type.low_balance_threshold;
        let mut guard = self
            .accounts
            .lock_or_insert_with(key, || LeaveAccount::new(key, threshold))
            .await?;
        if guard.balance().low_balance_threshold != threshold {
            guard.set_low_balance_threshold(threshold);
        }
        Ok(guard)
    }

    /// Posting context for `leave_type` at the current time.
    pub fn context(&self, leave_type: &LeaveType) -> Result<PostingContext, LedgerError> {
        PostingContext::new(leave_type, self.clock.today(), self.clock.now())
    }

    /// Writes `entries` to the audit log.
    ///
    /// Called after the account lock is released. Audit failures are logged;
    /// the postings themselves are already committed.
    pub async fn record(&self, entries: &[LedgerEntry], actor: Option<EmployeeId>) {
        for entry in entries {
            let record = AuditRecord::new(
                entry.recorded_at,
                actor,
                AuditEvent::LedgerEntry {
                    entry: Box::new(entry.clone()),
                },
            );
            if let Err(e) = self.audit.append(record).await {
                tracing::warn!(key = %entry.key, sequence = entry.sequence, error = %e, "failed to audit ledger entry");
            }
        }
    }

    // ===== Request-linked postings =====

    /// Reserves `days` for a pending request.
    pub async fn reserve(
        &self,
        leave_type: &LeaveType,
        employee_id: EmployeeId,
        request_id: LeaveRequestId,
        days: Days,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        let ctx = self.context(leave_type)?;
        let entries = {
            let mut account = self.lock_account(employee_id, leave_type).await?;
            let key = account.key();
            observe(key, account.reserve(request_id, days, ctx))?
        };
        self.record(&entries, Some(employee_id)).await;
        Ok(entries)
    }

    /// Converts a request's reservation into usage. Idempotent.
    pub async fn commit_usage(
        &self,
        leave_type: &LeaveType,
        employee_id: EmployeeId,
        request_id: LeaveRequestId,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        let ctx = self.context(leave_type)?;
        let entries = {
            let mut account = self.lock_account(employee_id, leave_type).await?;
            let key = account.key();
            observe(key, account.commit_usage(request_id, ctx))?
        };
        self.record(&entries, None).await;
        Ok(entries)
    }

    /// Releases an uncommitted reservation. Idempotent.
    pub async fn release(
        &self,
        leave_type: &LeaveType,
        employee_id: EmployeeId,
        request_id: LeaveRequestId,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        let ctx = self.context(leave_type)?;
        let entries = {
            let mut account = self.lock_account(employee_id, leave_type).await?;
            let key = account.key();
            observe(key, account.release(request_id, ctx))?
        };
        self.record(&entries, None).await;
        Ok(entries)
    }

    /// Reverses committed usage after an approved request is cancelled.
    pub async fn reverse_usage(
        &self,
        leave_type: &LeaveType,
        employee_id: EmployeeId,
        request_id: LeaveRequestId,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        let ctx = self.context(leave_type)?;
        let entries = {
            let mut account = self.lock_account(employee_id, leave_type).await?;
            let key = account.key();
            observe(key, account.reverse_usage(request_id, ctx))?
        };
        self.record(&entries, None).await;
        Ok(entries)
    }

    // ===== Accrual and year end =====

    /// Posts the accrual for `period`; `AlreadyPosted` if it was posted before.
    pub async fn post_accrual(
        &self,
        employee: &EmployeeProfile,
        leave_type_id: LeaveTypeId,
        period: &DateRange,
        run_id: Option<AccrualRunId>,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        let leave_type = self.policies.get_leave_type(leave_type_id)?;
        let ctx = self.context(&leave_type)?;
        let entries = {
            let mut account = self.lock_account(employee.id, &leave_type).await?;
            let key = account.key();
            observe(
                key,
                account.post_accrual(&leave_type, employee, period, run_id, ctx),
            )?
        };
        self.record(&entries, None).await;
        Ok(entries)
    }

    /// Opens the policy year containing `as_of`, carrying unused days forward.
    pub async fn apply_carry_forward(
        &self,
        employee_id: EmployeeId,
        leave_type_id: LeaveTypeId,
        as_of: NaiveDate,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        let leave_type = self.policies.get_leave_type(leave_type_id)?;
        let ctx = self.context(&leave_type)?;
        let entries = {
            let mut account = self.lock_account(employee_id, &leave_type).await?;
            let key = account.key();
            observe(key, account.apply_carry_forward(&leave_type, as_of, ctx))?
        };
        self.record(&entries, None).await;
        Ok(entries)
    }

    /// Forfeits carry-forward left unconsumed after its expiry window.
    pub async fn expire_carry_forward(
        &self,
        employee_id: EmployeeId,
        leave_type_id: LeaveTypeId,
        as_of: NaiveDate,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        let leave_type = self.policies.get_leave_type(leave_type_id)?;
        let ctx = self.context(&leave_type)?;
        let entries = {
            let mut account = self.lock_account(employee_id, &leave_type).await?;
            let key = account.key();
            observe(key, account.expire_carry_forward(&leave_type, as_of, ctx))?
        };
        self.record(&entries, None).await;
        Ok(entries)
    }

    // ===== Manual postings =====

    /// Converts available days into a cash payout.
    pub async fn cash_out(
        &self,
        employee_id: EmployeeId,
        leave_type_id: LeaveTypeId,
        days: Days,
        actor: EmployeeId,
    ) -> Result<CashOutOutcome, LedgerError> {
        let leave_type = self.policies.get_leave_type(leave_type_id)?;
        let ctx = self.context(&leave_type)?;
        let outcome = {
            let mut account = self.lock_account(employee_id, &leave_type).await?;
            let key = account.key();
            observe(key, account.cash_out(&leave_type, days, actor, ctx))?
        };
        tracing::info!(%employee_id, %leave_type_id, %days, payable = %outcome.payable, "leave cashed out");
        self.record(&outcome.entries, Some(actor)).await;
        Ok(outcome)
    }

    /// Posts a manual adjustment against accrued.
    pub async fn adjust(
        &self,
        employee_id: EmployeeId,
        leave_type_id: LeaveTypeId,
        days: Days,
        reason: &str,
        actor: EmployeeId,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        let leave_type = self.policies.get_leave_type(leave_type_id)?;
        let ctx = self.context(&leave_type)?;
        let entries = {
            let mut account = self.lock_account(employee_id, &leave_type).await?;
            let key = account.key();
            observe(key, account.adjust(days, reason, actor, ctx))?
        };
        tracing::info!(%employee_id, %leave_type_id, %days, %actor, "balance adjusted");
        self.record(&entries, Some(actor)).await;
        Ok(entries)
    }

    // ===== Reads =====

    /// Latest committed balance.
    pub fn get_balance(
        &self,
        employee_id: EmployeeId,
        leave_type_id: LeaveTypeId,
    ) -> Result<LeaveBalance, LedgerError> {
        let key = BalanceKey::new(employee_id, leave_type_id);
        self.accounts
            .snapshot(&key)
            .map(|account| account.balance().clone())
            .ok_or_else(|| LedgerError::BalanceNotFound(key.to_string()))
    }

    /// Committed entries in sequence order.
    pub fn entries(
        &self,
        employee_id: EmployeeId,
        leave_type_id: LeaveTypeId,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        let key = BalanceKey::new(employee_id, leave_type_id);
        self.accounts
            .snapshot(&key)
            .map(|account| account.entries())
            .ok_or_else(|| LedgerError::BalanceNotFound(key.to_string()))
    }

    /// Replays the committed entries of a key and compares with its balance.
    pub fn verify_replay(
        &self,
        employee_id: EmployeeId,
        leave_type_id: LeaveTypeId,
    ) -> Result<(), LedgerError> {
        let key = BalanceKey::new(employee_id, leave_type_id);
        let account = self
            .accounts
            .snapshot(&key)
            .ok_or_else(|| LedgerError::BalanceNotFound(key.to_string()))?;
        observe(key, account.verify_replay())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::collaborators::InMemoryAuditLog;
    use chrono::{TimeZone, Utc};
    use furlough_core::employee::EmploymentType;
    use furlough_core::policy::{AccrualFrequency, AccrualMethod, DayCountingRule, HolidayCalendar};
    use rust_decimal_macros::dec;

    struct Fixture {
        ledger: BalanceLedger,
        audit: Arc<InMemoryAuditLog>,
        leave_type: Arc<LeaveType>,
        employee: EmployeeProfile,
    }

    fn fixture() -> Fixture {
        let policies = Arc::new(PolicyStore::new(HolidayCalendar::default()));
        let mut leave_type = LeaveType::new("ANNUAL", "Annual Leave", DayCountingRule::WORKING_DAYS);
        leave_type.accrual_method = AccrualMethod::Fixed;
        leave_type.accrual_rate = Days::new(dec!(1.5));
        leave_type.accrual_frequency = AccrualFrequency::Monthly;
        let id = leave_type.id;
        policies.publish(leave_type).unwrap();
        let audit = Arc::new(InMemoryAuditLog::new());
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2026, 2, 1, 9, 0, 0).unwrap()));
        let ledger = BalanceLedger::new(
            Arc::clone(&policies),
            audit.clone(),
            clock,
            LockSettings::default(),
        );
        let employee = EmployeeProfile {
            id: EmployeeId::new(),
            name: "Ada".to_string(),
            department_id: furlough_shared::types::DepartmentId::new(),
            hire_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            employment_type: EmploymentType::FullTime,
            jurisdiction: "AU-NSW".to_string(),
            manager_id: None,
            auto_approval_delegated: false,
            approver_roles: Vec::new(),
            active: true,
        };
        Fixture {
            ledger,
            audit,
            leave_type: policies.get_leave_type(id).unwrap(),
            employee,
        }
    }

    fn january() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_republish_appends_to_shared_log() {
        let f = fixture();
        let key = BalanceKey::new(f.employee.id, f.leave_type.id);
        let actor = EmployeeId::new();
        f.ledger
            .adjust(f.employee.id, f.leave_type.id, Days::whole(5), "opening balance", actor)
            .await
            .unwrap();
        let first = f.ledger.accounts.snapshot(&key).unwrap();
        f.ledger
            .adjust(f.employee.id, f.leave_type.id, Days::whole(1), "correction", actor)
            .await
            .unwrap();
        let second = f.ledger.accounts.snapshot(&key).unwrap();

        assert!(Arc::ptr_eq(&first.log, &second.log));
        assert_eq!(first.entries().len(), 1);
        assert_eq!(second.entries().len(), 2);
        assert_eq!(first.balance().available(), Days::whole(5));
        assert!(first.verify_replay().is_ok());
        assert!(second.verify_replay().is_ok());
    }

    #[tokio::test]
    async fn test_unknown_balance_is_not_found() {
        let f = fixture();
        let err = f.ledger.get_balance(f.employee.id, f.leave_type.id).unwrap_err();
        assert_eq!(err.error_code(), "BALANCE_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_accrual_is_published_and_audited() {
        let f = fixture();
        let entries = f
            .ledger
            .post_accrual(&f.employee, f.leave_type.id, &january(), None)
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);

        let balance = f.ledger.get_balance(f.employee.id, f.leave_type.id).unwrap();
        assert_eq!(balance.available(), Days::new(dec!(1.5)));
        assert_eq!(f.ledger.entries(f.employee.id, f.leave_type.id).unwrap().len(), 1);
        assert!(f.ledger.verify_replay(f.employee.id, f.leave_type.id).is_ok());
        assert_eq!(f.audit.records().await.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_accrual_is_already_posted() {
        let f = fixture();
        f.ledger
            .post_accrual(&f.employee, f.leave_type.id, &january(), None)
            .await
            .unwrap();
        let err = f
            .ledger
            .post_accrual(&f.employee, f.leave_type.id, &january(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyPosted(_)));
        assert_eq!(f.ledger.entries(f.employee.id, f.leave_type.id).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_refused_reservation_leaves_no_entry() {
        let f = fixture();
        f.ledger
            .post_accrual(&f.employee, f.leave_type.id, &january(), None)
            .await
            .unwrap();
        let err = f
            .ledger
            .reserve(&f.leave_type, f.employee.id, LeaveRequestId::new(), Days::whole(2))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientBalance { .. }));
        assert_eq!(f.ledger.entries(f.employee.id, f.leave_type.id).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reserve_commit_reverse() {
        let f = fixture();
        let request = LeaveRequestId::new();
        f.ledger
            .adjust(f.employee.id, f.leave_type.id, Days::whole(5), "opening balance", EmployeeId::new())
            .await
            .unwrap();
        f.ledger
            .reserve(&f.leave_type, f.employee.id, request, Days::whole(2))
            .await
            .unwrap();
        f.ledger
            .commit_usage(&f.leave_type, f.employee.id, request)
            .await
            .unwrap();
        assert_eq!(
            f.ledger.get_balance(f.employee.id, f.leave_type.id).unwrap().available(),
            Days::whole(3)
        );

        f.ledger
            .reverse_usage(&f.leave_type, f.employee.id, request)
            .await
            .unwrap();
        let balance = f.ledger.get_balance(f.employee.id, f.leave_type.id).unwrap();
        assert_eq!(balance.available(), Days::whole(5));
        assert!(f.ledger.verify_replay(f.employee.id, f.leave_type.id).is_ok());
    }
}
