//! Accrual scheduler.
//!
//! Posts periodic accruals for enrolled (employee, leave type) pairs and runs
//! year-end carry-forward and expiry. Every posting is keyed by its period, so
//! re-running a cycle over the same dates never double-credits.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use dashmap::DashMap;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use furlough_core::employee::EmployeeProfile;
use furlough_core::ledger::{BalanceKey, LedgerError};
use furlough_core::policy::{
    accrual_period_containing, next_accrual_period, policy_year_containing, DateRange, PolicyError,
};
use furlough_shared::types::{AccrualRunId, EmployeeId, LeaveTypeId};

use crate::clock::Clock;
use crate::collaborators::{AuditEvent, AuditLog, AuditRecord, CollaboratorError, EmployeeDirectory};
use crate::ledger::BalanceLedger;

/// Pairs processed concurrently within one cycle.
const CYCLE_CONCURRENCY: usize = 16;

/// Errors from enrollment and per-pair processing.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccrualError {
    /// Employee not in the directory.
    #[error("Employee not found: {0}")]
    EmployeeNotFound(EmployeeId),

    /// Ledger failure.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Policy failure.
    #[error(transparent)]
    Policy(#[from] PolicyError),

    /// Directory or audit failure.
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
}

impl AccrualError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::EmployeeNotFound(_) => "EMPLOYEE_NOT_FOUND",
            Self::Ledger(e) => e.error_code(),
            Self::Policy(e) => e.error_code(),
            Self::Collaborator(_) => "COLLABORATOR_UNAVAILABLE",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::EmployeeNotFound(_) => 404,
            Self::Ledger(e) => e.http_status_code(),
            Self::Policy(e) => e.http_status_code(),
            Self::Collaborator(_) => 503,
        }
    }
}

/// A pair that failed during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccrualFailure {
    /// The employee.
    pub employee_id: EmployeeId,
    /// The leave type.
    pub leave_type_id: LeaveTypeId,
    /// Error code.
    pub code: &'static str,
    /// Error message.
    pub message: String,
}

impl AccrualFailure {
    fn new(key: BalanceKey, error: &AccrualError) -> Self {
        Self {
            employee_id: key.employee_id,
            leave_type_id: key.leave_type_id,
            code: error.error_code(),
            message: error.to_string(),
        }
    }
}

/// Outcome of one accrual cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccrualRunSummary {
    /// Run identifier, recorded on every entry it posts.
    pub run_id: AccrualRunId,
    /// Cut-off date.
    pub as_of: NaiveDate,
    /// Periods posted.
    pub posted: usize,
    /// Periods already posted, and inactive employees.
    pub skipped: usize,
    /// Pairs that failed.
    pub failed: usize,
    /// Failure details.
    pub failures: Vec<AccrualFailure>,
}

/// Outcome of a year-end pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct YearEndSummary {
    /// Pairs whose new policy year was opened.
    pub carried: usize,
    /// Pairs whose carry-forward expired.
    pub expired: usize,
    /// Pairs with nothing to do.
    pub skipped: usize,
    /// Pairs that failed.
    pub failed: usize,
    /// Failure details.
    pub failures: Vec<AccrualFailure>,
}

#[derive(Debug, Default)]
struct PairTally {
    posted: usize,
    skipped: usize,
}

/// Periodic accrual and year-end job.
pub struct AccrualScheduler {
    ledger: Arc<BalanceLedger>,
    directory: Arc<dyn EmployeeDirectory>,
    audit: Arc<dyn AuditLog>,
    clock: Arc<dyn Clock>,
    /// Next accrual period per enrolled pair.
    enrollments: DashMap<BalanceKey, DateRange>,
    /// One cycle at a time.
    running: Mutex<()>,
}

impl AccrualScheduler {
    /// Creates a scheduler with no enrollments.
    pub fn new(
        ledger: Arc<BalanceLedger>,
        directory: Arc<dyn EmployeeDirectory>,
        audit: Arc<dyn AuditLog>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            ledger,
            directory,
            audit,
            clock,
            enrollments: DashMap::new(),
            running: Mutex::new(()),
        }
    }

    /// Enrolls a pair and returns its first accrual date.
    ///
    /// The first period is the one containing the later of `from` and the
    /// hire date. Enrolling an enrolled pair keeps its schedule.
    pub async fn enroll(
        &self,
        employee_id: EmployeeId,
        leave_type_id: LeaveTypeId,
        from: NaiveDate,
    ) -> Result<NaiveDate, AccrualError> {
        let employee = self
            .directory
            .employee(employee_id)
            .await?
            .ok_or(AccrualError::EmployeeNotFound(employee_id))?;
        let leave_type = self.ledger.policies().get_leave_type(leave_type_id)?;
        let period = accrual_period_containing(
            from.max(employee.hire_date),
            leave_type.accrual_frequency,
            leave_type.policy_year_start_month,
        )?;
        let key = BalanceKey::new(employee_id, leave_type_id);
        let next = *self.enrollments.entry(key).or_insert(period);
        tracing::debug!(%key, next_accrual = %next.end, "pair enrolled for accrual");
        Ok(next.end)
    }

    /// Next accrual date of a pair, if enrolled.
    #[must_use]
    pub fn next_accrual_date(&self, employee_id: EmployeeId, leave_type_id: LeaveTypeId) -> Option<NaiveDate> {
        self.enrollments
            .get(&BalanceKey::new(employee_id, leave_type_id))
            .map(|period| period.end)
    }

    /// Number of enrolled pairs.
    #[must_use]
    pub fn enrolled(&self) -> usize {
        self.enrollments.len()
    }

    /// Posts every period due on or before `as_of`.
    ///
    /// A pair that fails is recorded and keeps its schedule; other pairs are
    /// unaffected.
    pub async fn run_accrual_cycle(&self, as_of: NaiveDate) -> AccrualRunSummary {
        let _running = self.running.lock().await;
        let run_id = AccrualRunId::new();
        let due: Vec<(BalanceKey, DateRange)> = self
            .enrollments
            .iter()
            .filter(|entry| entry.value().end <= as_of)
            .map(|entry| (*entry.key(), *entry.value()))
            .collect();

        let outcomes: Vec<(BalanceKey, PairTally, Option<AccrualError>)> = stream::iter(due)
            .map(|(key, period)| async move {
                let mut tally = PairTally::default();
                let error = self
                    .catch_up(key, period, as_of, run_id, &mut tally)
                    .await
                    .err();
                (key, tally, error)
            })
            .buffer_unordered(CYCLE_CONCURRENCY)
            .collect()
            .await;

        let mut summary = AccrualRunSummary {
            run_id,
            as_of,
            posted: 0,
            skipped: 0,
            failed: 0,
            failures: Vec::new(),
        };
        for (key, tally, error) in outcomes {
            summary.posted += tally.posted;
            summary.skipped += tally.skipped;
            if let Some(error) = error {
                tracing::warn!(%key, %run_id, error = %error, "accrual failed for pair");
                summary.failed += 1;
                summary.failures.push(AccrualFailure::new(key, &error));
            }
        }

        let record = AuditRecord::new(
            self.clock.now(),
            None,
            AuditEvent::AccrualRun {
                run_id,
                posted: summary.posted,
                skipped: summary.skipped,
                failed: summary.failed,
            },
        );
        if let Err(e) = self.audit.append(record).await {
            tracing::warn!(%run_id, error = %e, "failed to audit accrual run");
        }
        tracing::info!(
            %run_id,
            %as_of,
            posted = summary.posted,
            skipped = summary.skipped,
            failed = summary.failed,
            "accrual cycle finished"
        );
        summary
    }

    async fn catch_up(
        &self,
        key: BalanceKey,
        mut period: DateRange,
        as_of: NaiveDate,
        run_id: AccrualRunId,
        tally: &mut PairTally,
    ) -> Result<(), AccrualError> {
        let employee = self
            .directory
            .employee(key.employee_id)
            .await?
            .ok_or(AccrualError::EmployeeNotFound(key.employee_id))?;
        if !employee.active {
            tally.skipped += 1;
            return Ok(());
        }

        while period.end <= as_of {
            let leave_type = self.ledger.policies().get_leave_type(key.leave_type_id)?;
            let year = policy_year_containing(period.start, leave_type.policy_year_start_month)?;
            if period.start == year.start {
                // Close the previous year before crediting the new one.
                self.open_year(&employee, key.leave_type_id, period.start).await?;
            }
            match self
                .ledger
                .post_accrual(&employee, key.leave_type_id, &period, Some(run_id))
                .await
            {
                Ok(_) => tally.posted += 1,
                Err(LedgerError::AlreadyPosted(_)) => tally.skipped += 1,
                Err(e) => return Err(e.into()),
            }
            period = next_accrual_period(
                &period,
                leave_type.accrual_frequency,
                leave_type.policy_year_start_month,
            )?;
            self.enrollments.insert(key, period);
        }
        Ok(())
    }

    /// Returns true if a carry-over was posted.
    async fn open_year(
        &self,
        employee: &EmployeeProfile,
        leave_type_id: LeaveTypeId,
        as_of: NaiveDate,
    ) -> Result<bool, AccrualError> {
        match self
            .ledger
            .apply_carry_forward(employee.id, leave_type_id, as_of)
            .await
        {
            Ok(entries) => Ok(!entries.is_empty()),
            Err(LedgerError::AlreadyPosted(_)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Opens the policy year containing `as_of` for every enrolled pair and
    /// expires carry-forward whose window has elapsed.
    pub async fn run_year_end(&self, as_of: NaiveDate) -> YearEndSummary {
        let _running = self.running.lock().await;
        let keys: Vec<BalanceKey> = self.enrollments.iter().map(|entry| *entry.key()).collect();
        let mut summary = YearEndSummary::default();

        for key in keys {
            match self.year_end_pair(key, as_of).await {
                Ok((carried, expired)) => {
                    summary.carried += usize::from(carried);
                    summary.expired += usize::from(expired);
                    summary.skipped += usize::from(!carried && !expired);
                }
                Err(error) => {
                    tracing::warn!(%key, error = %error, "year-end processing failed for pair");
                    summary.failed += 1;
                    summary.failures.push(AccrualFailure::new(key, &error));
                }
            }
        }

        if summary.carried + summary.expired + summary.failed > 0 {
            tracing::info!(
                %as_of,
                carried = summary.carried,
                expired = summary.expired,
                failed = summary.failed,
                "year-end pass finished"
            );
        }
        summary
    }

    async fn year_end_pair(&self, key: BalanceKey, as_of: NaiveDate) -> Result<(bool, bool), AccrualError> {
        let employee = self
            .directory
            .employee(key.employee_id)
            .await?
            .ok_or(AccrualError::EmployeeNotFound(key.employee_id))?;
        let carried = self.open_year(&employee, key.leave_type_id, as_of).await?;
        let expired = match self
            .ledger
            .expire_carry_forward(key.employee_id, key.leave_type_id, as_of)
            .await
        {
            Ok(entries) => !entries.is_empty(),
            Err(LedgerError::AlreadyPosted(_)) => false,
            Err(e) => return Err(e.into()),
        };
        Ok((carried, expired))
    }

    /// Runs the accrual cycle then the year-end pass every `interval`.
    pub fn spawn(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let today = self.clock.today();
                self.run_accrual_cycle(today).await;
                self.run_year_end(today).await;
            }
        })
    }
}
