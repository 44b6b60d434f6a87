//! Property-based tests for LeaveAccount.
//!
//! - Property 1: Balance invariant holds after any operation sequence
//! - Property 2: Replaying the ledger reproduces the balance
//! - Property 3: Reserve then release restores available
//! - Property 4: Accrual posting is idempotent per period

use chrono::{NaiveDate, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;

use furlough_shared::types::{Days, EmployeeId, LeaveRequestId, LeaveTypeId};

use super::account::{LeaveAccount, PostingContext};
use super::balance::BalanceKey;
use super::error::LedgerError;
use crate::employee::{EmployeeProfile, EmploymentType};
use crate::policy::{DateRange, DayCountingRule, LeaveType};
use furlough_shared::types::DepartmentId;

/// Strategy to generate positive day quantities in half-day steps (0.5 to 10.0).
fn half_days() -> impl Strategy<Value = Days> {
    (1i64..=20i64).prop_map(|halves| Days::new(Decimal::new(halves * 5, 1)))
}

/// Operations applied to an account.
#[derive(Debug, Clone)]
enum Op {
    Adjust(Days),
    Reserve(Days),
    Commit(usize),
    Release(usize),
    Reverse(usize),
}

/// Strategy to generate a random operation.
fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        half_days().prop_map(Op::Adjust),
        half_days().prop_map(|d| Op::Adjust(-d)),
        half_days().prop_map(Op::Reserve),
        (0usize..8).prop_map(Op::Commit),
        (0usize..8).prop_map(Op::Release),
        (0usize..8).prop_map(Op::Reverse),
    ]
}

fn ctx() -> PostingContext {
    PostingContext {
        policy_version: 1,
        policy_year_start: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        recorded_at: Utc::now(),
    }
}

fn new_account() -> LeaveAccount {
    LeaveAccount::new(BalanceKey::new(EmployeeId::new(), LeaveTypeId::new()), Days::ZERO)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// **Property 1: Balance Invariant**
    ///
    /// *For any* sequence of operations, every component and the available
    /// balance stay non-negative, and refused operations leave no entry.
    #[test]
    fn prop_balance_invariant(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let mut account = new_account();
        let mut requests: Vec<LeaveRequestId> = Vec::new();

        for op in ops {
            let before = account.entries().len();
            let result = match op {
                Op::Adjust(days) => account.adjust(days, "prop", EmployeeId::new(), ctx()),
                Op::Reserve(days) => {
                    let request = LeaveRequestId::new();
                    let result = account.reserve(request, days, ctx());
                    if result.is_ok() {
                        requests.push(request);
                    }
                    result
                }
                Op::Commit(i) => match requests.get(i) {
                    Some(request) => account.commit_usage(*request, ctx()),
                    None => continue,
                },
                Op::Release(i) => match requests.get(i) {
                    Some(request) => account.release(*request, ctx()),
                    None => continue,
                },
                Op::Reverse(i) => match requests.get(i) {
                    Some(request) => account.reverse_usage(*request, ctx()),
                    None => continue,
                },
            };

            let violated = matches!(result, Err(LedgerError::InvariantViolation { .. }));
            prop_assert!(!violated);
            if result.is_err() {
                prop_assert_eq!(account.entries().len(), before);
            }
            prop_assert!(account.balance().components.is_consistent());
        }

        // Property 2 rides along: replay reproduces every snapshot.
        prop_assert!(account.verify_replay().is_ok());
    }

    /// **Property 3: Reserve/Release Round Trip**
    ///
    /// *For any* funded balance and reservation that fits, reserving then
    /// releasing restores the original available balance.
    #[test]
    fn prop_reserve_release_round_trip(funding in half_days(), requested in half_days()) {
        let mut account = new_account();
        account.adjust(funding, "opening", EmployeeId::new(), ctx()).unwrap();
        let before = account.balance().available();

        let request = LeaveRequestId::new();
        match account.reserve(request, requested, ctx()) {
            Ok(_) => {
                prop_assert_eq!(account.balance().available(), before - requested);
                account.release(request, ctx()).unwrap();
                prop_assert_eq!(account.balance().available(), before);
            }
            Err(LedgerError::InsufficientBalance { available, .. }) => {
                prop_assert!(requested > funding);
                prop_assert_eq!(available, before);
            }
            Err(other) => prop_assert!(false, "unexpected error: {other}"),
        }
    }

    /// **Property 4: Idempotent Accrual**
    ///
    /// *For any* rate and number of repeated postings for the same period,
    /// the period is credited exactly once.
    #[test]
    fn prop_accrual_idempotent(rate_hundredths in 1i64..500, repeats in 1usize..5) {
        let mut leave_type = LeaveType::new("ANNUAL", "Annual Leave", DayCountingRule::WORKING_DAYS);
        leave_type.accrual_rate = Days::new(Decimal::new(rate_hundredths, 2));
        let employee = EmployeeProfile {
            id: EmployeeId::new(),
            name: "Prop".to_string(),
            department_id: DepartmentId::new(),
            hire_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            employment_type: EmploymentType::FullTime,
            jurisdiction: "GB".to_string(),
            manager_id: None,
            auto_approval_delegated: false,
            approver_roles: Vec::new(),
            active: true,
        };
        let period = DateRange::new(
            NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
        ).unwrap();

        let mut account = new_account();
        let mut posted = 0;
        for _ in 0..repeats {
            match account.post_accrual(&leave_type, &employee, &period, None, ctx()) {
                Ok(_) => posted += 1,
                Err(LedgerError::AlreadyPosted(_)) => {}
                Err(other) => prop_assert!(false, "unexpected error: {other}"),
            }
        }
        prop_assert_eq!(posted, 1);
        prop_assert_eq!(account.balance().components.accrued, leave_type.accrual_rate);
        prop_assert_eq!(account.entries().len(), 1);
    }
}
