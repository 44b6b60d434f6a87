//! Property-based tests for WorkflowService.
//!
//! - Property 1: Every successful transition is an enumerated edge
//! - Property 2: Terminal states are absorbing
//! - Property 3: Approved is unreachable from Rejected

use chrono::Utc;
use proptest::prelude::*;

use furlough_shared::types::EmployeeId;
use uuid::Uuid;

use crate::workflow::service::WorkflowService;
use crate::workflow::types::LeaveStatus;

/// Strategy for generating random LeaveStatus values.
fn arb_status() -> impl Strategy<Value = LeaveStatus> {
    prop_oneof![
        Just(LeaveStatus::Draft),
        Just(LeaveStatus::Pending),
        Just(LeaveStatus::Approved),
        Just(LeaveStatus::Rejected),
        Just(LeaveStatus::Cancelled),
    ]
}

/// Strategy for generating employee IDs.
fn arb_employee() -> impl Strategy<Value = EmployeeId> {
    any::<u128>().prop_map(|n| EmployeeId::from_uuid(Uuid::from_u128(n)))
}

/// Operations a caller may attempt.
#[derive(Debug, Clone, Copy)]
enum Op {
    Submit,
    Approve,
    Reject,
    Cancel,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![Just(Op::Submit), Just(Op::Approve), Just(Op::Reject), Just(Op::Cancel)]
}

fn attempt(status: LeaveStatus, op: Op, actor: EmployeeId) -> Option<LeaveStatus> {
    let now = Utc::now();
    let result = match op {
        Op::Submit => WorkflowService::submit(status, actor, now),
        Op::Approve => WorkflowService::approve(status, Some(actor), now),
        Op::Reject => WorkflowService::reject(status, actor, now, "not this week".to_string()),
        Op::Cancel => WorkflowService::cancel(status, actor, now),
    };
    result.ok().map(|action| action.new_status())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// **Property 1: Valid State Transitions**
    ///
    /// *For any* status and operation, a successful operation moves along an
    /// enumerated edge.
    #[test]
    fn prop_success_is_enumerated_edge(status in arb_status(), op in arb_op(), actor in arb_employee()) {
        if let Some(next) = attempt(status, op, actor) {
            prop_assert!(WorkflowService::is_valid_transition(status, next));
        }
    }

    /// **Property 2: Terminal States Are Absorbing**
    ///
    /// *For any* operation sequence, once a request is rejected or cancelled
    /// no operation changes its status.
    #[test]
    fn prop_terminal_states_absorb(ops in prop::collection::vec(arb_op(), 1..20), actor in arb_employee()) {
        let mut status = LeaveStatus::Draft;
        let mut reached_terminal: Option<LeaveStatus> = None;
        for op in ops {
            if let Some(next) = attempt(status, op, actor) {
                prop_assert!(reached_terminal.is_none(), "left terminal state {status}");
                status = next;
                if status.is_terminal() {
                    reached_terminal = Some(status);
                }
            }
        }
    }

    /// **Property 3: Rejected Never Becomes Approved**
    #[test]
    fn prop_rejected_never_approved(actor in arb_employee()) {
        prop_assert!(attempt(LeaveStatus::Rejected, Op::Approve, actor).is_none());
        prop_assert!(attempt(LeaveStatus::Cancelled, Op::Cancel, actor).is_none());
    }
}
