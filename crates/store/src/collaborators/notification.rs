//! Fire-and-forget notification dispatch.

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use furlough_core::workflow::{ApproverRole, LeaveStatus};
use furlough_shared::types::{Days, EmployeeId, LeaveRequestId, LeaveTypeId};

/// Events delivered to employees and approvers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum NotificationEvent {
    /// A request entered or moved through the workflow.
    StatusChanged {
        /// The request.
        request_id: LeaveRequestId,
        /// The requester.
        employee_id: EmployeeId,
        /// New status.
        status: LeaveStatus,
    },
    /// An approval step is waiting on someone.
    ApprovalRequested {
        /// The request.
        request_id: LeaveRequestId,
        /// The step's role.
        role: ApproverRole,
        /// The assigned approver, if resolved.
        approver_id: Option<EmployeeId>,
    },
    /// A pending request passed its SLA.
    Escalated {
        /// The request.
        request_id: LeaveRequestId,
        /// New escalation level.
        level: u32,
        /// The approver it was reassigned to.
        approver_id: Option<EmployeeId>,
    },
    /// Available balance fell below the leave type's threshold.
    LowBalance {
        /// The employee.
        employee_id: EmployeeId,
        /// The leave type.
        leave_type_id: LeaveTypeId,
        /// Days available.
        available: Days,
        /// The threshold.
        threshold: Days,
    },
}

/// Non-blocking event sink.
pub trait NotificationDispatcher: Send + Sync {
    /// Queues `event` for delivery. Never blocks and never fails the caller.
    fn dispatch(&self, event: NotificationEvent);
}

/// Dispatcher backed by a bounded channel; drops events when full.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: mpsc::Sender<NotificationEvent>,
}

impl ChannelNotifier {
    /// A dispatcher and the receiving end of its buffer.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<NotificationEvent>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }
}

impl NotificationDispatcher for ChannelNotifier {
    fn dispatch(&self, event: NotificationEvent) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                tracing::warn!(?event, "notification buffer full, dropping event");
            }
            Err(TrySendError::Closed(event)) => {
                tracing::warn!(?event, "notification receiver closed, dropping event");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> NotificationEvent {
        NotificationEvent::StatusChanged {
            request_id: LeaveRequestId::new(),
            employee_id: EmployeeId::new(),
            status: LeaveStatus::Pending,
        }
    }

    #[tokio::test]
    async fn test_dispatch_delivers() {
        let (notifier, mut rx) = ChannelNotifier::new(4);
        let sent = event();
        notifier.dispatch(sent.clone());
        assert_eq!(rx.recv().await, Some(sent));
    }

    #[tokio::test]
    async fn test_full_buffer_drops_without_blocking() {
        let (notifier, mut rx) = ChannelNotifier::new(1);
        let first = event();
        notifier.dispatch(first.clone());
        notifier.dispatch(event());
        assert_eq!(rx.recv().await, Some(first));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let json = serde_json::to_value(event()).unwrap();
        assert_eq!(json["event"], "status_changed");
    }
}
