//! Leave request repository.

use std::sync::Arc;

use chrono::{DateTime, Days, Duration, Utc};

use furlough_core::conflict::Absence;
use furlough_core::policy::DateRange;
use furlough_core::workflow::{LeaveRequest, LeaveStatus, WorkflowError};
use furlough_shared::types::{DepartmentId, EmployeeId, LeaveRequestId};

use crate::arena::{ArenaGuard, LockArena, LockSettings, Publish};

/// Exclusive access to one request.
pub type RequestGuard = ArenaGuard<LeaveRequestId, LeaveRequest>;

/// Exclusive right to submit on behalf of one employee.
pub type SubmissionGuard = ArenaGuard<EmployeeId, ()>;

impl Publish for LeaveRequest {
    type Snapshot = Self;

    fn publish(&self, _previous: Option<&Self>) -> Self {
        self.clone()
    }
}

/// Requests behind per-request locks, with snapshot scans for reads.
///
/// Submissions for one employee also serialize on a per-employee lock, held
/// until the submitted request is published, so overlap and gap checks
/// always see the employee's earlier submissions.
pub struct RequestRepository {
    requests: LockArena<LeaveRequestId, LeaveRequest>,
    submissions: LockArena<EmployeeId, ()>,
}

impl RequestRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new(settings: LockSettings) -> Self {
        Self {
            requests: LockArena::new(settings),
            submissions: LockArena::new(settings),
        }
    }

    /// Stores a new request. Returns false if the ID is taken.
    pub fn insert(&self, request: LeaveRequest) -> bool {
        self.requests.insert(request.id, request)
    }

    /// Latest committed state of a request.
    pub fn get(&self, id: LeaveRequestId) -> Result<LeaveRequest, WorkflowError> {
        self.requests
            .snapshot(&id)
            .map(|request| (*request).clone())
            .ok_or(WorkflowError::RequestNotFound(id))
    }

    /// Locks a request for a transition.
    pub async fn lock(&self, id: LeaveRequestId) -> Result<RequestGuard, WorkflowError> {
        self.requests
            .lock(id)
            .await?
            .ok_or(WorkflowError::RequestNotFound(id))
    }

    /// Serializes submissions for `employee`.
    pub async fn lock_submissions(&self, employee: EmployeeId) -> Result<SubmissionGuard, WorkflowError> {
        Ok(self.submissions.lock_or_insert_with(employee, || ()).await?)
    }

    /// Approved absences in `department` overlapping `range` widened by
    /// `margin_days` on both sides.
    #[must_use]
    pub fn approved_absences(
        &self,
        department: DepartmentId,
        range: &DateRange,
        margin_days: u32,
    ) -> Vec<Absence> {
        let margin = Days::new(u64::from(margin_days));
        let range = DateRange {
            start: range.start.checked_sub_days(margin).unwrap_or(range.start),
            end: range.end.checked_add_days(margin).unwrap_or(range.end),
        };
        self.requests
            .snapshots()
            .into_iter()
            .filter(|request| {
                request.status == LeaveStatus::Approved
                    && request.department_id == department
                    && request.range.overlaps(&range)
            })
            .map(|request| Absence {
                request_id: request.id,
                employee_id: request.employee_id,
                leave_type_id: request.leave_type_id,
                range: request.range,
            })
            .collect()
    }

    /// The employee's pending and approved requests of every type.
    #[must_use]
    pub fn open_requests(&self, employee: EmployeeId, exclude: LeaveRequestId) -> Vec<Arc<LeaveRequest>> {
        self.requests
            .snapshots()
            .into_iter()
            .filter(|request| {
                request.id != exclude && request.employee_id == employee && request.status.holds_balance()
            })
            .collect()
    }

    /// Pending requests past `sla` at `now`, oldest first.
    #[must_use]
    pub fn overdue(&self, now: DateTime<Utc>, sla: Duration) -> Vec<LeaveRequestId> {
        let mut overdue: Vec<_> = self
            .requests
            .snapshots()
            .into_iter()
            .filter(|request| request.is_overdue(now, sla))
            .map(|request| (request.submitted_at, request.id))
            .collect();
        overdue.sort_unstable();
        overdue.into_iter().map(|(_, id)| id).collect()
    }
}
