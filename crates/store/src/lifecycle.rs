//! Leave request lifecycle service.
//!
//! Drives a request through `draft → pending → approved | rejected | cancelled`.
//! Every transition runs under the request's lock; ledger effects run under
//! the balance key's lock, always taken after the request lock. Submissions
//! also hold the employee's submission lock, between the two, until the
//! submitted request is published.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use furlough_core::conflict::{ConflictDetector, ConflictQuery, ConflictReport};
use furlough_core::employee::EmployeeProfile;
use furlough_core::ledger::LedgerError;
use furlough_core::policy::{DateRange, LeaveType, PolicyStore};
use furlough_core::workflow::{
    guards, ApprovalChain, ApproverAssignment, ApproverRole, ConflictOverride, LeaveRequest,
    LeaveRequestInput, LeaveStatus, OverrideInput, WorkflowAction, WorkflowError, WorkflowService,
};
use furlough_shared::types::{EmployeeId, LeaveRequestId};

use crate::clock::Clock;
use crate::collaborators::{
    AuditEvent, AuditLog, AuditRecord, EmployeeDirectory, NotificationDispatcher, NotificationEvent,
};
use crate::ledger::{observe, BalanceLedger};
use crate::requests::RequestRepository;

/// External collaborators of the lifecycle service.
#[derive(Clone)]
pub struct Collaborators {
    /// Employee directory.
    pub directory: Arc<dyn EmployeeDirectory>,
    /// Notification sink.
    pub notifier: Arc<dyn NotificationDispatcher>,
    /// Audit trail.
    pub audit: Arc<dyn AuditLog>,
    /// Time source.
    pub clock: Arc<dyn Clock>,
}

/// Leave request lifecycle service.
pub struct LeaveService {
    policies: Arc<PolicyStore>,
    ledger: Arc<BalanceLedger>,
    requests: Arc<RequestRepository>,
    collaborators: Collaborators,
    detector: ConflictDetector,
    escalation_sla: Duration,
}

impl LeaveService {
    /// Creates the service.
    pub fn new(
        policies: Arc<PolicyStore>,
        ledger: Arc<BalanceLedger>,
        requests: Arc<RequestRepository>,
        collaborators: Collaborators,
        detector: ConflictDetector,
        escalation_sla: Duration,
    ) -> Self {
        Self {
            policies,
            ledger,
            requests,
            collaborators,
            detector,
            escalation_sla,
        }
    }

    /// The policy store.
    #[must_use]
    pub fn policies(&self) -> &Arc<PolicyStore> {
        &self.policies
    }

    /// The balance ledger.
    #[must_use]
    pub fn ledger(&self) -> &Arc<BalanceLedger> {
        &self.ledger
    }

    // =========================================================================
    // Submission
    // =========================================================================

    /// Saves a draft. Drafts hold no balance and run no guards.
    pub async fn save_draft(&self, input: &LeaveRequestInput) -> Result<LeaveRequest, WorkflowError> {
        let request = self.build_draft(input).await?;
        self.requests.insert(request.clone());
        self.audit(
            Some(request.employee_id),
            AuditEvent::Transition {
                request_id: request.id,
                from: None,
                to: LeaveStatus::Draft,
                action: "create".to_string(),
            },
        )
        .await;
        tracing::info!(request_id = %request.id, employee_id = %request.employee_id, "leave request drafted");
        Ok(request)
    }

    /// Submits a saved draft on behalf of its employee.
    pub async fn submit_draft(
        &self,
        request_id: LeaveRequestId,
        actor: EmployeeId,
        conflict_override: Option<&OverrideInput>,
    ) -> Result<LeaveRequest, WorkflowError> {
        let mut guard = self.requests.lock(request_id).await?;
        let submission = self.requests.lock_submissions(guard.employee_id).await?;
        let submitted = self.submit(guard.clone(), actor, conflict_override).await?;
        *guard = submitted.clone();
        drop(guard);
        drop(submission);
        self.after_submit(&submitted).await;
        Ok(submitted)
    }

    /// Creates and submits a request in one step.
    ///
    /// A refused submission stores nothing and posts nothing.
    pub async fn submit_request(&self, input: &LeaveRequestInput) -> Result<LeaveRequest, WorkflowError> {
        let draft = self.build_draft(input).await?;
        let submission = self.requests.lock_submissions(input.employee_id).await?;
        let submitted = self
            .submit(draft, input.employee_id, input.conflict_override.as_ref())
            .await?;
        self.requests.insert(submitted.clone());
        drop(submission);
        self.audit(
            Some(submitted.employee_id),
            AuditEvent::Transition {
                request_id: submitted.id,
                from: None,
                to: LeaveStatus::Draft,
                action: "create".to_string(),
            },
        )
        .await;
        self.after_submit(&submitted).await;
        Ok(submitted)
    }

    async fn build_draft(&self, input: &LeaveRequestInput) -> Result<LeaveRequest, WorkflowError> {
        let employee = self.employee(input.employee_id).await?;
        let leave_type = self.policies.get_leave_type(input.leave_type_id)?;
        let range = DateRange::new(input.start_date, input.end_date)?;
        let days = self
            .policies
            .count_chargeable_days(&range, input.start_period, input.end_period, &leave_type);
        let approval = self.approval_chain(&employee, &leave_type).await?;
        let mut request = LeaveRequest::draft(
            input,
            employee.department_id,
            &leave_type,
            days,
            approval,
            self.collaborators.clock.now(),
        )?;
        request.medical_certificate_required = guards::requires_medical_certificate(&leave_type, days);
        Ok(request)
    }

    /// Runs the guards and the reservation on a draft.
    ///
    /// Guards run in order and stop at the first refusal. The balance check,
    /// the conflict check and the reservation run under the balance key lock.
    /// Callers hold the employee's submission lock and publish the result
    /// before releasing it.
    async fn submit(
        &self,
        mut request: LeaveRequest,
        actor: EmployeeId,
        override_input: Option<&OverrideInput>,
    ) -> Result<LeaveRequest, WorkflowError> {
        if actor != request.employee_id {
            return Err(WorkflowError::NotAuthorized(
                "only the requesting employee may submit".to_string(),
            ));
        }
        let now = self.collaborators.clock.now();
        let today = self.collaborators.clock.today();
        let submit = WorkflowService::submit(request.status, actor, now)?;

        // Evaluate against the latest published policy.
        let employee = self.employee(request.employee_id).await?;
        let leave_type = self.policies.get_leave_type(request.leave_type_id)?;
        request.department_id = employee.department_id;
        request.leave_type_version = leave_type.version;
        request.chargeable_days = self.policies.count_chargeable_days(
            &request.range,
            request.start_period,
            request.end_period,
            &leave_type,
        );
        request.medical_certificate_required =
            guards::requires_medical_certificate(&leave_type, request.chargeable_days);
        request.approval = self.approval_chain(&employee, &leave_type).await?;

        if let Err(e) = self.check_guards(&request, &employee, &leave_type, today) {
            tracing::warn!(
                request_id = %request.id,
                employee_id = %request.employee_id,
                code = e.error_code(),
                "leave request refused"
            );
            return Err(e);
        }

        let conflict_override = self
            .resolve_override(override_input, request.employee_id, now)
            .await?;
        let manager_delegated = self.manager_delegated(&employee).await?;
        let headcount = self
            .collaborators
            .directory
            .department_headcount(request.department_id)
            .await?;
        let query = conflict_query(&request);

        let (report, entries, auto_approved) = {
            let mut account = self.ledger.lock_account(request.employee_id, &leave_type).await?;
            let key = account.key();

            let available = account.balance().available();
            if available < request.chargeable_days {
                tracing::warn!(%key, %available, requested = %request.chargeable_days, "insufficient balance");
                return Err(LedgerError::InsufficientBalance {
                    available,
                    requested: request.chargeable_days,
                }
                .into());
            }

            let absences = self.requests.approved_absences(
                request.department_id,
                &request.range,
                leave_type.min_gap_days.unwrap_or(0),
            );
            let report = self
                .detector
                .analyze(&query, headcount, &absences, Some(&leave_type));
            if let Err(e) =
                guards::check_conflicts(&report, conflict_override.as_ref().map(|o| o.role))
            {
                tracing::warn!(request_id = %request.id, code = e.error_code(), "leave request blocked by conflict");
                return Err(e);
            }

            let ctx = self.ledger.context(&leave_type)?;
            let mut entries = observe(key, account.reserve(request.id, request.chargeable_days, ctx))?;
            let auto_approved = guards::qualifies_for_auto_approval(
                &leave_type,
                request.chargeable_days,
                &report,
                manager_delegated,
            );
            if auto_approved {
                entries.extend(observe(key, account.commit_usage(request.id, ctx))?);
            }
            (report, entries, auto_approved)
        };

        request.apply(&submit);
        if report.has_critical() {
            request.conflict_override = conflict_override;
        }
        request.conflict_report = Some(report);
        if auto_approved {
            request.approval.auto_approve(now);
            request.apply(&WorkflowService::approve(request.status, None, now)?);
        }

        self.ledger.record(&entries, Some(actor)).await;
        Ok(request)
    }

    fn check_guards(
        &self,
        request: &LeaveRequest,
        employee: &EmployeeProfile,
        leave_type: &LeaveType,
        today: chrono::NaiveDate,
    ) -> Result<(), WorkflowError> {
        let eligibility = self.policies.evaluate_eligibility(employee, leave_type, today);
        if !eligibility.is_eligible() {
            return Err(WorkflowError::Ineligible {
                reasons: eligibility.failures,
            });
        }
        guards::check_notice(
            leave_type,
            request.range.start,
            today,
            request.emergency,
            request.emergency_justification.as_deref(),
        )?;
        guards::check_duration(leave_type, request.chargeable_days)?;
        let open = self.requests.open_requests(request.employee_id, request.id);
        let booked: Vec<_> = open.iter().map(|other| (other.id, other.range)).collect();
        guards::check_overlap(&request.range, &booked)?;
        let same_type: Vec<_> = open
            .iter()
            .filter(|other| other.leave_type_id == request.leave_type_id)
            .map(|other| other.range)
            .collect();
        guards::check_minimum_gap(leave_type, &request.range, &same_type)
    }

    async fn after_submit(&self, request: &LeaveRequest) {
        let actor = Some(request.employee_id);
        self.audit(
            actor,
            AuditEvent::Transition {
                request_id: request.id,
                from: Some(LeaveStatus::Draft),
                to: LeaveStatus::Pending,
                action: "submit".to_string(),
            },
        )
        .await;
        if let Some(conflict_override) = &request.conflict_override {
            self.audit(
                Some(conflict_override.approver_id),
                AuditEvent::ConflictOverridden {
                    request_id: request.id,
                    role: conflict_override.role,
                },
            )
            .await;
        }

        if request.auto_approved {
            self.audit(
                None,
                AuditEvent::Transition {
                    request_id: request.id,
                    from: Some(LeaveStatus::Pending),
                    to: LeaveStatus::Approved,
                    action: "auto_approve".to_string(),
                },
            )
            .await;
            self.notify_status(request);
            self.check_low_balance(request);
        } else {
            self.notify_status(request);
            self.notify_current_approver(request);
        }
        tracing::info!(
            request_id = %request.id,
            employee_id = %request.employee_id,
            days = %request.chargeable_days,
            status = %request.status,
            "leave request submitted"
        );
    }

    // =========================================================================
    // Decisions
    // =========================================================================

    /// Records `approver_id`'s approval of the current step.
    ///
    /// The final step re-checks conflicts (an HR or director approver may set
    /// `override_conflict`), requires any medical certificate, and commits the
    /// reserved days.
    pub async fn approve(
        &self,
        request_id: LeaveRequestId,
        approver_id: EmployeeId,
        override_conflict: bool,
    ) -> Result<LeaveRequest, WorkflowError> {
        let mut guard = self.requests.lock(request_id).await?;
        let mut request = guard.clone();
        let now = self.collaborators.clock.now();
        let approve = WorkflowService::approve(request.status, Some(approver_id), now)?;
        guards::check_not_requester(request.employee_id, approver_id, "approve")?;

        let approver = self.employee(approver_id).await?;
        let role = request.approval.authorize(&approver)?.role;
        let leave_type = self
            .policies
            .get_leave_type_version(request.leave_type_id, request.leave_type_version)?;

        let mut overridden = None;
        if request.approval.is_final_step() {
            if request.medical_certificate_required && !request.medical_certificate_attached {
                return Err(WorkflowError::MedicalCertificateRequired);
            }
            let report = self.analyze_for(&request, &leave_type).await?;
            if request.conflict_override.is_none() {
                let override_role = if override_conflict {
                    strongest_override_role(&approver)
                } else {
                    None
                };
                guards::check_conflicts(&report, override_role)?;
                if let Some(role) = override_role.filter(|_| report.has_critical()) {
                    request.conflict_override = Some(ConflictOverride {
                        approver_id,
                        role,
                        reason: None,
                        at: now,
                    });
                    overridden = Some(role);
                }
            }
            request.conflict_report = Some(report);
        }

        let complete = request.approval.approve(&approver, now)?;
        if complete {
            self.ledger
                .commit_usage(&leave_type, request.employee_id, request.id)
                .await?;
            request.apply(&approve);
        } else {
            request.updated_at = now;
        }
        *guard = request.clone();
        drop(guard);

        if let Some(role) = overridden {
            self.audit(
                Some(approver_id),
                AuditEvent::ConflictOverridden { request_id, role },
            )
            .await;
        }
        if complete {
            self.audit(
                Some(approver_id),
                AuditEvent::Transition {
                    request_id,
                    from: Some(LeaveStatus::Pending),
                    to: LeaveStatus::Approved,
                    action: approve.action_name().to_string(),
                },
            )
            .await;
            self.notify_status(&request);
            self.check_low_balance(&request);
            tracing::info!(%request_id, %approver_id, "leave request approved");
        } else {
            self.audit(Some(approver_id), AuditEvent::StepApproved { request_id, role })
                .await;
            self.notify_current_approver(&request);
            tracing::info!(%request_id, %approver_id, %role, "approval step recorded");
        }
        Ok(request)
    }

    /// Rejects a pending request and releases its reservation.
    pub async fn reject(
        &self,
        request_id: LeaveRequestId,
        approver_id: EmployeeId,
        reason: String,
    ) -> Result<LeaveRequest, WorkflowError> {
        let mut guard = self.requests.lock(request_id).await?;
        let mut request = guard.clone();
        let now = self.collaborators.clock.now();
        let reject = WorkflowService::reject(request.status, approver_id, now, reason)?;
        guards::check_not_requester(request.employee_id, approver_id, "reject")?;

        let approver = self.employee(approver_id).await?;
        request.approval.reject(&approver, now)?;
        let leave_type = self
            .policies
            .get_leave_type_version(request.leave_type_id, request.leave_type_version)?;
        self.ledger
            .release(&leave_type, request.employee_id, request.id)
            .await?;
        request.apply(&reject);
        *guard = request.clone();
        drop(guard);

        self.record_transition(&request, LeaveStatus::Pending, &reject, Some(approver_id))
            .await;
        tracing::info!(%request_id, %approver_id, "leave request rejected");
        Ok(request)
    }

    /// Cancels a draft, pending or approved request.
    ///
    /// Only the requesting employee or an HR role holder may cancel. Pending
    /// requests release their reservation; approved ones reverse their usage.
    pub async fn cancel(
        &self,
        request_id: LeaveRequestId,
        actor_id: EmployeeId,
    ) -> Result<LeaveRequest, WorkflowError> {
        let mut guard = self.requests.lock(request_id).await?;
        let mut request = guard.clone();
        let now = self.collaborators.clock.now();
        let previous = request.status;
        let cancel = WorkflowService::cancel(previous, actor_id, now)?;
        self.ensure_owner_or_hr(&request, actor_id, "cancel").await?;

        let leave_type = self
            .policies
            .get_leave_type_version(request.leave_type_id, request.leave_type_version)?;
        match previous {
            LeaveStatus::Pending => {
                self.ledger
                    .release(&leave_type, request.employee_id, request.id)
                    .await?;
            }
            LeaveStatus::Approved => {
                self.ledger
                    .reverse_usage(&leave_type, request.employee_id, request.id)
                    .await?;
            }
            LeaveStatus::Draft | LeaveStatus::Rejected | LeaveStatus::Cancelled => {}
        }
        request.apply(&cancel);
        *guard = request.clone();
        drop(guard);

        self.record_transition(&request, previous, &cancel, Some(actor_id))
            .await;
        tracing::info!(%request_id, %actor_id, from = %previous, "leave request cancelled");
        Ok(request)
    }

    /// Marks a request's medical certificate as attached.
    pub async fn attach_medical_certificate(
        &self,
        request_id: LeaveRequestId,
        actor_id: EmployeeId,
    ) -> Result<LeaveRequest, WorkflowError> {
        let mut guard = self.requests.lock(request_id).await?;
        let mut request = guard.clone();
        if request.status.is_terminal() {
            return Err(WorkflowError::InvalidTransition {
                from: request.status,
                to: request.status,
            });
        }
        self.ensure_owner_or_hr(&request, actor_id, "attach a certificate to")
            .await?;
        request.medical_certificate_attached = true;
        request.updated_at = self.collaborators.clock.now();
        *guard = request.clone();
        drop(guard);

        self.audit(Some(actor_id), AuditEvent::CertificateAttached { request_id })
            .await;
        Ok(request)
    }

    // =========================================================================
    // Reads and maintenance
    // =========================================================================

    /// Latest committed state of a request.
    pub fn get_request(&self, request_id: LeaveRequestId) -> Result<LeaveRequest, WorkflowError> {
        self.requests.get(request_id)
    }

    /// Conflict analysis for an arbitrary query.
    pub async fn analyze_conflicts(&self, query: &ConflictQuery) -> Result<ConflictReport, WorkflowError> {
        let leave_type = query
            .leave_type_id
            .map(|id| self.policies.get_leave_type(id))
            .transpose()?;
        let headcount = self
            .collaborators
            .directory
            .department_headcount(query.department_id)
            .await?;
        let margin = leave_type
            .as_ref()
            .and_then(|leave_type| leave_type.min_gap_days)
            .unwrap_or(0);
        let absences = self
            .requests
            .approved_absences(query.department_id, &query.range, margin);
        Ok(self
            .detector
            .analyze(query, headcount, &absences, leave_type.as_deref()))
    }

    /// Escalates pending requests past the SLA at `now`.
    ///
    /// Each request is escalated at most once per SLA window. Returns the
    /// escalated request IDs; failures are logged and skipped.
    pub async fn escalate_overdue(&self, now: DateTime<Utc>) -> Vec<LeaveRequestId> {
        let mut escalated = Vec::new();
        for request_id in self.requests.overdue(now, self.escalation_sla) {
            match self.escalate(request_id, now).await {
                Ok(Some(request)) => {
                    escalated.push(request_id);
                    tracing::info!(
                        %request_id,
                        level = request.escalation_level(),
                        "leave request escalated"
                    );
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(%request_id, error = %e, "escalation failed"),
            }
        }
        escalated
    }

    async fn escalate(
        &self,
        request_id: LeaveRequestId,
        now: DateTime<Utc>,
    ) -> Result<Option<LeaveRequest>, WorkflowError> {
        let mut guard = self.requests.lock(request_id).await?;
        if !guard.is_overdue(now, self.escalation_sla) {
            return Ok(None);
        }
        let mut request = guard.clone();
        let reassign_to = self.escalation_target(&request).await?;
        request.mark_escalated(reassign_to, now);
        *guard = request.clone();
        drop(guard);

        let level = request.escalation_level();
        self.audit(
            None,
            AuditEvent::Escalated {
                request_id,
                level,
                reassigned_to: reassign_to,
            },
        )
        .await;
        self.collaborators.notifier.dispatch(NotificationEvent::Escalated {
            request_id,
            level,
            approver_id: reassign_to,
        });
        Ok(Some(request))
    }

    /// Next step's approver, otherwise the current approver's manager,
    /// otherwise a director or HR role holder.
    async fn escalation_target(&self, request: &LeaveRequest) -> Result<Option<EmployeeId>, WorkflowError> {
        if let Some(next) = request.approval.next_step().and_then(|step| step.approver_id) {
            return Ok(Some(next));
        }
        let current = request.approval.current_step().and_then(|step| step.approver_id);
        if let Some(current) = current {
            let chain = self.collaborators.directory.manager_chain(current).await?;
            if let Some(manager) = chain.into_iter().find(|id| *id != request.employee_id) {
                return Ok(Some(manager));
            }
        }
        for role in [ApproverRole::Director, ApproverRole::Hr] {
            let holders = self.collaborators.directory.approvers_with_role(role).await?;
            if let Some(holder) = holders
                .into_iter()
                .find(|id| *id != request.employee_id && Some(*id) != current)
            {
                return Ok(Some(holder));
            }
        }
        Ok(None)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn employee(&self, id: EmployeeId) -> Result<EmployeeProfile, WorkflowError> {
        self.collaborators
            .directory
            .employee(id)
            .await?
            .ok_or(WorkflowError::EmployeeNotFound(id))
    }

    async fn approval_chain(
        &self,
        employee: &EmployeeProfile,
        leave_type: &LeaveType,
    ) -> Result<ApprovalChain, WorkflowError> {
        let directory = &self.collaborators.directory;
        let first_other = |holders: Vec<EmployeeId>| holders.into_iter().find(|id| *id != employee.id);
        let hr = first_other(directory.approvers_with_role(ApproverRole::Hr).await?);
        let director = first_other(directory.approvers_with_role(ApproverRole::Director).await?);
        // Without a manager the manager step goes to a role holder, preferring
        // one whose own step the leave type does not already require.
        let stand_in = if leave_type.approval.director {
            hr.or(director)
        } else {
            director.or(hr)
        };
        let approvers = ApproverAssignment {
            manager: employee.manager_id.filter(|id| *id != employee.id).or(stand_in),
            hr,
            director,
        };
        Ok(ApprovalChain::build(&leave_type.approval, &approvers))
    }

    async fn manager_delegated(&self, employee: &EmployeeProfile) -> Result<bool, WorkflowError> {
        let Some(manager_id) = employee.manager_id else {
            return Ok(false);
        };
        Ok(self
            .collaborators
            .directory
            .employee(manager_id)
            .await?
            .is_some_and(|manager| manager.auto_approval_delegated))
    }

    /// An override counts only when supplied by an HR or director role holder
    /// other than the requester.
    async fn resolve_override(
        &self,
        input: Option<&OverrideInput>,
        requester: EmployeeId,
        at: DateTime<Utc>,
    ) -> Result<Option<ConflictOverride>, WorkflowError> {
        let Some(input) = input else {
            return Ok(None);
        };
        guards::check_not_requester(requester, input.approver_id, "override conflicts on")?;
        let approver = self.employee(input.approver_id).await?;
        Ok(strongest_override_role(&approver).map(|role| ConflictOverride {
            approver_id: approver.id,
            role,
            reason: input.reason.clone(),
            at,
        }))
    }

    async fn ensure_owner_or_hr(
        &self,
        request: &LeaveRequest,
        actor_id: EmployeeId,
        operation: &str,
    ) -> Result<(), WorkflowError> {
        if actor_id == request.employee_id {
            return Ok(());
        }
        let actor = self.employee(actor_id).await?;
        if actor.holds_role(ApproverRole::Hr) {
            Ok(())
        } else {
            Err(WorkflowError::NotAuthorized(format!(
                "only the requester or HR may {operation} this request"
            )))
        }
    }

    async fn analyze_for(
        &self,
        request: &LeaveRequest,
        leave_type: &LeaveType,
    ) -> Result<ConflictReport, WorkflowError> {
        let headcount = self
            .collaborators
            .directory
            .department_headcount(request.department_id)
            .await?;
        let absences = self.requests.approved_absences(
            request.department_id,
            &request.range,
            leave_type.min_gap_days.unwrap_or(0),
        );
        Ok(self
            .detector
            .analyze(&conflict_query(request), headcount, &absences, Some(leave_type)))
    }

    async fn record_transition(
        &self,
        request: &LeaveRequest,
        from: LeaveStatus,
        action: &WorkflowAction,
        actor: Option<EmployeeId>,
    ) {
        self.audit(
            actor,
            AuditEvent::Transition {
                request_id: request.id,
                from: Some(from),
                to: action.new_status(),
                action: action.action_name().to_string(),
            },
        )
        .await;
        self.notify_status(request);
    }

    async fn audit(&self, actor: Option<EmployeeId>, event: AuditEvent) {
        let record = AuditRecord::new(self.collaborators.clock.now(), actor, event);
        if let Err(e) = self.collaborators.audit.append(record).await {
            tracing::warn!(error = %e, "failed to write audit record");
        }
    }

    fn notify_status(&self, request: &LeaveRequest) {
        self.collaborators.notifier.dispatch(NotificationEvent::StatusChanged {
            request_id: request.id,
            employee_id: request.employee_id,
            status: request.status,
        });
    }

    fn notify_current_approver(&self, request: &LeaveRequest) {
        if let Some(step) = request.approval.current_step() {
            self.collaborators.notifier.dispatch(NotificationEvent::ApprovalRequested {
                request_id: request.id,
                role: step.role,
                approver_id: step.approver_id,
            });
        }
    }

    fn check_low_balance(&self, request: &LeaveRequest) {
        let Ok(balance) = self
            .ledger
            .get_balance(request.employee_id, request.leave_type_id)
        else {
            return;
        };
        if balance.is_low() {
            self.collaborators.notifier.dispatch(NotificationEvent::LowBalance {
                employee_id: request.employee_id,
                leave_type_id: request.leave_type_id,
                available: balance.available(),
                threshold: balance.low_balance_threshold,
            });
        }
    }
}

fn conflict_query(request: &LeaveRequest) -> ConflictQuery {
    ConflictQuery {
        department_id: request.department_id,
        range: request.range,
        employee_id: Some(request.employee_id),
        leave_type_id: Some(request.leave_type_id),
        exclude_request: Some(request.id),
    }
}

fn strongest_override_role(approver: &EmployeeProfile) -> Option<ApproverRole> {
    approver
        .approver_roles
        .iter()
        .copied()
        .filter(ApproverRole::can_override_conflicts)
        .max()
}
