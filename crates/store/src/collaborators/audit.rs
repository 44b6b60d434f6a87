//! Append-only audit trail of transitions and ledger postings.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use furlough_core::ledger::LedgerEntry;
use furlough_core::workflow::{ApproverRole, LeaveStatus};
use furlough_shared::types::{AccrualRunId, AuditRecordId, EmployeeId, LeaveRequestId};

use super::CollaboratorError;

/// What happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// A request changed status.
    Transition {
        /// The request.
        request_id: LeaveRequestId,
        /// Status before, `None` on creation.
        from: Option<LeaveStatus>,
        /// Status after.
        to: LeaveStatus,
        /// Action name.
        action: String,
    },
    /// An intermediate approval step was approved.
    StepApproved {
        /// The request.
        request_id: LeaveRequestId,
        /// The step's role.
        role: ApproverRole,
    },
    /// Critical conflicts were overridden.
    ConflictOverridden {
        /// The request.
        request_id: LeaveRequestId,
        /// The overriding role.
        role: ApproverRole,
    },
    /// A medical certificate was attached.
    CertificateAttached {
        /// The request.
        request_id: LeaveRequestId,
    },
    /// A pending request was escalated.
    Escalated {
        /// The request.
        request_id: LeaveRequestId,
        /// New escalation level.
        level: u32,
        /// New approver, if reassigned.
        reassigned_to: Option<EmployeeId>,
    },
    /// A ledger entry was appended.
    LedgerEntry {
        /// The entry.
        entry: Box<LedgerEntry>,
    },
    /// An accrual cycle finished.
    AccrualRun {
        /// Run identifier.
        run_id: AccrualRunId,
        /// Periods posted.
        posted: usize,
        /// Periods already posted.
        skipped: usize,
        /// Pairs that failed.
        failed: usize,
    },
}

/// One immutable audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditRecord {
    /// Record ID.
    pub id: AuditRecordId,
    /// When.
    pub at: DateTime<Utc>,
    /// Who, if a person acted.
    pub actor: Option<EmployeeId>,
    /// What.
    pub event: AuditEvent,
}

impl AuditRecord {
    /// Creates a record with a fresh ID.
    #[must_use]
    pub fn new(at: DateTime<Utc>, actor: Option<EmployeeId>, event: AuditEvent) -> Self {
        Self {
            id: AuditRecordId::new(),
            at,
            actor,
            event,
        }
    }
}

/// Append-only audit sink.
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Appends a record.
    async fn append(&self, record: AuditRecord) -> Result<(), CollaboratorError>;
}

/// Audit log held in memory.
#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    records: RwLock<Vec<AuditRecord>>,
}

impl InMemoryAuditLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record in append order.
    pub async fn records(&self) -> Vec<AuditRecord> {
        self.records.read().await.clone()
    }
}

#[async_trait]
impl AuditLog for InMemoryAuditLog {
    async fn append(&self, record: AuditRecord) -> Result<(), CollaboratorError> {
        self.records.write().await.push(record);
        Ok(())
    }
}
