//! # Furlough Store
//!
//! In-memory transactional store for the leave core.
//!
//! - [`arena`]: per-key locks with published snapshots
//! - [`ledger`]: the balance ledger repository
//! - [`requests`]: the leave request repository
//! - [`lifecycle`]: submission, approval, cancellation and escalation
//! - [`scheduler`]: periodic accrual and year-end processing
//! - [`collaborators`]: employee directory, notifications and audit log

pub mod arena;
pub mod clock;
pub mod collaborators;
pub mod ledger;
pub mod lifecycle;
pub mod requests;
pub mod scheduler;

use std::sync::Arc;

use chrono::Duration;

use furlough_core::conflict::{ConflictDetector, CoverageThresholds};
use furlough_core::policy::PolicyStore;
use furlough_shared::LeaveConfig;

pub use arena::{ContentionError, LockSettings};
pub use clock::{Clock, FixedClock, SystemClock};
pub use ledger::BalanceLedger;
pub use lifecycle::{Collaborators, LeaveService};
pub use requests::RequestRepository;
pub use scheduler::{AccrualError, AccrualRunSummary, AccrualScheduler, YearEndSummary};

/// The wired-up leave core.
#[derive(Clone)]
pub struct LeaveSystem {
    /// Request lifecycle.
    pub service: Arc<LeaveService>,
    /// Accrual job.
    pub scheduler: Arc<AccrualScheduler>,
    /// Balance ledger.
    pub ledger: Arc<BalanceLedger>,
}

impl LeaveSystem {
    /// Wires the store, service and scheduler from configuration.
    #[must_use]
    pub fn new(config: &LeaveConfig, policies: Arc<PolicyStore>, collaborators: Collaborators) -> Self {
        let settings = LockSettings::from(config);
        let ledger = Arc::new(BalanceLedger::new(
            Arc::clone(&policies),
            Arc::clone(&collaborators.audit),
            Arc::clone(&collaborators.clock),
            settings,
        ));
        let requests = Arc::new(RequestRepository::new(settings));
        let scheduler = Arc::new(AccrualScheduler::new(
            Arc::clone(&ledger),
            Arc::clone(&collaborators.directory),
            Arc::clone(&collaborators.audit),
            Arc::clone(&collaborators.clock),
        ));
        let detector = ConflictDetector::new(CoverageThresholds::from(&config.coverage));
        let sla = i64::try_from(config.escalation_sla_hours)
            .ok()
            .and_then(Duration::try_hours)
            .unwrap_or(Duration::MAX);
        let service = Arc::new(LeaveService::new(
            policies,
            Arc::clone(&ledger),
            requests,
            collaborators,
            detector,
            sla,
        ));
        Self {
            service,
            scheduler,
            ledger,
        }
    }
}
