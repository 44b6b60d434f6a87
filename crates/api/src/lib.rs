//! HTTP API layer with Axum routes.
//!
//! This crate provides:
//! - REST routes for leave requests, balances, conflict analysis and accrual runs
//! - JSON error responses built from the domain error taxonomy

pub mod error;
pub mod routes;

#[cfg(test)]
mod test_support;

use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use furlough_core::policy::PolicyStore;
use furlough_store::{AccrualScheduler, BalanceLedger, Clock, LeaveService, LeaveSystem};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Request lifecycle.
    pub service: Arc<LeaveService>,
    /// Balance ledger.
    pub ledger: Arc<BalanceLedger>,
    /// Accrual job, run on demand.
    pub scheduler: Arc<AccrualScheduler>,
    /// Published leave types.
    pub policies: Arc<PolicyStore>,
    /// Time source for defaulted dates.
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Builds the state from a wired leave system.
    #[must_use]
    pub fn new(system: &LeaveSystem, clock: Arc<dyn Clock>) -> Self {
        Self {
            service: Arc::clone(&system.service),
            ledger: Arc::clone(&system.ledger),
            scheduler: Arc::clone(&system.scheduler),
            policies: Arc::clone(system.service.policies()),
            clock,
        }
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::routes())
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
