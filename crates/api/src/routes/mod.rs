//! API route definitions.

use axum::Router;

use crate::AppState;

pub mod accrual;
pub mod balances;
pub mod conflicts;
pub mod health;
pub mod leave_requests;
pub mod leave_types;

/// Creates the versioned API router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(leave_requests::routes())
        .merge(balances::routes())
        .merge(conflicts::routes())
        .merge(leave_types::routes())
        .merge(accrual::routes())
}
