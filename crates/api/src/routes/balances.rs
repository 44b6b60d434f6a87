//! Balance and ledger routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use furlough_core::ledger::{LeaveBalance, LedgerEntry};
use furlough_shared::types::{Days, EmployeeId, LeaveTypeId};

use crate::AppState;
use crate::error::{ledger_error_response, validation_response};

/// Creates the balance routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/employees/{employee_id}/balances/{leave_type_id}", get(get_balance))
        .route(
            "/employees/{employee_id}/balances/{leave_type_id}/ledger",
            get(get_ledger),
        )
        .route(
            "/employees/{employee_id}/balances/{leave_type_id}/adjustments",
            post(adjust_balance),
        )
        .route(
            "/employees/{employee_id}/balances/{leave_type_id}/cash-outs",
            post(cash_out),
        )
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Balance with its derived figures.
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    /// Stored balance.
    #[serde(flatten)]
    pub balance: LeaveBalance,
    /// `accrued + carry_forward - used - pending`.
    pub available: Days,
    /// Below the leave type's low-balance threshold.
    pub low: bool,
}

impl From<LeaveBalance> for BalanceResponse {
    fn from(balance: LeaveBalance) -> Self {
        Self {
            available: balance.available(),
            low: balance.is_low(),
            balance,
        }
    }
}

/// Request body for a manual adjustment.
#[derive(Debug, Deserialize)]
pub struct AdjustmentRequest {
    /// Signed days.
    pub days: Days,
    /// Why.
    pub reason: String,
    /// Who adjusts.
    pub actor_id: EmployeeId,
}

/// Request body for a cash-out.
#[derive(Debug, Deserialize)]
pub struct CashOutRequest {
    /// Days to convert.
    pub days: Days,
    /// Who authorizes.
    pub actor_id: EmployeeId,
}

/// Response for a cash-out.
#[derive(Debug, Serialize)]
pub struct CashOutResponse {
    /// Entries appended.
    pub entries: Vec<LedgerEntry>,
    /// Payable day-equivalents.
    pub payable: String,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/employees/{employee_id}/balances/{leave_type_id}` - Committed balance.
async fn get_balance(
    State(state): State<AppState>,
    Path((employee_id, leave_type_id)): Path<(Uuid, Uuid)>,
) -> impl IntoResponse {
    match state.ledger.get_balance(
        EmployeeId::from_uuid(employee_id),
        LeaveTypeId::from_uuid(leave_type_id),
    ) {
        Ok(balance) => (StatusCode::OK, Json(BalanceResponse::from(balance))).into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

/// GET `/employees/{employee_id}/balances/{leave_type_id}/ledger` - Entries in sequence order.
async fn get_ledger(
    State(state): State<AppState>,
    Path((employee_id, leave_type_id)): Path<(Uuid, Uuid)>,
) -> impl IntoResponse {
    match state.ledger.entries(
        EmployeeId::from_uuid(employee_id),
        LeaveTypeId::from_uuid(leave_type_id),
    ) {
        Ok(entries) => (StatusCode::OK, Json(json!({ "data": entries }))).into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

/// POST `/employees/{employee_id}/balances/{leave_type_id}/adjustments` - Manual adjustment.
async fn adjust_balance(
    State(state): State<AppState>,
    Path((employee_id, leave_type_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<AdjustmentRequest>,
) -> impl IntoResponse {
    if payload.reason.trim().is_empty() {
        return validation_response("An adjustment needs a reason");
    }
    match state
        .ledger
        .adjust(
            EmployeeId::from_uuid(employee_id),
            LeaveTypeId::from_uuid(leave_type_id),
            payload.days,
            &payload.reason,
            payload.actor_id,
        )
        .await
    {
        Ok(entries) => (StatusCode::CREATED, Json(json!({ "data": entries }))).into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

/// POST `/employees/{employee_id}/balances/{leave_type_id}/cash-outs` - Convert days to pay.
async fn cash_out(
    State(state): State<AppState>,
    Path((employee_id, leave_type_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<CashOutRequest>,
) -> impl IntoResponse {
    match state
        .ledger
        .cash_out(
            EmployeeId::from_uuid(employee_id),
            LeaveTypeId::from_uuid(leave_type_id),
            payload.days,
            payload.actor_id,
        )
        .await
    {
        Ok(outcome) => (
            StatusCode::CREATED,
            Json(CashOutResponse {
                entries: outcome.entries,
                payable: outcome.payable.to_string(),
            }),
        )
            .into_response(),
        Err(e) => ledger_error_response(&e),
    }
}
