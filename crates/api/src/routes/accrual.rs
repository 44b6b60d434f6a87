//! Accrual and year-end run routes.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use furlough_shared::types::{EmployeeId, LeaveTypeId};

use crate::AppState;
use crate::error::accrual_error_response;

/// Creates the accrual routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/accrual-runs", post(run_accrual_cycle))
        .route("/year-end-runs", post(run_year_end))
        .route("/accrual-enrollments", post(enroll))
}

/// Request body for a scheduler run.
#[derive(Debug, Default, Deserialize)]
pub struct RunRequest {
    /// Run date; defaults to today.
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
}

/// Request body for enrolling a pair.
#[derive(Debug, Deserialize)]
pub struct EnrollmentRequest {
    /// The employee.
    pub employee_id: EmployeeId,
    /// The leave type.
    pub leave_type_id: LeaveTypeId,
    /// Accrue from the period containing this date (or the hire date, if later).
    pub from: NaiveDate,
}

fn as_of(state: &AppState, payload: Option<Json<RunRequest>>) -> NaiveDate {
    payload
        .and_then(|Json(body)| body.as_of)
        .unwrap_or_else(|| state.clock.today())
}

/// POST `/accrual-runs` - Post every accrual due on or before the run date.
async fn run_accrual_cycle(
    State(state): State<AppState>,
    payload: Option<Json<RunRequest>>,
) -> impl IntoResponse {
    let as_of = as_of(&state, payload);
    info!(%as_of, "accrual run requested");
    let summary = state.scheduler.run_accrual_cycle(as_of).await;
    (StatusCode::OK, Json(summary)).into_response()
}

/// POST `/year-end-runs` - Carry forward and expire for the run date's policy year.
async fn run_year_end(
    State(state): State<AppState>,
    payload: Option<Json<RunRequest>>,
) -> impl IntoResponse {
    let as_of = as_of(&state, payload);
    info!(%as_of, "year-end run requested");
    let summary = state.scheduler.run_year_end(as_of).await;
    (StatusCode::OK, Json(summary)).into_response()
}

/// POST `/accrual-enrollments` - Schedule accruals for an employee and leave type.
async fn enroll(
    State(state): State<AppState>,
    Json(payload): Json<EnrollmentRequest>,
) -> impl IntoResponse {
    match state
        .scheduler
        .enroll(payload.employee_id, payload.leave_type_id, payload.from)
        .await
    {
        Ok(next) => (
            StatusCode::CREATED,
            Json(json!({ "next_accrual_date": next })),
        )
            .into_response(),
        Err(e) => accrual_error_response(&e),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::test_support::{app, fixture, json_request, send};

    #[tokio::test]
    async fn test_enroll_then_run() {
        let fixture = fixture().await;
        let (status, enrolled) = send(
            app(&fixture),
            json_request(
                "POST",
                "/api/v1/accrual-enrollments",
                &json!({
                    "employee_id": fixture.employee,
                    "leave_type_id": fixture.leave_type,
                    "from": "2026-03-01",
                }),
            ),
        )
        .await;
        assert_eq!(status, 201);
        assert_eq!(enrolled["next_accrual_date"], "2026-03-31");

        let (status, summary) = send(
            app(&fixture),
            json_request("POST", "/api/v1/accrual-runs", &json!({ "as_of": "2026-03-31" })),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(summary["posted"], 1);
        assert_eq!(summary["failed"], 0);
    }

    #[tokio::test]
    async fn test_enroll_unknown_employee() {
        let fixture = fixture().await;
        let (status, error) = send(
            app(&fixture),
            json_request(
                "POST",
                "/api/v1/accrual-enrollments",
                &json!({
                    "employee_id": uuid::Uuid::new_v4(),
                    "leave_type_id": fixture.leave_type,
                    "from": "2026-03-01",
                }),
            ),
        )
        .await;
        assert_eq!(status, 404);
        assert_eq!(error["error"], "EMPLOYEE_NOT_FOUND");
    }
}
