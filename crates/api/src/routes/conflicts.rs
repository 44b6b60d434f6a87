//! Conflict analysis route.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use chrono::NaiveDate;
use serde::Deserialize;

use furlough_core::conflict::ConflictQuery;
use furlough_core::policy::DateRange;
use furlough_shared::types::{DepartmentId, EmployeeId, LeaveTypeId};

use crate::AppState;
use crate::error::{policy_error_response, workflow_error_response};

/// Creates the conflict analysis routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/conflict-analysis", post(analyze_conflicts))
}

/// Request body for a conflict analysis.
#[derive(Debug, Deserialize)]
pub struct ConflictAnalysisRequest {
    /// The department whose coverage is checked.
    pub department_id: DepartmentId,
    /// First day (inclusive).
    pub start_date: NaiveDate,
    /// Last day (inclusive).
    pub end_date: NaiveDate,
    /// Prospective absentee, counted on every day.
    #[serde(default)]
    pub employee_id: Option<EmployeeId>,
    /// Enables blackout and minimum-gap findings.
    #[serde(default)]
    pub leave_type_id: Option<LeaveTypeId>,
}

/// POST `/conflict-analysis` - Coverage, blackout and gap findings for a range.
async fn analyze_conflicts(
    State(state): State<AppState>,
    Json(payload): Json<ConflictAnalysisRequest>,
) -> impl IntoResponse {
    let range = match DateRange::new(payload.start_date, payload.end_date) {
        Ok(range) => range,
        Err(e) => return policy_error_response(&e),
    };
    let query = ConflictQuery {
        department_id: payload.department_id,
        range,
        employee_id: payload.employee_id,
        leave_type_id: payload.leave_type_id,
        exclude_request: None,
    };
    match state.service.analyze_conflicts(&query).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => workflow_error_response(&e),
    }
}
