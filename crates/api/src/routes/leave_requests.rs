//! Leave request routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use furlough_core::workflow::{LeaveRequestInput, OverrideInput};
use furlough_shared::types::{EmployeeId, LeaveRequestId};

use crate::AppState;
use crate::error::workflow_error_response;

/// Creates the leave request routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/leave-requests", post(create_leave_request))
        .route("/leave-requests/{request_id}", get(get_leave_request))
        .route("/leave-requests/{request_id}/submit", post(submit_draft))
        .route("/leave-requests/{request_id}/approve", post(approve_leave_request))
        .route("/leave-requests/{request_id}/reject", post(reject_leave_request))
        .route("/leave-requests/{request_id}/cancel", post(cancel_leave_request))
        .route(
            "/leave-requests/{request_id}/medical-certificate",
            post(attach_medical_certificate),
        )
        .route("/escalation-runs", post(run_escalation))
}

// ============================================================================
// Request Types
// ============================================================================

/// Request body for creating a leave request.
#[derive(Debug, Deserialize)]
pub struct CreateLeaveRequest {
    /// The request itself.
    #[serde(flatten)]
    pub input: LeaveRequestInput,
    /// Save without submitting.
    #[serde(default)]
    pub draft: bool,
}

/// Request body for submitting a saved draft.
#[derive(Debug, Deserialize)]
pub struct SubmitDraftRequest {
    /// The requesting employee.
    pub actor_id: EmployeeId,
    /// Override for critical conflicts.
    #[serde(default)]
    pub conflict_override: Option<OverrideInput>,
}

/// Request body for approving a step.
#[derive(Debug, Deserialize)]
pub struct ApproveRequest {
    /// The approver.
    pub approver_id: EmployeeId,
    /// Proceed despite critical conflicts (HR and director only).
    #[serde(default)]
    pub override_conflict: bool,
}

/// Request body for rejecting a request.
#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    /// The approver.
    pub approver_id: EmployeeId,
    /// Required reason.
    #[serde(default)]
    pub reason: Option<String>,
}

/// Request body naming the acting employee.
#[derive(Debug, Deserialize)]
pub struct ActorRequest {
    /// Who acts.
    pub actor_id: EmployeeId,
}

/// Request body for an escalation pass.
#[derive(Debug, Default, Deserialize)]
pub struct EscalationRunRequest {
    /// Evaluation instant; defaults to now.
    #[serde(default)]
    pub now: Option<DateTime<Utc>>,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST `/leave-requests` - Create and submit a request, or save a draft.
async fn create_leave_request(
    State(state): State<AppState>,
    Json(payload): Json<CreateLeaveRequest>,
) -> impl IntoResponse {
    let result = if payload.draft {
        state.service.save_draft(&payload.input).await
    } else {
        state.service.submit_request(&payload.input).await
    };
    match result {
        Ok(request) => {
            info!(request_id = %request.id, status = %request.status, "leave request created");
            (StatusCode::CREATED, Json(request)).into_response()
        }
        Err(e) => workflow_error_response(&e),
    }
}

/// GET `/leave-requests/{request_id}` - Latest committed state.
async fn get_leave_request(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
) -> impl IntoResponse {
    match state.service.get_request(LeaveRequestId::from_uuid(request_id)) {
        Ok(request) => (StatusCode::OK, Json(request)).into_response(),
        Err(e) => workflow_error_response(&e),
    }
}

/// POST `/leave-requests/{request_id}/submit` - Submit a saved draft.
async fn submit_draft(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
    Json(payload): Json<SubmitDraftRequest>,
) -> impl IntoResponse {
    match state
        .service
        .submit_draft(
            LeaveRequestId::from_uuid(request_id),
            payload.actor_id,
            payload.conflict_override.as_ref(),
        )
        .await
    {
        Ok(request) => (StatusCode::OK, Json(request)).into_response(),
        Err(e) => workflow_error_response(&e),
    }
}

/// POST `/leave-requests/{request_id}/approve` - Approve the current step.
async fn approve_leave_request(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
    Json(payload): Json<ApproveRequest>,
) -> impl IntoResponse {
    match state
        .service
        .approve(
            LeaveRequestId::from_uuid(request_id),
            payload.approver_id,
            payload.override_conflict,
        )
        .await
    {
        Ok(request) => (StatusCode::OK, Json(request)).into_response(),
        Err(e) => workflow_error_response(&e),
    }
}

/// POST `/leave-requests/{request_id}/reject` - Reject with a reason.
async fn reject_leave_request(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
    Json(payload): Json<RejectRequest>,
) -> impl IntoResponse {
    match state
        .service
        .reject(
            LeaveRequestId::from_uuid(request_id),
            payload.approver_id,
            payload.reason.unwrap_or_default(),
        )
        .await
    {
        Ok(request) => (StatusCode::OK, Json(request)).into_response(),
        Err(e) => workflow_error_response(&e),
    }
}

/// POST `/leave-requests/{request_id}/cancel` - Cancel or discard.
async fn cancel_leave_request(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
    Json(payload): Json<ActorRequest>,
) -> impl IntoResponse {
    match state
        .service
        .cancel(LeaveRequestId::from_uuid(request_id), payload.actor_id)
        .await
    {
        Ok(request) => (StatusCode::OK, Json(request)).into_response(),
        Err(e) => workflow_error_response(&e),
    }
}

/// POST `/leave-requests/{request_id}/medical-certificate` - Record the certificate.
async fn attach_medical_certificate(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
    Json(payload): Json<ActorRequest>,
) -> impl IntoResponse {
    match state
        .service
        .attach_medical_certificate(LeaveRequestId::from_uuid(request_id), payload.actor_id)
        .await
    {
        Ok(request) => (StatusCode::OK, Json(request)).into_response(),
        Err(e) => workflow_error_response(&e),
    }
}

/// POST `/escalation-runs` - Escalate requests past the approval SLA.
async fn run_escalation(
    State(state): State<AppState>,
    payload: Option<Json<EscalationRunRequest>>,
) -> impl IntoResponse {
    let payload = payload.map(|Json(body)| body).unwrap_or_default();
    let now = payload.now.unwrap_or_else(|| state.clock.now());
    let escalated = state.service.escalate_overdue(now).await;
    (StatusCode::OK, Json(json!({ "escalated": escalated }))).into_response()
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use crate::test_support::{Fixture, app, fixture, get_request, json_request, send};

    fn body(fixture: &Fixture, start: &str, end: &str) -> Value {
        json!({
            "employee_id": fixture.employee,
            "leave_type_id": fixture.leave_type,
            "start_date": start,
            "end_date": end,
        })
    }

    #[tokio::test]
    async fn test_submit_then_approve() {
        let fixture = fixture().await;

        let (status, created) = send(
            app(&fixture),
            json_request("POST", "/api/v1/leave-requests", &body(&fixture, "2026-03-09", "2026-03-10")),
        )
        .await;
        assert_eq!(status, 201);
        assert_eq!(created["status"], "pending");
        let id = created["id"].as_str().unwrap().to_string();

        let (status, fetched) = send(app(&fixture), get_request(&format!("/api/v1/leave-requests/{id}"))).await;
        assert_eq!(status, 200);
        assert_eq!(fetched["id"], created["id"]);

        let (status, approved) = send(
            app(&fixture),
            json_request(
                "POST",
                &format!("/api/v1/leave-requests/{id}/approve"),
                &json!({ "approver_id": fixture.manager }),
            ),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(approved["status"], "approved");
    }

    #[tokio::test]
    async fn test_save_draft() {
        let fixture = fixture().await;
        let mut draft = body(&fixture, "2026-03-09", "2026-03-09");
        draft["draft"] = json!(true);

        let (status, created) = send(app(&fixture), json_request("POST", "/api/v1/leave-requests", &draft)).await;
        assert_eq!(status, 201);
        assert_eq!(created["status"], "draft");

        let id = created["id"].as_str().unwrap();
        let (status, submitted) = send(
            app(&fixture),
            json_request(
                "POST",
                &format!("/api/v1/leave-requests/{id}/submit"),
                &json!({ "actor_id": fixture.employee }),
            ),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(submitted["status"], "pending");
    }

    #[tokio::test]
    async fn test_insufficient_balance_is_unprocessable() {
        let fixture = fixture().await;
        let (status, error) = send(
            app(&fixture),
            json_request("POST", "/api/v1/leave-requests", &body(&fixture, "2026-03-09", "2026-03-27")),
        )
        .await;
        assert_eq!(status, 422);
        assert_eq!(error["error"], "INSUFFICIENT_BALANCE");
    }

    #[tokio::test]
    async fn test_reject_requires_reason() {
        let fixture = fixture().await;
        let (_, created) = send(
            app(&fixture),
            json_request("POST", "/api/v1/leave-requests", &body(&fixture, "2026-03-09", "2026-03-09")),
        )
        .await;
        let id = created["id"].as_str().unwrap();

        let (status, error) = send(
            app(&fixture),
            json_request(
                "POST",
                &format!("/api/v1/leave-requests/{id}/reject"),
                &json!({ "approver_id": fixture.manager }),
            ),
        )
        .await;
        assert_eq!(status, 400);
        assert_eq!(error["error"], "REJECTION_REASON_REQUIRED");

        let (status, rejected) = send(
            app(&fixture),
            json_request(
                "POST",
                &format!("/api/v1/leave-requests/{id}/reject"),
                &json!({ "approver_id": fixture.manager, "reason": "short-staffed" }),
            ),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(rejected["status"], "rejected");
    }

    #[tokio::test]
    async fn test_cancel_by_another_employee_is_forbidden() {
        let fixture = fixture().await;
        let (_, created) = send(
            app(&fixture),
            json_request("POST", "/api/v1/leave-requests", &body(&fixture, "2026-03-09", "2026-03-09")),
        )
        .await;
        let id = created["id"].as_str().unwrap();

        let (status, error) = send(
            app(&fixture),
            json_request(
                "POST",
                &format!("/api/v1/leave-requests/{id}/cancel"),
                &json!({ "actor_id": fixture.manager }),
            ),
        )
        .await;
        assert_eq!(status, 403);
        assert_eq!(error["error"], "NOT_AUTHORIZED");
    }

    #[tokio::test]
    async fn test_unknown_request_is_not_found() {
        let fixture = fixture().await;
        let (status, error) = send(
            app(&fixture),
            get_request(&format!("/api/v1/leave-requests/{}", uuid::Uuid::new_v4())),
        )
        .await;
        assert_eq!(status, 404);
        assert_eq!(error["error"], "REQUEST_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_escalation_run_without_body() {
        let fixture = fixture().await;
        let (status, body) = send(
            app(&fixture),
            axum::http::Request::builder()
                .method("POST")
                .uri("/api/v1/escalation-runs")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(body["escalated"], json!([]));
    }
}
