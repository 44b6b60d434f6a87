//! Leave type routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde_json::json;
use uuid::Uuid;

use furlough_core::policy::LeaveType;
use furlough_shared::types::LeaveTypeId;

use crate::AppState;
use crate::error::policy_error_response;

/// Creates the leave type routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/leave-types", get(list_leave_types))
        .route("/leave-types/{leave_type_id}", get(get_leave_type))
}

/// GET `/leave-types` - Latest version of every published leave type.
async fn list_leave_types(State(state): State<AppState>) -> impl IntoResponse {
    let mut leave_types = state.policies.leave_types();
    leave_types.sort_by(|a, b| a.code.cmp(&b.code));
    let data: Vec<&LeaveType> = leave_types.iter().map(|leave_type| &**leave_type).collect();
    (StatusCode::OK, Json(json!({ "data": data }))).into_response()
}

/// GET `/leave-types/{leave_type_id}` - Latest version of one leave type.
async fn get_leave_type(
    State(state): State<AppState>,
    Path(leave_type_id): Path<Uuid>,
) -> impl IntoResponse {
    match state.policies.get_leave_type(LeaveTypeId::from_uuid(leave_type_id)) {
        Ok(leave_type) => (StatusCode::OK, Json(&*leave_type)).into_response(),
        Err(e) => policy_error_response(&e),
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::{app, fixture, get_request, send};

    #[tokio::test]
    async fn test_list_and_get_leave_type() {
        let fixture = fixture().await;
        let (status, list) = send(app(&fixture), get_request("/api/v1/leave-types")).await;
        assert_eq!(status, 200);
        assert_eq!(list["data"].as_array().unwrap().len(), 1);
        assert_eq!(list["data"][0]["code"], "ANNUAL");

        let uri = format!("/api/v1/leave-types/{}", fixture.leave_type);
        let (status, leave_type) = send(app(&fixture), get_request(&uri)).await;
        assert_eq!(status, 200);
        assert_eq!(leave_type["id"], list["data"][0]["id"]);
    }

    #[tokio::test]
    async fn test_unknown_leave_type_is_not_found() {
        let fixture = fixture().await;
        let uri = format!("/api/v1/leave-types/{}", uuid::Uuid::new_v4());
        let (status, _) = send(app(&fixture), get_request(&uri)).await;
        assert_eq!(status, 404);
    }
}
