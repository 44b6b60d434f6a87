//! JSON error responses.
//!
//! Every domain error carries an `error_code()` and an `http_status_code()`;
//! handlers turn them into `{ "error": <code>, "message": <text> }`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

use furlough_core::ledger::LedgerError;
use furlough_core::policy::PolicyError;
use furlough_core::workflow::WorkflowError;
use furlough_shared::AppError;
use furlough_store::AccrualError;

/// Builds an error response.
pub fn error_response(status: u16, code: &str, message: impl Into<String>) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(json!({
            "error": code,
            "message": message.into()
        })),
    )
        .into_response()
}

fn domain_response(status: u16, code: &str, message: String) -> Response {
    if status >= 500 {
        error!(code, message = %message, "request failed");
    }
    error_response(status, code, message)
}

/// Maps workflow errors to HTTP responses.
pub fn workflow_error_response(e: &WorkflowError) -> Response {
    domain_response(e.http_status_code(), e.error_code(), e.to_string())
}

/// Maps ledger errors to HTTP responses.
pub fn ledger_error_response(e: &LedgerError) -> Response {
    domain_response(e.http_status_code(), e.error_code(), e.to_string())
}

/// Maps policy errors to HTTP responses.
pub fn policy_error_response(e: &PolicyError) -> Response {
    domain_response(e.http_status_code(), e.error_code(), e.to_string())
}

/// Maps accrual errors to HTTP responses.
pub fn accrual_error_response(e: &AccrualError) -> Response {
    domain_response(e.http_status_code(), e.error_code(), e.to_string())
}

/// Maps application errors to HTTP responses.
pub fn app_error_response(e: &AppError) -> Response {
    domain_response(e.status_code(), e.error_code(), e.to_string())
}

/// 400 for a malformed request body or parameter.
pub fn validation_response(message: impl Into<String>) -> Response {
    app_error_response(&AppError::Validation(message.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use furlough_shared::types::{Days, LeaveRequestId};

    #[test]
    fn test_status_follows_taxonomy() {
        let response = workflow_error_response(&WorkflowError::RequestNotFound(LeaveRequestId::new()));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = ledger_error_response(&LedgerError::InsufficientBalance {
            available: Days::ONE,
            requested: Days::whole(2),
        });
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let response = ledger_error_response(&LedgerError::ConcurrentModification);
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_validation_is_bad_request() {
        assert_eq!(validation_response("bad").status(), StatusCode::BAD_REQUEST);
        let response = app_error_response(&AppError::Configuration("port".into()));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
