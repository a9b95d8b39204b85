//! `TodoError` → HTTP response
//!
//! Every failure leaves the API as `{"status":"error","message":...}`,
//! with field-keyed `errors` for validation failures.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::error::{FieldErrors, TodoError};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
}

impl IntoResponse for TodoError {
    fn into_response(self) -> Response {
        if self.is_client_error() {
            tracing::debug!(error = %self, "request rejected");
        }
        let (status, message, errors) = match self {
            TodoError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                "Invalid input.".to_string(),
                Some(errors),
            ),
            TodoError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            TodoError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg, None),
            other => {
                tracing::error!(error = %other, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error.".to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            status: "error",
            message,
            errors,
        };
        (status, Json(body)).into_response()
    }
}

/// Unreadable request bodies become a 400 keyed by `body`.
pub fn bad_body(rejection: JsonRejection) -> TodoError {
    tracing::debug!(error = %rejection.body_text(), "rejected request body");
    TodoError::validation("body", rejection.body_text())
}
