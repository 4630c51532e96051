//! API handlers and shared utilities.
//!
//! This module organizes the service's route handlers and provides the
//! common JSON error body used by every failing endpoint.

pub mod auth;
pub mod health;
pub mod me;
pub mod root;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use auth::types::ErrorResponse;

/// Build a `{"error": "..."}` response. Internal details are logged at the
/// call site and never make it into `message`.
pub(crate) fn error_json(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn error_json_shapes_status_and_body() {
        let response = error_json(StatusCode::CONFLICT, "Email already in use");
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let bytes = axum::body::to_bytes(response.into_body(), 1024)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            value.get("error").and_then(serde_json::Value::as_str),
            Some("Email already in use")
        );
    }
}
