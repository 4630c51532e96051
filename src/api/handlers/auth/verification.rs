//! Email verification endpoint.

use axum::{
    extract::Extension,
    http::{header::LOCATION, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

use crate::api::handlers::error_json;

use super::state::AuthState;
use super::storage::consume_verification_token;
use super::types::{ErrorResponse, VerifyEmailRequest};
use super::utils::hash_token;

/// Consume the verification token, activate the account, and send the
/// browser to the frontend signin page.
#[utoipa::path(
    post,
    path = "/v1/auth/verify-email",
    request_body = VerifyEmailRequest,
    responses(
        (status = 302, description = "Email verified, redirect to signin"),
        (status = 400, description = "Missing, unknown, or expired token", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn verify_email(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<VerifyEmailRequest>>,
) -> impl IntoResponse {
    let request: VerifyEmailRequest = match payload {
        Some(Json(payload)) => payload,
        None => return error_json(StatusCode::BAD_REQUEST, "Missing payload"),
    };

    let token = request.token.trim();
    if token.is_empty() {
        return error_json(StatusCode::BAD_REQUEST, "Missing token");
    }

    match consume_verification_token(&pool, &hash_token(token)).await {
        Ok(true) => {
            let signin_url = format!(
                "{}/auth/signin",
                auth_state.config().frontend_base_url().trim_end_matches('/')
            );
            match signin_url.parse::<axum::http::HeaderValue>() {
                Ok(location) => (StatusCode::FOUND, [(LOCATION, location)]).into_response(),
                Err(err) => {
                    error!("Invalid frontend redirect URL: {err}");
                    error_json(StatusCode::INTERNAL_SERVER_ERROR, "Verification failed")
                }
            }
        }
        Ok(false) => error_json(StatusCode::BAD_REQUEST, "Invalid or expired token"),
        Err(err) => {
            error!("Verify email error: {err}");
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "Verification failed")
        }
    }
}
