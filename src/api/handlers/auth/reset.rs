//! Password lifecycle: forgot/reset flows and authenticated password change.
//!
//! Forgot-password answers identically whether or not the account exists, so
//! the endpoint cannot be used to enumerate emails. Reset tokens are
//! single-use; redemption and the password update happen in one transaction.

use axum::{
    extract::{Extension, Query},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

use crate::api::email::EmailMessage;
use crate::api::handlers::error_json;

use super::password::{hash_password, verify_password};
use super::principal::require_auth;
use super::state::AuthState;
use super::storage::{
    consume_reset_token, fetch_password_hash, lookup_user_id, reset_token_valid,
    store_one_time_token, update_password as store_password, TokenPurpose,
};
use super::types::{
    ErrorResponse, ForgotPasswordRequest, ForgotPasswordResponse, MessageResponse,
    ResetPasswordRequest, UpdatePasswordRequest, ValidateResetTokenQuery,
    ValidateResetTokenResponse,
};
use super::utils::{frontend_link, hash_token, normalize_email, valid_email};

const MIN_PASSWORD_LENGTH: usize = 8;

#[utoipa::path(
    post,
    path = "/v1/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Same response whether or not the account exists", body = ForgotPasswordResponse),
        (status = 400, description = "Invalid email", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn forgot_password(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<ForgotPasswordRequest>>,
) -> impl IntoResponse {
    let request: ForgotPasswordRequest = match payload {
        Some(Json(payload)) => payload,
        None => return error_json(StatusCode::BAD_REQUEST, "Missing payload"),
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return error_json(StatusCode::BAD_REQUEST, "Invalid email");
    }

    let message = "Reset link has been sent to your email".to_string();

    let user_id = match lookup_user_id(&pool, &email).await {
        Ok(Some(user_id)) => user_id,
        // Unknown address: answer exactly as if the link had been sent.
        Ok(None) => {
            return (
                StatusCode::OK,
                Json(ForgotPasswordResponse {
                    success: true,
                    message,
                    reset_token: None,
                }),
            )
                .into_response()
        }
        Err(err) => {
            error!("Forgot password error: {err}");
            return error_json(StatusCode::INTERNAL_SERVER_ERROR, "Server error");
        }
    };

    let token = match store_one_time_token(
        &pool,
        user_id,
        TokenPurpose::PasswordReset,
        auth_state.config().reset_token_ttl_seconds(),
    )
    .await
    {
        Ok(token) => token,
        Err(err) => {
            error!("Forgot password error: {err}");
            return error_json(StatusCode::INTERNAL_SERVER_ERROR, "Server error");
        }
    };

    let reset_url = frontend_link(
        auth_state.config().frontend_base_url(),
        "auth/reset-password",
        &token,
    );
    if let Err(err) = auth_state
        .email()
        .send(&EmailMessage::password_reset(&email, &reset_url))
    {
        error!("Failed to send reset email: {err}");
        return error_json(StatusCode::INTERNAL_SERVER_ERROR, "Server error");
    }

    let response = ForgotPasswordResponse {
        success: true,
        message,
        reset_token: auth_state.config().expose_tokens().then_some(token),
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// Frontend pre-check before rendering the reset form; does not consume.
#[utoipa::path(
    get,
    path = "/v1/auth/validate-reset-token",
    params(
        ("token" = String, Query, description = "Reset token from the email link")
    ),
    responses(
        (status = 200, description = "Token is redeemable", body = ValidateResetTokenResponse),
        (status = 400, description = "Missing, unknown, or expired token", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn validate_reset_token(
    pool: Extension<PgPool>,
    query: Option<Query<ValidateResetTokenQuery>>,
) -> impl IntoResponse {
    let token = match query {
        Some(Query(query)) => query.token,
        None => return error_json(StatusCode::BAD_REQUEST, "Token required"),
    };
    if token.trim().is_empty() {
        return error_json(StatusCode::BAD_REQUEST, "Token required");
    }

    match reset_token_valid(&pool, &hash_token(token.trim())).await {
        Ok(true) => (
            StatusCode::OK,
            Json(ValidateResetTokenResponse { valid: true }),
        )
            .into_response(),
        Ok(false) => error_json(StatusCode::BAD_REQUEST, "Invalid or expired token"),
        Err(err) => {
            error!("Validate reset token error: {err}");
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "Server error")
        }
    }
}

#[utoipa::path(
    post,
    path = "/v1/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password replaced, token consumed", body = MessageResponse),
        (status = 400, description = "Invalid payload or token", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn reset_password(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<ResetPasswordRequest>>,
) -> impl IntoResponse {
    redeem_reset_token(&pool, &auth_state, payload, "Password reset successfully").await
}

/// Same flow as `reset_password` under the route name older clients use.
#[utoipa::path(
    post,
    path = "/v1/auth/change-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password replaced, token consumed", body = MessageResponse),
        (status = 400, description = "Invalid payload or token", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn change_password(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<ResetPasswordRequest>>,
) -> impl IntoResponse {
    redeem_reset_token(&pool, &auth_state, payload, "Password changed successfully").await
}

async fn redeem_reset_token(
    pool: &PgPool,
    auth_state: &AuthState,
    payload: Option<Json<ResetPasswordRequest>>,
    success_message: &str,
) -> axum::response::Response {
    let request: ResetPasswordRequest = match payload {
        Some(Json(payload)) => payload,
        None => return error_json(StatusCode::BAD_REQUEST, "Missing payload"),
    };
    let token = request.token.trim();
    if token.is_empty() {
        return error_json(StatusCode::BAD_REQUEST, "Token required");
    }
    if request.new_password.len() < MIN_PASSWORD_LENGTH {
        return error_json(
            StatusCode::BAD_REQUEST,
            "Password must be at least 8 characters",
        );
    }

    let new_hash =
        match hash_password(request.new_password, auth_state.config().bcrypt_cost()).await {
            Ok(hash) => hash,
            Err(err) => {
                error!("Reset password error: {err}");
                return error_json(StatusCode::INTERNAL_SERVER_ERROR, "Server error");
            }
        };

    match consume_reset_token(pool, &hash_token(token), &new_hash).await {
        Ok(true) => (
            StatusCode::OK,
            Json(MessageResponse {
                success: true,
                message: success_message.to_string(),
            }),
        )
            .into_response(),
        Ok(false) => error_json(StatusCode::BAD_REQUEST, "Invalid or expired token"),
        Err(err) => {
            error!("Reset password error: {err}");
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "Server error")
        }
    }
}

#[utoipa::path(
    put,
    path = "/v1/auth/update-password",
    request_body = UpdatePasswordRequest,
    responses(
        (status = 200, description = "Password updated", body = MessageResponse),
        (status = 400, description = "Invalid payload", body = ErrorResponse),
        (status = 401, description = "Not authenticated or wrong current password", body = ErrorResponse),
        (status = 404, description = "Account no longer exists", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn update_password(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<UpdatePasswordRequest>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &auth_state) {
        Ok(principal) => principal,
        Err(response) => return response,
    };

    let request: UpdatePasswordRequest = match payload {
        Some(Json(payload)) => payload,
        None => return error_json(StatusCode::BAD_REQUEST, "Missing payload"),
    };
    if request.current_password.is_empty() {
        return error_json(StatusCode::BAD_REQUEST, "Current password required");
    }
    if request.new_password.len() < MIN_PASSWORD_LENGTH {
        return error_json(
            StatusCode::BAD_REQUEST,
            "Password must be at least 8 characters",
        );
    }

    let current_hash = match fetch_password_hash(&pool, principal.user_id).await {
        Ok(Some(Some(hash))) => hash,
        // Passwordless accounts have no current password to present.
        Ok(Some(None)) => return error_json(StatusCode::UNAUTHORIZED, "Current password incorrect"),
        Ok(None) => return error_json(StatusCode::NOT_FOUND, "User not found"),
        Err(err) => {
            error!("Update password error: {err}");
            return error_json(StatusCode::INTERNAL_SERVER_ERROR, "Server error");
        }
    };

    match verify_password(request.current_password, current_hash).await {
        Ok(true) => {}
        Ok(false) => return error_json(StatusCode::UNAUTHORIZED, "Current password incorrect"),
        Err(err) => {
            error!("Update password error: {err}");
            return error_json(StatusCode::INTERNAL_SERVER_ERROR, "Server error");
        }
    }

    let new_hash =
        match hash_password(request.new_password, auth_state.config().bcrypt_cost()).await {
            Ok(hash) => hash,
            Err(err) => {
                error!("Update password error: {err}");
                return error_json(StatusCode::INTERNAL_SERVER_ERROR, "Server error");
            }
        };

    if let Err(err) = store_password(&pool, principal.user_id, &new_hash).await {
        error!("Update password error: {err}");
        return error_json(StatusCode::INTERNAL_SERVER_ERROR, "Server error");
    }

    let response = MessageResponse {
        success: true,
        message: "Password updated".to_string(),
    };
    (StatusCode::OK, Json(response)).into_response()
}
