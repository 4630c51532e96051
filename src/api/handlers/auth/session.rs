//! Session endpoints: signin, refresh rotation, signout.
//!
//! Signout revokes the refresh token only. Outstanding access tokens remain
//! valid until their natural expiry; they are short-lived by configuration.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

use crate::api::handlers::error_json;

use super::password::verify_password;
use super::state::AuthState;
use super::storage::{
    find_auth_user, insert_refresh_token, revoke_refresh_token, rotate_refresh_token,
};
use super::types::{
    ErrorResponse, MessageResponse, RefreshRequest, SessionResponse, SigninRequest,
    TokenPairResponse,
};
use super::utils::{hash_token, normalize_email, valid_email};

#[utoipa::path(
    post,
    path = "/v1/auth/signin",
    request_body = SigninRequest,
    responses(
        (status = 200, description = "Credentials accepted, token pair issued", body = SessionResponse),
        (status = 400, description = "Invalid signin payload", body = ErrorResponse),
        (status = 401, description = "Unknown account or wrong password", body = ErrorResponse),
        (status = 403, description = "Email not verified yet", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn signin(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<SigninRequest>>,
) -> impl IntoResponse {
    let request: SigninRequest = match payload {
        Some(Json(payload)) => payload,
        None => return error_json(StatusCode::BAD_REQUEST, "Missing payload"),
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return error_json(StatusCode::BAD_REQUEST, "Invalid email");
    }
    if request.password.is_empty() {
        return error_json(StatusCode::BAD_REQUEST, "Password required");
    }

    let user = match find_auth_user(&pool, &email).await {
        Ok(Some(user)) => user,
        Ok(None) => return error_json(StatusCode::UNAUTHORIZED, "Invalid credentials"),
        Err(err) => {
            error!("Signin error: {err}");
            return error_json(StatusCode::INTERNAL_SERVER_ERROR, "Server error");
        }
    };

    let Some(password_hash) = user.password_hash else {
        return error_json(StatusCode::UNAUTHORIZED, "User has no password set");
    };

    match verify_password(request.password, password_hash).await {
        Ok(true) => {}
        Ok(false) => return error_json(StatusCode::UNAUTHORIZED, "Invalid credentials"),
        Err(err) => {
            error!("Signin error: {err}");
            return error_json(StatusCode::INTERNAL_SERVER_ERROR, "Server error");
        }
    }

    if !user.profile.email_verified {
        return error_json(
            StatusCode::FORBIDDEN,
            "Please verify your email before signing in",
        );
    }

    let pair = match auth_state.issue_pair(
        user.profile.user_id,
        &user.profile.email,
        user.profile.role,
    ) {
        Ok(pair) => pair,
        Err(err) => {
            error!("Signin error: {err}");
            return error_json(StatusCode::INTERNAL_SERVER_ERROR, "Server error");
        }
    };

    // Enter the rotation state machine: the new refresh token becomes the
    // active link of a fresh chain.
    if let Err(err) = insert_refresh_token(
        &pool,
        user.profile.user_id,
        &hash_token(&pair.refresh_token),
        auth_state.config().refresh_token_ttl_seconds(),
    )
    .await
    {
        error!("Signin error: {err}");
        return error_json(StatusCode::INTERNAL_SERVER_ERROR, "Server error");
    }

    let response = SessionResponse {
        success: true,
        user: user.profile.into(),
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        expires_in: auth_state.config().access_token_ttl_label().to_string(),
    };
    (StatusCode::OK, Json(response)).into_response()
}

#[utoipa::path(
    post,
    path = "/v1/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Token pair rotated", body = TokenPairResponse),
        (status = 400, description = "Missing refresh token", body = ErrorResponse),
        (status = 401, description = "Invalid, expired, or already-rotated token", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn refresh(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<RefreshRequest>>,
) -> impl IntoResponse {
    let request: RefreshRequest = match payload {
        Some(Json(payload)) => payload,
        None => return error_json(StatusCode::BAD_REQUEST, "refreshToken required"),
    };
    let presented = request.refresh_token.trim();
    if presented.is_empty() {
        return error_json(StatusCode::BAD_REQUEST, "refreshToken required");
    }

    // Stateless check first; a bad signature never touches the ledger.
    let claims = match auth_state.keys().verify(presented) {
        Ok(claims) => claims,
        Err(_) => {
            return error_json(StatusCode::UNAUTHORIZED, "Invalid or expired refresh token")
        }
    };

    // Compare-and-swap on the ledger row: only one concurrent caller can
    // revoke the presented token, so replays lose here.
    let rotated = match rotate_refresh_token(&pool, claims.sub, &hash_token(presented)).await {
        Ok(rotated) => rotated,
        Err(err) => {
            error!("Refresh error: {err}");
            return error_json(StatusCode::INTERNAL_SERVER_ERROR, "Server error");
        }
    };
    if !rotated {
        return error_json(StatusCode::UNAUTHORIZED, "Invalid refresh token");
    }

    let pair = match auth_state.issue_pair(claims.sub, &claims.email, claims.role) {
        Ok(pair) => pair,
        Err(err) => {
            error!("Refresh error: {err}");
            return error_json(StatusCode::INTERNAL_SERVER_ERROR, "Server error");
        }
    };

    if let Err(err) = insert_refresh_token(
        &pool,
        claims.sub,
        &hash_token(&pair.refresh_token),
        auth_state.config().refresh_token_ttl_seconds(),
    )
    .await
    {
        // The old token is already revoked; the caller must sign in again.
        error!("Refresh error: {err}");
        return error_json(StatusCode::INTERNAL_SERVER_ERROR, "Server error");
    }

    let response = TokenPairResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        expires_in: auth_state.config().access_token_ttl_label().to_string(),
    };
    (StatusCode::OK, Json(response)).into_response()
}

#[utoipa::path(
    post,
    path = "/v1/auth/signout",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Refresh token revoked", body = MessageResponse),
        (status = 400, description = "Missing refresh token", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn signout(
    pool: Extension<PgPool>,
    payload: Option<Json<RefreshRequest>>,
) -> impl IntoResponse {
    let request: RefreshRequest = match payload {
        Some(Json(payload)) => payload,
        None => return error_json(StatusCode::BAD_REQUEST, "refreshToken required"),
    };
    let presented = request.refresh_token.trim();
    if presented.is_empty() {
        return error_json(StatusCode::BAD_REQUEST, "refreshToken required");
    }

    // Idempotent: revoking an unknown or already-revoked token still reports
    // success.
    if let Err(err) = revoke_refresh_token(&pool, &hash_token(presented)).await {
        error!("Signout error: {err}");
        return error_json(StatusCode::INTERNAL_SERVER_ERROR, "Server error");
    }

    let response = MessageResponse {
        success: true,
        message: "Signed out".to_string(),
    };
    (StatusCode::OK, Json(response)).into_response()
}
