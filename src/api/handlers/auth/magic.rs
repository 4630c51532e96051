//! Magic-login flows.
//!
//! Admins mint passwordless login tokens for any account, either mailed as a
//! link or returned directly for support tooling. Redeeming one issues a
//! normal access/refresh pair, entering the rotation state machine the same
//! way signin does.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use crate::api::email::EmailMessage;
use crate::api::handlers::error_json;

use super::principal::{require_auth, require_role};
use super::state::AuthState;
use super::storage::{
    consume_magic_token, insert_refresh_token, lookup_user_id, store_one_time_token, TokenPurpose,
};
use super::types::{
    ErrorResponse, MagicLinkRequest, MagicLinkResponse, MagicLoginRequest, MagicTokenResponse,
    Role, SessionResponse,
};
use super::utils::{frontend_link, hash_token, normalize_email, valid_email};

/// Admin gate + target lookup shared by both minting endpoints.
async fn magic_target(
    headers: &HeaderMap,
    pool: &PgPool,
    auth_state: &AuthState,
    payload: Option<Json<MagicLinkRequest>>,
) -> Result<(Uuid, String), axum::response::Response> {
    let principal = require_auth(headers, auth_state)?;
    require_role(&principal, &[Role::Admin])?;

    let request: MagicLinkRequest = match payload {
        Some(Json(payload)) => payload,
        None => return Err(error_json(StatusCode::BAD_REQUEST, "Missing payload")),
    };
    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return Err(error_json(StatusCode::BAD_REQUEST, "Invalid email"));
    }

    match lookup_user_id(pool, &email).await {
        Ok(Some(user_id)) => Ok((user_id, email)),
        Ok(None) => Err(error_json(StatusCode::NOT_FOUND, "User not found")),
        Err(err) => {
            error!("Magic token error: {err}");
            Err(error_json(StatusCode::INTERNAL_SERVER_ERROR, "Server error"))
        }
    }
}

#[utoipa::path(
    post,
    path = "/v1/auth/send-magic-link",
    request_body = MagicLinkRequest,
    responses(
        (status = 200, description = "Magic link queued for delivery", body = MagicLinkResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
        (status = 404, description = "No account with that email", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn send_magic_link(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<MagicLinkRequest>>,
) -> impl IntoResponse {
    let (user_id, email) = match magic_target(&headers, &pool, &auth_state, payload).await {
        Ok(target) => target,
        Err(response) => return response,
    };

    let token = match store_one_time_token(
        &pool,
        user_id,
        TokenPurpose::MagicLogin,
        auth_state.config().magic_token_ttl_seconds(),
    )
    .await
    {
        Ok(token) => token,
        Err(err) => {
            error!("Send magic link error: {err}");
            return error_json(StatusCode::INTERNAL_SERVER_ERROR, "Server error");
        }
    };

    let magic_url = frontend_link(auth_state.config().frontend_base_url(), "magic-login", &token);
    if let Err(err) = auth_state
        .email()
        .send(&EmailMessage::magic_link(&email, &magic_url))
    {
        error!("Failed to send magic link email: {err}");
        return error_json(StatusCode::INTERNAL_SERVER_ERROR, "Server error");
    }

    let expose = auth_state.config().expose_tokens();
    let response = MagicLinkResponse {
        success: true,
        message: "Magic link sent successfully".to_string(),
        magic_token: expose.then_some(token),
        magic_url: expose.then_some(magic_url),
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// Mint a magic token without sending email; support tooling picks it up
/// from the response.
#[utoipa::path(
    post,
    path = "/v1/auth/generate-magic-token",
    request_body = MagicLinkRequest,
    responses(
        (status = 200, description = "Magic token minted", body = MagicTokenResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
        (status = 404, description = "No account with that email", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn generate_magic_token(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<MagicLinkRequest>>,
) -> impl IntoResponse {
    let (user_id, _email) = match magic_target(&headers, &pool, &auth_state, payload).await {
        Ok(target) => target,
        Err(response) => return response,
    };

    let token = match store_one_time_token(
        &pool,
        user_id,
        TokenPurpose::MagicLogin,
        auth_state.config().magic_token_ttl_seconds(),
    )
    .await
    {
        Ok(token) => token,
        Err(err) => {
            error!("Generate magic token error: {err}");
            return error_json(StatusCode::INTERNAL_SERVER_ERROR, "Server error");
        }
    };

    let minutes = auth_state.config().magic_token_ttl_seconds() / 60;
    let response = MagicTokenResponse {
        success: true,
        message: "Magic token generated successfully".to_string(),
        token,
        expires_in: format!("{minutes} minutes"),
    };
    (StatusCode::OK, Json(response)).into_response()
}

#[utoipa::path(
    post,
    path = "/v1/auth/magic-login",
    request_body = MagicLoginRequest,
    responses(
        (status = 200, description = "Token redeemed, session issued", body = SessionResponse),
        (status = 400, description = "Missing, unknown, or expired token", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn magic_login(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<MagicLoginRequest>>,
) -> impl IntoResponse {
    let request: MagicLoginRequest = match payload {
        Some(Json(payload)) => payload,
        None => return error_json(StatusCode::BAD_REQUEST, "Missing payload"),
    };
    let token = request.token.trim();
    if token.is_empty() {
        return error_json(StatusCode::BAD_REQUEST, "Missing token");
    }

    let profile = match consume_magic_token(&pool, &hash_token(token)).await {
        Ok(Some(profile)) => profile,
        Ok(None) => return error_json(StatusCode::BAD_REQUEST, "Invalid or expired token"),
        Err(err) => {
            error!("Magic login error: {err}");
            return error_json(StatusCode::INTERNAL_SERVER_ERROR, "Server error");
        }
    };

    let pair = match auth_state.issue_pair(profile.user_id, &profile.email, profile.role) {
        Ok(pair) => pair,
        Err(err) => {
            error!("Magic login error: {err}");
            return error_json(StatusCode::INTERNAL_SERVER_ERROR, "Server error");
        }
    };

    if let Err(err) = insert_refresh_token(
        &pool,
        profile.user_id,
        &hash_token(&pair.refresh_token),
        auth_state.config().refresh_token_ttl_seconds(),
    )
    .await
    {
        error!("Magic login error: {err}");
        return error_json(StatusCode::INTERNAL_SERVER_ERROR, "Server error");
    }

    let response = SessionResponse {
        success: true,
        user: profile.into(),
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        expires_in: auth_state.config().access_token_ttl_label().to_string(),
    };
    (StatusCode::OK, Json(response)).into_response()
}
