//! Authenticated self-service endpoints.
//!
//! Flow overview:
//! 1) Resolve the bearer token into a principal.
//! 2) Load the caller's profile from the database.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

use super::auth::storage::fetch_profile;
use super::auth::types::UserSummary;
use super::auth::{principal::require_auth, AuthState};
use super::error_json;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MeResponse {
    pub user: UserSummary,
}

#[utoipa::path(
    get,
    path = "/v1/me",
    responses(
        (status = 200, description = "The authenticated user's profile", body = MeResponse),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 404, description = "Account no longer exists")
    ),
    tag = "me"
)]
pub async fn get_me(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &auth_state) {
        Ok(principal) => principal,
        Err(response) => return response,
    };

    match fetch_profile(&pool, principal.user_id).await {
        Ok(Some(profile)) => (
            StatusCode::OK,
            Json(MeResponse {
                user: profile.into(),
            }),
        )
            .into_response(),
        Ok(None) => error_json(StatusCode::NOT_FOUND, "User not found"),
        Err(err) => {
            error!("Failed to fetch profile: {err}");
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "Server error")
        }
    }
}
