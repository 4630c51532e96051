//! Public provider signup.
//!
//! Signup always produces an unverified `service_provider` account; asking
//! for `admin` is refused outright. The user row and its verification token
//! are created in one transaction, and the verification link goes out by
//! email.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

use crate::api::email::EmailMessage;
use crate::api::handlers::error_json;

use super::password::hash_password;
use super::state::AuthState;
use super::storage::{insert_user_and_verification, SignupOutcome};
use super::types::{ErrorResponse, Role, SignupRequest, SignupResponse, UserSummary};
use super::utils::{frontend_link, normalize_email, valid_email};

const MIN_PASSWORD_LENGTH: usize = 8;
const MIN_DISPLAY_NAME_LENGTH: usize = 2;

#[utoipa::path(
    post,
    path = "/v1/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created, email verification pending", body = SignupResponse),
        (status = 400, description = "Invalid signup payload", body = ErrorResponse),
        (status = 403, description = "Admin self-registration attempt", body = ErrorResponse),
        (status = 409, description = "Email already in use", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn signup(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<SignupRequest>>,
) -> impl IntoResponse {
    let request: SignupRequest = match payload {
        Some(Json(payload)) => payload,
        None => return error_json(StatusCode::BAD_REQUEST, "Missing payload"),
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return error_json(StatusCode::BAD_REQUEST, "Invalid email");
    }
    if request.password.len() < MIN_PASSWORD_LENGTH {
        return error_json(
            StatusCode::BAD_REQUEST,
            "Password must be at least 8 characters",
        );
    }
    let display_name = request.display_name.trim();
    if display_name.len() < MIN_DISPLAY_NAME_LENGTH {
        return error_json(
            StatusCode::BAD_REQUEST,
            "Display name must be at least 2 characters",
        );
    }

    // Block admin creation via the public path; everything else becomes a
    // provider regardless of what the client asked for.
    if request.role.as_deref() == Some(Role::Admin.as_str()) {
        return error_json(StatusCode::FORBIDDEN, "Cannot self-register as admin");
    }
    let role = Role::ServiceProvider;

    let password_hash =
        match hash_password(request.password, auth_state.config().bcrypt_cost()).await {
            Ok(hash) => hash,
            Err(err) => {
                error!("Signup error: {err}");
                return error_json(StatusCode::INTERNAL_SERVER_ERROR, "Server error");
            }
        };

    let outcome = insert_user_and_verification(
        &pool,
        &email,
        &password_hash,
        display_name,
        request.phone.as_deref(),
        role,
        auth_state.config().verification_token_ttl_seconds(),
    )
    .await;

    let (user_id, verification_token) = match outcome {
        Ok(SignupOutcome::Created {
            user_id,
            verification_token,
        }) => (user_id, verification_token),
        Ok(SignupOutcome::Conflict) => {
            return error_json(StatusCode::CONFLICT, "Email already in use")
        }
        Err(err) => {
            error!("Signup error: {err}");
            return error_json(StatusCode::INTERNAL_SERVER_ERROR, "Server error");
        }
    };

    let verify_url = frontend_link(
        auth_state.config().frontend_base_url(),
        "auth/verify-email",
        &verification_token,
    );
    if let Err(err) = auth_state
        .email()
        .send(&EmailMessage::verification(&email, &verify_url))
    {
        error!("Failed to send verification email: {err}");
        return error_json(StatusCode::INTERNAL_SERVER_ERROR, "Server error");
    }

    let response = SignupResponse {
        success: true,
        message: "Account created successfully. Please check your email to verify your account."
            .to_string(),
        user: UserSummary {
            id: user_id.to_string(),
            email,
            display_name: display_name.to_string(),
            phone: request.phone,
            role,
            email_verified: false,
            created_at: None,
            updated_at: None,
        },
        verification_token: auth_state
            .config()
            .expose_tokens()
            .then_some(verification_token),
    };

    (StatusCode::CREATED, Json(response)).into_response()
}
