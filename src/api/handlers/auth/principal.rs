//! Authenticated principal extraction and the role gate.
//!
//! Flow overview: pull the bearer token from the Authorization header, verify
//! it, and hand downstream handlers a normalized principal. Ownership checks
//! (resource owner vs. principal) stay in the handlers that own the resource;
//! the gate only compares roles.

use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use uuid::Uuid;

use crate::api::handlers::error_json;

use super::state::AuthState;
use super::token::Claims;
use super::types::Role;
use super::utils::extract_bearer_token;

/// Identity context derived from a verified bearer token.
#[derive(Clone, Debug)]
pub struct Principal {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
}

impl From<Claims> for Principal {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            role: claims.role,
        }
    }
}

/// Resolve the bearer token into a principal, or reject with 401.
///
/// Expired and malformed tokens get the same response on purpose.
pub fn require_auth(headers: &HeaderMap, state: &AuthState) -> Result<Principal, Response> {
    let Some(token) = extract_bearer_token(headers) else {
        return Err(error_json(
            StatusCode::UNAUTHORIZED,
            "Missing authorization header",
        ));
    };

    state
        .keys()
        .verify(&token)
        .map(Principal::from)
        .map_err(|_| error_json(StatusCode::UNAUTHORIZED, "Invalid or expired token"))
}

/// Like [`require_auth`] but anonymous callers pass through. Endpoints that
/// only personalize output for signed-in users use this mode.
#[must_use]
pub fn optional_auth(headers: &HeaderMap, state: &AuthState) -> Option<Principal> {
    let token = extract_bearer_token(headers)?;
    state.keys().verify(&token).map(Principal::from).ok()
}

/// Reject with 403 unless the principal's role is in `allowed`.
pub fn require_role(principal: &Principal, allowed: &[Role]) -> Result<(), Response> {
    if allowed.contains(&principal.role) {
        Ok(())
    } else {
        Err(error_json(
            StatusCode::FORBIDDEN,
            "Forbidden - insufficient role",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::email::LogEmailSender;
    use crate::api::handlers::auth::AuthConfig;
    use axum::http::{header::AUTHORIZATION, HeaderValue};
    use secrecy::SecretString;
    use std::sync::Arc;

    fn state() -> AuthState {
        let config = AuthConfig::new(
            "https://sokoni.dev".to_string(),
            SecretString::from("unit-test-secret".to_string()),
        );
        AuthState::new(config, Arc::new(LogEmailSender))
    }

    fn bearer_headers(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    #[test]
    fn require_auth_resolves_valid_bearer() {
        let state = state();
        let subject = Uuid::new_v4();
        let pair = state
            .issue_pair(subject, "alice@example.com", Role::ServiceProvider)
            .unwrap();

        let principal = require_auth(&bearer_headers(&pair.access_token), &state).unwrap();
        assert_eq!(principal.user_id, subject);
        assert_eq!(principal.email, "alice@example.com");
        assert_eq!(principal.role, Role::ServiceProvider);
    }

    #[test]
    fn require_auth_rejects_missing_header() {
        let response = require_auth(&HeaderMap::new(), &state()).unwrap_err();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn require_auth_rejects_garbage_token() {
        let response = require_auth(&bearer_headers("not-a-jwt"), &state()).unwrap_err();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn optional_auth_passes_anonymous_callers() {
        let state = state();
        assert!(optional_auth(&HeaderMap::new(), &state).is_none());
        assert!(optional_auth(&bearer_headers("not-a-jwt"), &state).is_none());

        let pair = state
            .issue_pair(Uuid::new_v4(), "alice@example.com", Role::Customer)
            .unwrap();
        assert!(optional_auth(&bearer_headers(&pair.access_token), &state).is_some());
    }

    #[test]
    fn require_role_gates_by_membership() {
        let principal = Principal {
            user_id: Uuid::new_v4(),
            email: "alice@example.com".to_string(),
            role: Role::ServiceProvider,
        };

        assert!(require_role(&principal, &[Role::Admin, Role::ServiceProvider]).is_ok());

        let response = require_role(&principal, &[Role::Admin]).unwrap_err();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
