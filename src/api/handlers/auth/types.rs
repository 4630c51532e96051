//! Request/response types for auth endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Account roles. The set is closed; unknown values in storage are a data
/// corruption error, not a variant.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    ServiceProvider,
    Customer,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::ServiceProvider => "service_provider",
            Self::Customer => "customer",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Self::Admin),
            "service_provider" => Some(Self::ServiceProvider),
            "customer" => Some(Self::Customer),
            _ => None,
        }
    }
}

/// Error body shared by every failing endpoint.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
}

/// User fields safe to return to clients. Password hashes and token columns
/// never leave the storage layer.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UserSummary {
    pub id: String,
    pub email: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub role: Role,
    pub email_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    /// Accepted for compatibility with older clients; anything other than
    /// `admin` is ignored and the account becomes a `service_provider`.
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SignupResponse {
    pub success: bool,
    pub message: String,
    pub user: UserSummary,
    #[serde(rename = "verificationToken", skip_serializing_if = "Option::is_none")]
    pub verification_token: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SessionResponse {
    pub success: bool,
    pub user: UserSummary,
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
    #[serde(rename = "expiresIn")]
    pub expires_in: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RefreshRequest {
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct TokenPairResponse {
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
    #[serde(rename = "expiresIn")]
    pub expires_in: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UpdatePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ForgotPasswordResponse {
    pub success: bool,
    pub message: String,
    #[serde(rename = "resetToken", skip_serializing_if = "Option::is_none")]
    pub reset_token: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ValidateResetTokenQuery {
    pub token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ValidateResetTokenResponse {
    pub valid: bool,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ResetPasswordRequest {
    pub token: String,
    #[serde(rename = "newPassword")]
    pub new_password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct VerifyEmailRequest {
    pub token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MagicLinkRequest {
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MagicLinkResponse {
    pub success: bool,
    pub message: String,
    #[serde(rename = "magicToken", skip_serializing_if = "Option::is_none")]
    pub magic_token: Option<String>,
    #[serde(rename = "magicUrl", skip_serializing_if = "Option::is_none")]
    pub magic_url: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MagicTokenResponse {
    pub success: bool,
    pub message: String,
    pub token: String,
    #[serde(rename = "expiresIn")]
    pub expires_in: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MagicLoginRequest {
    pub token: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};

    #[test]
    fn role_round_trips_snake_case() -> Result<()> {
        let value = serde_json::to_value(Role::ServiceProvider)?;
        assert_eq!(value, serde_json::json!("service_provider"));
        let decoded: Role = serde_json::from_value(value)?;
        assert_eq!(decoded, Role::ServiceProvider);
        Ok(())
    }

    #[test]
    fn role_parse_matches_as_str() {
        for role in [Role::Admin, Role::ServiceProvider, Role::Customer] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("superuser"), None);
    }

    #[test]
    fn signup_request_defaults_optional_fields() -> Result<()> {
        let decoded: SignupRequest = serde_json::from_value(serde_json::json!({
            "email": "a@b.com",
            "password": "longenough",
            "display_name": "A",
        }))?;
        assert_eq!(decoded.phone, None);
        assert_eq!(decoded.role, None);
        Ok(())
    }

    #[test]
    fn session_response_uses_camel_case_token_fields() -> Result<()> {
        let response = SessionResponse {
            success: true,
            user: UserSummary {
                id: "id".to_string(),
                email: "a@b.com".to_string(),
                display_name: "A".to_string(),
                phone: None,
                role: Role::ServiceProvider,
                email_verified: true,
                created_at: None,
                updated_at: None,
            },
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_in: "15m".to_string(),
        };
        let value = serde_json::to_value(&response)?;
        let access = value
            .get("accessToken")
            .and_then(serde_json::Value::as_str)
            .context("missing accessToken")?;
        assert_eq!(access, "access");
        assert!(value.get("refreshToken").is_some());
        assert_eq!(
            value.get("expiresIn").and_then(serde_json::Value::as_str),
            Some("15m")
        );
        // Sanitized summary omits absent optional fields entirely.
        assert!(value.get("user").and_then(|u| u.get("phone")).is_none());
        Ok(())
    }

    #[test]
    fn refresh_request_accepts_camel_case() -> Result<()> {
        let decoded: RefreshRequest =
            serde_json::from_value(serde_json::json!({"refreshToken": "tok"}))?;
        assert_eq!(decoded.refresh_token, "tok");
        Ok(())
    }

    #[test]
    fn reset_password_request_accepts_camel_case() -> Result<()> {
        let decoded: ResetPasswordRequest =
            serde_json::from_value(serde_json::json!({"token": "t", "newPassword": "longenough"}))?;
        assert_eq!(decoded.new_password, "longenough");
        Ok(())
    }

    #[test]
    fn forgot_password_response_hides_token_when_absent() -> Result<()> {
        let response = ForgotPasswordResponse {
            success: true,
            message: "Reset link has been sent to your email".to_string(),
            reset_token: None,
        };
        let value = serde_json::to_value(&response)?;
        assert!(value.get("resetToken").is_none());
        Ok(())
    }
}
