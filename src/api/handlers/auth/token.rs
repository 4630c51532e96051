//! Signed bearer tokens: issue, verify, and the duration-string parser that
//! drives their lifetimes.
//!
//! Access and refresh tokens are HS256 JWTs signed with the shared secret
//! from `AuthConfig`. Validity of an access token is entirely stateless;
//! the refresh ledger in storage only gates the refresh operation.

use anyhow::{Context, Result};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use super::types::Role;

/// Canonical identity claims. Normalization happens here, once: older tokens
/// carried the subject under `id`, `userId`, or `user_id`, and all of those
/// still verify; newly issued tokens always write `sub`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(alias = "id", alias = "userId", alias = "user_id")]
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Verification failure. The HTTP boundary reports both variants as one
/// generic 401 so callers cannot distinguish a forged token from a stale one.
#[derive(Debug, PartialEq, Eq)]
pub enum TokenError {
    Expired,
    Invalid,
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expired => write!(f, "token expired"),
            Self::Invalid => write!(f, "invalid token"),
        }
    }
}

impl std::error::Error for TokenError {}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => Self::Expired,
            _ => Self::Invalid,
        }
    }
}

/// A freshly issued access/refresh pair.
#[derive(Debug)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Signing and verification keys derived from the configured secret.
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenKeys {
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
        }
    }

    /// Sign claims for `subject` expiring `ttl` from now.
    pub fn issue(&self, subject: Uuid, email: &str, role: Role, ttl: Duration) -> Result<String> {
        let now = unix_now()?;
        let ttl = i64::try_from(ttl.as_secs()).context("token lifetime overflow")?;
        let claims = Claims {
            sub: subject,
            email: email.to_string(),
            role,
            iat: now,
            exp: now + ttl,
        };
        encode(&Header::default(), &claims, &self.encoding).context("failed to sign token")
    }

    /// Validate signature and expiry, returning normalized claims.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        // Zero leeway: a token is invalid the second its expiry passes.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(TokenError::from)
    }
}

fn unix_now() -> Result<i64> {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system clock is before the unix epoch")?;
    i64::try_from(elapsed.as_secs()).context("unix timestamp overflow")
}

/// Parse a duration string with ms/s/m/h/d suffixes ("15m", "7d").
///
/// Unsuffixed or unparseable values degrade to milliseconds, matching how
/// deployed configurations have historically been interpreted.
pub(crate) fn parse_duration(value: &str) -> Duration {
    let magnitude: u64 = value
        .chars()
        .filter(char::is_ascii_digit)
        .collect::<String>()
        .parse()
        .unwrap_or(0);

    let trimmed = value.trim();
    if trimmed.ends_with("ms") {
        Duration::from_millis(magnitude)
    } else if trimmed.ends_with('s') {
        Duration::from_secs(magnitude)
    } else if trimmed.ends_with('m') {
        Duration::from_secs(magnitude * 60)
    } else if trimmed.ends_with('h') {
        Duration::from_secs(magnitude * 60 * 60)
    } else if trimmed.ends_with('d') {
        Duration::from_secs(magnitude * 24 * 60 * 60)
    } else {
        Duration::from_millis(magnitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> TokenKeys {
        TokenKeys::new(&SecretString::from("unit-test-secret".to_string()))
    }

    #[test]
    fn issue_then_verify_round_trip() {
        let keys = keys();
        let subject = Uuid::new_v4();
        let token = keys
            .issue(
                subject,
                "alice@example.com",
                Role::ServiceProvider,
                Duration::from_secs(60),
            )
            .unwrap();

        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.sub, subject);
        assert_eq!(claims.email, "alice@example.com");
        assert_eq!(claims.role, Role::ServiceProvider);
        assert_eq!(claims.exp - claims.iat, 60);
    }

    #[test]
    fn verify_rejects_expired_tokens() {
        let keys = keys();
        let now = unix_now().unwrap();
        let claims = Claims {
            sub: Uuid::new_v4(),
            email: "alice@example.com".to_string(),
            role: Role::Customer,
            iat: now - 120,
            exp: now - 60,
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).unwrap();
        assert_eq!(keys.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let keys = keys();
        let token = keys
            .issue(
                Uuid::new_v4(),
                "alice@example.com",
                Role::Admin,
                Duration::from_secs(60),
            )
            .unwrap();

        let other = TokenKeys::new(&SecretString::from("another-secret".to_string()));
        assert_eq!(other.verify(&token), Err(TokenError::Invalid));
    }

    #[test]
    fn verify_rejects_garbage() {
        assert_eq!(keys().verify("not-a-jwt"), Err(TokenError::Invalid));
    }

    #[test]
    fn verify_normalizes_legacy_subject_claims() {
        // Tokens minted by earlier releases used `id`/`userId` for the
        // subject; they must keep verifying to the same canonical claims.
        let keys = keys();
        let subject = Uuid::new_v4();
        let now = unix_now().unwrap();
        for key in ["id", "userId", "user_id"] {
            let legacy = serde_json::json!({
                key: subject,
                "email": "alice@example.com",
                "role": "admin",
                "iat": now,
                "exp": now + 60,
            });
            let token = encode(&Header::default(), &legacy, &keys.encoding).unwrap();
            let claims = keys.verify(&token).unwrap();
            assert_eq!(claims.sub, subject);
            assert_eq!(claims.role, Role::Admin);
        }
    }

    #[test]
    fn parse_duration_known_suffixes() {
        assert_eq!(parse_duration("500ms"), Duration::from_millis(500));
        assert_eq!(parse_duration("30s"), Duration::from_secs(30));
        assert_eq!(parse_duration("15m"), Duration::from_secs(15 * 60));
        assert_eq!(parse_duration("12h"), Duration::from_secs(12 * 60 * 60));
        assert_eq!(parse_duration("7d"), Duration::from_secs(7 * 24 * 60 * 60));
    }

    #[test]
    fn parse_duration_degrades_to_milliseconds() {
        assert_eq!(parse_duration("1500"), Duration::from_millis(1500));
        assert_eq!(parse_duration("garbage"), Duration::from_millis(0));
        assert_eq!(parse_duration("15 m"), Duration::from_secs(15 * 60));
    }
}
