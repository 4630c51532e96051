//! Auth configuration and shared state.
//!
//! `AuthConfig` is built once at startup from CLI/env input and injected into
//! handlers through `AuthState`; business logic never reads the process
//! environment.

use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;

use crate::api::email::EmailSender;

use super::token::{parse_duration, TokenKeys, TokenPair};
use super::types::Role;

const DEFAULT_ACCESS_TOKEN_TTL: &str = "15m";
const DEFAULT_REFRESH_TOKEN_TTL: &str = "7d";
const DEFAULT_VERIFICATION_TOKEN_TTL_SECONDS: i64 = 24 * 60 * 60;
const DEFAULT_RESET_TOKEN_TTL_SECONDS: i64 = 60 * 60;
const DEFAULT_MAGIC_TOKEN_TTL_SECONDS: i64 = 15 * 60;
const DEFAULT_BCRYPT_COST: u32 = 12;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    frontend_base_url: String,
    signing_secret: SecretString,
    access_token_ttl: String,
    refresh_token_ttl: String,
    verification_token_ttl_seconds: i64,
    reset_token_ttl_seconds: i64,
    magic_token_ttl_seconds: i64,
    bcrypt_cost: u32,
    production: bool,
}

impl AuthConfig {
    #[must_use]
    pub fn new(frontend_base_url: String, signing_secret: SecretString) -> Self {
        Self {
            frontend_base_url,
            signing_secret,
            access_token_ttl: DEFAULT_ACCESS_TOKEN_TTL.to_string(),
            refresh_token_ttl: DEFAULT_REFRESH_TOKEN_TTL.to_string(),
            verification_token_ttl_seconds: DEFAULT_VERIFICATION_TOKEN_TTL_SECONDS,
            reset_token_ttl_seconds: DEFAULT_RESET_TOKEN_TTL_SECONDS,
            magic_token_ttl_seconds: DEFAULT_MAGIC_TOKEN_TTL_SECONDS,
            bcrypt_cost: DEFAULT_BCRYPT_COST,
            production: false,
        }
    }

    #[must_use]
    pub fn with_access_token_ttl(mut self, ttl: String) -> Self {
        self.access_token_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_refresh_token_ttl(mut self, ttl: String) -> Self {
        self.refresh_token_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_verification_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.verification_token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_reset_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.reset_token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_magic_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.magic_token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    #[must_use]
    pub fn with_production(mut self, production: bool) -> Self {
        self.production = production;
        self
    }

    pub(crate) fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    pub(crate) fn signing_secret(&self) -> &SecretString {
        &self.signing_secret
    }

    /// The configured access lifetime verbatim; clients receive this string
    /// in `expiresIn`.
    pub(super) fn access_token_ttl_label(&self) -> &str {
        &self.access_token_ttl
    }

    pub(super) fn access_token_ttl(&self) -> Duration {
        parse_duration(&self.access_token_ttl)
    }

    pub(super) fn refresh_token_ttl(&self) -> Duration {
        parse_duration(&self.refresh_token_ttl)
    }

    /// Refresh lifetime in whole seconds, for persisting `expires_at`.
    pub(super) fn refresh_token_ttl_seconds(&self) -> i64 {
        i64::try_from(self.refresh_token_ttl().as_secs()).unwrap_or(i64::MAX)
    }

    pub(super) fn verification_token_ttl_seconds(&self) -> i64 {
        self.verification_token_ttl_seconds
    }

    pub(super) fn reset_token_ttl_seconds(&self) -> i64 {
        self.reset_token_ttl_seconds
    }

    pub(super) fn magic_token_ttl_seconds(&self) -> i64 {
        self.magic_token_ttl_seconds
    }

    pub(super) fn bcrypt_cost(&self) -> u32 {
        self.bcrypt_cost
    }

    /// Outside production, one-time tokens are echoed in responses so the
    /// flows can be exercised without an inbox.
    pub(super) fn expose_tokens(&self) -> bool {
        !self.production
    }
}

pub struct AuthState {
    config: AuthConfig,
    keys: TokenKeys,
    email: Arc<dyn EmailSender>,
}

impl AuthState {
    #[must_use]
    pub fn new(config: AuthConfig, email: Arc<dyn EmailSender>) -> Self {
        let keys = TokenKeys::new(config.signing_secret());
        Self {
            config,
            keys,
            email,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn keys(&self) -> &TokenKeys {
        &self.keys
    }

    pub(super) fn email(&self) -> &dyn EmailSender {
        self.email.as_ref()
    }

    /// Issue a fresh access/refresh pair for `subject` using the configured
    /// lifetimes.
    pub(super) fn issue_pair(
        &self,
        subject: uuid::Uuid,
        email: &str,
        role: Role,
    ) -> anyhow::Result<TokenPair> {
        let access_token =
            self.keys
                .issue(subject, email, role, self.config.access_token_ttl())?;
        let refresh_token =
            self.keys
                .issue(subject, email, role, self.config.refresh_token_ttl())?;
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::email::LogEmailSender;

    fn secret() -> SecretString {
        SecretString::from("unit-test-secret".to_string())
    }

    #[test]
    fn auth_config_defaults_and_overrides() {
        let config = AuthConfig::new("https://sokoni.dev".to_string(), secret());

        assert_eq!(config.frontend_base_url(), "https://sokoni.dev");
        assert_eq!(config.access_token_ttl_label(), "15m");
        assert_eq!(config.access_token_ttl(), Duration::from_secs(15 * 60));
        assert_eq!(
            config.refresh_token_ttl(),
            Duration::from_secs(7 * 24 * 60 * 60)
        );
        assert_eq!(config.refresh_token_ttl_seconds(), 7 * 24 * 60 * 60);
        assert_eq!(
            config.verification_token_ttl_seconds(),
            DEFAULT_VERIFICATION_TOKEN_TTL_SECONDS
        );
        assert_eq!(
            config.reset_token_ttl_seconds(),
            DEFAULT_RESET_TOKEN_TTL_SECONDS
        );
        assert_eq!(
            config.magic_token_ttl_seconds(),
            DEFAULT_MAGIC_TOKEN_TTL_SECONDS
        );
        assert_eq!(config.bcrypt_cost(), DEFAULT_BCRYPT_COST);
        assert!(config.expose_tokens());

        let config = config
            .with_access_token_ttl("5m".to_string())
            .with_refresh_token_ttl("30d".to_string())
            .with_verification_token_ttl_seconds(60)
            .with_reset_token_ttl_seconds(90)
            .with_magic_token_ttl_seconds(120)
            .with_bcrypt_cost(4)
            .with_production(true);

        assert_eq!(config.access_token_ttl_label(), "5m");
        assert_eq!(config.access_token_ttl(), Duration::from_secs(5 * 60));
        assert_eq!(config.refresh_token_ttl_seconds(), 30 * 24 * 60 * 60);
        assert_eq!(config.verification_token_ttl_seconds(), 60);
        assert_eq!(config.reset_token_ttl_seconds(), 90);
        assert_eq!(config.magic_token_ttl_seconds(), 120);
        assert_eq!(config.bcrypt_cost(), 4);
        assert!(!config.expose_tokens());
    }

    #[test]
    fn issue_pair_uses_configured_lifetimes() {
        let config = AuthConfig::new("https://sokoni.dev".to_string(), secret())
            .with_access_token_ttl("30s".to_string())
            .with_refresh_token_ttl("2h".to_string());
        let state = AuthState::new(config, Arc::new(LogEmailSender));

        let subject = uuid::Uuid::new_v4();
        let pair = state
            .issue_pair(subject, "alice@example.com", Role::ServiceProvider)
            .unwrap();

        let access = state.keys().verify(&pair.access_token).unwrap();
        let refresh = state.keys().verify(&pair.refresh_token).unwrap();
        assert_eq!(access.sub, subject);
        assert_eq!(access.exp - access.iat, 30);
        assert_eq!(refresh.exp - refresh.iat, 2 * 60 * 60);
    }
}
