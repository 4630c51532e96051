//! # Sokoni (Marketplace Identity Authority)
//!
//! `sokoni` is the authentication and authorization service of the Sokoni
//! services marketplace. It owns credential handling, the access/refresh
//! token lifecycle, refresh-token rotation, and role-based route gating.
//!
//! ## Accounts and Roles
//!
//! Accounts carry one of three roles: `admin`, `service_provider`, or
//! `customer`. Public signup always produces a `service_provider`; admins are
//! seeded administratively and can never be created through the public path.
//! New accounts start unverified and cannot sign in until the email
//! verification link is redeemed.
//!
//! ## Tokens
//!
//! - **Access tokens** are short-lived HS256 JWTs; validity is signature +
//!   expiry only, with no server-side ledger.
//! - **Refresh tokens** are long-lived JWTs whose SHA-256 hash is recorded in
//!   a revocation ledger. Each refresh rotates the chain: the presented token
//!   is revoked with a single conditional update and a new pair is issued, so
//!   a replayed token loses the race exactly once.
//! - **One-time tokens** (email verification, password reset, magic login)
//!   are opaque random values stored hashed with an absolute expiry and
//!   deleted on redemption.
//!
//! Signout revokes the refresh token only; outstanding access tokens remain
//! valid until their natural expiry.

pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
