//! Auth handlers and supporting modules.
//!
//! This module owns credential handling, the access/refresh token lifecycle,
//! and the single-use token flows (email verification, password reset, magic
//! login).
//!
//! ## Refresh rotation
//!
//! Refresh tokens are single-use. Redeeming one revokes its ledger row with a
//! conditional update and issues a successor, so a replayed token fails with
//! 401 after its first legitimate use, even when the replay races the
//! original request.
//!
//! ## One-time tokens
//!
//! Verification, reset, and magic-login tokens are purpose-tagged rows keyed
//! by token hash; a reset token can never be redeemed as a magic login.
//! Redemption deletes the row.

pub(crate) mod magic;
pub mod principal;
pub(crate) mod reset;
pub(crate) mod session;
pub(crate) mod signup;
pub(crate) mod types;
pub(crate) mod verification;

mod password;
mod state;
pub(crate) mod storage;
mod token;
mod utils;

pub use state::{AuthConfig, AuthState};
pub use token::{Claims, TokenError, TokenKeys, TokenPair};
