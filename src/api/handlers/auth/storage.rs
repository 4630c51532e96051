//! Database helpers for accounts, the refresh-token ledger, and one-time
//! tokens.
//!
//! Raw credentials never reach this layer: callers pass SHA-256 hashes for
//! refresh and one-time tokens, and bcrypt digests for passwords.

use anyhow::{anyhow, Context, Result};
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::types::{Role, UserSummary};
use super::utils::{generate_one_time_token, hash_token, is_unique_violation};

/// Outcome when attempting to create a new user + verification token.
#[derive(Debug)]
pub(super) enum SignupOutcome {
    Created {
        user_id: Uuid,
        verification_token: String,
    },
    Conflict,
}

/// Single-use token purposes. Purpose is part of the lookup key, so a reset
/// token can never be redeemed as a magic-login token or vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum TokenPurpose {
    EmailVerify,
    PasswordReset,
    MagicLogin,
}

impl TokenPurpose {
    pub(super) fn as_str(self) -> &'static str {
        match self {
            Self::EmailVerify => "email_verify",
            Self::PasswordReset => "password_reset",
            Self::MagicLogin => "magic_login",
        }
    }
}

/// Everything signin needs in one lookup.
pub(super) struct AuthUserRecord {
    pub(super) profile: ProfileRecord,
    pub(super) password_hash: Option<String>,
}

/// User fields exposed through responses.
pub(crate) struct ProfileRecord {
    pub(super) user_id: Uuid,
    pub(super) email: String,
    pub(super) display_name: String,
    pub(super) phone: Option<String>,
    pub(super) role: Role,
    pub(super) email_verified: bool,
    pub(super) created_at: String,
    pub(super) updated_at: String,
}

impl From<ProfileRecord> for UserSummary {
    fn from(profile: ProfileRecord) -> Self {
        Self {
            id: profile.user_id.to_string(),
            email: profile.email,
            display_name: profile.display_name,
            phone: profile.phone,
            role: profile.role,
            email_verified: profile.email_verified,
            created_at: Some(profile.created_at),
            updated_at: Some(profile.updated_at),
        }
    }
}

fn row_role(row: &sqlx::postgres::PgRow) -> Result<Role> {
    let role: String = row.get("role");
    Role::parse(&role).ok_or_else(|| anyhow!("unknown role in database: {role}"))
}

fn row_profile(row: &sqlx::postgres::PgRow) -> Result<ProfileRecord> {
    Ok(ProfileRecord {
        user_id: row.get("id"),
        email: row.get("email"),
        display_name: row.get("display_name"),
        phone: row.get("phone"),
        role: row_role(row)?,
        email_verified: row.get("email_verified"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

const PROFILE_COLUMNS: &str = r"
    id, email, display_name, phone, role, email_verified,
    created_at::text AS created_at, updated_at::text AS updated_at
";

/// Create the user row and its email verification token in one transaction.
pub(super) async fn insert_user_and_verification(
    pool: &PgPool,
    email: &str,
    password_hash: &str,
    display_name: &str,
    phone: Option<&str>,
    role: Role,
    verification_ttl_seconds: i64,
) -> Result<SignupOutcome> {
    let mut tx = pool.begin().await.context("begin signup transaction")?;

    let query = r"
        INSERT INTO users
            (email, password_hash, display_name, phone, role)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .bind(password_hash)
        .bind(display_name)
        .bind(phone)
        .bind(role.as_str())
        .fetch_one(&mut *tx)
        .instrument(span)
        .await;

    let user_id: Uuid = match row {
        Ok(row) => row.get("id"),
        Err(err) => {
            if is_unique_violation(&err) {
                let _ = tx.rollback().await;
                return Ok(SignupOutcome::Conflict);
            }
            return Err(err).context("failed to insert user");
        }
    };

    let verification_token = upsert_one_time_token(
        &mut *tx,
        user_id,
        TokenPurpose::EmailVerify,
        verification_ttl_seconds,
    )
    .await?;

    tx.commit().await.context("commit signup transaction")?;

    Ok(SignupOutcome::Created {
        user_id,
        verification_token,
    })
}

/// Generate a one-time token for `purpose`, store its hash, and return the
/// raw value. A previous token for the same (user, purpose) is replaced.
async fn upsert_one_time_token(
    executor: impl sqlx::PgExecutor<'_>,
    user_id: Uuid,
    purpose: TokenPurpose,
    ttl_seconds: i64,
) -> Result<String> {
    let token = generate_one_time_token()?;
    let token_hash = hash_token(&token);

    let query = r"
        INSERT INTO one_time_tokens (user_id, purpose, token_hash, expires_at)
        VALUES ($1, $2, $3, NOW() + ($4 * INTERVAL '1 second'))
        ON CONFLICT (user_id, purpose)
        DO UPDATE SET
            token_hash = EXCLUDED.token_hash,
            expires_at = EXCLUDED.expires_at,
            created_at = NOW()
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .bind(purpose.as_str())
        .bind(token_hash)
        .bind(ttl_seconds)
        .execute(executor)
        .instrument(span)
        .await
        .context("failed to store one-time token")?;

    Ok(token)
}

/// Pool-level wrapper for flows that only store a token (reset, magic login).
pub(super) async fn store_one_time_token(
    pool: &PgPool,
    user_id: Uuid,
    purpose: TokenPurpose,
    ttl_seconds: i64,
) -> Result<String> {
    upsert_one_time_token(pool, user_id, purpose, ttl_seconds).await
}

/// Look up a user by normalized email, including the password digest.
pub(super) async fn find_auth_user(pool: &PgPool, email: &str) -> Result<Option<AuthUserRecord>> {
    let query = format!(
        r"SELECT {PROFILE_COLUMNS}, password_hash
          FROM users WHERE email = $1 LIMIT 1"
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by email")?;

    row.map(|row| {
        Ok(AuthUserRecord {
            password_hash: row.get("password_hash"),
            profile: row_profile(&row)?,
        })
    })
    .transpose()
}

pub(crate) async fn fetch_profile(pool: &PgPool, user_id: Uuid) -> Result<Option<ProfileRecord>> {
    let query = format!(
        r"SELECT {PROFILE_COLUMNS}
          FROM users WHERE id = $1 LIMIT 1"
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(user_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to fetch profile")?;

    row.map(|row| row_profile(&row)).transpose()
}

pub(super) async fn lookup_user_id(pool: &PgPool, email: &str) -> Result<Option<Uuid>> {
    let query = "SELECT id FROM users WHERE email = $1 LIMIT 1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user id")?;
    Ok(row.map(|row| row.get("id")))
}

/// The stored digest for a user, or `None` when the user does not exist.
/// The inner `Option` is the nullable column (passwordless accounts).
pub(super) async fn fetch_password_hash(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Option<Option<String>>> {
    let query = "SELECT password_hash FROM users WHERE id = $1 LIMIT 1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to fetch password hash")?;
    Ok(row.map(|row| row.get("password_hash")))
}

pub(super) async fn update_password(
    pool: &PgPool,
    user_id: Uuid,
    password_hash: &str,
) -> Result<()> {
    let query = r"
        UPDATE users
        SET password_hash = $2, updated_at = NOW()
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .bind(password_hash)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to update password")?;
    Ok(())
}

/// Record a freshly issued refresh token as the active link of its chain.
pub(super) async fn insert_refresh_token(
    pool: &PgPool,
    user_id: Uuid,
    token_hash: &[u8],
    ttl_seconds: i64,
) -> Result<()> {
    let query = r"
        INSERT INTO refresh_tokens (user_id, token_hash, expires_at)
        VALUES ($1, $2, NOW() + ($3 * INTERVAL '1 second'))
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .bind(token_hash)
        .bind(ttl_seconds)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to insert refresh token")?;
    Ok(())
}

/// Revoke the presented refresh token if it is still active.
///
/// This is the single compare-and-swap the rotation protocol hinges on: the
/// conditional update flips `revoked` only when the row is unrevoked and
/// unexpired, so concurrent refresh attempts with the same token produce
/// exactly one winner.
pub(super) async fn rotate_refresh_token(
    pool: &PgPool,
    user_id: Uuid,
    token_hash: &[u8],
) -> Result<bool> {
    let query = r"
        UPDATE refresh_tokens
        SET revoked = TRUE
        WHERE user_id = $1
          AND token_hash = $2
          AND revoked = FALSE
          AND expires_at > NOW()
        RETURNING id
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .bind(token_hash)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to rotate refresh token")?;
    Ok(row.is_some())
}

/// Signout: revoke unconditionally. Unknown and already-revoked tokens are
/// fine; the operation is idempotent.
pub(super) async fn revoke_refresh_token(pool: &PgPool, token_hash: &[u8]) -> Result<()> {
    let query = "UPDATE refresh_tokens SET revoked = TRUE WHERE token_hash = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(token_hash)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to revoke refresh token")?;
    Ok(())
}

/// Redeem a one-time token: delete the matching unexpired row and return its
/// owner. The delete is what makes the token single-use.
async fn consume_one_time_token(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    purpose: TokenPurpose,
    token_hash: &[u8],
) -> Result<Option<Uuid>> {
    let query = r"
        DELETE FROM one_time_tokens
        WHERE token_hash = $1
          AND purpose = $2
          AND expires_at > NOW()
        RETURNING user_id
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(token_hash)
        .bind(purpose.as_str())
        .fetch_optional(&mut **tx)
        .instrument(span)
        .await
        .context("failed to consume one-time token")?;
    Ok(row.map(|row| row.get("user_id")))
}

/// Redeem a verification token and mark the account verified, atomically.
pub(super) async fn consume_verification_token(pool: &PgPool, token_hash: &[u8]) -> Result<bool> {
    let mut tx = pool
        .begin()
        .await
        .context("begin verify-email transaction")?;

    let Some(user_id) = consume_one_time_token(&mut tx, TokenPurpose::EmailVerify, token_hash)
        .await?
    else {
        let _ = tx.rollback().await;
        return Ok(false);
    };

    let query = r"
        UPDATE users
        SET email_verified = TRUE, updated_at = NOW()
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to mark email verified")?;

    tx.commit().await.context("commit verify-email transaction")?;
    Ok(true)
}

/// Non-consuming check used by the frontend before showing the reset form.
pub(super) async fn reset_token_valid(pool: &PgPool, token_hash: &[u8]) -> Result<bool> {
    let query = r"
        SELECT 1 AS present
        FROM one_time_tokens
        WHERE token_hash = $1
          AND purpose = $2
          AND expires_at > NOW()
        LIMIT 1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(token_hash)
        .bind(TokenPurpose::PasswordReset.as_str())
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to check reset token")?;
    Ok(row.is_some())
}

/// Redeem a reset token and install the new password digest, atomically.
pub(super) async fn consume_reset_token(
    pool: &PgPool,
    token_hash: &[u8],
    new_password_hash: &str,
) -> Result<bool> {
    let mut tx = pool
        .begin()
        .await
        .context("begin reset-password transaction")?;

    let Some(user_id) = consume_one_time_token(&mut tx, TokenPurpose::PasswordReset, token_hash)
        .await?
    else {
        let _ = tx.rollback().await;
        return Ok(false);
    };

    let query = r"
        UPDATE users
        SET password_hash = $2, updated_at = NOW()
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .bind(new_password_hash)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to set new password")?;

    tx.commit()
        .await
        .context("commit reset-password transaction")?;
    Ok(true)
}

/// Redeem a magic-login token, returning the owning profile for session
/// issuance.
pub(super) async fn consume_magic_token(
    pool: &PgPool,
    token_hash: &[u8],
) -> Result<Option<ProfileRecord>> {
    let mut tx = pool
        .begin()
        .await
        .context("begin magic-login transaction")?;

    let Some(user_id) = consume_one_time_token(&mut tx, TokenPurpose::MagicLogin, token_hash)
        .await?
    else {
        let _ = tx.rollback().await;
        return Ok(None);
    };

    let query = format!(
        r"SELECT {PROFILE_COLUMNS}
          FROM users WHERE id = $1 LIMIT 1"
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .instrument(span)
        .await
        .context("failed to load user for magic login")?;

    tx.commit().await.context("commit magic-login transaction")?;

    row.map(|row| row_profile(&row)).transpose()
}
