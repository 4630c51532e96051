//! Password hashing and verification.
//!
//! bcrypt at a fixed work factor. Hashing runs on the blocking pool so a
//! burst of signups cannot stall the async workers.

use anyhow::{Context, Result};

/// Hash a plaintext password. Failure here is fatal to the calling request.
pub(super) async fn hash_password(plaintext: String, cost: u32) -> Result<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(plaintext, cost))
        .await
        .context("password hashing task failed")?
        .context("failed to hash password")
}

/// Check a plaintext password against a stored digest. A wrong password is
/// `Ok(false)`, not an error.
pub(super) async fn verify_password(plaintext: String, digest: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || bcrypt::verify(plaintext, &digest))
        .await
        .context("password verification task failed")?
        .context("failed to verify password")
}

#[cfg(test)]
mod tests {
    use super::*;

    // Mirror of bcrypt's (private) MIN_COST; keeps the tests fast. Production
    // uses the configured cost from AuthConfig.
    const MIN_COST: u32 = 4;

    #[tokio::test]
    async fn hash_then_verify_round_trip() {
        let digest = hash_password("correct horse".to_string(), MIN_COST)
            .await
            .unwrap();
        assert!(digest.starts_with("$2"));
        assert!(
            verify_password("correct horse".to_string(), digest.clone())
                .await
                .unwrap()
        );
        assert!(!verify_password("wrong horse".to_string(), digest)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn hashes_are_salted() {
        let first = hash_password("same input".to_string(), MIN_COST)
            .await
            .unwrap();
        let second = hash_password("same input".to_string(), MIN_COST)
            .await
            .unwrap();
        assert_ne!(first, second);
    }
}
