//! Argon2id password hashing with a random per-password salt.
//! Hashing runs on the blocking pool.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::warn;

use crate::error::{AppError, AppResult};

fn hash_sync(plain: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!("argon2 hash: {}", e)))
}

/// A stored hash that cannot be parsed never matches.
fn verify_sync(plain: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!(error = %e, "stored password hash unreadable");
            false
        }
    }
}

pub async fn hash(plain: String) -> AppResult<String> {
    tokio::task::spawn_blocking(move || hash_sync(&plain))
        .await
        .map_err(anyhow::Error::from)?
}

pub async fn verify(plain: String, stored: String) -> AppResult<bool> {
    let ok = tokio::task::spawn_blocking(move || verify_sync(&plain, &stored))
        .await
        .map_err(anyhow::Error::from)?;
    Ok(ok)
}
