// SPDX-License-Identifier: Apache-2.0

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use hope_core::{Error, Result};
use tokio::sync::OnceCell;

/// Argon2id with a fresh random salt. Runs on the blocking pool.
pub async fn hash_password(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| Error::store(format!("password hashing failed: {e}")))
    })
    .await
    .map_err(|e| Error::store(format!("hash task failed: {e}")))?
}

/// False for a wrong password and for an unparseable stored hash.
pub async fn verify_password(password: String, stored_hash: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || {
        let Ok(parsed) = PasswordHash::new(&stored_hash) else {
            tracing::warn!("stored password hash is not a PHC string");
            return false;
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
    .await
    .map_err(|e| Error::store(format!("verify task failed: {e}")))
}

async fn decoy_hash() -> Result<String> {
    static DECOY: OnceCell<String> = OnceCell::const_new();
    DECOY
        .get_or_try_init(|| hash_password("hope-decoy-credential".to_string()))
        .await
        .cloned()
}

/// Runs one verification against a throwaway hash so a login that never
/// reaches a real hash costs the same as a wrong password.
pub async fn verify_against_decoy(password: String) -> Result<()> {
    let decoy = decoy_hash().await?;
    verify_password(password, decoy).await.map(|_| ())
}
