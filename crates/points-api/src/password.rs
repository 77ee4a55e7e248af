use anyhow::{Result, anyhow};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use rand_core::OsRng;
use sha2::{Digest, Sha256};
use tracing::warn;

/// Hash a password with Argon2id into a PHC string.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("Password hashing failed: {}", e))?
        .to_string();
    Ok(hash)
}

/// Hex-encoded SHA-256 digest, the format of admin rows created before
/// Argon2 hashes were introduced.
pub fn legacy_hash(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// Check `password` against a stored hash in either format.
pub fn verify_password(stored: &str, password: &str) -> bool {
    if stored.starts_with("$argon2") {
        match PasswordHash::new(stored) {
            Ok(parsed) => Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                warn!("Unparseable Argon2 hash in adminuser: {}", e);
                false
            }
        }
    } else {
        legacy_hash(password).eq_ignore_ascii_case(stored.trim())
    }
}
