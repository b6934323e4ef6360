//! Secret hashing.
//!
//! License keys are looked up by a salted SHA-256 digest so the raw key
//! never lands in the database. Passwords get argon2id PHC strings; the
//! digest format is opaque to the rest of the crate.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use sha2::{Digest, Sha256};

use crate::error::{AppError, Result};

/// Hash a secret for database lookups (license keys).
/// Uses SHA-256 with application salt, returns lowercase hex string.
pub fn hash_secret(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"keygate-v1:");
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Hash a password into an argon2id PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against a stored digest. Malformed digests verify as
/// false rather than erroring; the caller cannot do anything better with
/// a corrupt hash than deny.
pub fn verify_password(password: &str, digest: &str) -> bool {
    PasswordHash::new(digest)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}
