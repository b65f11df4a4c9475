//! Password and session-token hashing
//!
//! # Pure Functions
//!
//! No HTTP framework dependencies. The server wraps these with its session
//! middleware (and runs the password functions on the blocking pool); the
//! admin tool uses them directly.
//!
//! Passwords are stored as Argon2id PHC strings, which carry their own
//! parameters and salt. The salt is also kept in its own column. Session
//! tokens are random and only their SHA-256 digest is stored, so a
//! database dump never yields a usable token.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::{Error, Result};

/// Session token length in bytes
const TOKEN_BYTES: usize = 32;

/// Hash a password with a fresh random salt.
///
/// Returns `(phc_string, salt)`.
///
/// # Examples
///
/// ```
/// use resumo_common::auth::{hash_password, verify_password};
///
/// let (hash, _salt) = hash_password("correct horse").unwrap();
/// assert!(verify_password("correct horse", &hash));
/// assert!(!verify_password("wrong horse", &hash));
/// ```
pub fn hash_password(password: &str) -> Result<(String, String)> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| Error::Internal(format!("Password hashing failed: {}", e)))?;
    Ok((hash.to_string(), salt.as_str().to_string()))
}

/// Check a password against a stored PHC string.
///
/// An empty or unparsable stored hash never verifies.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Generate a new random session token (64 hex chars)
pub fn generate_session_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Digest stored in the sessions table for a token
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
