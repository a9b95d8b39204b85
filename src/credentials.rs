//! Password hashing and auth token keys
//!
//! - Passwords: Argon2id, stored as PHC strings.
//! - Tokens: 40 hex chars from the OS RNG, handed out once; only the
//!   SHA-256 digest is persisted.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use sha2::{Digest, Sha256};

use crate::error::{Result, TodoError};

fn random_bytes<const N: usize>() -> Result<[u8; N]> {
    let mut bytes = [0u8; N];
    getrandom::getrandom(&mut bytes)
        .map_err(|e| TodoError::Io(std::io::Error::other(e.to_string())))?;
    Ok(bytes)
}

/// Generate a fresh 40-character hex token key.
pub fn generate_token_key() -> Result<String> {
    Ok(hex::encode(random_bytes::<20>()?))
}

/// Digest under which a token key is stored and looked up.
pub fn token_digest(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}

#[cfg(not(test))]
fn hasher() -> Argon2<'static> {
    Argon2::default()
}

// Verification reads the cost from the stored hash, so tests can hash cheaply.
#[cfg(test)]
fn hasher() -> Argon2<'static> {
    let params = argon2::Params::new(1024, 1, 1, None).expect("static argon2 params");
    Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params)
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::encode_b64(&random_bytes::<16>()?)
        .map_err(|e| TodoError::PasswordHash(e.to_string()))?;
    let hash = hasher()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| TodoError::PasswordHash(e.to_string()))?;
    Ok(hash.to_string())
}

/// `Ok(false)` for a wrong password; `Err` only for an unreadable hash.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool> {
    let parsed =
        PasswordHash::new(stored_hash).map_err(|e| TodoError::PasswordHash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
