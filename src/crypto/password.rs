//! Password hashing and verification using Argon2id.
//!
//! Each hash carries a fresh salt in PHC string format, so two hashes of
//! the same password differ and both verify.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordHashError {
    #[error("failed to hash password: {0}")]
    Hash(argon2::password_hash::Error),

    #[error("invalid password hash encoding: {0}")]
    Format(argon2::password_hash::Error),
}

/// Hash a password with a freshly generated salt.
///
/// # Errors
///
/// Returns `PasswordHashError::Hash` if the hasher fails.
pub fn hash(password: &str) -> Result<String, PasswordHashError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(PasswordHashError::Hash)
}

/// Verify a password against a stored PHC hash string.
///
/// A mismatch is `Ok(false)`, never an error.
///
/// # Errors
///
/// Returns `PasswordHashError::Format` only when the stored hash cannot be
/// parsed.
pub fn verify(password: &str, stored: &str) -> Result<bool, PasswordHashError> {
    let parsed = PasswordHash::new(stored).map_err(PasswordHashError::Format)?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hashed = hash("hunter2").unwrap();

        assert!(hashed.starts_with("$argon2"));
        assert!(verify("hunter2", &hashed).unwrap());
        assert!(!verify("wrong", &hashed).unwrap());
    }

    #[test]
    fn test_fresh_salt_per_call() {
        let first = hash("secret").unwrap();
        let second = hash("secret").unwrap();

        assert_ne!(first, second);
        assert!(verify("secret", &first).unwrap());
        assert!(verify("secret", &second).unwrap());
    }

    #[test]
    fn test_unparseable_hash_is_an_error() {
        let result = verify("secret", "not-a-phc-hash");
        assert!(matches!(result, Err(PasswordHashError::Format(_))));
    }
}
