//! Password hashing for login users.
//!
//! Argon2id with default parameters and an OsRng salt, stored in PHC string
//! format.
//!
//! # Example
//!
//! ```
//! use grantstore_auth::password::{hash_password, verify_password};
//!
//! let hash = hash_password("correct horse").unwrap();
//! assert!(hash.starts_with("$argon2id$"));
//! assert!(verify_password("correct horse", &hash).unwrap());
//! assert!(!verify_password("battery staple", &hash).unwrap());
//! ```

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::AuthResult;
use crate::error::AuthError;

/// Hash a password for storage.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails (rare).
pub fn hash_password(password: &str) -> AuthResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::password_hash(e.to_string()))
}

/// Verify a password against a stored hash.
///
/// `Ok(false)` means the password does not match. `Err` is returned only if
/// the stored hash is malformed.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if `hash` is not a valid PHC string.
pub fn verify_password(password: &str, hash: &str) -> AuthResult<bool> {
    let parsed_hash = PasswordHash::new(hash).map_err(|e| AuthError::password_hash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("s3cret").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("s3cret", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        let first = hash_password("s3cret").unwrap();
        let second = hash_password("s3cret").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_invalid_hash_format() {
        assert!(verify_password("s3cret", "not-a-phc-string").is_err());
    }
}
