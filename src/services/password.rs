//! Password hashing
//!
//! Argon2id with the crate's default parameters and a random salt per hash.
//! Hashes are stored as PHC strings, so the parameters travel with them.

use anyhow::{Context, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Hash a plaintext password into a PHC string (`$argon2id$...`)
///
/// # Arguments
///
/// * `password` - The plaintext password, as submitted
///
/// # Errors
///
/// Returns an error if Argon2 rejects the input (only possible for
/// inputs beyond its length limits).
///
/// # Example
///
/// ```ignore
/// let hash = hash_password("secret123")?;
/// assert!(verify_password("secret123", &hash)?);
/// ```
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))
        .context("Password hashing failed")?;

    Ok(hash.to_string())
}

/// Check a plaintext password against a stored PHC string.
///
/// A wrong password is `Ok(false)`.
///
/// # Errors
///
/// Returns an error if `hash` is not a valid PHC string or names an
/// algorithm Argon2 cannot verify.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| anyhow::anyhow!("Invalid password hash format: {}", e))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(anyhow::anyhow!("Password verification failed: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_argon2id() {
        let hash = hash_password("secret123").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert_ne!(hash, "secret123");
    }

    #[test]
    fn test_verify_correct_and_wrong_password() {
        let hash = hash_password("secret123").unwrap();
        assert!(verify_password("secret123", &hash).unwrap());
        assert!(!verify_password("secret124", &hash).unwrap());
    }

    #[test]
    fn test_same_password_gets_different_salts() {
        let first = hash_password("secret123").unwrap();
        let second = hash_password("secret123").unwrap();
        assert_ne!(first, second);
        assert!(verify_password("secret123", &first).unwrap());
        assert!(verify_password("secret123", &second).unwrap());
    }

    #[test]
    fn test_malformed_hash_is_error() {
        assert!(verify_password("secret123", "not-a-phc-string").is_err());
    }
}
