//! Password hashing (Argon2id) and account input rules.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use zeroize::Zeroizing;

/// Errors from password hashing.
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("failed to hash password: {0}")]
    Hash(argon2::password_hash::Error),

    /// The blocking hashing task panicked or was cancelled.
    #[error("password hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Hash a password into a PHC string.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(PasswordError::Hash)
}

/// [`hash_password`] on the blocking pool, off the async workers.
pub async fn hash_password_blocking(password: &str) -> Result<String, PasswordError> {
    let password = Zeroizing::new(password.to_owned());
    tokio::task::spawn_blocking(move || hash_password(&password)).await?
}

/// [`verify_password`] on the blocking pool, off the async workers.
pub async fn verify_password_blocking(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let password = Zeroizing::new(password.to_owned());
    let hash = hash.to_owned();
    Ok(tokio::task::spawn_blocking(move || verify_password(&password, &hash)).await?)
}

/// Verify a password against a stored PHC string.
///
/// A malformed stored hash verifies as `false`.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// At least 8 characters with an upper-case letter, a lower-case letter
/// and a digit.
pub fn validate_password_strength(password: &str) -> Result<(), String> {
    if password.chars().count() < 8 {
        return Err("password must be at least 8 characters long".to_string());
    }
    if password.len() > 128 {
        return Err("password must not exceed 128 bytes".to_string());
    }
    if !password.chars().any(char::is_uppercase) {
        return Err("password must contain at least one uppercase letter".to_string());
    }
    if !password.chars().any(char::is_lowercase) {
        return Err("password must contain at least one lowercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("password must contain at least one number".to_string());
    }
    Ok(())
}

/// Basic shape check; returns the normalized (trimmed, lower-cased) address.
pub fn normalize_email(email: &str) -> Result<String, String> {
    let email = email.trim().to_lowercase();

    if email.len() < 5 || email.len() > 254 {
        return Err("email must be between 5 and 254 characters".to_string());
    }
    let (local, domain) = email
        .split_once('@')
        .ok_or_else(|| "email must contain @".to_string())?;
    if local.is_empty() || domain.contains('@') {
        return Err("invalid email format".to_string());
    }
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err("email domain must contain a dot".to_string());
    }
    Ok(email)
}
