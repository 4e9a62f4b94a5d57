use super::AuthError;
use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};

/// Argon2id PHC string with a fresh random salt.
///
/// # Errors
/// `AuthError::Hash` if the hasher rejects its parameters.
pub fn hash_password(plain: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default().hash_password(plain.as_bytes(), &salt)?.to_string())
}

/// Constant-time check of `plain` against a stored PHC string. Malformed hashes never match.
#[must_use]
pub fn verify_password(plain: &str, phc: &str) -> bool {
    match PasswordHash::new(phc) {
        Ok(parsed) => Argon2::default().verify_password(plain.as_bytes(), &parsed).is_ok(),
        Err(e) => {
            log::warn!("stored password hash is malformed: {e}");
            false
        }
    }
}
