//! argon2 password hashing for local accounts.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use rand_core::OsRng;

use crate::error::ApiError;

/// Hash `password` into an argon2 PHC string.
pub fn hash(password: &str) -> Result<String, ApiError> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|h| h.to_string())
    .map_err(|e| ApiError::Internal(format!("argon2: {e}")))
}

/// `true` if `password` matches the stored PHC string. A malformed hash never
/// matches.
pub fn verify(password: &str, phc: &str) -> bool {
  PasswordHash::new(phc)
    .and_then(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed))
    .is_ok()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn hash_then_verify() {
    let phc = hash("secret").unwrap();
    assert!(phc.starts_with("$argon2"));
    assert!(verify("secret", &phc));
    assert!(!verify("wrong", &phc));
  }

  #[test]
  fn malformed_hash_never_matches() {
    assert!(!verify("secret", "not-a-phc-string"));
  }
}
