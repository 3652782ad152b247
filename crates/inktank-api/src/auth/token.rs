//! HS256 bearer tokens.
//!
//! A token only names a user (`sub`). Everything else about the user,
//! including the admin flag, is re-read from the store on every request.

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

pub const DEFAULT_TTL_SECS: u64 = 3600;

/// Longest lifetime a configuration may ask for: one year.
const MAX_TTL_SECS: i64 = 365 * 24 * 3600;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
  pub sub: Uuid,
  pub iat: i64,
  pub exp: i64,
}

pub struct TokenIssuer {
  encoding: EncodingKey,
  decoding: DecodingKey,
  ttl:      Duration,
}

impl TokenIssuer {
  pub fn new(secret: &[u8], ttl_secs: u64) -> Self {
    Self {
      encoding: EncodingKey::from_secret(secret),
      decoding: DecodingKey::from_secret(secret),
      ttl:      Duration::seconds(i64::try_from(ttl_secs).map_or(MAX_TTL_SECS, |s| s.min(MAX_TTL_SECS))),
    }
  }

  pub fn ttl_secs(&self) -> i64 { self.ttl.num_seconds() }

  /// Sign a token for `user_id`, valid from now for the configured lifetime.
  pub fn issue(&self, user_id: Uuid) -> Result<String, ApiError> {
    let now = Utc::now();
    let claims = Claims {
      sub: user_id,
      iat: now.timestamp(),
      exp: (now + self.ttl).timestamp(),
    };
    encode(&Header::default(), &claims, &self.encoding)
      .map_err(|e| ApiError::Internal(format!("token generation: {e}")))
  }

  /// Check the signature and expiry of `token`.
  pub fn verify(&self, token: &str) -> Result<Claims, ApiError> {
    decode::<Claims>(token, &self.decoding, &Validation::default())
      .map(|data| data.claims)
      .map_err(|e| ApiError::unauthorized(format!("invalid token: {e}")))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn issued_token_verifies() {
    let issuer = TokenIssuer::new(b"s3cret", DEFAULT_TTL_SECS);
    let id = Uuid::new_v4();
    let claims = issuer.verify(&issuer.issue(id).unwrap()).unwrap();
    assert_eq!(claims.sub, id);
    assert_eq!(claims.exp - claims.iat, 3600);
  }

  #[test]
  fn token_from_other_secret_is_rejected() {
    let ours = TokenIssuer::new(b"ours", DEFAULT_TTL_SECS);
    let theirs = TokenIssuer::new(b"theirs", DEFAULT_TTL_SECS);
    let token = theirs.issue(Uuid::new_v4()).unwrap();
    assert!(matches!(ours.verify(&token), Err(ApiError::Unauthorized(_))));
  }

  #[test]
  fn expired_token_is_rejected() {
    let issuer = TokenIssuer::new(b"s3cret", DEFAULT_TTL_SECS);
    let past = Utc::now() - Duration::hours(2);
    let claims = Claims {
      sub: Uuid::new_v4(),
      iat: past.timestamp(),
      exp: (past + Duration::minutes(5)).timestamp(),
    };
    let token = encode(&Header::default(), &claims, &issuer.encoding).unwrap();
    assert!(matches!(issuer.verify(&token), Err(ApiError::Unauthorized(_))));
  }

  #[test]
  fn garbage_is_rejected() {
    let issuer = TokenIssuer::new(b"s3cret", DEFAULT_TTL_SECS);
    assert!(issuer.verify("not.a.token").is_err());
  }
}
