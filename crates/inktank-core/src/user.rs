//! Users: the accounts that sign in and author comments and ratings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An external identity provider a user can sign in with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
  Facebook,
  Google,
}

impl Provider {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Facebook => "facebook",
      Self::Google => "google",
    }
  }
}

impl std::fmt::Display for Provider {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A stored account. Never serialised directly: responses use
/// [`UserProfile`] so the password hash cannot leak.
#[derive(Debug, Clone)]
pub struct User {
  pub id:            Uuid,
  pub username:      String,
  /// argon2 PHC string; `None` for accounts created through a provider.
  pub password_hash: Option<String>,
  pub firstname:     Option<String>,
  pub lastname:      Option<String>,
  pub admin:         bool,
  pub facebook_id:   Option<String>,
  pub google_id:     Option<String>,
  pub created_at:    DateTime<Utc>,
}

impl User {
  /// A local account with a pre-computed password hash.
  pub fn local(username: impl Into<String>, password_hash: String) -> Self {
    Self {
      id:            Uuid::new_v4(),
      username:      username.into(),
      password_hash: Some(password_hash),
      firstname:     None,
      lastname:      None,
      admin:         false,
      facebook_id:   None,
      google_id:     None,
      created_at:    Utc::now(),
    }
  }

  /// An account linked to `provider` under the provider's own user id.
  pub fn federated(
    username: impl Into<String>,
    provider: Provider,
    provider_id: impl Into<String>,
  ) -> Self {
    let provider_id = provider_id.into();
    let (facebook_id, google_id) = match provider {
      Provider::Facebook => (Some(provider_id), None),
      Provider::Google => (None, Some(provider_id)),
    };
    Self {
      id: Uuid::new_v4(),
      username: username.into(),
      password_hash: None,
      firstname: None,
      lastname: None,
      admin: false,
      facebook_id,
      google_id,
      created_at: Utc::now(),
    }
  }

  pub fn profile(&self) -> UserProfile {
    UserProfile {
      id:        self.id,
      username:  self.username.clone(),
      firstname: self.firstname.clone(),
      lastname:  self.lastname.clone(),
    }
  }
}

/// The displayable part of a user, substituted for `author` references when
/// comments and ratings are read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
  pub id:        Uuid,
  pub username:  String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub firstname: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub lastname:  Option<String>,
}
