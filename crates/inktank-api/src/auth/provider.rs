//! Sign-in through Facebook or Google access tokens.
//!
//! A [`ProviderVerifier`] turns a client-supplied access token into the
//! provider's view of the user. [`find_or_create`] then maps that onto a local
//! account, creating one on first sign-in.

use std::time::Duration;

use async_trait::async_trait;
use inktank_core::{
  Error as CoreError,
  store::{CatalogStore, Write},
  user::{Provider, User},
};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::error::ApiError;

const FACEBOOK_GRAPH: &str = "https://graph.facebook.com";
const GOOGLE_TOKENINFO: &str = "https://oauth2.googleapis.com/tokeninfo";
const GOOGLE_USERINFO: &str = "https://openidconnect.googleapis.com/v1/userinfo";

/// How many `-N` suffixes to try before giving up on a display name.
const MAX_USERNAME_ATTEMPTS: u32 = 50;

#[derive(Debug, Error)]
pub enum ProviderError {
  #[error("provider request failed: {0}")]
  Http(#[from] reqwest::Error),

  #[error("provider rejected the token: {0}")]
  Rejected(String),
}

/// What a provider tells us about the token's owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
  pub id:           String,
  pub display_name: String,
  pub given_name:   Option<String>,
  pub family_name:  Option<String>,
}

#[async_trait]
pub trait ProviderVerifier: Send + Sync {
  fn provider(&self) -> Provider;

  /// Validate `access_token` for this application and fetch its owner.
  async fn verify(&self, access_token: &str) -> Result<ProviderProfile, ProviderError>;
}

fn http_client() -> Result<Client, ProviderError> {
  Ok(Client::builder().timeout(Duration::from_secs(10)).build()?)
}

// ─── Facebook ────────────────────────────────────────────────────────────────

pub struct FacebookVerifier {
  client:     Client,
  app_id:     String,
  app_secret: String,
}

impl FacebookVerifier {
  pub fn new(app_id: String, app_secret: String) -> Result<Self, ProviderError> {
    Ok(Self { client: http_client()?, app_id, app_secret })
  }
}

#[derive(Deserialize)]
struct DebugToken {
  data: DebugTokenData,
}

#[derive(Deserialize)]
struct DebugTokenData {
  #[serde(default)]
  app_id:   String,
  #[serde(default)]
  is_valid: bool,
}

#[derive(Deserialize)]
struct FacebookMe {
  id:         String,
  #[serde(default)]
  name:       String,
  first_name: Option<String>,
  last_name:  Option<String>,
}

#[async_trait]
impl ProviderVerifier for FacebookVerifier {
  fn provider(&self) -> Provider { Provider::Facebook }

  async fn verify(&self, access_token: &str) -> Result<ProviderProfile, ProviderError> {
    let app_token = format!("{}|{}", self.app_id, self.app_secret);
    let debug: DebugToken = self
      .client
      .get(format!("{FACEBOOK_GRAPH}/debug_token"))
      .query(&[("input_token", access_token), ("access_token", app_token.as_str())])
      .send()
      .await?
      .error_for_status()?
      .json()
      .await?;

    if !debug.data.is_valid || debug.data.app_id != self.app_id {
      return Err(ProviderError::Rejected("token not issued for this app".into()));
    }

    let me: FacebookMe = self
      .client
      .get(format!("{FACEBOOK_GRAPH}/me"))
      .query(&[("fields", "id,name,first_name,last_name"), ("access_token", access_token)])
      .send()
      .await?
      .error_for_status()?
      .json()
      .await?;

    Ok(ProviderProfile {
      id:           me.id,
      display_name: me.name,
      given_name:   me.first_name,
      family_name:  me.last_name,
    })
  }
}

// ─── Google ──────────────────────────────────────────────────────────────────

pub struct GoogleVerifier {
  client:    Client,
  client_id: String,
}

impl GoogleVerifier {
  pub fn new(client_id: String) -> Result<Self, ProviderError> {
    Ok(Self { client: http_client()?, client_id })
  }
}

#[derive(Deserialize)]
struct TokenInfo {
  #[serde(default)]
  aud: String,
}

#[derive(Deserialize)]
struct GoogleUserInfo {
  sub:         String,
  #[serde(default)]
  name:        String,
  given_name:  Option<String>,
  family_name: Option<String>,
}

#[async_trait]
impl ProviderVerifier for GoogleVerifier {
  fn provider(&self) -> Provider { Provider::Google }

  async fn verify(&self, access_token: &str) -> Result<ProviderProfile, ProviderError> {
    let info: TokenInfo = self
      .client
      .get(GOOGLE_TOKENINFO)
      .query(&[("access_token", access_token)])
      .send()
      .await?
      .error_for_status()?
      .json()
      .await?;

    if info.aud != self.client_id {
      return Err(ProviderError::Rejected("token not issued for this client".into()));
    }

    let user: GoogleUserInfo = self
      .client
      .get(GOOGLE_USERINFO)
      .bearer_auth(access_token)
      .send()
      .await?
      .error_for_status()?
      .json()
      .await?;

    Ok(ProviderProfile {
      id:           user.sub,
      display_name: user.name,
      given_name:   user.given_name,
      family_name:  user.family_name,
    })
  }
}

// ─── Local account ───────────────────────────────────────────────────────────

/// Return the user linked to `profile`, creating one on first sign-in.
///
/// A new user takes the provider display name as username, with `-2`, `-3`,
/// ... appended while that name is taken.
pub async fn find_or_create<S: CatalogStore>(
  store: &S,
  provider: Provider,
  profile: ProviderProfile,
) -> Result<User, ApiError> {
  let store_err = |e: S::Error| ApiError::Store(Box::new(e));

  if let Some(user) = store
    .find_user_by_provider(provider, profile.id.clone())
    .await
    .map_err(store_err)?
  {
    return Ok(user);
  }

  let base = match profile.display_name.trim() {
    "" => format!("{provider}-{}", profile.id),
    name => name.to_owned(),
  };

  for attempt in 1..=MAX_USERNAME_ATTEMPTS {
    let username = match attempt {
      1 => base.clone(),
      n => format!("{base}-{n}"),
    };
    let mut user = User::federated(username, provider, profile.id.clone());
    user.firstname = profile.given_name.clone();
    user.lastname = profile.family_name.clone();

    match store.insert_user(user).await.map_err(store_err)? {
      Write::Applied(user) => {
        tracing::info!(%provider, username = %user.username, id = %user.id, "created federated user");
        return Ok(user);
      }
      // Either the name is taken or a concurrent sign-in linked the same
      // provider id first.
      Write::Duplicate | Write::Missing | Write::Stale => {
        if let Some(user) = store
          .find_user_by_provider(provider, profile.id.clone())
          .await
          .map_err(store_err)?
        {
          return Ok(user);
        }
      }
    }
  }

  Err(ApiError::Core(CoreError::Duplicate { what: "user".into(), key: base }))
}

#[cfg(test)]
mod tests {
  use inktank_store_sqlite::SqliteStore;

  use super::*;

  fn profile(id: &str, name: &str) -> ProviderProfile {
    ProviderProfile {
      id:           id.into(),
      display_name: name.into(),
      given_name:   Some("Ada".into()),
      family_name:  Some("Lovelace".into()),
    }
  }

  #[tokio::test]
  async fn second_sign_in_finds_the_same_user() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let first = find_or_create(&store, Provider::Google, profile("g-1", "Ada L"))
      .await
      .unwrap();
    assert_eq!(first.google_id.as_deref(), Some("g-1"));
    assert_eq!(first.firstname.as_deref(), Some("Ada"));

    let again = find_or_create(&store, Provider::Google, profile("g-1", "Renamed"))
      .await
      .unwrap();
    assert_eq!(again.id, first.id);
    assert_eq!(again.username, "Ada L");
  }

  #[tokio::test]
  async fn taken_display_name_gets_a_suffix() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    store
      .insert_user(User::local("Ada L", "x".into()))
      .await
      .unwrap();

    let fb = find_or_create(&store, Provider::Facebook, profile("f-9", "Ada L"))
      .await
      .unwrap();
    assert_eq!(fb.username, "Ada L-2");
    assert_eq!(fb.facebook_id.as_deref(), Some("f-9"));
  }

  #[tokio::test]
  async fn blank_display_name_falls_back_to_provider_id() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let user = find_or_create(&store, Provider::Facebook, profile("77", "  "))
      .await
      .unwrap();
    assert_eq!(user.username, "facebook-77");
  }
}
