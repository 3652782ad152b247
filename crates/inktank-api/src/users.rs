//! Handlers for `/users`: sign-up, log-in, provider sign-in, and the admin
//! user listing.
//!
//! | Method | Path                    | Notes |
//! |--------|-------------------------|-------|
//! | `GET`  | `/users`                | admin only |
//! | `POST` | `/users/signup`         | `{"username","password","firstname"?,"lastname"?}` |
//! | `POST` | `/users/login`          | `{"username","password"}` → token |
//! | `GET`  | `/users/facebook/token` | `?access_token=` → token |
//! | `GET`  | `/users/google/token`   | `?access_token=` → token |

use axum::{
  Json,
  extract::State,
};
use inktank_core::{
  Error as CoreError,
  store::{CatalogStore, Write},
  user::{Provider, User, UserProfile},
};
use serde::{Deserialize, Serialize};

use crate::{
  AppState,
  auth::{Admin, password, provider},
  error::ApiError,
  extract::{JsonBody, QueryParams},
};

fn store_err<E: std::error::Error + Send + Sync + 'static>(e: E) -> ApiError {
  ApiError::Store(Box::new(e))
}

/// Response body for every endpoint that hands out a token.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
  pub success:    bool,
  pub token:      String,
  pub expires_in: i64,
  pub status:     String,
}

fn token_response<S>(
  state: &AppState<S>,
  user: &User,
  status: &str,
) -> Result<Json<TokenResponse>, ApiError> {
  Ok(Json(TokenResponse {
    success:    true,
    token:      state.auth.tokens.issue(user.id)?,
    expires_in: state.auth.tokens.ttl_secs(),
    status:     status.to_owned(),
  }))
}

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct UserListing {
  #[serde(flatten)]
  pub profile: UserProfile,
  pub admin:   bool,
}

/// `GET /users`
pub async fn list<S>(
  Admin(_): Admin,
  State(state): State<AppState<S>>,
) -> Result<Json<Vec<UserListing>>, ApiError>
where
  S: CatalogStore + 'static,
{
  let users = state.store.list_users().await.map_err(store_err)?;
  Ok(Json(
    users
      .iter()
      .map(|u| UserListing { profile: u.profile(), admin: u.admin })
      .collect(),
  ))
}

// ─── Local accounts ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignupBody {
  pub username:  String,
  pub password:  String,
  pub firstname: Option<String>,
  pub lastname:  Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
  pub success: bool,
  pub status:  String,
  pub user:    UserProfile,
}

/// `POST /users/signup`
pub async fn signup<S>(
  State(state): State<AppState<S>>,
  JsonBody(body): JsonBody<SignupBody>,
) -> Result<Json<SignupResponse>, ApiError>
where
  S: CatalogStore + 'static,
{
  let username = body.username.trim();
  if username.is_empty() {
    return Err(CoreError::validation("username", "must not be empty").into());
  }
  if body.password.is_empty() {
    return Err(CoreError::validation("password", "must not be empty").into());
  }

  let mut user = User::local(username, password::hash(&body.password)?);
  user.firstname = body.firstname.filter(|s| !s.trim().is_empty());
  user.lastname = body.lastname.filter(|s| !s.trim().is_empty());

  match state.store.insert_user(user).await.map_err(store_err)? {
    Write::Applied(user) => {
      tracing::info!(username = %user.username, id = %user.id, "registered user");
      Ok(Json(SignupResponse {
        success: true,
        status:  "Registration Successful!".into(),
        user:    user.profile(),
      }))
    }
    Write::Duplicate | Write::Missing | Write::Stale => Err(
      CoreError::Duplicate { what: "user".into(), key: username.to_owned() }.into(),
    ),
  }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginBody {
  pub username: String,
  pub password: String,
}

/// `POST /users/login`
pub async fn login<S>(
  State(state): State<AppState<S>>,
  JsonBody(body): JsonBody<LoginBody>,
) -> Result<Json<TokenResponse>, ApiError>
where
  S: CatalogStore + 'static,
{
  let user = state
    .store
    .find_user_by_username(body.username.clone())
    .await
    .map_err(store_err)?;

  let verified = user.filter(|u| {
    u.password_hash
      .as_deref()
      .is_some_and(|phc| password::verify(&body.password, phc))
  });

  let Some(user) = verified else {
    tracing::warn!(username = %body.username, "login failed");
    return Err(ApiError::unauthorized("invalid username or password"));
  };

  tracing::info!(username = %user.username, "logged in");
  token_response(&state, &user, "You are successfully logged in!")
}

// ─── Provider sign-in ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TokenParams {
  pub access_token: String,
}

async fn provider_login<S>(
  state: AppState<S>,
  provider: Provider,
  access_token: &str,
) -> Result<Json<TokenResponse>, ApiError>
where
  S: CatalogStore + 'static,
{
  let verifier = state
    .auth
    .verifier(provider)
    .ok_or_else(|| ApiError::BadRequest(format!("{provider} sign-in is not configured")))?;

  let profile = verifier.verify(access_token).await.map_err(|e| {
    tracing::warn!(%provider, error = %e, "provider sign-in failed");
    ApiError::unauthorized(e.to_string())
  })?;

  let user = provider::find_or_create(&*state.store, provider, profile).await?;
  tracing::info!(%provider, username = %user.username, "signed in through provider");
  token_response(&state, &user, "You are successfully logged in!")
}

/// `GET /users/facebook/token?access_token=…`
pub async fn facebook<S>(
  State(state): State<AppState<S>>,
  QueryParams(params): QueryParams<TokenParams>,
) -> Result<Json<TokenResponse>, ApiError>
where
  S: CatalogStore + 'static,
{
  provider_login(state, Provider::Facebook, &params.access_token).await
}

/// `GET /users/google/token?access_token=…`
pub async fn google<S>(
  State(state): State<AppState<S>>,
  QueryParams(params): QueryParams<TokenParams>,
) -> Result<Json<TokenResponse>, ApiError>
where
  S: CatalogStore + 'static,
{
  provider_login(state, Provider::Google, &params.access_token).await
}
