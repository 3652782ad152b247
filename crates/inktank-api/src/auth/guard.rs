//! Guard extractors. Put one in a handler's argument list and the handler
//! only runs for callers that pass it.

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use inktank_core::{store::CatalogStore, user::User};

use crate::{AppState, error::ApiError};

/// Any signed-in user, re-loaded from the store.
#[derive(Debug, Clone)]
pub struct Caller(pub User);

/// A signed-in user whose `admin` flag is set.
#[derive(Debug, Clone)]
pub struct Admin(pub User);

fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
  let value = headers
    .get(header::AUTHORIZATION)
    .ok_or_else(|| ApiError::unauthorized("missing Authorization header"))?
    .to_str()
    .map_err(|_| ApiError::unauthorized("malformed Authorization header"))?;

  value
    .strip_prefix("Bearer ")
    .map(str::trim)
    .filter(|t| !t.is_empty())
    .ok_or_else(|| ApiError::unauthorized("expected a Bearer token"))
}

impl<S> FromRequestParts<AppState<S>> for Caller
where
  S: CatalogStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let rejected = |e: ApiError| {
      tracing::warn!(path = parts.uri.path(), error = %e, "authentication failed");
      e
    };

    let token = bearer_token(&parts.headers).map_err(rejected)?;
    let claims = state.auth.tokens.verify(token).map_err(rejected)?;
    let user = state
      .store
      .get_user(claims.sub)
      .await
      .map_err(|e| ApiError::Store(Box::new(e)))?
      .ok_or_else(|| rejected(ApiError::unauthorized("user no longer exists")))?;
    Ok(Caller(user))
  }
}

impl<S> FromRequestParts<AppState<S>> for Admin
where
  S: CatalogStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let Caller(user) = Caller::from_request_parts(parts, state).await?;
    if !user.admin {
      let operation = format!("{} {}", parts.method, parts.uri.path());
      tracing::warn!(username = %user.username, %operation, "admin required");
      return Err(ApiError::Forbidden { username: user.username, operation });
    }
    Ok(Admin(user))
  }
}
