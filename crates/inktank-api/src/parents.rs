//! Handlers for whole books and authors.
//!
//! | Method   | Path            | Guard |
//! |----------|-----------------|-------|
//! | `GET`    | `/books`        | none  |
//! | `POST`   | `/books`        | admin |
//! | `GET`    | `/books/{id}`   | none  |
//! | `PUT`    | `/books/{id}`   | `G`   |
//! | `DELETE` | `/books/{id}`   | `G`   |
//!
//! `/authors` mirrors this. The write guard `G` is chosen per parent kind in
//! the router.

use axum::{
  Json,
  extract::{FromRequestParts, Path, State},
};
use inktank_core::{catalog::Parents, parent::Parent, payload::Payload, store::CatalogStore};
use serde_json::Value;

use crate::{AppState, auth::Admin, error::ApiError, extract::JsonBody};

/// `GET /books`
pub async fn list<S, P>(State(state): State<AppState<S>>) -> Result<Json<Vec<P>>, ApiError>
where
  S: CatalogStore + 'static,
  P: Parent,
{
  let docs = Parents::new(&*state.store).list::<P>().await?;
  tracing::debug!(kind = P::KIND.as_str(), count = docs.len(), "listed parents");
  Ok(Json(docs))
}

/// `POST /books`
pub async fn create<S, P>(
  Admin(_): Admin,
  State(state): State<AppState<S>>,
  JsonBody(body): JsonBody<Value>,
) -> Result<Json<P>, ApiError>
where
  S: CatalogStore + 'static,
  P: Parent,
{
  let draft = P::Draft::parse(body)?;
  let doc = Parents::new(&*state.store).create::<P>(draft).await?;
  Ok(Json(doc))
}

/// `GET /books/{id}`
pub async fn get_one<S, P>(
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
) -> Result<Json<P>, ApiError>
where
  S: CatalogStore + 'static,
  P: Parent,
{
  Ok(Json(Parents::new(&*state.store).get::<P>(&id).await?))
}

/// `PUT /books/{id}`, a merge-patch of scalar fields.
pub async fn update<S, P, G>(
  _guard: G,
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
  JsonBody(body): JsonBody<Value>,
) -> Result<Json<P>, ApiError>
where
  S: CatalogStore + 'static,
  P: Parent,
  G: FromRequestParts<AppState<S>, Rejection = ApiError> + Send,
{
  Ok(Json(Parents::new(&*state.store).update::<P>(&id, body).await?))
}

/// `DELETE /books/{id}`, returning the deleted document.
pub async fn delete<S, P, G>(
  _guard: G,
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
) -> Result<Json<P>, ApiError>
where
  S: CatalogStore + 'static,
  P: Parent,
  G: FromRequestParts<AppState<S>, Rejection = ApiError> + Send,
{
  Ok(Json(Parents::new(&*state.store).delete::<P>(&id).await?))
}
