//! Handlers for embedded collections, generic over parent kind `P` and item
//! kind `K`.
//!
//! | Method   | Path                          | Guard  | Returns |
//! |----------|-------------------------------|--------|---------|
//! | `GET`    | `/books/{id}/comments`        | none   | items   |
//! | `POST`   | `/books/{id}/comments`        | caller | parent  |
//! | `DELETE` | `/books/{id}/comments`        | admin  | parent  |
//! | `GET`    | `/books/{id}/comments/{sub}`  | none   | item    |
//! | `PUT`    | `/books/{id}/comments/{sub}`  | caller | parent  |
//! | `DELETE` | `/books/{id}/comments/{sub}`  | caller | parent  |

use axum::{
  Json,
  extract::{Path, State},
};
use inktank_core::{
  manager::SubDocuments, parent::Parent, store::CatalogStore, subdoc::SubDocument,
};
use serde_json::Value;

use crate::{
  AppState,
  auth::{Admin, Caller},
  error::ApiError,
  extract::JsonBody,
};

pub async fn list<S, P, K>(
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
) -> Result<Json<Vec<K>>, ApiError>
where
  S: CatalogStore + 'static,
  P: Parent,
  K: SubDocument,
{
  let items = SubDocuments::new(&*state.store).list_all::<P, K>(&id).await?;
  Ok(Json(items))
}

/// The new item's author is the caller, whatever the body says.
pub async fn create<S, P, K>(
  Caller(user): Caller,
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
  JsonBody(body): JsonBody<Value>,
) -> Result<Json<P>, ApiError>
where
  S: CatalogStore + 'static,
  P: Parent,
  K: SubDocument,
{
  let parent = SubDocuments::new(&*state.store)
    .create::<P, K>(&id, body, user.id)
    .await?;
  Ok(Json(parent))
}

pub async fn delete_all<S, P, K>(
  Admin(_): Admin,
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
) -> Result<Json<P>, ApiError>
where
  S: CatalogStore + 'static,
  P: Parent,
  K: SubDocument,
{
  let parent = SubDocuments::new(&*state.store).delete_all::<P, K>(&id).await?;
  Ok(Json(parent))
}

pub async fn get_one<S, P, K>(
  State(state): State<AppState<S>>,
  Path((id, sub_id)): Path<(String, String)>,
) -> Result<Json<K>, ApiError>
where
  S: CatalogStore + 'static,
  P: Parent,
  K: SubDocument,
{
  let item = SubDocuments::new(&*state.store)
    .get_one::<P, K>(&id, &sub_id)
    .await?;
  Ok(Json(item))
}

pub async fn update<S, P, K>(
  Caller(_): Caller,
  State(state): State<AppState<S>>,
  Path((id, sub_id)): Path<(String, String)>,
  JsonBody(body): JsonBody<Value>,
) -> Result<Json<P>, ApiError>
where
  S: CatalogStore + 'static,
  P: Parent,
  K: SubDocument,
{
  let parent = SubDocuments::new(&*state.store)
    .update::<P, K>(&id, &sub_id, body)
    .await?;
  Ok(Json(parent))
}

pub async fn delete_one<S, P, K>(
  Caller(_): Caller,
  State(state): State<AppState<S>>,
  Path((id, sub_id)): Path<(String, String)>,
) -> Result<Json<P>, ApiError>
where
  S: CatalogStore + 'static,
  P: Parent,
  K: SubDocument,
{
  let parent = SubDocuments::new(&*state.store)
    .delete_one::<P, K>(&id, &sub_id)
    .await?;
  Ok(Json(parent))
}
