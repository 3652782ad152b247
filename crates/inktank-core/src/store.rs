//! The `CatalogStore` trait and the load/persist helpers built on it.
//!
//! The trait is implemented by storage backends (e.g. `inktank-store-sqlite`).
//! A backend only needs whole-document reads and a version-checked
//! whole-document write; everything about sub-documents happens in memory in
//! between.

use std::future::Future;

use chrono::Utc;
use uuid::Uuid;

use crate::{
  Error, Result,
  parent::Parent,
  parse_id,
  user::{Provider, User},
};

// ─── Write outcome ────────────────────────────────────────────────────────────

/// The result of a write that can be refused for reasons other than an I/O
/// failure.
#[derive(Debug, Clone, PartialEq)]
pub enum Write<T> {
  /// The document was stored; this is the stored form.
  Applied(T),
  /// No document with that id exists.
  Missing,
  /// The stored version no longer matches the one the caller loaded.
  Stale,
  /// A uniqueness constraint (author name, username, provider id) was hit.
  Duplicate,
}

// ─── Trait ────────────────────────────────────────────────────────────────────

/// Abstraction over an Inktank catalog backend.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait CatalogStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Parents ───────────────────────────────────────────────────────────

  /// Store a new parent. Its version becomes 1.
  fn insert_parent<P: Parent>(
    &self,
    doc: P,
  ) -> impl Future<Output = Result<Write<P>, Self::Error>> + Send + '_;

  /// Retrieve a parent by id. Returns `None` if not found.
  fn get_parent<P: Parent>(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<P>, Self::Error>> + Send + '_;

  /// All parents of one kind, oldest first.
  fn list_parents<P: Parent>(
    &self,
  ) -> impl Future<Output = Result<Vec<P>, Self::Error>> + Send + '_;

  /// Overwrite a parent if its stored version is still `expected_version`.
  /// On success the stored version is `expected_version + 1`.
  fn replace_parent<P: Parent>(
    &self,
    doc: P,
    expected_version: u64,
  ) -> impl Future<Output = Result<Write<P>, Self::Error>> + Send + '_;

  /// Delete a parent, returning what was stored.
  fn delete_parent<P: Parent>(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<P>, Self::Error>> + Send + '_;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Store a new user; `Duplicate` if the username or provider id is taken.
  fn insert_user(
    &self,
    user: User,
  ) -> impl Future<Output = Result<Write<User>, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Fetch every user whose id is in `ids`; unknown ids are skipped.
  fn find_users(
    &self,
    ids: Vec<Uuid>,
  ) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send + '_;

  fn find_user_by_username(
    &self,
    username: String,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn find_user_by_provider(
    &self,
    provider: Provider,
    provider_id: String,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn list_users(
    &self,
  ) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send + '_;

  /// Set or clear the admin flag. Returns the updated user, or `None` if no
  /// user has that name.
  fn set_admin(
    &self,
    username: String,
    admin: bool,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;
}

// ─── Unit of work ─────────────────────────────────────────────────────────────

/// Load the parent named by a raw path id, or fail with `ParentNotFound`.
pub(crate) async fn load_parent<S, P>(store: &S, raw_id: &str) -> Result<P>
where
  S: CatalogStore,
  P: Parent,
{
  let found = match parse_id(raw_id) {
    Some(id) => store.get_parent::<P>(id).await.map_err(Error::store)?,
    None => None,
  };
  found.ok_or_else(|| Error::ParentNotFound {
    kind: P::KIND,
    id:   raw_id.to_owned(),
  })
}

/// Write back a parent loaded by [`load_parent`]. The write is refused with
/// `Conflict` if anyone else persisted the same parent in the meantime.
pub(crate) async fn persist_parent<S, P>(store: &S, mut doc: P) -> Result<P>
where
  S: CatalogStore,
  P: Parent,
{
  let id = doc.id();
  let expected = doc.meta().version;
  let key = doc.unique_key().map(str::to_owned);
  doc.meta_mut().updated_at = Utc::now();

  match store
    .replace_parent(doc, expected)
    .await
    .map_err(Error::store)?
  {
    Write::Applied(stored) => Ok(stored),
    Write::Missing => Err(Error::ParentNotFound {
      kind: P::KIND,
      id:   id.to_string(),
    }),
    Write::Stale => {
      tracing::warn!(kind = P::KIND.as_str(), %id, expected, "stale write refused");
      Err(Error::Conflict { kind: P::KIND, id: id.to_string() })
    }
    Write::Duplicate => Err(Error::Duplicate {
      what: P::KIND.to_string(),
      key:  key.unwrap_or_else(|| id.to_string()),
    }),
  }
}
