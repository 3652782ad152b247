//! The sub-document manager: one mutation protocol for every embedded
//! collection of every parent kind.
//!
//! Each operation is a single unit of work: load the parent, check that the
//! addressed item exists, change the collection in memory, persist the parent.
//! Nothing is written if any step fails, and the in-memory copy is dropped.
//!
//! Lookups always check the parent first and the sub-document second, so a
//! missing parent is reported as such even when the sub-document id could not
//! have matched anything. Request bodies arrive as raw JSON and are parsed only
//! once both lookups have succeeded, so a bad body sent to a missing target is
//! still reported as not found.
//!
//! Authorisation is the caller's job. The only identity the manager uses is
//! the `caller` passed to [`SubDocuments::create`], which becomes the author.

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::{
  Error, Result,
  parent::Parent,
  parse_id,
  payload::Payload,
  policy, resolve,
  store::{CatalogStore, load_parent, persist_parent},
  subdoc::SubDocument,
};

/// Sub-document operations against a borrowed store.
pub struct SubDocuments<'s, S> {
  store: &'s S,
}

impl<'s, S: CatalogStore> SubDocuments<'s, S> {
  pub fn new(store: &'s S) -> Self { Self { store } }

  /// Every item of kind `K` under the parent, in collection order, with
  /// authors resolved.
  pub async fn list_all<P, K>(&self, parent_id: &str) -> Result<Vec<K>>
  where
    P: Parent,
    K: SubDocument,
  {
    let parent: P = load_parent(self.store, parent_id).await?;
    let mut items = K::collection(parent.embedded()).clone().into_vec();
    resolve::sub_documents(self.store, &mut items).await?;
    tracing::debug!(
      parent = %parent.id(),
      kind = K::KIND.path_segment(),
      count = items.len(),
      "listed sub-documents"
    );
    Ok(items)
  }

  /// One item, with its author resolved.
  pub async fn get_one<P, K>(&self, parent_id: &str, sub_id: &str) -> Result<K>
  where
    P: Parent,
    K: SubDocument,
  {
    let parent: P = load_parent(self.store, parent_id).await?;
    let id = locate::<P, K>(&parent, parent_id, sub_id)?;
    let item = K::collection(parent.embedded())
      .get(id)
      .cloned()
      .ok_or_else(|| sub_not_found::<K>(parent_id, sub_id))?;

    let mut items = [item];
    resolve::sub_documents(self.store, &mut items).await?;
    let [item] = items;
    Ok(item)
  }

  /// Build a new item from `body` and place it in the parent's collection;
  /// appended for comments and ratings, replacing slot 0 for a bio. Returns
  /// the whole updated parent.
  pub async fn create<P, K>(
    &self,
    parent_id: &str,
    body: Value,
    caller: Uuid,
  ) -> Result<P>
  where
    P: Parent,
    K: SubDocument,
  {
    let mut parent: P = load_parent(self.store, parent_id).await?;
    let draft = K::Draft::parse(body)?;

    let item = K::from_draft(draft, caller, Utc::now());
    let item_id = item.id();
    policy::place(K::collection_mut(parent.embedded_mut()), item);

    let stored = persist_parent(self.store, parent).await?;
    tracing::info!(
      parent = %stored.id(),
      kind = K::KIND.path_segment(),
      id = %item_id,
      %caller,
      "created sub-document"
    );
    Ok(stored)
  }

  /// Apply the fields present in `body` to one item. Absent or empty fields
  /// keep their stored values.
  pub async fn update<P, K>(
    &self,
    parent_id: &str,
    sub_id: &str,
    body: Value,
  ) -> Result<P>
  where
    P: Parent,
    K: SubDocument,
  {
    let mut parent: P = load_parent(self.store, parent_id).await?;
    let id = locate::<P, K>(&parent, parent_id, sub_id)?;
    let patch = K::Patch::parse(body)?;

    K::collection_mut(parent.embedded_mut())
      .get_mut(id)
      .ok_or_else(|| sub_not_found::<K>(parent_id, sub_id))?
      .apply_patch(patch, Utc::now())?;

    let stored = persist_parent(self.store, parent).await?;
    tracing::info!(
      parent = %stored.id(),
      kind = K::KIND.path_segment(),
      %id,
      "updated sub-document"
    );
    Ok(stored)
  }

  /// Remove one item.
  pub async fn delete_one<P, K>(&self, parent_id: &str, sub_id: &str) -> Result<P>
  where
    P: Parent,
    K: SubDocument,
  {
    let mut parent: P = load_parent(self.store, parent_id).await?;
    let id = locate::<P, K>(&parent, parent_id, sub_id)?;

    K::collection_mut(parent.embedded_mut())
      .remove(id)
      .ok_or_else(|| sub_not_found::<K>(parent_id, sub_id))?;

    let stored = persist_parent(self.store, parent).await?;
    tracing::info!(
      parent = %stored.id(),
      kind = K::KIND.path_segment(),
      %id,
      "deleted sub-document"
    );
    Ok(stored)
  }

  /// Remove every item of kind `K`. An empty collection is not an error.
  pub async fn delete_all<P, K>(&self, parent_id: &str) -> Result<P>
  where
    P: Parent,
    K: SubDocument,
  {
    let mut parent: P = load_parent(self.store, parent_id).await?;
    let removed = K::collection_mut(parent.embedded_mut()).remove_all();

    let stored = persist_parent(self.store, parent).await?;
    tracing::info!(
      parent = %stored.id(),
      kind = K::KIND.path_segment(),
      removed,
      "cleared sub-documents"
    );
    Ok(stored)
  }
}

/// Resolve `sub_id` against an already-loaded parent.
fn locate<P, K>(parent: &P, parent_id: &str, sub_id: &str) -> Result<Uuid>
where
  P: Parent,
  K: SubDocument,
{
  parse_id(sub_id)
    .filter(|id| K::collection(parent.embedded()).contains(*id))
    .ok_or_else(|| sub_not_found::<K>(parent_id, sub_id))
}

fn sub_not_found<K: SubDocument>(parent_id: &str, sub_id: &str) -> Error {
  Error::SubDocumentNotFound {
    parent_id: parent_id.to_owned(),
    kind:      K::KIND,
    id:        sub_id.to_owned(),
  }
}
