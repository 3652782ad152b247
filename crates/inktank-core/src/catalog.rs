//! Parent-level CRUD: whole books and authors.
//!
//! Nothing here touches embedded collections beyond resolving authors for
//! display. Updates are allow-listed merge-patches of scalar fields.

use chrono::Utc;
use serde_json::Value;

use crate::{
  Error, Result,
  parent::Parent,
  parse_id,
  payload::Payload,
  resolve,
  store::{CatalogStore, Write, load_parent, persist_parent},
};

/// Parent operations against a borrowed store.
pub struct Parents<'s, S> {
  store: &'s S,
}

impl<'s, S: CatalogStore> Parents<'s, S> {
  pub fn new(store: &'s S) -> Self { Self { store } }

  /// Validate `draft` and store it as a new parent.
  pub async fn create<P: Parent>(&self, draft: P::Draft) -> Result<P> {
    let doc = P::from_draft(draft, Utc::now())?;
    let id = doc.id();
    let key = doc.unique_key().map(str::to_owned);

    match self.store.insert_parent(doc).await.map_err(Error::store)? {
      Write::Applied(stored) => {
        tracing::info!(kind = P::KIND.as_str(), id = %stored.id(), "created parent");
        Ok(stored)
      }
      Write::Duplicate => Err(Error::Duplicate {
        what: P::KIND.to_string(),
        key:  key.unwrap_or_default(),
      }),
      Write::Missing | Write::Stale => {
        Err(Error::Conflict { kind: P::KIND, id: id.to_string() })
      }
    }
  }

  /// Every parent of kind `P`, with comment and rating authors resolved.
  pub async fn list<P: Parent>(&self) -> Result<Vec<P>> {
    let mut docs = self
      .store
      .list_parents::<P>()
      .await
      .map_err(Error::store)?;
    resolve::parents(self.store, &mut docs).await?;
    Ok(docs)
  }

  pub async fn get<P: Parent>(&self, id: &str) -> Result<P> {
    let doc: P = load_parent(self.store, id).await?;
    let mut docs = [doc];
    resolve::parents(self.store, &mut docs).await?;
    let [doc] = docs;
    Ok(doc)
  }

  /// Merge the patch in `body` into the stored parent. The body is only
  /// parsed once the parent is known to exist.
  pub async fn update<P: Parent>(&self, id: &str, body: Value) -> Result<P> {
    let mut doc: P = load_parent(self.store, id).await?;
    doc.apply_patch(P::Patch::parse(body)?)?;
    let stored = persist_parent(self.store, doc).await?;
    tracing::info!(kind = P::KIND.as_str(), id = %stored.id(), "updated parent");
    Ok(stored)
  }

  /// Delete a parent and everything embedded in it. Returns what was stored.
  pub async fn delete<P: Parent>(&self, id: &str) -> Result<P> {
    let not_found = || Error::ParentNotFound { kind: P::KIND, id: id.to_owned() };
    let uuid = parse_id(id).ok_or_else(not_found)?;
    let deleted = self
      .store
      .delete_parent::<P>(uuid)
      .await
      .map_err(Error::store)?
      .ok_or_else(not_found)?;
    tracing::info!(kind = P::KIND.as_str(), %uuid, "deleted parent");
    Ok(deleted)
  }
}
