//! Swapping `author` ids for displayable user profiles on the read path.
//!
//! Resolution only ever touches values about to be returned to a caller; the
//! stored form keeps bare ids. An id whose user no longer exists is left as
//! an id.

use std::collections::HashMap;

use uuid::Uuid;

use crate::{
  Error, Result,
  parent::Parent,
  store::CatalogStore,
  subdoc::{Attribution, Comment, Rating, SubDocument},
  user::UserProfile,
};

async fn profiles<S: CatalogStore>(
  store: &S,
  mut ids: Vec<Uuid>,
) -> Result<HashMap<Uuid, UserProfile>> {
  ids.sort_unstable();
  ids.dedup();
  if ids.is_empty() {
    return Ok(HashMap::new());
  }
  let users = store.find_users(ids).await.map_err(Error::store)?;
  Ok(users.iter().map(|u| (u.id, u.profile())).collect())
}

fn apply<K: SubDocument>(items: &mut [K], profiles: &HashMap<Uuid, UserProfile>) {
  for author in items.iter_mut().filter_map(K::attribution_mut) {
    if let Some(profile) = profiles.get(&author.user_id()) {
      *author = Attribution::Profile(profile.clone());
    }
  }
}

fn author_ids<K: SubDocument>(items: &[K]) -> impl Iterator<Item = Uuid> + '_ {
  items.iter().filter_map(K::attribution).map(Attribution::user_id)
}

/// Resolve the authors of a list of sub-documents in one store round trip.
pub async fn sub_documents<S, K>(store: &S, items: &mut [K]) -> Result<()>
where
  S: CatalogStore,
  K: SubDocument,
{
  let ids: Vec<Uuid> = author_ids(items).collect();
  let profiles = profiles(store, ids).await?;
  apply(items, &profiles);
  Ok(())
}

/// Resolve comment and rating authors across a batch of parents.
pub async fn parents<S, P>(store: &S, docs: &mut [P]) -> Result<()>
where
  S: CatalogStore,
  P: Parent,
{
  let ids: Vec<Uuid> = docs
    .iter()
    .flat_map(|doc| {
      let embedded = doc.embedded();
      author_ids(embedded.comments.as_slice())
        .chain(author_ids(embedded.ratings.as_slice()))
    })
    .collect();
  let profiles = profiles(store, ids).await?;

  for doc in docs.iter_mut() {
    let embedded = doc.embedded_mut();
    apply::<Comment>(embedded.comments.as_mut_slice(), &profiles);
    apply::<Rating>(embedded.ratings.as_mut_slice(), &profiles);
  }
  Ok(())
}
