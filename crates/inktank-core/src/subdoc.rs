//! Sub-documents: comments, ratings and bios embedded inside a parent.
//!
//! A sub-document has no existence outside its parent's [`Collection`]. It is
//! created by inserting into the collection, changed by patching it in place,
//! and destroyed by removing it; every one of those steps is made durable only
//! by persisting the parent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::{
  Result,
  parent::Embedded,
  payload::{self, Payload},
  policy::Placement,
  user::UserProfile,
};

// ─── Kinds ────────────────────────────────────────────────────────────────────

/// Which embedded collection of a parent an operation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
  Comments,
  Ratings,
  Bio,
}

impl CollectionKind {
  /// The URL segment and JSON key of the collection.
  pub fn path_segment(self) -> &'static str {
    match self {
      Self::Comments => "comments",
      Self::Ratings => "ratings",
      Self::Bio => "bio",
    }
  }

  /// Singular, capitalised name of one item, used in messages.
  pub fn item_name(self) -> &'static str {
    match self {
      Self::Comments => "Comment",
      Self::Ratings => "Rating",
      Self::Bio => "Bio",
    }
  }
}

impl std::fmt::Display for CollectionKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.item_name())
  }
}

// ─── Collection ───────────────────────────────────────────────────────────────

/// Anything addressable by id inside a [`Collection`].
pub trait Identified {
  fn id(&self) -> Uuid;
}

/// An ordered, id-addressable list of embedded items.
///
/// Items keep their insertion order. Ids are assigned when an item is built
/// and never change, so every lookup and removal goes through the id rather
/// than a position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Collection<T>(Vec<T>);

impl<T> Default for Collection<T> {
  fn default() -> Self { Self(Vec::new()) }
}

impl<T> Collection<T> {
  pub fn len(&self) -> usize { self.0.len() }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn iter(&self) -> std::slice::Iter<'_, T> { self.0.iter() }

  pub fn as_slice(&self) -> &[T] { &self.0 }

  pub fn as_mut_slice(&mut self) -> &mut [T] { &mut self.0 }

  pub fn into_vec(self) -> Vec<T> { self.0 }
}

impl<T: Identified> Collection<T> {
  pub fn get(&self, id: Uuid) -> Option<&T> {
    self.0.iter().find(|item| item.id() == id)
  }

  pub fn get_mut(&mut self, id: Uuid) -> Option<&mut T> {
    self.0.iter_mut().find(|item| item.id() == id)
  }

  pub fn contains(&self, id: Uuid) -> bool { self.get(id).is_some() }

  /// Append at the end.
  pub fn push(&mut self, item: T) { self.0.push(item); }

  /// Overwrite the first slot, or insert into an empty collection. Items
  /// after the first are left as they are.
  pub fn replace_first(&mut self, item: T) {
    match self.0.first_mut() {
      Some(first) => *first = item,
      None => self.0.push(item),
    }
  }

  /// Remove the item with `id`, returning it.
  pub fn remove(&mut self, id: Uuid) -> Option<T> {
    let position = self.0.iter().position(|item| item.id() == id)?;
    Some(self.0.remove(position))
  }

  /// Remove every item. The ids are collected first and each is then removed
  /// by id, so no removal can shift an item out from under the next one.
  /// Returns how many were removed.
  pub fn remove_all(&mut self) -> usize {
    let ids: Vec<Uuid> = self.0.iter().map(Identified::id).collect();
    ids
      .into_iter()
      .filter(|id| self.remove(*id).is_some())
      .count()
  }
}

impl<T> FromIterator<T> for Collection<T> {
  fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
    Self(iter.into_iter().collect())
  }
}

impl<'a, T> IntoIterator for &'a Collection<T> {
  type IntoIter = std::slice::Iter<'a, T>;
  type Item = &'a T;

  fn into_iter(self) -> Self::IntoIter { self.0.iter() }
}

// ─── Attribution ──────────────────────────────────────────────────────────────

/// Who wrote a comment or rating.
///
/// Always stored as a bare user id. When read for display the id is swapped
/// for the user's profile; that form is never written back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Attribution {
  Profile(UserProfile),
  User(Uuid),
}

impl Attribution {
  pub fn user_id(&self) -> Uuid {
    match self {
      Self::Profile(profile) => profile.id,
      Self::User(id) => *id,
    }
  }
}

// ─── Trait ────────────────────────────────────────────────────────────────────

/// An item kind stored in one of a parent's embedded collections.
pub trait SubDocument:
  Identified + Clone + Serialize + DeserializeOwned + Send + Sync + 'static
{
  const KIND: CollectionKind;

  /// Where a newly created item lands in its collection.
  const PLACEMENT: Placement = Placement::Append;

  /// Body accepted on create.
  type Draft: Payload + Send;
  /// Body accepted on update.
  type Patch: Payload + Send;

  /// Build a new item with a fresh id. `author` is the authenticated caller;
  /// kinds without an author field ignore it.
  fn from_draft(draft: Self::Draft, author: Uuid, now: DateTime<Utc>) -> Self;

  /// Apply the fields present in `patch`. Fails without touching `self` if
  /// any supplied value is invalid.
  fn apply_patch(&mut self, patch: Self::Patch, now: DateTime<Utc>) -> Result<()>;

  fn collection(embedded: &Embedded) -> &Collection<Self>;

  fn collection_mut(embedded: &mut Embedded) -> &mut Collection<Self>;

  fn attribution(&self) -> Option<&Attribution> { None }

  fn attribution_mut(&mut self) -> Option<&mut Attribution> { None }
}

// ─── Comment ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
  pub id:         Uuid,
  pub text:       String,
  pub author:     Attribution,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// `author` is accepted so existing clients keep working, and then dropped:
/// authorship always comes from the verified caller.
#[derive(Debug, Clone, Deserialize)]
pub struct CommentDraft {
  pub text: String,
}

impl Payload for CommentDraft {
  const FIELDS: &'static [&'static str] = &["text", "author"];

  fn validate(&self) -> Result<()> { payload::required("text", &self.text) }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentPatch {
  pub text: Option<String>,
}

impl Payload for CommentPatch {
  const FIELDS: &'static [&'static str] = &["text"];
}

impl Identified for Comment {
  fn id(&self) -> Uuid { self.id }
}

impl SubDocument for Comment {
  type Draft = CommentDraft;
  type Patch = CommentPatch;

  const KIND: CollectionKind = CollectionKind::Comments;

  fn from_draft(draft: CommentDraft, author: Uuid, now: DateTime<Utc>) -> Self {
    Self {
      id:         Uuid::new_v4(),
      text:       draft.text,
      author:     Attribution::User(author),
      created_at: now,
      updated_at: now,
    }
  }

  fn apply_patch(&mut self, patch: CommentPatch, now: DateTime<Utc>) -> Result<()> {
    if let Some(text) = payload::non_empty(patch.text) {
      self.text = text;
      self.updated_at = now;
    }
    Ok(())
  }

  fn collection(embedded: &Embedded) -> &Collection<Self> { &embedded.comments }

  fn collection_mut(embedded: &mut Embedded) -> &mut Collection<Self> {
    &mut embedded.comments
  }

  fn attribution(&self) -> Option<&Attribution> { Some(&self.author) }

  fn attribution_mut(&mut self) -> Option<&mut Attribution> { Some(&mut self.author) }
}

// ─── Rating ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
  pub id:         Uuid,
  /// Whole stars, 1..=5.
  pub rating:     u8,
  pub author:     Attribution,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RatingDraft {
  pub rating: i64,
}

impl Payload for RatingDraft {
  const FIELDS: &'static [&'static str] = &["rating", "author"];

  fn validate(&self) -> Result<()> { payload::rating(self.rating).map(drop) }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RatingPatch {
  pub rating: Option<i64>,
}

impl Payload for RatingPatch {
  const FIELDS: &'static [&'static str] = &["rating"];

  fn validate(&self) -> Result<()> {
    self.rating.map_or(Ok(()), |r| payload::rating(r).map(drop))
  }
}

impl Identified for Rating {
  fn id(&self) -> Uuid { self.id }
}

impl SubDocument for Rating {
  type Draft = RatingDraft;
  type Patch = RatingPatch;

  const KIND: CollectionKind = CollectionKind::Ratings;

  /// Callers validate the draft first; an out-of-range value that slips
  /// through is clamped rather than stored.
  fn from_draft(draft: RatingDraft, author: Uuid, now: DateTime<Utc>) -> Self {
    Self {
      id:         Uuid::new_v4(),
      rating:     draft.rating.clamp(1, 5) as u8,
      author:     Attribution::User(author),
      created_at: now,
      updated_at: now,
    }
  }

  fn apply_patch(&mut self, patch: RatingPatch, now: DateTime<Utc>) -> Result<()> {
    if let Some(value) = patch.rating {
      self.rating = payload::rating(value)?;
      self.updated_at = now;
    }
    Ok(())
  }

  fn collection(embedded: &Embedded) -> &Collection<Self> { &embedded.ratings }

  fn collection_mut(embedded: &mut Embedded) -> &mut Collection<Self> {
    &mut embedded.ratings
  }

  fn attribution(&self) -> Option<&Attribution> { Some(&self.author) }

  fn attribution_mut(&mut self) -> Option<&mut Attribution> { Some(&mut self.author) }
}

// ─── Bio ──────────────────────────────────────────────────────────────────────

/// A link to one of the subject's social channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialLink {
  pub id:         Uuid,
  pub channel:    String,
  pub link:       String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Identified for SocialLink {
  fn id(&self) -> Uuid { self.id }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SocialLinkDraft {
  pub channel: String,
  pub link:    String,
}

impl SocialLinkDraft {
  fn validate(&self) -> Result<()> {
    payload::required("social.channel", &self.channel)?;
    payload::required("social.link", &self.link)
  }

  fn build(self, now: DateTime<Utc>) -> SocialLink {
    SocialLink {
      id:         Uuid::new_v4(),
      channel:    self.channel,
      link:       self.link,
      created_at: now,
      updated_at: now,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bio {
  pub id:            Uuid,
  pub location:      String,
  pub description:   String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub review:        Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub review_author: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub portfolio:     Option<String>,
  #[serde(default)]
  pub social:        Collection<SocialLink>,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BioDraft {
  pub location:      String,
  pub description:   String,
  pub review:        Option<String>,
  pub review_author: Option<String>,
  pub portfolio:     Option<String>,
  #[serde(default)]
  pub social:        Vec<SocialLinkDraft>,
}

impl Payload for BioDraft {
  const FIELDS: &'static [&'static str] = &[
    "location",
    "description",
    "review",
    "reviewAuthor",
    "portfolio",
    "social",
  ];

  fn validate(&self) -> Result<()> {
    payload::required("location", &self.location)?;
    payload::required("description", &self.description)?;
    self.social.iter().try_for_each(SocialLinkDraft::validate)
  }
}

/// `social`, when present, replaces the whole list.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BioPatch {
  pub location:      Option<String>,
  pub description:   Option<String>,
  pub review:        Option<String>,
  pub review_author: Option<String>,
  pub portfolio:     Option<String>,
  pub social:        Option<Vec<SocialLinkDraft>>,
}

impl Payload for BioPatch {
  const FIELDS: &'static [&'static str] = BioDraft::FIELDS;

  fn validate(&self) -> Result<()> {
    self
      .social
      .iter()
      .flatten()
      .try_for_each(SocialLinkDraft::validate)
  }
}

impl Identified for Bio {
  fn id(&self) -> Uuid { self.id }
}

impl SubDocument for Bio {
  type Draft = BioDraft;
  type Patch = BioPatch;

  const KIND: CollectionKind = CollectionKind::Bio;
  const PLACEMENT: Placement = Placement::ReplaceFirst;

  fn from_draft(draft: BioDraft, _author: Uuid, now: DateTime<Utc>) -> Self {
    Self {
      id:            Uuid::new_v4(),
      location:      draft.location,
      description:   draft.description,
      review:        payload::non_empty(draft.review),
      review_author: payload::non_empty(draft.review_author),
      portfolio:     payload::non_empty(draft.portfolio),
      social:        draft.social.into_iter().map(|s| s.build(now)).collect(),
      created_at:    now,
      updated_at:    now,
    }
  }

  fn apply_patch(&mut self, patch: BioPatch, now: DateTime<Utc>) -> Result<()> {
    patch.validate()?;

    let mut touched = false;
    let mut set = |slot: &mut String, value: Option<String>| {
      if let Some(v) = payload::non_empty(value) {
        *slot = v;
        touched = true;
      }
    };
    set(&mut self.location, patch.location);
    set(&mut self.description, patch.description);

    for (slot, value) in [
      (&mut self.review, patch.review),
      (&mut self.review_author, patch.review_author),
      (&mut self.portfolio, patch.portfolio),
    ] {
      if let Some(v) = payload::non_empty(value) {
        *slot = Some(v);
        touched = true;
      }
    }

    if let Some(social) = patch.social {
      self.social = social.into_iter().map(|s| s.build(now)).collect();
      touched = true;
    }

    if touched {
      self.updated_at = now;
    }
    Ok(())
  }

  fn collection(embedded: &Embedded) -> &Collection<Self> { &embedded.bio }

  fn collection_mut(embedded: &mut Embedded) -> &mut Collection<Self> {
    &mut embedded.bio
  }
}
