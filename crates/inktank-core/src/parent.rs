//! Parent documents: books and authors.
//!
//! A parent is the unit of persistence. It carries its scalar metadata and
//! the three embedded collections; a write to any comment, rating or bio is a
//! write of the whole parent.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::{
  Result,
  payload::{self, Payload},
  subdoc::{Bio, Collection, Comment, Rating},
};

// ─── Kinds ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParentKind {
  Book,
  Author,
}

impl ParentKind {
  /// Storage discriminant.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Book => "book",
      Self::Author => "author",
    }
  }

  /// The URL segment of the collection root, e.g. `books`.
  pub fn path_segment(self) -> &'static str {
    match self {
      Self::Book => "books",
      Self::Author => "authors",
    }
  }
}

impl std::fmt::Display for ParentKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(match self {
      Self::Book => "Book",
      Self::Author => "Author",
    })
  }
}

// ─── Shared parts ─────────────────────────────────────────────────────────────

/// Identity and bookkeeping common to every parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
  pub id:         Uuid,
  /// Bumped by the store on every successful write; a write that names a
  /// stale version is refused.
  pub version:    u64,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Meta {
  pub fn new(now: DateTime<Utc>) -> Self {
    Self { id: Uuid::new_v4(), version: 0, created_at: now, updated_at: now }
  }
}

/// The embedded collections every parent owns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Embedded {
  #[serde(default)]
  pub comments: Collection<Comment>,
  #[serde(default)]
  pub ratings:  Collection<Rating>,
  #[serde(default)]
  pub bio:      Collection<Bio>,
}

// ─── Trait ────────────────────────────────────────────────────────────────────

/// A top-level document kind.
pub trait Parent:
  Clone + Serialize + DeserializeOwned + Send + Sync + 'static
{
  const KIND: ParentKind;

  type Draft: Payload + Send;
  type Patch: Payload + Send;

  /// Build a new, not-yet-stored document.
  fn from_draft(draft: Self::Draft, now: DateTime<Utc>) -> Result<Self>;

  /// Merge the supplied scalar fields. Fails without writing anything if a
  /// supplied value is invalid.
  fn apply_patch(&mut self, patch: Self::Patch) -> Result<()>;

  fn meta(&self) -> &Meta;

  fn meta_mut(&mut self) -> &mut Meta;

  fn embedded(&self) -> &Embedded;

  fn embedded_mut(&mut self) -> &mut Embedded;

  fn id(&self) -> Uuid { self.meta().id }

  /// A value that must be unique among parents of this kind, if any.
  fn unique_key(&self) -> Option<&str> { None }
}

// ─── Book ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
  #[serde(flatten)]
  pub meta:        Meta,
  pub title:       String,
  /// The writer's name as printed; not a user reference.
  pub author:      String,
  pub category:    String,
  pub image:       String,
  pub description: String,
  /// Page count.
  pub length:      u32,
  pub release:     NaiveDate,
  pub language:    String,
  #[serde(default)]
  pub featured:    bool,
  #[serde(flatten)]
  pub embedded:    Embedded,
}

const BOOK_FIELDS: &[&str] = &[
  "title",
  "author",
  "category",
  "image",
  "description",
  "length",
  "release",
  "language",
  "featured",
];

#[derive(Debug, Clone, Deserialize)]
pub struct BookDraft {
  pub title:       String,
  pub author:      String,
  pub category:    String,
  pub image:       String,
  pub description: String,
  pub length:      i64,
  pub release:     NaiveDate,
  pub language:    String,
  #[serde(default)]
  pub featured:    bool,
}

impl Payload for BookDraft {
  const FIELDS: &'static [&'static str] = BOOK_FIELDS;

  fn validate(&self) -> Result<()> {
    for (field, value) in [
      ("title", &self.title),
      ("author", &self.author),
      ("category", &self.category),
      ("image", &self.image),
      ("description", &self.description),
      ("language", &self.language),
    ] {
      payload::required(field, value)?;
    }
    payload::length(self.length).map(drop)
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookPatch {
  pub title:       Option<String>,
  pub author:      Option<String>,
  pub category:    Option<String>,
  pub image:       Option<String>,
  pub description: Option<String>,
  pub length:      Option<i64>,
  pub release:     Option<NaiveDate>,
  pub language:    Option<String>,
  pub featured:    Option<bool>,
}

impl Payload for BookPatch {
  const FIELDS: &'static [&'static str] = BOOK_FIELDS;

  fn validate(&self) -> Result<()> {
    for (field, value) in [
      ("title", &self.title),
      ("author", &self.author),
      ("category", &self.category),
      ("image", &self.image),
      ("description", &self.description),
      ("language", &self.language),
    ] {
      payload::required_if_present(field, value.as_deref())?;
    }
    self.length.map_or(Ok(()), |l| payload::length(l).map(drop))
  }
}

impl Parent for Book {
  type Draft = BookDraft;
  type Patch = BookPatch;

  const KIND: ParentKind = ParentKind::Book;

  fn from_draft(draft: BookDraft, now: DateTime<Utc>) -> Result<Self> {
    draft.validate()?;
    Ok(Self {
      meta:        Meta::new(now),
      length:      payload::length(draft.length)?,
      title:       draft.title,
      author:      draft.author,
      category:    draft.category,
      image:       draft.image,
      description: draft.description,
      release:     draft.release,
      language:    draft.language,
      featured:    draft.featured,
      embedded:    Embedded::default(),
    })
  }

  fn apply_patch(&mut self, patch: BookPatch) -> Result<()> {
    patch.validate()?;
    let length = patch.length.map(payload::length).transpose()?;

    if let Some(v) = patch.title { self.title = v; }
    if let Some(v) = patch.author { self.author = v; }
    if let Some(v) = patch.category { self.category = v; }
    if let Some(v) = patch.image { self.image = v; }
    if let Some(v) = patch.description { self.description = v; }
    if let Some(v) = length { self.length = v; }
    if let Some(v) = patch.release { self.release = v; }
    if let Some(v) = patch.language { self.language = v; }
    if let Some(v) = patch.featured { self.featured = v; }
    Ok(())
  }

  fn meta(&self) -> &Meta { &self.meta }

  fn meta_mut(&mut self) -> &mut Meta { &mut self.meta }

  fn embedded(&self) -> &Embedded { &self.embedded }

  fn embedded_mut(&mut self) -> &mut Embedded { &mut self.embedded }
}

// ─── Author ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
  #[serde(flatten)]
  pub meta:        Meta,
  /// Unique across authors.
  pub name:        String,
  pub description: String,
  pub image:       String,
  #[serde(default)]
  pub featured:    bool,
  #[serde(flatten)]
  pub embedded:    Embedded,
}

const AUTHOR_FIELDS: &[&str] = &["name", "description", "image", "featured"];

#[derive(Debug, Clone, Deserialize)]
pub struct AuthorDraft {
  pub name:        String,
  pub description: String,
  pub image:       String,
  #[serde(default)]
  pub featured:    bool,
}

impl Payload for AuthorDraft {
  const FIELDS: &'static [&'static str] = AUTHOR_FIELDS;

  fn validate(&self) -> Result<()> {
    payload::required("name", &self.name)?;
    payload::required("description", &self.description)?;
    payload::required("image", &self.image)
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorPatch {
  pub name:        Option<String>,
  pub description: Option<String>,
  pub image:       Option<String>,
  pub featured:    Option<bool>,
}

impl Payload for AuthorPatch {
  const FIELDS: &'static [&'static str] = AUTHOR_FIELDS;

  fn validate(&self) -> Result<()> {
    payload::required_if_present("name", self.name.as_deref())?;
    payload::required_if_present("description", self.description.as_deref())?;
    payload::required_if_present("image", self.image.as_deref())
  }
}

impl Parent for Author {
  type Draft = AuthorDraft;
  type Patch = AuthorPatch;

  const KIND: ParentKind = ParentKind::Author;

  fn from_draft(draft: AuthorDraft, now: DateTime<Utc>) -> Result<Self> {
    draft.validate()?;
    Ok(Self {
      meta:        Meta::new(now),
      name:        draft.name.trim().to_owned(),
      description: draft.description,
      image:       draft.image,
      featured:    draft.featured,
      embedded:    Embedded::default(),
    })
  }

  fn apply_patch(&mut self, patch: AuthorPatch) -> Result<()> {
    patch.validate()?;
    if let Some(v) = patch.name { self.name = v.trim().to_owned(); }
    if let Some(v) = patch.description { self.description = v; }
    if let Some(v) = patch.image { self.image = v; }
    if let Some(v) = patch.featured { self.featured = v; }
    Ok(())
  }

  fn meta(&self) -> &Meta { &self.meta }

  fn meta_mut(&mut self) -> &mut Meta { &mut self.meta }

  fn embedded(&self) -> &Embedded { &self.embedded }

  fn embedded_mut(&mut self) -> &mut Embedded { &mut self.embedded }

  fn unique_key(&self) -> Option<&str> { Some(&self.name) }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::Error;

  fn book_body() -> serde_json::Value {
    json!({
      "title": "T",
      "author": "A",
      "category": "fiction",
      "image": "images/t.png",
      "description": "a book",
      "length": 320,
      "release": "2019-05-01",
      "language": "en",
    })
  }

  #[test]
  fn book_round_trips_with_flattened_parts() {
    let draft = BookDraft::parse(book_body()).unwrap();
    let book = Book::from_draft(draft, Utc::now()).unwrap();
    let value = serde_json::to_value(&book).unwrap();

    assert_eq!(value["id"], json!(book.meta.id.to_string()));
    assert_eq!(value["comments"], json!([]));
    assert_eq!(value["bio"], json!([]));
    assert!(!value["featured"].as_bool().unwrap());

    let back: Book = serde_json::from_value(value).unwrap();
    assert_eq!(back, book);
  }

  #[test]
  fn book_draft_rejects_embedded_collections() {
    let mut body = book_body();
    body["comments"] = json!([]);
    match BookDraft::parse(body) {
      Err(Error::ValidationFailed { field, .. }) => assert_eq!(field, "comments"),
      other => panic!("unexpected: {other:?}"),
    }
  }

  #[test]
  fn book_patch_changes_only_supplied_fields() {
    let mut book =
      Book::from_draft(BookDraft::parse(book_body()).unwrap(), Utc::now()).unwrap();
    let patch = BookPatch::parse(json!({ "title": "New", "featured": true })).unwrap();
    book.apply_patch(patch).unwrap();

    assert_eq!(book.title, "New");
    assert!(book.featured);
    assert_eq!(book.author, "A");
    assert_eq!(book.length, 320);
  }

  #[test]
  fn book_patch_with_bad_length_writes_nothing() {
    let mut book =
      Book::from_draft(BookDraft::parse(book_body()).unwrap(), Utc::now()).unwrap();
    let patch = BookPatch { title: Some("New".into()), length: Some(0), ..Default::default() };
    assert!(book.apply_patch(patch).is_err());
    assert_eq!(book.title, "T");
  }

  #[test]
  fn author_patch_rejects_blank_name() {
    assert!(AuthorPatch::parse(json!({ "name": "" })).is_err());
  }
}
