//! Integration tests for `SqliteStore` against an in-memory database, driving
//! the catalog and sub-document operations from `inktank-core` end to end.

use inktank_core::{
  Error,
  catalog::Parents,
  manager::SubDocuments,
  parent::{Author, AuthorDraft, Book, BookDraft, Parent},
  payload::Payload,
  store::{CatalogStore, Write},
  subdoc::{Attribution, Bio, Comment, Rating},
  user::{Provider, User},
};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn user(s: &SqliteStore, username: &str) -> User {
  let user = User::local(username, "$argon2id$placeholder".into());
  match s.insert_user(user).await.unwrap() {
    Write::Applied(u) => u,
    other => panic!("insert_user: {other:?}"),
  }
}

async fn book(s: &SqliteStore) -> Book {
  let draft = BookDraft::parse(json!({
    "title": "The Long Way",
    "author": "B. Chambers",
    "category": "fiction",
    "image": "images/long-way.png",
    "description": "a small ship",
    "length": 404,
    "release": "2014-07-29",
    "language": "en",
  }))
  .unwrap();
  Parents::new(s).create::<Book>(draft).await.unwrap()
}

async fn author(s: &SqliteStore, name: &str) -> Result<Author, Error> {
  let draft = AuthorDraft::parse(json!({
    "name": name,
    "description": "writes books",
    "image": "images/a.png",
  }))
  .unwrap();
  Parents::new(s).create::<Author>(draft).await
}

fn comment(text: &str) -> Value { json!({ "text": text }) }

fn bio(location: &str) -> Value { json!({ "location": location, "description": "bio" }) }

// ─── Parents ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_book() {
  let s = store().await;
  let created = book(&s).await;
  assert_eq!(created.meta.version, 1);

  let fetched: Book = Parents::new(&s)
    .get(&created.id().to_string())
    .await
    .unwrap();
  assert_eq!(fetched.title, "The Long Way");
  assert_eq!(fetched.length, 404);
  assert!(fetched.embedded.comments.is_empty());
}

#[tokio::test]
async fn list_books_in_insertion_order() {
  let s = store().await;
  let first = book(&s).await;
  let second = book(&s).await;

  let all: Vec<Book> = Parents::new(&s).list().await.unwrap();
  let ids: Vec<Uuid> = all.iter().map(|b| b.id()).collect();
  assert_eq!(ids, vec![first.id(), second.id()]);
}

#[tokio::test]
async fn books_and_authors_do_not_share_ids() {
  let s = store().await;
  let b = book(&s).await;
  let missing = s.get_parent::<Author>(b.id()).await.unwrap();
  assert!(missing.is_none());
}

#[tokio::test]
async fn unknown_or_malformed_id_is_parent_not_found() {
  let s = store().await;
  let parents = Parents::new(&s);

  for id in ["does-not-exist".to_owned(), Uuid::new_v4().to_string()] {
    let err = parents.get::<Book>(&id).await.unwrap_err();
    assert!(matches!(err, Error::ParentNotFound { .. }), "{id}: {err}");
  }
}

#[tokio::test]
async fn duplicate_author_name_is_rejected() {
  let s = store().await;
  author(&s, "Ursula").await.unwrap();
  let err = author(&s, "Ursula").await.unwrap_err();
  assert!(matches!(err, Error::Duplicate { ref key, .. } if key == "Ursula"), "{err}");
}

#[tokio::test]
async fn renaming_author_onto_taken_name_is_rejected() {
  let s = store().await;
  author(&s, "Ursula").await.unwrap();
  let other = author(&s, "Octavia").await.unwrap();

  let err = Parents::new(&s)
    .update::<Author>(&other.id().to_string(), json!({ "name": "Ursula" }))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Duplicate { .. }), "{err}");

  let kept: Author = Parents::new(&s).get(&other.id().to_string()).await.unwrap();
  assert_eq!(kept.name, "Octavia");
}

#[tokio::test]
async fn update_bumps_version_and_keeps_collections() {
  let s = store().await;
  let b = book(&s).await;
  let id = b.id().to_string();
  let subs = SubDocuments::new(&s);
  let u = user(&s, "reader").await;
  subs.create::<Book, Comment>(&id, comment("nice"), u.id).await.unwrap();

  let patch = json!({ "title": "Renamed", "featured": true });
  let updated = Parents::new(&s)
    .update::<Book>(&id, patch)
    .await
    .unwrap();
  assert_eq!(updated.title, "Renamed");
  assert!(updated.featured);
  assert_eq!(updated.meta.version, 3);
  assert_eq!(updated.embedded.comments.len(), 1);
}

#[tokio::test]
async fn delete_parent_returns_stored_document() {
  let s = store().await;
  let b = book(&s).await;
  let id = b.id().to_string();

  let deleted: Book = Parents::new(&s).delete(&id).await.unwrap();
  assert_eq!(deleted.id(), b.id());

  let err = Parents::new(&s).delete::<Book>(&id).await.unwrap_err();
  assert!(matches!(err, Error::ParentNotFound { .. }));
}

// ─── Version check ───────────────────────────────────────────────────────────

#[tokio::test]
async fn stale_replace_is_refused() {
  let s = store().await;
  let b = book(&s).await;

  let mut first: Book = s.get_parent(b.id()).await.unwrap().unwrap();
  let mut second = first.clone();

  first.title = "first writer".into();
  let applied = s.replace_parent(first, 1).await.unwrap();
  assert!(matches!(applied, Write::Applied(ref d) if d.meta.version == 2));

  second.title = "second writer".into();
  let refused = s.replace_parent(second, 1).await.unwrap();
  assert_eq!(refused, Write::Stale);

  let stored: Book = s.get_parent(b.id()).await.unwrap().unwrap();
  assert_eq!(stored.title, "first writer");
}

#[tokio::test]
async fn replace_of_deleted_parent_is_missing() {
  let s = store().await;
  let b = book(&s).await;
  s.delete_parent::<Book>(b.id()).await.unwrap();

  let outcome = s.replace_parent(b, 1).await.unwrap();
  assert_eq!(outcome, Write::Missing);
}

// ─── Sub-documents ───────────────────────────────────────────────────────────

#[tokio::test]
async fn comment_author_is_the_caller() {
  let s = store().await;
  let b = book(&s).await;
  let alice = user(&s, "alice").await;
  let mallory = user(&s, "mallory").await;

  // A body that names someone else still parses; the value is discarded.
  let draft = json!({
    "text": "mine",
    "author": mallory.id.to_string(),
  });

  let parent = SubDocuments::new(&s)
    .create::<Book, Comment>(&b.id().to_string(), draft, alice.id)
    .await
    .unwrap();
  let stored = &parent.embedded.comments.as_slice()[0];
  assert_eq!(stored.author, Attribution::User(alice.id));
}

#[tokio::test]
async fn listed_comments_carry_author_profiles() {
  let s = store().await;
  let b = book(&s).await;
  let id = b.id().to_string();
  let alice = user(&s, "alice").await;
  let subs = SubDocuments::new(&s);
  subs.create::<Book, Comment>(&id, comment("one"), alice.id).await.unwrap();
  subs.create::<Book, Comment>(&id, comment("two"), alice.id).await.unwrap();

  let listed = subs.list_all::<Book, Comment>(&id).await.unwrap();
  assert_eq!(listed.len(), 2);
  assert_eq!(listed[0].text, "one");
  for c in &listed {
    assert!(matches!(&c.author, Attribution::Profile(p) if p.username == "alice"));
  }

  // Stored form keeps the bare id.
  let raw: Book = s.get_parent(b.id()).await.unwrap().unwrap();
  assert_eq!(raw.embedded.comments.as_slice()[0].author, Attribution::User(alice.id));
}

#[tokio::test]
async fn author_of_deleted_user_stays_an_id() {
  let s = store().await;
  let b = book(&s).await;
  let ghost = Uuid::new_v4();
  SubDocuments::new(&s)
    .create::<Book, Comment>(&b.id().to_string(), comment("boo"), ghost)
    .await
    .unwrap();

  let got: Book = Parents::new(&s).get(&b.id().to_string()).await.unwrap();
  assert_eq!(got.embedded.comments.as_slice()[0].author, Attribution::User(ghost));
}

#[tokio::test]
async fn get_one_checks_parent_before_item() {
  let s = store().await;
  let b = book(&s).await;
  let subs = SubDocuments::new(&s);

  let err = subs
    .get_one::<Book, Comment>("does-not-exist", "also-missing")
    .await
    .unwrap_err();
  assert!(matches!(err, Error::ParentNotFound { .. }));

  let err = subs
    .get_one::<Book, Comment>(&b.id().to_string(), &Uuid::new_v4().to_string())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::SubDocumentNotFound { .. }));
}

#[tokio::test]
async fn invalid_body_is_parsed_only_after_lookups() {
  let s = store().await;
  let b = book(&s).await;
  let ghost = Uuid::new_v4().to_string();
  let subs = SubDocuments::new(&s);

  let err = subs
    .create::<Book, Rating>(&ghost, json!({ "rating": 9 }), Uuid::new_v4())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::ParentNotFound { .. }), "{err}");

  let err = subs
    .update::<Book, Comment>(&ghost, "nope", json!({ "bogus": 1 }))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::ParentNotFound { .. }), "{err}");

  let err = subs
    .update::<Book, Comment>(&b.id().to_string(), "nope", json!({ "bogus": 1 }))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::SubDocumentNotFound { .. }), "{err}");

  let err = Parents::new(&s)
    .update::<Book>(&ghost, json!({ "length": 0 }))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::ParentNotFound { .. }), "{err}");
}

#[tokio::test]
async fn update_comment_ignores_empty_text() {
  let s = store().await;
  let b = book(&s).await;
  let id = b.id().to_string();
  let u = user(&s, "u").await;
  let subs = SubDocuments::new(&s);
  let parent = subs.create::<Book, Comment>(&id, comment("original"), u.id).await.unwrap();
  let cid = parent.embedded.comments.as_slice()[0].id.to_string();

  let parent = subs
    .update::<Book, Comment>(&id, &cid, json!({ "text": "" }))
    .await
    .unwrap();
  assert_eq!(parent.embedded.comments.as_slice()[0].text, "original");

  let parent = subs
    .update::<Book, Comment>(&id, &cid, json!({ "text": "edited" }))
    .await
    .unwrap();
  assert_eq!(parent.embedded.comments.as_slice()[0].text, "edited");
}

#[tokio::test]
async fn out_of_range_rating_leaves_parent_unchanged() {
  let s = store().await;
  let a = author(&s, "Le Guin").await.unwrap();
  let id = a.id().to_string();
  let u = user(&s, "u").await;
  let subs = SubDocuments::new(&s);
  let parent = subs
    .create::<Author, Rating>(&id, json!({ "rating": 4 }), u.id)
    .await
    .unwrap();
  let rid = parent.embedded.ratings.as_slice()[0].id.to_string();

  for bad in [0, 6, -1] {
    let err = subs
      .update::<Author, Rating>(&id, &rid, json!({ "rating": bad }))
      .await
      .unwrap_err();
    assert!(matches!(err, Error::ValidationFailed { .. }), "{bad}: {err}");
  }

  let err = subs
    .create::<Author, Rating>(&id, json!({ "rating": 9 }), u.id)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::ValidationFailed { .. }));

  let stored: Author = s.get_parent(a.id()).await.unwrap().unwrap();
  assert_eq!(stored.meta.version, parent.meta.version);
  assert_eq!(stored.embedded.ratings.len(), 1);
  assert_eq!(stored.embedded.ratings.as_slice()[0].rating, 4);
}

#[tokio::test]
async fn delete_one_comment() {
  let s = store().await;
  let b = book(&s).await;
  let id = b.id().to_string();
  let u = user(&s, "u").await;
  let subs = SubDocuments::new(&s);
  subs.create::<Book, Comment>(&id, comment("keep"), u.id).await.unwrap();
  let parent = subs.create::<Book, Comment>(&id, comment("drop"), u.id).await.unwrap();
  let drop_id = parent.embedded.comments.as_slice()[1].id.to_string();

  let parent = subs.delete_one::<Book, Comment>(&id, &drop_id).await.unwrap();
  let texts: Vec<&str> = parent.embedded.comments.iter().map(|c| c.text.as_str()).collect();
  assert_eq!(texts, ["keep"]);

  let err = subs.delete_one::<Book, Comment>(&id, &drop_id).await.unwrap_err();
  assert!(matches!(err, Error::SubDocumentNotFound { .. }));
}

#[tokio::test]
async fn delete_all_empties_collection_of_any_size() {
  let s = store().await;
  let u = user(&s, "u").await;
  let subs = SubDocuments::new(&s);

  for n in [0, 1, 2, 5] {
    let b = book(&s).await;
    let id = b.id().to_string();
    for i in 0..n {
      subs
        .create::<Book, Comment>(&id, comment(&format!("c{i}")), u.id)
        .await
        .unwrap();
    }

    let parent = subs.delete_all::<Book, Comment>(&id).await.unwrap();
    assert!(parent.embedded.comments.is_empty(), "n = {n}");

    let stored: Book = s.get_parent(b.id()).await.unwrap().unwrap();
    assert!(stored.embedded.comments.is_empty(), "n = {n}");
  }
}

#[tokio::test]
async fn bio_create_replaces_existing() {
  let s = store().await;
  let a = author(&s, "Jemisin").await.unwrap();
  let id = a.id().to_string();
  let u = user(&s, "admin").await;
  let subs = SubDocuments::new(&s);

  for location in ["X", "Y"] {
    subs.create::<Author, Bio>(&id, bio(location), u.id).await.unwrap();
  }

  let bios = subs.list_all::<Author, Bio>(&id).await.unwrap();
  assert_eq!(bios.len(), 1);
  assert_eq!(bios[0].location, "Y");
}

#[tokio::test]
async fn bio_patch_replaces_social_list() {
  let s = store().await;
  let a = author(&s, "Jemisin").await.unwrap();
  let id = a.id().to_string();
  let u = user(&s, "admin").await;
  let subs = SubDocuments::new(&s);

  let draft = json!({
    "location": "Brooklyn",
    "description": "bio",
    "social": [
      { "channel": "web", "link": "https://a.example" },
      { "channel": "mastodon", "link": "https://b.example" },
    ],
  });
  let parent = subs.create::<Author, Bio>(&id, draft, u.id).await.unwrap();
  let bio_id = parent.embedded.bio.as_slice()[0].id.to_string();

  let patch = json!({
    "reviewAuthor": "NYT",
    "social": [{ "channel": "web", "link": "https://c.example" }],
  });
  let parent = subs.update::<Author, Bio>(&id, &bio_id, patch).await.unwrap();
  let stored = &parent.embedded.bio.as_slice()[0];
  assert_eq!(stored.location, "Brooklyn");
  assert_eq!(stored.review_author.as_deref(), Some("NYT"));
  assert_eq!(stored.social.len(), 1);
  assert_eq!(stored.social.as_slice()[0].link, "https://c.example");
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn duplicate_username_is_rejected() {
  let s = store().await;
  user(&s, "sam").await;
  let again = s
    .insert_user(User::local("sam", "x".into()))
    .await
    .unwrap();
  assert!(matches!(again, Write::Duplicate));
}

#[tokio::test]
async fn find_users_skips_unknown_ids() {
  let s = store().await;
  let a = user(&s, "a").await;
  let b = user(&s, "b").await;

  let mut found = s
    .find_users(vec![a.id, Uuid::new_v4(), b.id])
    .await
    .unwrap();
  found.sort_by(|x, y| x.username.cmp(&y.username));
  let names: Vec<&str> = found.iter().map(|u| u.username.as_str()).collect();
  assert_eq!(names, ["a", "b"]);

  assert!(s.find_users(vec![]).await.unwrap().is_empty());
}

#[tokio::test]
async fn provider_lookup() {
  let s = store().await;
  let fed = User::federated("fb-user", Provider::Facebook, "1234");
  s.insert_user(fed.clone()).await.unwrap();

  let hit = s
    .find_user_by_provider(Provider::Facebook, "1234".into())
    .await
    .unwrap();
  assert_eq!(hit.map(|u| u.id), Some(fed.id));

  let miss = s
    .find_user_by_provider(Provider::Google, "1234".into())
    .await
    .unwrap();
  assert!(miss.is_none());
}

#[tokio::test]
async fn set_admin_flags_existing_user_only() {
  let s = store().await;
  let u = user(&s, "boss").await;
  assert!(!u.admin);

  let promoted = s.set_admin("boss".into(), true).await.unwrap().unwrap();
  assert!(promoted.admin);
  assert_eq!(promoted.id, u.id);

  assert!(s.set_admin("nobody".into(), true).await.unwrap().is_none());
}
