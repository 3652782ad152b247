//! [`SqliteStore`], the SQLite implementation of [`CatalogStore`].

use std::path::Path;

use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use inktank_core::{
  parent::Parent,
  store::{CatalogStore, Write},
  user::{Provider, User},
};

use crate::{
  Result,
  encode::{
    Outcome, RawUser, USER_COLUMNS, decode_doc, encode_doc, encode_dt, encode_uuid,
    is_constraint_violation,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An Inktank catalog backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store; used by the test suites.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run a `SELECT <USER_COLUMNS> ... WHERE <filter>` with a single text
  /// parameter and return at most one user.
  async fn user_where(&self, filter: &'static str, value: String) -> Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {filter}");

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params![value], RawUser::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }
}

// ─── CatalogStore impl ───────────────────────────────────────────────────────

impl CatalogStore for SqliteStore {
  type Error = crate::Error;

  // ── Parents ───────────────────────────────────────────────────────────────

  async fn insert_parent<P: Parent>(&self, mut doc: P) -> Result<Write<P>> {
    doc.meta_mut().version = 1;

    let kind   = P::KIND.as_str();
    let id_str = encode_uuid(doc.id());
    let key    = doc.unique_key().map(str::to_owned);
    let at_str = encode_dt(doc.meta().created_at);
    let body   = encode_doc(&doc)?;

    let outcome = self
      .conn
      .call(move |conn| {
        let inserted = conn.execute(
          "INSERT INTO documents (kind, doc_id, unique_key, version, body_json, created_at)
           VALUES (?1, ?2, ?3, 1, ?4, ?5)",
          rusqlite::params![kind, id_str, key, body, at_str],
        );
        match inserted {
          Ok(_) => Ok(Outcome::Applied),
          Err(e) if is_constraint_violation(&e) => Ok(Outcome::Duplicate),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    Ok(outcome.with(doc))
  }

  async fn get_parent<P: Parent>(&self, id: Uuid) -> Result<Option<P>> {
    let kind   = P::KIND.as_str();
    let id_str = encode_uuid(id);

    let body: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT body_json FROM documents WHERE kind = ?1 AND doc_id = ?2",
              rusqlite::params![kind, id_str],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    body.as_deref().map(decode_doc::<P>).transpose()
  }

  async fn list_parents<P: Parent>(&self) -> Result<Vec<P>> {
    let kind = P::KIND.as_str();

    let bodies: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn
          .prepare("SELECT body_json FROM documents WHERE kind = ?1 ORDER BY rowid")?;
        let rows = stmt
          .query_map(rusqlite::params![kind], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;

    bodies.iter().map(|b| decode_doc::<P>(b)).collect()
  }

  async fn replace_parent<P: Parent>(
    &self,
    mut doc: P,
    expected_version: u64,
  ) -> Result<Write<P>> {
    let next = expected_version + 1;
    doc.meta_mut().version = next;

    let kind     = P::KIND.as_str();
    let id_str   = encode_uuid(doc.id());
    let key      = doc.unique_key().map(str::to_owned);
    let body     = encode_doc(&doc)?;
    let expected = expected_version as i64;
    let next     = next as i64;

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let changed = match tx.execute(
          "UPDATE documents SET unique_key = ?1, version = ?2, body_json = ?3
           WHERE kind = ?4 AND doc_id = ?5 AND version = ?6",
          rusqlite::params![key, next, body, kind, id_str, expected],
        ) {
          Ok(n) => n,
          Err(e) if is_constraint_violation(&e) => return Ok(Outcome::Duplicate),
          Err(e) => return Err(e.into()),
        };

        let outcome = if changed == 1 {
          Outcome::Applied
        } else {
          let exists = tx
            .query_row(
              "SELECT 1 FROM documents WHERE kind = ?1 AND doc_id = ?2",
              rusqlite::params![kind, id_str],
              |_| Ok(()),
            )
            .optional()?
            .is_some();
          if exists { Outcome::Stale } else { Outcome::Missing }
        };

        tx.commit()?;
        Ok(outcome)
      })
      .await?;

    Ok(outcome.with(doc))
  }

  async fn delete_parent<P: Parent>(&self, id: Uuid) -> Result<Option<P>> {
    let kind   = P::KIND.as_str();
    let id_str = encode_uuid(id);

    let body: Option<String> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let body: Option<String> = tx
          .query_row(
            "SELECT body_json FROM documents WHERE kind = ?1 AND doc_id = ?2",
            rusqlite::params![kind, id_str],
            |row| row.get(0),
          )
          .optional()?;
        if body.is_some() {
          tx.execute(
            "DELETE FROM documents WHERE kind = ?1 AND doc_id = ?2",
            rusqlite::params![kind, id_str],
          )?;
        }
        tx.commit()?;
        Ok(body)
      })
      .await?;

    body.as_deref().map(decode_doc::<P>).transpose()
  }

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn insert_user(&self, user: User) -> Result<Write<User>> {
    let id_str   = encode_uuid(user.id);
    let at_str   = encode_dt(user.created_at);
    let username = user.username.clone();
    let hash     = user.password_hash.clone();
    let first    = user.firstname.clone();
    let last     = user.lastname.clone();
    let admin    = user.admin;
    let facebook = user.facebook_id.clone();
    let google   = user.google_id.clone();

    let outcome = self
      .conn
      .call(move |conn| {
        let inserted = conn.execute(
          "INSERT INTO users (user_id, username, password_hash, firstname, lastname,
                              admin, facebook_id, google_id, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![id_str, username, hash, first, last, admin, facebook, google, at_str],
        );
        match inserted {
          Ok(_) => Ok(Outcome::Applied),
          Err(e) if is_constraint_violation(&e) => Ok(Outcome::Duplicate),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    Ok(outcome.with(user))
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
    self.user_where("user_id = ?1", encode_uuid(id)).await
  }

  async fn find_users(&self, ids: Vec<Uuid>) -> Result<Vec<User>> {
    if ids.is_empty() {
      return Ok(Vec::new());
    }

    let id_strs: Vec<String> = ids.into_iter().map(encode_uuid).collect();
    let placeholders = vec!["?"; id_strs.len()].join(", ");
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE user_id IN ({placeholders})");

    let raws: Vec<RawUser> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(id_strs.iter()), RawUser::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawUser::into_user).collect()
  }

  async fn find_user_by_username(&self, username: String) -> Result<Option<User>> {
    self.user_where("username = ?1", username).await
  }

  async fn find_user_by_provider(
    &self,
    provider: Provider,
    provider_id: String,
  ) -> Result<Option<User>> {
    let filter = match provider {
      Provider::Facebook => "facebook_id = ?1",
      Provider::Google => "google_id = ?1",
    };
    self.user_where(filter, provider_id).await
  }

  async fn list_users(&self) -> Result<Vec<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY rowid");

    let raws: Vec<RawUser> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], RawUser::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawUser::into_user).collect()
  }

  async fn set_admin(&self, username: String, admin: bool) -> Result<Option<User>> {
    let name = username.clone();
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE users SET admin = ?1 WHERE username = ?2",
          rusqlite::params![admin, name],
        )?)
      })
      .await?;

    if changed == 0 {
      return Ok(None);
    }
    tracing::info!(%username, admin, "changed admin flag");
    self.find_user_by_username(username).await
  }
}
