//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Parent documents are stored
//! as compact JSON. UUIDs are stored as hyphenated lowercase strings.

use chrono::{DateTime, Utc};
use inktank_core::{parent::Parent, store::Write, user::User};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Documents ────────────────────────────────────────────────────────────────

pub fn encode_doc<P: Parent>(doc: &P) -> Result<String> {
  Ok(serde_json::to_string(doc)?)
}

pub fn decode_doc<P: Parent>(s: &str) -> Result<P> { Ok(serde_json::from_str(s)?) }

// ─── Write outcomes ───────────────────────────────────────────────────────────

/// What a write closure reports back from the database thread; the document
/// itself stays on the async side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
  Applied,
  Missing,
  Stale,
  Duplicate,
}

impl Outcome {
  pub fn with<T>(self, value: T) -> Write<T> {
    match self {
      Self::Applied => Write::Applied(value),
      Self::Missing => Write::Missing,
      Self::Stale => Write::Stale,
      Self::Duplicate => Write::Duplicate,
    }
  }
}

/// `true` for UNIQUE / PRIMARY KEY violations.
pub fn is_constraint_violation(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(f, _)
      if f.code == rusqlite::ErrorCode::ConstraintViolation
  )
}

// ─── Row types ────────────────────────────────────────────────────────────────

/// Column list matching [`RawUser::from_row`].
pub const USER_COLUMNS: &str = "user_id, username, password_hash, firstname, \
                                lastname, admin, facebook_id, google_id, created_at";

/// Raw values read directly from a `users` row.
pub struct RawUser {
  pub user_id:       String,
  pub username:      String,
  pub password_hash: Option<String>,
  pub firstname:     Option<String>,
  pub lastname:      Option<String>,
  pub admin:         bool,
  pub facebook_id:   Option<String>,
  pub google_id:     Option<String>,
  pub created_at:    String,
}

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:       row.get(0)?,
      username:      row.get(1)?,
      password_hash: row.get(2)?,
      firstname:     row.get(3)?,
      lastname:      row.get(4)?,
      admin:         row.get(5)?,
      facebook_id:   row.get(6)?,
      google_id:     row.get(7)?,
      created_at:    row.get(8)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      id:            decode_uuid(&self.user_id)?,
      username:      self.username,
      password_hash: self.password_hash,
      firstname:     self.firstname,
      lastname:      self.lastname,
      admin:         self.admin,
      facebook_id:   self.facebook_id,
      google_id:     self.google_id,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}
