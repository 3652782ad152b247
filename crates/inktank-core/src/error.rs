//! Error types for `inktank-core`.

use thiserror::Error;

use crate::{parent::ParentKind, subdoc::CollectionKind};

#[derive(Debug, Error)]
pub enum Error {
  #[error("{kind} {id} not found")]
  ParentNotFound { kind: ParentKind, id: String },

  #[error("{kind} {id} not found")]
  SubDocumentNotFound {
    parent_id: String,
    kind:      CollectionKind,
    id:        String,
  },

  #[error("invalid {field}: {reason}")]
  ValidationFailed { field: String, reason: String },

  /// The parent changed between load and persist.
  #[error("{kind} {id} was modified by another request")]
  Conflict { kind: ParentKind, id: String },

  #[error("{what} {key:?} already exists")]
  Duplicate { what: String, key: String },

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
    Self::ValidationFailed { field: field.into(), reason: reason.into() }
  }

  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
