//! Core types and trait definitions for the Inktank book catalog.
//!
//! This crate has no HTTP or database dependencies.
//! Parents (books and authors) are whole documents; their comments, ratings
//! and bio live inside them and are only ever persisted by saving the parent.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod catalog;
pub mod error;
pub mod manager;
pub mod parent;
pub mod payload;
pub mod policy;
pub mod resolve;
pub mod store;
pub mod subdoc;
pub mod user;

pub use error::{Error, Result};
pub use uuid::Uuid;

/// Parse a path identifier. Anything that is not a UUID can never name a
/// stored document, so callers treat `None` as "not found".
pub fn parse_id(raw: &str) -> Option<Uuid> { Uuid::parse_str(raw.trim()).ok() }
