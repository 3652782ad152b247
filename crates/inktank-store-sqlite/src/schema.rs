//! SQL schema for the Inktank SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per parent document. Embedded comments, ratings and bios live
-- inside body_json and are never stored anywhere else.
CREATE TABLE IF NOT EXISTS documents (
    kind        TEXT    NOT NULL,   -- 'book' | 'author'
    doc_id      TEXT    NOT NULL,
    unique_key  TEXT,               -- author name; NULL for books
    version     INTEGER NOT NULL,   -- bumped on every write
    body_json   TEXT    NOT NULL,
    created_at  TEXT    NOT NULL,   -- ISO 8601 UTC
    PRIMARY KEY (kind, doc_id),
    UNIQUE (kind, unique_key)
);

CREATE TABLE IF NOT EXISTS users (
    user_id        TEXT PRIMARY KEY,
    username       TEXT NOT NULL UNIQUE,
    password_hash  TEXT,               -- argon2 PHC string; NULL for provider logins
    firstname      TEXT,
    lastname       TEXT,
    admin          INTEGER NOT NULL DEFAULT 0,
    facebook_id    TEXT UNIQUE,
    google_id      TEXT UNIQUE,
    created_at     TEXT NOT NULL
);

PRAGMA user_version = 1;
";
