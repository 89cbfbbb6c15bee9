//! SQL schema for the Warden SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per storage key. Each save rewrites the whole record.
CREATE TABLE IF NOT EXISTS snapshots (
    key       TEXT PRIMARY KEY,
    record    TEXT NOT NULL,   -- versioned JSON record
    saved_at  TEXT NOT NULL    -- ISO 8601 UTC
);

PRAGMA user_version = 1;
";
