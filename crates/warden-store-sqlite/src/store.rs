//! [`SqliteStore`] — the SQLite implementation of [`SnapshotStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use warden_core::store::SnapshotStore;

use crate::{Error, Result, schema::SCHEMA};

/// A snapshot store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
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

  /// Open an in-memory store — useful for testing.
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

  /// When the record under `key` was last written, if ever.
  pub async fn saved_at(&self, key: &str) -> Result<Option<DateTime<Utc>>> {
    let key = key.to_owned();
    let raw: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT saved_at FROM snapshots WHERE key = ?1",
              rusqlite::params![key],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    // Rows are only ever written by `save`, which stores RFC 3339; anything
    // else is treated as unknown.
    Ok(
      raw
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc)),
    )
  }
}

// ─── SnapshotStore impl ──────────────────────────────────────────────────────

impl SnapshotStore for SqliteStore {
  type Error = Error;

  async fn load(&self, key: &str) -> Result<Option<String>> {
    let key = key.to_owned();
    let record = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT record FROM snapshots WHERE key = ?1",
              rusqlite::params![key],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;
    Ok(record)
  }

  async fn save(&self, key: &str, record: String) -> Result<()> {
    let key = key.to_owned();
    let saved_at = Utc::now().to_rfc3339();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO snapshots (key, record, saved_at) VALUES (?1, ?2, ?3)
           ON CONFLICT(key) DO UPDATE SET
             record   = excluded.record,
             saved_at = excluded.saved_at",
          rusqlite::params![key, record, saved_at],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
