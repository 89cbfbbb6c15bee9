//! The `SnapshotStore` trait and the versioned record it persists.
//!
//! The trait is implemented by storage backends (e.g. `warden-store-sqlite`).
//! The registry depends on this abstraction, not on any concrete backend.

use std::{
  collections::HashMap,
  future::Future,
  sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::{Error, Result, model::Snapshot};

/// Fixed key under which the registry snapshot is stored.
pub const STORAGE_KEY: &str = "access_control";

/// Layout version of [`SnapshotRecord`]. Bump when the snapshot shape changes.
pub const STORAGE_VERSION: u32 = 1;

// ─── Record ──────────────────────────────────────────────────────────────────

/// The envelope written to storage: a version, the storage key, and the full
/// snapshot as `data`.
///
/// Records are written with [`encode_snapshot`] and read back with
/// [`SnapshotRecord::decode`].
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotRecord {
  pub version: u32,
  pub key:     String,
  pub data:    Snapshot,
}

impl SnapshotRecord {
  /// Parse a stored record, rejecting unknown shapes and versions.
  pub fn decode(raw: &str) -> Result<Self> {
    let record: Self = serde_json::from_str(raw)
      .map_err(|e| Error::Malformed(e.to_string()))?;
    if record.version != STORAGE_VERSION {
      return Err(Error::Malformed(format!(
        "unsupported version {} (expected {STORAGE_VERSION})",
        record.version
      )));
    }
    if record.key != STORAGE_KEY {
      return Err(Error::Malformed(format!(
        "record key {:?} does not match {STORAGE_KEY:?}",
        record.key
      )));
    }
    Ok(record)
  }
}

/// Encode `snapshot` as a current-version record without cloning it.
pub fn encode_snapshot(snapshot: &Snapshot) -> Result<String> {
  #[derive(Serialize)]
  struct Borrowed<'a> {
    version: u32,
    key:     &'a str,
    data:    &'a Snapshot,
  }

  Ok(serde_json::to_string(&Borrowed {
    version: STORAGE_VERSION,
    key:     STORAGE_KEY,
    data:    snapshot,
  })?)
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the key-value backend holding the registry snapshot.
///
/// Records are opaque strings to the store; encoding and version checks live
/// in [`SnapshotRecord`]. A save replaces the previous record wholesale.
pub trait SnapshotStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Fetch the record stored under `key`. Returns `None` on first run.
  fn load<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + 'a;

  /// Replace the record stored under `key`.
  fn save<'a>(
    &'a self,
    key: &'a str,
    record: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

// ─── In-memory backend ───────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum MemoryStoreError {
  #[error("memory store is unavailable")]
  Unavailable,
}

/// A process-local store. Counts saves and can be switched into a failing
/// mode, which makes it handy for tests and embedded setups.
#[derive(Debug, Default)]
pub struct MemoryStore {
  records: RwLock<HashMap<String, String>>,
  saves:   AtomicUsize,
  failing: AtomicBool,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  /// A store pre-seeded with a raw record under `key`.
  pub fn with_record(key: &str, record: impl Into<String>) -> Self {
    let mut records = HashMap::new();
    records.insert(key.to_owned(), record.into());
    Self {
      records: RwLock::new(records),
      ..Self::default()
    }
  }

  /// Number of successful saves so far.
  pub fn saves(&self) -> usize { self.saves.load(Ordering::SeqCst) }

  /// When `true`, every load and save fails with
  /// [`MemoryStoreError::Unavailable`].
  pub fn set_failing(&self, failing: bool) {
    self.failing.store(failing, Ordering::SeqCst);
  }

  /// The raw record currently stored under `key`.
  pub async fn raw(&self, key: &str) -> Option<String> {
    self.records.read().await.get(key).cloned()
  }

  fn check(&self) -> Result<(), MemoryStoreError> {
    if self.failing.load(Ordering::SeqCst) {
      Err(MemoryStoreError::Unavailable)
    } else {
      Ok(())
    }
  }
}

impl SnapshotStore for MemoryStore {
  type Error = MemoryStoreError;

  async fn load(&self, key: &str) -> Result<Option<String>, MemoryStoreError> {
    self.check()?;
    Ok(self.records.read().await.get(key).cloned())
  }

  async fn save(
    &self,
    key: &str,
    record: String,
  ) -> Result<(), MemoryStoreError> {
    self.check()?;
    self.records.write().await.insert(key.to_owned(), record);
    self.saves.fetch_add(1, Ordering::SeqCst);
    Ok(())
  }
}
