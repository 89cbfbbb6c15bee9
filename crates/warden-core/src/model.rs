//! Readers, credentials and the snapshot that holds them.
//!
//! The serialised form of [`Snapshot`] is the persisted layout:
//! `reader_id → {name, uids: {uid → {name, surname, allowed}}}`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ─── Credential ──────────────────────────────────────────────────────────────

/// A badge UID known to one reader, with its holder and permission flag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
  pub name:    String,
  pub surname: String,
  /// Whether downstream access logic should grant entry. New credentials
  /// start denied.
  #[serde(default)]
  pub allowed: bool,
}

impl Credential {
  pub fn new(
    name: impl Into<String>,
    surname: impl Into<String>,
    allowed: bool,
  ) -> Self {
    Self {
      name: name.into(),
      surname: surname.into(),
      allowed,
    }
  }
}

// ─── Reader ──────────────────────────────────────────────────────────────────

/// A physical access-control terminal. Owns its credential table exclusively.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reader {
  pub name: String,
  #[serde(default)]
  pub uids: BTreeMap<String, Credential>,
}

impl Reader {
  /// A reader with an empty credential table.
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      uids: BTreeMap::new(),
    }
  }
}

// ─── Snapshot ────────────────────────────────────────────────────────────────

/// The complete registry state; the unit of persistence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
  pub readers: BTreeMap<String, Reader>,
}

impl Snapshot {
  pub fn is_empty(&self) -> bool { self.readers.is_empty() }

  /// Total number of credentials across all readers.
  pub fn credential_count(&self) -> usize {
    self.readers.values().map(|r| r.uids.len()).sum()
  }
}
