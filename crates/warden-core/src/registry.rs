//! [`Registry`] — the single owner of the reader/credential snapshot.
//!
//! Every mutation takes the snapshot lock, applies the change, and writes the
//! full snapshot through the [`SnapshotStore`] before releasing the lock. A
//! caller that sees `Ok` therefore knows the change is durable, and two
//! mutations of the same key are persisted in the order they were applied.

use std::collections::btree_map::Entry;

use tokio::sync::Mutex;

use crate::{
  Error, Result,
  model::{Credential, Reader, Snapshot},
  store::{STORAGE_KEY, SnapshotRecord, SnapshotStore, encode_snapshot},
};

/// The in-memory registry of readers and their credentials, mirrored to a
/// [`SnapshotStore`].
///
/// Share it between the command surface and the event worker with an `Arc`.
pub struct Registry<S> {
  state: Mutex<Snapshot>,
  store: S,
}

impl<S: SnapshotStore> Registry<S> {
  /// Create an empty registry. Call [`Registry::load`] to hydrate it.
  pub fn new(store: S) -> Self {
    Self {
      state: Mutex::new(Snapshot::default()),
      store,
    }
  }

  /// The backing store.
  pub fn store(&self) -> &S { &self.store }

  // ── Persistence ─────────────────────────────────────────────────────────

  /// Replace the in-memory state with the stored snapshot.
  ///
  /// An absent record yields an empty registry. A record with the wrong shape
  /// or version is rejected with [`Error::Malformed`] and leaves the current
  /// state untouched.
  pub async fn load(&self) -> Result<()> {
    let mut state = self.state.lock().await;

    let raw = self
      .store
      .load(STORAGE_KEY)
      .await
      .map_err(|e| Error::Storage(Box::new(e)))?;

    *state = match raw {
      Some(raw) => SnapshotRecord::decode(&raw)?.data,
      None => Snapshot::default(),
    };

    tracing::info!(
      readers = state.readers.len(),
      credentials = state.credential_count(),
      "registry loaded"
    );
    Ok(())
  }

  /// Write the full snapshot to the store.
  pub async fn save(&self) -> Result<()> {
    let state = self.state.lock().await;
    self.persist(&state).await
  }

  async fn persist(&self, snapshot: &Snapshot) -> Result<()> {
    let record = encode_snapshot(snapshot)?;
    self
      .store
      .save(STORAGE_KEY, record)
      .await
      .map_err(|e| {
        tracing::error!(error = %e, "failed to persist registry snapshot");
        Error::Storage(Box::new(e))
      })
  }

  // ── Mutations ───────────────────────────────────────────────────────────

  /// Register a reader, or rename it if it already exists.
  ///
  /// An existing reader keeps its credential table. Returns `true` if the
  /// reader was newly created.
  pub async fn add_reader(&self, reader_id: &str, name: &str) -> Result<bool> {
    let mut state = self.state.lock().await;

    let created = match state.readers.entry(reader_id.to_owned()) {
      Entry::Occupied(mut entry) => {
        entry.get_mut().name = name.to_owned();
        false
      }
      Entry::Vacant(entry) => {
        entry.insert(Reader::new(name));
        true
      }
    };

    self.persist(&state).await?;
    tracing::info!(reader_id = %reader_id, name = %name, created, "reader registered");
    Ok(created)
  }

  /// Register (or overwrite) a credential under an existing reader.
  ///
  /// Fails with [`Error::ReaderNotFound`] if the reader has not been
  /// registered; nothing is created or persisted in that case. Returns `true`
  /// if the uid was new to the reader.
  pub async fn add_uid(
    &self,
    reader_id: &str,
    uid: &str,
    name: &str,
    surname: &str,
    allowed: bool,
  ) -> Result<bool> {
    self
      .merge_uid(reader_id, uid, Some(name), Some(surname), Some(allowed))
      .await
  }

  /// Like [`Registry::add_uid`], but a `None` field keeps the value already
  /// stored for the uid. A uid seen for the first time gets empty holder
  /// fields and `allowed = false` in place of the missing ones.
  pub async fn merge_uid(
    &self,
    reader_id: &str,
    uid: &str,
    name: Option<&str>,
    surname: Option<&str>,
    allowed: Option<bool>,
  ) -> Result<bool> {
    let mut state = self.state.lock().await;

    let reader = state
      .readers
      .get_mut(reader_id)
      .ok_or_else(|| Error::ReaderNotFound(reader_id.to_owned()))?;

    let (created, allowed) = match reader.uids.entry(uid.to_owned()) {
      Entry::Occupied(mut entry) => {
        let credential = entry.get_mut();
        if let Some(name) = name {
          credential.name = name.to_owned();
        }
        if let Some(surname) = surname {
          credential.surname = surname.to_owned();
        }
        if let Some(allowed) = allowed {
          credential.allowed = allowed;
        }
        (false, credential.allowed)
      }
      Entry::Vacant(entry) => {
        let credential = entry.insert(Credential::new(
          name.unwrap_or_default(),
          surname.unwrap_or_default(),
          allowed.unwrap_or_default(),
        ));
        (true, credential.allowed)
      }
    };

    self.persist(&state).await?;
    tracing::info!(
      reader_id = %reader_id,
      uid = %uid,
      allowed,
      created,
      "uid registered"
    );
    Ok(created)
  }

  /// Flip the `allowed` flag of a credential and return its new value.
  ///
  /// Never creates entries: an unknown reader or uid is reported as not found
  /// and nothing is persisted.
  pub async fn toggle_uid(&self, reader_id: &str, uid: &str) -> Result<bool> {
    let mut state = self.state.lock().await;

    let reader = state
      .readers
      .get_mut(reader_id)
      .ok_or_else(|| Error::ReaderNotFound(reader_id.to_owned()))?;
    let credential =
      reader.uids.get_mut(uid).ok_or_else(|| Error::UidNotFound {
        reader_id: reader_id.to_owned(),
        uid:       uid.to_owned(),
      })?;

    credential.allowed = !credential.allowed;
    let allowed = credential.allowed;

    self.persist(&state).await?;
    tracing::info!(reader_id = %reader_id, uid = %uid, allowed, "uid toggled");
    Ok(allowed)
  }

  // ── Reads ───────────────────────────────────────────────────────────────

  /// A copy of the whole registry.
  pub async fn snapshot(&self) -> Snapshot { self.state.lock().await.clone() }

  pub async fn reader(&self, reader_id: &str) -> Option<Reader> {
    self.state.lock().await.readers.get(reader_id).cloned()
  }

  pub async fn credential(
    &self,
    reader_id: &str,
    uid: &str,
  ) -> Option<Credential> {
    self
      .state
      .lock()
      .await
      .readers
      .get(reader_id)
      .and_then(|r| r.uids.get(uid))
      .cloned()
  }

  /// Whether `uid` is currently allowed on `reader_id`. Unknown keys are
  /// denied.
  pub async fn is_allowed(&self, reader_id: &str, uid: &str) -> bool {
    self
      .credential(reader_id, uid)
      .await
      .is_some_and(|c| c.allowed)
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use serde_json::json;

  use super::*;
  use crate::store::{MemoryStore, STORAGE_VERSION};

  fn registry() -> Registry<MemoryStore> { Registry::new(MemoryStore::new()) }

  async fn front_door(reg: &Registry<MemoryStore>) {
    reg.add_reader("front-door", "Front Door").await.unwrap();
    reg
      .add_uid("front-door", "AABBCC", "Jane", "Doe", false)
      .await
      .unwrap();
  }

  // ─── Loading ─────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn load_without_record_starts_empty() {
    let reg = registry();
    reg.load().await.unwrap();
    assert!(reg.snapshot().await.is_empty());
    assert_eq!(reg.store().saves(), 0);
  }

  #[tokio::test]
  async fn load_rejects_malformed_record() {
    let raw = json!({ "version": STORAGE_VERSION, "key": STORAGE_KEY, "data": 7 });
    let reg = Registry::new(MemoryStore::with_record(STORAGE_KEY, raw.to_string()));
    let err = reg.load().await.unwrap_err();
    assert!(matches!(err, Error::Malformed(_)), "got {err:?}");
  }

  #[tokio::test]
  async fn load_surfaces_storage_failure() {
    let store = MemoryStore::new();
    store.set_failing(true);
    let reg = Registry::new(store);
    let err = reg.load().await.unwrap_err();
    assert!(matches!(err, Error::Storage(_)), "got {err:?}");
    assert!(reg.snapshot().await.is_empty());
  }

  // ─── Readers ─────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn add_reader_persists() {
    let reg = registry();
    assert!(reg.add_reader("lobby", "Lobby").await.unwrap());
    assert_eq!(reg.store().saves(), 1);
    assert_eq!(reg.reader("lobby").await, Some(Reader::new("Lobby")));
  }

  #[tokio::test]
  async fn re_registering_reader_renames_and_keeps_credentials() {
    let reg = registry();
    front_door(&reg).await;
    let before = reg.reader("front-door").await.unwrap().uids;

    let created = reg.add_reader("front-door", "Main Entrance").await.unwrap();
    assert!(!created);

    let reader = reg.reader("front-door").await.unwrap();
    assert_eq!(reader.name, "Main Entrance");
    assert_eq!(reader.uids, before);
  }

  // ─── Credentials ─────────────────────────────────────────────────────────

  #[tokio::test]
  async fn add_uid_for_unknown_reader_fails_without_side_effects() {
    let reg = registry();
    let err = reg
      .add_uid("ghost", "01", "A", "B", false)
      .await
      .unwrap_err();
    assert!(matches!(err, Error::ReaderNotFound(ref r) if r == "ghost"));
    assert!(reg.snapshot().await.is_empty());
    assert_eq!(reg.store().saves(), 0);
  }

  #[tokio::test]
  async fn add_uid_overwrites_existing_entry() {
    let reg = registry();
    front_door(&reg).await;
    let created = reg
      .add_uid("front-door", "AABBCC", "John", "Roe", true)
      .await
      .unwrap();
    assert!(!created);
    assert_eq!(
      reg.credential("front-door", "AABBCC").await,
      Some(Credential::new("John", "Roe", true))
    );
  }

  #[tokio::test]
  async fn merge_uid_keeps_fields_that_are_not_given() {
    let reg = registry();
    reg.add_reader("r", "R").await.unwrap();
    reg.add_uid("r", "01", "Jane", "Doe", true).await.unwrap();

    let created = reg.merge_uid("r", "01", None, None, None).await.unwrap();
    assert!(!created);
    assert_eq!(
      reg.credential("r", "01").await,
      Some(Credential::new("Jane", "Doe", true))
    );

    reg
      .merge_uid("r", "01", Some("Janet"), None, Some(false))
      .await
      .unwrap();
    assert_eq!(
      reg.credential("r", "01").await,
      Some(Credential::new("Janet", "Doe", false))
    );
  }

  #[tokio::test]
  async fn merge_uid_fills_a_new_uid_with_defaults() {
    let reg = registry();
    reg.add_reader("r", "R").await.unwrap();

    let created = reg.merge_uid("r", "02", None, None, None).await.unwrap();
    assert!(created);
    assert_eq!(reg.credential("r", "02").await, Some(Credential::default()));
    assert_eq!(reg.store().saves(), 2);

    let err = reg
      .merge_uid("ghost", "02", None, None, None)
      .await
      .unwrap_err();
    assert!(matches!(err, Error::ReaderNotFound(_)));
    assert_eq!(reg.store().saves(), 2);
  }

  #[tokio::test]
  async fn same_uid_on_two_readers_is_independent() {
    let reg = registry();
    reg.add_reader("a", "A").await.unwrap();
    reg.add_reader("b", "B").await.unwrap();
    reg.add_uid("a", "X", "N", "S", false).await.unwrap();
    reg.add_uid("b", "X", "N", "S", false).await.unwrap();

    reg.toggle_uid("a", "X").await.unwrap();
    assert!(reg.is_allowed("a", "X").await);
    assert!(!reg.is_allowed("b", "X").await);
  }

  #[tokio::test]
  async fn replaying_registration_is_idempotent() {
    let once = registry();
    once.add_reader("r", "R").await.unwrap();
    once.add_uid("r", "01", "A", "B", true).await.unwrap();

    let twice = registry();
    twice.add_reader("r", "R").await.unwrap();
    twice.add_uid("r", "01", "A", "B", true).await.unwrap();
    twice.add_uid("r", "01", "A", "B", true).await.unwrap();

    assert_eq!(once.snapshot().await, twice.snapshot().await);
  }

  // ─── Toggling ────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn toggle_twice_restores_original_value() {
    let reg = registry();
    front_door(&reg).await;

    assert!(reg.toggle_uid("front-door", "AABBCC").await.unwrap());
    assert!(!reg.toggle_uid("front-door", "AABBCC").await.unwrap());
    assert!(!reg.is_allowed("front-door", "AABBCC").await);
  }

  #[tokio::test]
  async fn toggle_unknown_reader_is_not_found_and_not_persisted() {
    let reg = registry();
    let err = reg.toggle_uid("unknown-reader", "X").await.unwrap_err();
    assert!(err.is_not_found());
    assert!(matches!(err, Error::ReaderNotFound(_)));
    assert!(reg.snapshot().await.is_empty());
    assert_eq!(reg.store().saves(), 0);
  }

  #[tokio::test]
  async fn toggle_unknown_uid_does_not_create_it() {
    let reg = registry();
    reg.add_reader("r", "R").await.unwrap();
    let saves = reg.store().saves();

    let err = reg.toggle_uid("r", "missing").await.unwrap_err();
    assert!(matches!(err, Error::UidNotFound { .. }), "got {err:?}");
    assert!(reg.credential("r", "missing").await.is_none());
    assert_eq!(reg.store().saves(), saves);
  }

  // ─── Durability ──────────────────────────────────────────────────────────

  #[tokio::test]
  async fn failed_save_is_reported_but_memory_keeps_mutation() {
    let reg = registry();
    reg.add_reader("r", "R").await.unwrap();
    reg.store().set_failing(true);

    let err = reg.add_uid("r", "01", "A", "B", false).await.unwrap_err();
    assert!(matches!(err, Error::Storage(_)), "got {err:?}");
    assert!(reg.credential("r", "01").await.is_some());

    reg.store().set_failing(false);
    reg.save().await.unwrap();
    let raw = reg.store().raw(STORAGE_KEY).await.unwrap();
    assert!(raw.contains("\"01\""), "record: {raw}");
  }

  #[tokio::test]
  async fn front_door_scenario_survives_reload() {
    let reg = registry();
    front_door(&reg).await;

    assert!(reg.toggle_uid("front-door", "AABBCC").await.unwrap());
    assert!(!reg.toggle_uid("front-door", "AABBCC").await.unwrap());
    let before = reg.snapshot().await;

    let raw = reg.store().raw(STORAGE_KEY).await.unwrap();
    let reloaded = Registry::new(MemoryStore::with_record(STORAGE_KEY, raw));
    reloaded.load().await.unwrap();

    assert_eq!(reloaded.snapshot().await, before);
    assert_eq!(
      reloaded.credential("front-door", "AABBCC").await,
      Some(Credential::new("Jane", "Doe", false))
    );
  }

  #[tokio::test]
  async fn concurrent_toggles_are_serialised() {
    let reg = Arc::new(registry());
    front_door(&reg).await;

    let handles: Vec<_> = (0..10)
      .map(|_| {
        let reg = Arc::clone(&reg);
        tokio::spawn(async move {
          reg.toggle_uid("front-door", "AABBCC").await.unwrap();
        })
      })
      .collect();
    for h in handles {
      h.await.unwrap();
    }

    // An even number of flips lands back on the original value, in memory and
    // in the last persisted record.
    assert!(!reg.is_allowed("front-door", "AABBCC").await);
    let raw = reg.store().raw(STORAGE_KEY).await.unwrap();
    let stored = SnapshotRecord::decode(&raw).unwrap().data;
    assert_eq!(stored, reg.snapshot().await);
  }
}
