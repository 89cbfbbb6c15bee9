//! Typed commands accepted by the registry.
//!
//! | Command | Required | Optional | Registry call |
//! |---|---|---|---|
//! | `register-reader` | `reader_id`, `name` | — | [`Registry::add_reader`] |
//! | `register-uid` | `reader_id`, `uid`, `name`, `surname` | `allowed` (false) | [`Registry::add_uid`] |
//! | `toggle-uid` | `reader_id`, `uid` | — | [`Registry::toggle_uid`] |
//!
//! Deserialising into these types is the whole of input validation; the
//! registry trusts what it is given.

use serde::{Deserialize, Serialize};

use crate::{Registry, Result, store::SnapshotStore};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterReader {
  pub reader_id: String,
  pub name:      String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterUid {
  pub reader_id: String,
  pub uid:       String,
  pub name:      String,
  pub surname:   String,
  #[serde(default)]
  pub allowed:   bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleUid {
  pub reader_id: String,
  pub uid:       String,
}

/// Any command, tagged by its external name, e.g.
/// `{"command": "toggle-uid", "reader_id": "...", "uid": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum Command {
  RegisterReader(RegisterReader),
  RegisterUid(RegisterUid),
  ToggleUid(ToggleUid),
}

impl Command {
  /// The external command name.
  pub fn name(&self) -> &'static str {
    match self {
      Self::RegisterReader(_) => "register-reader",
      Self::RegisterUid(_) => "register-uid",
      Self::ToggleUid(_) => "toggle-uid",
    }
  }
}

impl From<RegisterReader> for Command {
  fn from(c: RegisterReader) -> Self { Self::RegisterReader(c) }
}

impl From<RegisterUid> for Command {
  fn from(c: RegisterUid) -> Self { Self::RegisterUid(c) }
}

impl From<ToggleUid> for Command {
  fn from(c: ToggleUid) -> Self { Self::ToggleUid(c) }
}

/// What a successfully executed command changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
  ReaderRegistered { created: bool },
  UidRegistered { created: bool },
  UidToggled { allowed: bool },
}

impl<S: SnapshotStore> Registry<S> {
  /// Run `command` to completion, including the persist that follows it.
  pub async fn execute(&self, command: impl Into<Command>) -> Result<Outcome> {
    match command.into() {
      Command::RegisterReader(c) => {
        let created = self.add_reader(&c.reader_id, &c.name).await?;
        Ok(Outcome::ReaderRegistered { created })
      }
      Command::RegisterUid(c) => {
        let created = self
          .add_uid(&c.reader_id, &c.uid, &c.name, &c.surname, c.allowed)
          .await?;
        Ok(Outcome::UidRegistered { created })
      }
      Command::ToggleUid(c) => {
        let allowed = self.toggle_uid(&c.reader_id, &c.uid).await?;
        Ok(Outcome::UidToggled { allowed })
      }
    }
  }
}
