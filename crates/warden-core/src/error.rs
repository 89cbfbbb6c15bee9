//! Error types for `warden-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("reader not found: {0}")]
  ReaderNotFound(String),

  #[error("uid {uid} not found on reader {reader_id}")]
  UidNotFound { reader_id: String, uid: String },

  /// The stored record has the wrong shape or an unsupported version.
  #[error("malformed snapshot: {0}")]
  Malformed(String),

  /// The persistence backend failed to load or save.
  #[error("storage unavailable: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  /// `true` for the lookup failures a caller can fix by registering first.
  pub fn is_not_found(&self) -> bool {
    matches!(self, Self::ReaderNotFound(_) | Self::UidNotFound { .. })
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
