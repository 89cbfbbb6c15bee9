//! Handler for `POST /events` — an HTTP bridge onto the reader-event queue.
//!
//! The message is queued, not applied: the response only says the event was
//! accepted. Delivery is at-most-once, so a full queue rejects with 503.

use axum::{extract::State, http::StatusCode};
use serde::Deserialize;
use tokio::sync::mpsc::error::TrySendError;
use warden_core::{ingest::InboundMessage, store::SnapshotStore};

use crate::{
  ApiState,
  error::{ApiError, ApiJson},
};

#[derive(Debug, Deserialize)]
pub struct EventBody {
  /// Full topic, e.g. `access_control/reader/front-door`.
  pub topic:   String,
  /// A JSON string is forwarded as raw text; anything else is forwarded as
  /// its JSON encoding.
  pub payload: serde_json::Value,
}

impl EventBody {
  fn into_message(self) -> InboundMessage {
    let payload = match self.payload {
      serde_json::Value::String(s) => s.into_bytes(),
      other => other.to_string().into_bytes(),
    };
    InboundMessage::new(self.topic, payload)
  }
}

/// `POST /events` — returns 202 once queued.
pub async fn publish<S>(
  State(state): State<ApiState<S>>,
  ApiJson(body): ApiJson<EventBody>,
) -> Result<StatusCode, ApiError>
where
  S: SnapshotStore + 'static,
{
  match state.events.try_send(body.into_message()) {
    Ok(()) => Ok(StatusCode::ACCEPTED),
    Err(TrySendError::Full(message)) => {
      tracing::warn!(topic = %message.topic, "event queue full, dropping event");
      Err(ApiError::Unavailable("event queue is full".into()))
    }
    Err(TrySendError::Closed(_)) => {
      Err(ApiError::Unavailable("event ingestor is not running".into()))
    }
  }
}
