//! Reader event ingestion.
//!
//! Readers publish on `<namespace>/reader/<reader_id>`. A transport (MQTT
//! bridge, HTTP endpoint, test harness) pushes each message onto an mpsc queue
//! as an [`InboundMessage`]; a single [`EventIngestor::run`] worker drains it
//! and turns every well-formed message into one [`Registry::merge_uid`] call.
//! Holder fields an event leaves out keep their stored values, so a bare scan
//! of a known badge changes nothing.
//!
//! Bad messages never stop the worker: they are logged and dropped.

use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::{Registry, store::SnapshotStore};

/// Default topic namespace.
pub const DEFAULT_NAMESPACE: &str = "access_control";

/// One message as received from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
  pub topic:   String,
  pub payload: Vec<u8>,
}

impl InboundMessage {
  pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
    Self {
      topic:   topic.into(),
      payload: payload.into(),
    }
  }
}

#[derive(Debug, Error)]
pub enum IngestError {
  #[error("topic {0:?} is not a reader channel")]
  Topic(String),

  #[error("invalid payload: {0}")]
  Payload(String),

  #[error(transparent)]
  Registry(#[from] crate::Error),
}

/// Payload of a uid announcement. Holder fields are optional on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UidEvent {
  pub uid:     String,
  #[serde(default)]
  pub name:    Option<String>,
  #[serde(default)]
  pub surname: Option<String>,
  #[serde(default)]
  pub allowed: Option<bool>,
}

impl UidEvent {
  pub fn parse(payload: &[u8]) -> Result<Self, IngestError> {
    let event: Self = serde_json::from_slice(payload)
      .map_err(|e| IngestError::Payload(e.to_string()))?;
    if event.uid.trim().is_empty() {
      return Err(IngestError::Payload("uid is empty".into()));
    }
    Ok(event)
  }
}

/// The subscription filter covering every reader in `namespace`.
pub fn topic_filter(namespace: &str) -> String { format!("{namespace}/reader/#") }

/// Extract the reader id from `<namespace>/reader/<reader_id>`.
///
/// Deeper topics and empty ids are not reader channels.
pub fn reader_id_from_topic<'a>(namespace: &str, topic: &'a str) -> Option<&'a str> {
  let reader_id = topic
    .strip_prefix(namespace)?
    .strip_prefix("/reader/")?;
  (!reader_id.is_empty() && !reader_id.contains('/')).then_some(reader_id)
}

/// Drains reader events into a shared [`Registry`].
pub struct EventIngestor<S> {
  registry:  Arc<Registry<S>>,
  namespace: String,
}

impl<S: SnapshotStore> EventIngestor<S> {
  pub fn new(registry: Arc<Registry<S>>, namespace: impl Into<String>) -> Self {
    Self {
      registry,
      namespace: namespace.into(),
    }
  }

  /// A bounded queue for feeding [`EventIngestor::run`]. Publishers should use
  /// `try_send`: delivery is at-most-once, so a full queue drops the event.
  pub fn channel(
    capacity: usize,
  ) -> (mpsc::Sender<InboundMessage>, mpsc::Receiver<InboundMessage>) {
    mpsc::channel(capacity.max(1))
  }

  pub fn namespace(&self) -> &str { &self.namespace }

  /// Apply one message to the registry.
  pub async fn handle(&self, message: &InboundMessage) -> Result<(), IngestError> {
    let reader_id = reader_id_from_topic(&self.namespace, &message.topic)
      .ok_or_else(|| IngestError::Topic(message.topic.clone()))?;
    let event = UidEvent::parse(&message.payload)?;

    self
      .registry
      .merge_uid(
        reader_id,
        &event.uid,
        event.name.as_deref(),
        event.surname.as_deref(),
        event.allowed,
      )
      .await?;
    Ok(())
  }

  /// Consume `rx` until every sender is dropped.
  pub async fn run(self, mut rx: mpsc::Receiver<InboundMessage>) {
    tracing::info!(filter = %topic_filter(&self.namespace), "event ingestor started");

    while let Some(message) = rx.recv().await {
      if let Err(e) = self.handle(&message).await {
        tracing::warn!(topic = %message.topic, error = %e, "dropping reader event");
      }
    }

    tracing::info!("event ingestor stopped");
  }
}
