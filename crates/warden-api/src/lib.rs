//! JSON REST API for Warden.
//!
//! Exposes an axum [`Router`] backed by a shared [`Registry`] and the sender
//! half of the reader-event queue. Auth, TLS, and transport concerns are the
//! caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", warden_api::api_router(state))
//! ```

pub mod commands;
pub mod error;
pub mod events;
pub mod readers;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;
use warden_core::{Registry, ingest::InboundMessage, store::SnapshotStore};

pub use error::{ApiError, ApiJson};

/// Shared state threaded through all handlers.
pub struct ApiState<S> {
  pub registry: Arc<Registry<S>>,
  /// Feeds the event worker; see [`warden_core::ingest::EventIngestor`].
  pub events:   mpsc::Sender<InboundMessage>,
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self {
      registry: Arc::clone(&self.registry),
      events:   self.events.clone(),
    }
  }
}

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: ApiState<S>) -> Router<()>
where
  S: SnapshotStore + 'static,
{
  Router::new()
    // Readers
    .route("/readers", get(readers::list::<S>).post(readers::register::<S>))
    .route("/readers/{reader_id}", get(readers::get_one::<S>))
    // Credentials
    .route("/readers/{reader_id}/uids", post(readers::register_uid::<S>))
    .route(
      "/readers/{reader_id}/uids/{uid}/toggle",
      post(readers::toggle_uid::<S>),
    )
    // Generic command and event entry points
    .route("/commands", post(commands::execute::<S>))
    .route("/events", post(events::publish::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
