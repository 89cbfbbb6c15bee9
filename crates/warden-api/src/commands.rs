//! Handler for `POST /commands` — any [`Command`] as tagged JSON.

use axum::{
  Json,
  extract::State,
};
use warden_core::{
  command::{Command, Outcome},
  store::SnapshotStore,
};

use crate::{
  ApiState,
  error::{ApiError, ApiJson},
};

/// `POST /commands` — body: `{"command":"toggle-uid","reader_id":"...","uid":"..."}`
pub async fn execute<S>(
  State(state): State<ApiState<S>>,
  ApiJson(command): ApiJson<Command>,
) -> Result<Json<Outcome>, ApiError>
where
  S: SnapshotStore + 'static,
{
  tracing::debug!(command = command.name(), "executing command");
  let outcome = state.registry.execute(command).await?;
  Ok(Json(outcome))
}
