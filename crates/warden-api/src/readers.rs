//! Handlers for `/readers` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/readers` | Whole registry, keyed by reader id |
//! | `GET`  | `/readers/:reader_id` | 404 if not found |
//! | `POST` | `/readers` | Body: `{"reader_id":"...","name":"..."}`; 201 when new |
//! | `POST` | `/readers/:reader_id/uids` | Body: [`RegisterUidBody`]; 201 when new |
//! | `POST` | `/readers/:reader_id/uids/:uid/toggle` | Returns the new `allowed` |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use warden_core::{
  command::{Outcome, RegisterReader, RegisterUid, ToggleUid},
  model::{Reader, Snapshot},
  store::SnapshotStore,
};

use crate::{
  ApiState,
  error::{ApiError, ApiJson},
};

fn status_for(outcome: Outcome) -> StatusCode {
  match outcome {
    Outcome::ReaderRegistered { created: true }
    | Outcome::UidRegistered { created: true } => StatusCode::CREATED,
    _ => StatusCode::OK,
  }
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /readers`
pub async fn list<S>(State(state): State<ApiState<S>>) -> Json<Snapshot>
where
  S: SnapshotStore + 'static,
{
  Json(state.registry.snapshot().await)
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /readers/:reader_id`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  Path(reader_id): Path<String>,
) -> Result<Json<Reader>, ApiError>
where
  S: SnapshotStore + 'static,
{
  let reader = state
    .registry
    .reader(&reader_id)
    .await
    .ok_or_else(|| ApiError::NotFound(format!("reader {reader_id} not found")))?;
  Ok(Json(reader))
}

// ─── Register reader ──────────────────────────────────────────────────────────

/// `POST /readers` — body: `{"reader_id":"front-door","name":"Front Door"}`
pub async fn register<S>(
  State(state): State<ApiState<S>>,
  ApiJson(body): ApiJson<RegisterReader>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SnapshotStore + 'static,
{
  let outcome = state.registry.execute(body).await?;
  Ok((status_for(outcome), Json(outcome)))
}

// ─── Register uid ─────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /readers/:reader_id/uids`.
#[derive(Debug, Deserialize)]
pub struct RegisterUidBody {
  pub uid:     String,
  pub name:    String,
  pub surname: String,
  #[serde(default)]
  pub allowed: bool,
}

/// `POST /readers/:reader_id/uids`
pub async fn register_uid<S>(
  State(state): State<ApiState<S>>,
  Path(reader_id): Path<String>,
  ApiJson(body): ApiJson<RegisterUidBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SnapshotStore + 'static,
{
  let command = RegisterUid {
    reader_id,
    uid:     body.uid,
    name:    body.name,
    surname: body.surname,
    allowed: body.allowed,
  };
  let outcome = state.registry.execute(command).await?;
  Ok((status_for(outcome), Json(outcome)))
}

// ─── Toggle ───────────────────────────────────────────────────────────────────

/// `POST /readers/:reader_id/uids/:uid/toggle`
pub async fn toggle_uid<S>(
  State(state): State<ApiState<S>>,
  Path((reader_id, uid)): Path<(String, String)>,
) -> Result<Json<Outcome>, ApiError>
where
  S: SnapshotStore + 'static,
{
  let outcome = state
    .registry
    .execute(ToggleUid { reader_id, uid })
    .await?;
  Ok(Json(outcome))
}
