//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::{FromRequest, rejection::JsonRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  /// The request body could not be read as the expected JSON.
  #[error("bad request: {0}")]
  BadRequest(String),

  /// Storage or the event queue could not take the request right now.
  #[error("unavailable: {0}")]
  Unavailable(String),

  #[error("internal error: {0}")]
  Internal(String),
}

impl From<warden_core::Error> for ApiError {
  fn from(e: warden_core::Error) -> Self {
    use warden_core::Error;
    match e {
      Error::ReaderNotFound(_) | Error::UidNotFound { .. } => {
        ApiError::NotFound(e.to_string())
      }
      Error::Storage(_) => ApiError::Unavailable(e.to_string()),
      Error::Malformed(_) | Error::Serialization(_) => {
        ApiError::Internal(e.to_string())
      }
    }
  }
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self {
    ApiError::BadRequest(rejection.body_text())
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Unavailable(m) => (StatusCode::SERVICE_UNAVAILABLE, m.clone()),
      ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m.clone()),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}

/// [`Json`] extractor that rejects with [`ApiError`], so malformed bodies get
/// the same `{"error": ...}` shape as every other failure.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);
