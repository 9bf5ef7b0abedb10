//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
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

  #[error("bad request: {0}")]
  BadRequest(String),

  /// The data layer has not been published yet.
  #[error("data layer is still loading")]
  Unavailable,

  #[error("internal error: {0}")]
  Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<hatab_core::Error> for ApiError {
  fn from(err: hatab_core::Error) -> Self {
    use hatab_core::Error as E;
    match err {
      E::UnknownDomain(_) | E::UnknownLevel(_) | E::UnknownDimension(_) => {
        ApiError::BadRequest(err.to_string())
      }
      E::NotInitialized => ApiError::Unavailable,
      other => ApiError::Internal(Box::new(other)),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Unavailable => (StatusCode::SERVICE_UNAVAILABLE, self.to_string()),
      ApiError::Internal(e) => {
        tracing::error!(error = %e, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_owned())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
