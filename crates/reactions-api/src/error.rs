//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every error body has the shape `{"message": "..."}`. Storage failures are
//! reported with a generic message; their detail is logged by the service.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use reactions_core::ReactionError;
use serde_json::json;
use thiserror::Error;

pub const MSG_INVALID: &str = "Invalid request.";
pub const MSG_UNAUTHENTICATED: &str = "A voter identity is required to react.";
pub const MSG_MODE_DISABLED: &str = "Dislike is disabled.";
pub const MSG_STORAGE: &str = "Something went wrong. Please try again.";

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("bad request: {0}")]
  BadRequest(String),

  /// No resolvable voter identity on a voting request.
  #[error("unauthenticated")]
  Unauthenticated,

  /// Missing or wrong administrator credentials.
  #[error("unauthorized")]
  Unauthorized,

  #[error("dislike is disabled")]
  ModeDisabled,

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<ReactionError> for ApiError {
  fn from(e: ReactionError) -> Self {
    match e {
      ReactionError::InvalidRequest(m) => Self::BadRequest(m),
      ReactionError::Unauthenticated => Self::Unauthenticated,
      ReactionError::ModeDisabled => Self::ModeDisabled,
      ReactionError::StorageUnavailable(source) => Self::Store(source),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, format!("{MSG_INVALID} {m}")),
      ApiError::Unauthenticated => (StatusCode::UNAUTHORIZED, MSG_UNAUTHENTICATED.to_owned()),
      ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_owned()),
      ApiError::ModeDisabled => (StatusCode::FORBIDDEN, MSG_MODE_DISABLED.to_owned()),
      // Already logged with its source by the service.
      ApiError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, MSG_STORAGE.to_owned()),
    };

    let mut res = (status, Json(json!({ "message": message }))).into_response();
    if matches!(self, ApiError::Unauthorized) {
      res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"reactions-admin\""),
      );
    }
    res
  }
}
