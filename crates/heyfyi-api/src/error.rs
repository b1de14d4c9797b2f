//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use heyfyi_core::Error as CoreError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Core(#[from] CoreError),

  #[error("{0}")]
  BadRequest(String),

  #[error("You need to be logged in.")]
  Unauthorized,

  #[error("You are not allowed to do that.")]
  Forbidden,
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match self {
      Self::BadRequest(_) => StatusCode::BAD_REQUEST,
      Self::Unauthorized => StatusCode::UNAUTHORIZED,
      Self::Forbidden => StatusCode::FORBIDDEN,
      Self::Core(e) => match e {
        CoreError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        CoreError::NotYetVerified => StatusCode::FORBIDDEN,
        CoreError::AccountNotFound | CoreError::FactNotFound(_) => {
          StatusCode::NOT_FOUND
        }
        CoreError::Conflict(_) => StatusCode::CONFLICT,
        e if e.is_validation() => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
      },
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    }
    (status, Json(json!({ "error": self.to_string() }))).into_response()
  }
}
