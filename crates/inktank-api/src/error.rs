//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::{JsonRejection, QueryRejection},
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use inktank_core::Error as CoreError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler or guard.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Core(#[from] CoreError),

  /// Missing, malformed, or expired credential.
  #[error("unauthorized: {0}")]
  Unauthorized(String),

  /// Authenticated, but not allowed to do this.
  #[error("{username} is not permitted to {operation}")]
  Forbidden { username: String, operation: String },

  #[error("bad request: {0}")]
  BadRequest(String),

  /// The body was not JSON, or not the JSON the handler expects.
  #[error("invalid body: {}", .0.body_text())]
  Body(#[from] JsonRejection),

  #[error("invalid query: {}", .0.body_text())]
  Query(#[from] QueryRejection),

  #[error("internal error: {0}")]
  Internal(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  pub fn unauthorized(reason: impl Into<String>) -> Self {
    Self::Unauthorized(reason.into())
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self {
      ApiError::Core(e) => match e {
        CoreError::ParentNotFound { .. } | CoreError::SubDocumentNotFound { .. } => {
          StatusCode::NOT_FOUND
        }
        CoreError::ValidationFailed { .. } => StatusCode::BAD_REQUEST,
        CoreError::Conflict { .. } | CoreError::Duplicate { .. } => StatusCode::CONFLICT,
        CoreError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
      },
      ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
      ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Body(rejection) => rejection.status(),
      ApiError::Query(rejection) => rejection.status(),
      ApiError::Internal(_) | ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    }

    let mut res = (status, Json(json!({ "error": self.to_string() }))).into_response();
    if status == StatusCode::UNAUTHORIZED {
      res
        .headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    }
    res
  }
}

#[cfg(test)]
mod tests {
  use inktank_core::parent::ParentKind;

  use super::*;

  #[test]
  fn core_errors_map_to_statuses() {
    let cases = [
      (
        CoreError::ParentNotFound { kind: ParentKind::Book, id: "x".into() },
        StatusCode::NOT_FOUND,
      ),
      (CoreError::validation("rating", "too big"), StatusCode::BAD_REQUEST),
      (
        CoreError::Conflict { kind: ParentKind::Author, id: "y".into() },
        StatusCode::CONFLICT,
      ),
      (
        CoreError::Duplicate { what: "author".into(), key: "Le Guin".into() },
        StatusCode::CONFLICT,
      ),
    ];
    for (err, status) in cases {
      assert_eq!(ApiError::from(err).into_response().status(), status);
    }
  }

  #[test]
  fn unauthorized_carries_bearer_challenge() {
    let res = ApiError::unauthorized("no token").into_response();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(res.headers()[header::WWW_AUTHENTICATE], "Bearer");
  }
}
