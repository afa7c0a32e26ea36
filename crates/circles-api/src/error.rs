//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Recoverable board errors become `{"notice": …}` bodies the client shows
//! to the user; everything else is `{"error": …}`.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use circles_core::Error;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub Error);

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match &self.0 {
      Error::DuplicateTopic(_) | Error::PostDeleted(_) => StatusCode::CONFLICT,
      Error::EmptyTopic | Error::EmptyEdit => StatusCode::UNPROCESSABLE_ENTITY,
      Error::Unauthenticated => StatusCode::UNAUTHORIZED,
      Error::AuthDenied { .. } | Error::NotAllowed(_) => StatusCode::FORBIDDEN,
      Error::CircleNotFound(_) | Error::PostNotFound(_) => StatusCode::NOT_FOUND,
      Error::ProviderUnavailable(_) => StatusCode::BAD_GATEWAY,
      Error::NameTaken(_) | Error::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();

    if self.0.is_recoverable() {
      return (status, Json(json!({ "notice": self.0.to_string() }))).into_response();
    }

    let message = match &self.0 {
      Error::ProviderUnavailable(_) | Error::Storage(_) => {
        tracing::error!(error = %self.0, "request failed");
        "internal error".to_owned()
      }
      other => other.to_string(),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn notices_and_denials_map_to_distinct_statuses() {
    let cases = [
      (Error::DuplicateTopic("books".into()), StatusCode::CONFLICT),
      (Error::EmptyEdit, StatusCode::UNPROCESSABLE_ENTITY),
      (Error::Unauthenticated, StatusCode::UNAUTHORIZED),
      (Error::NotAllowed("x@example.com".into()), StatusCode::FORBIDDEN),
      (Error::ProviderUnavailable("timeout".into()), StatusCode::BAD_GATEWAY),
    ];
    for (err, status) in cases {
      assert_eq!(ApiError(err).status(), status);
    }
  }
}
