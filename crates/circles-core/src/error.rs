//! Error types for `circles-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  /// The identity provider refused the authorization request.
  #[error("Access denied: reason={reason} error={description}")]
  AuthDenied { reason: String, description: String },

  /// First-time login for an email that is not on the allow-list.
  #[error("{0} is not allowed to sign in")]
  NotAllowed(String),

  #[error("not signed in")]
  Unauthenticated,

  #[error("A circle with topic \"{0}\" already exists.")]
  DuplicateTopic(String),

  #[error("Unable to create circle: no topic")]
  EmptyTopic,

  #[error("Unable to save edit: no new content")]
  EmptyEdit,

  #[error("post {0} is deleted and cannot be edited")]
  PostDeleted(Uuid),

  #[error("circle not found: {0}")]
  CircleNotFound(Uuid),

  #[error("post not found: {0}")]
  PostNotFound(Uuid),

  /// A new identity's display name collides with an existing user.
  #[error("user name {0:?} is already taken")]
  NameTaken(String),

  #[error("identity provider unavailable: {0}")]
  ProviderUnavailable(String),

  #[error("storage error: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a backend error as a fatal storage failure.
  pub fn storage<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Storage(Box::new(e))
  }

  /// Whether this error is surfaced as a non-fatal notice with no state
  /// change, rather than blocking or failing the request.
  pub fn is_recoverable(&self) -> bool {
    matches!(
      self,
      Self::DuplicateTopic(_)
        | Self::EmptyTopic
        | Self::EmptyEdit
        | Self::PostDeleted(_)
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
