//! The `BoardStore` trait — the durable content store behind the board.
//!
//! The trait is implemented by storage backends (e.g. `circles-store-sqlite`).
//! Higher layers (`circles-api`, `circles-server`) depend on this
//! abstraction, not on any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  circle::{Circle, CircleSummary},
  post::{NewPost, Post, PostHistory, Revision},
  user::{Category, NewUser, Session, User},
};

/// Abstraction over a Circles storage backend.
///
/// Every state-changing method is a single atomic unit: either all of its
/// writes become visible or none do. Uniqueness conflicts are reported in
/// the `Ok` value (as `None`), never as `Err`, so callers can turn them into
/// user-facing notices.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait BoardStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Persist a new user. Returns `None` if the provider id or the name is
  /// already taken.
  fn add_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn find_user_by_provider_id<'a>(
    &'a self,
    provider_id: &'a str,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  // ── Sessions ──────────────────────────────────────────────────────────

  /// Open a session for `user_id` with a freshly generated random token.
  fn open_session(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Session, Self::Error>> + Send + '_;

  /// Resolve a session token to its user. Returns `None` for unknown or
  /// closed sessions.
  fn session_user<'a>(
    &'a self,
    token: &'a str,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  /// Delete a session. Closing an unknown token is not an error.
  fn close_session<'a>(
    &'a self,
    token: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  // ── Categories ────────────────────────────────────────────────────────

  /// Returns `None` if a category with that name exists.
  fn add_category(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Option<Category>, Self::Error>> + Send + '_;

  fn list_categories(
    &self,
  ) -> impl Future<Output = Result<Vec<Category>, Self::Error>> + Send + '_;

  // ── Circles ───────────────────────────────────────────────────────────

  /// Persist a new circle. Returns `None` if the topic is already taken.
  fn add_circle(
    &self,
    topic: String,
    founder_id: Uuid,
  ) -> impl Future<Output = Result<Option<Circle>, Self::Error>> + Send + '_;

  fn get_circle(
    &self,
    circle_id: Uuid,
  ) -> impl Future<Output = Result<Option<Circle>, Self::Error>> + Send + '_;

  /// All circles ordered by topic ascending, each with its count of
  /// non-deleted posts.
  fn list_circles(
    &self,
  ) -> impl Future<Output = Result<Vec<CircleSummary>, Self::Error>> + Send + '_;

  // ── Posts ─────────────────────────────────────────────────────────────

  /// Record a new post. `created_at` and `last_revised_at` are set by the
  /// store to the same instant.
  fn add_post(
    &self,
    input: NewPost,
  ) -> impl Future<Output = Result<Post, Self::Error>> + Send + '_;

  fn get_post(
    &self,
    post_id: Uuid,
  ) -> impl Future<Output = Result<Option<Post>, Self::Error>> + Send + '_;

  /// Snapshot the post's current content into its history, then overwrite
  /// it, all in one transaction.
  fn revise_post(
    &self,
    post_id: Uuid,
    content: String,
    editor_id: Uuid,
  ) -> impl Future<Output = Result<Revision, Self::Error>> + Send + '_;

  /// Mark a post deleted. Already-deleted posts are returned unchanged.
  fn delete_post(
    &self,
    post_id: Uuid,
    deletor_id: Uuid,
  ) -> impl Future<Output = Result<Option<Post>, Self::Error>> + Send + '_;

  /// Clear a post's deleted flag, leaving the deletor columns as they are.
  fn undelete_post(
    &self,
    post_id: Uuid,
  ) -> impl Future<Output = Result<Option<Post>, Self::Error>> + Send + '_;

  /// Posts in a circle ordered by creation time ascending.
  fn list_posts(
    &self,
    circle_id: Uuid,
    include_deleted: bool,
  ) -> impl Future<Output = Result<Vec<Post>, Self::Error>> + Send + '_;

  /// A post's history, most recent snapshot first.
  fn list_history(
    &self,
    post_id: Uuid,
  ) -> impl Future<Output = Result<Vec<PostHistory>, Self::Error>> + Send + '_;
}
