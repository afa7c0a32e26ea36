//! JSON REST API for Circles.
//!
//! Exposes an axum [`Router`] backed by any [`BoardStore`]. Every route
//! requires a session cookie; the login flow that issues it lives in
//! `circles-server`.
//!
//! # Mounting
//!
//! ```rust,ignore
//! Router::new().merge(circles_api::api_router(store.clone()))
//! ```

pub mod circles;
pub mod error;
pub mod posts;
pub mod session;

use std::sync::Arc;

use axum::{
  Json, Router,
  routing::{get, post},
};
use circles_core::{board::Board, store::BoardStore, user::User};

pub use error::ApiError;
pub use session::{CurrentUser, SESSION_COOKIE};

/// `GET /me`
async fn me(CurrentUser(user): CurrentUser) -> Json<User> { Json(user) }

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be merged into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: BoardStore + 'static,
{
  Router::new()
    .route("/me", get(me))
    // Circles
    .route("/circles", get(circles::list::<S>).post(circles::create::<S>))
    .route("/circles/{id}", get(circles::get_one::<S>))
    // Posts
    .route("/circles/{id}/posts", post(posts::create::<S>))
    .route("/circles/{id}/posts/{post_id}/history", get(posts::history::<S>))
    .route("/circles/{id}/posts/{post_id}/edit", post(posts::edit::<S>))
    .route("/circles/{id}/posts/{post_id}/delete", post(posts::delete::<S>))
    .route("/circles/{id}/posts/{post_id}/undelete", post(posts::undelete::<S>))
    .with_state(Board::new(store))
}

// ─── Integration tests ────────────────────────────────────────────────────────
