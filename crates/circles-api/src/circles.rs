//! Handlers for `/circles` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/circles` | Ordered by topic, with live post counts |
//! | `POST` | `/circles` | Body: `{"topic":"..."}`; 201, or 409 notice if taken |
//! | `GET`  | `/circles/:id` | Circle and its posts; `?include_deleted=true` |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use circles_core::{
  board::Board,
  circle::{Circle, CircleSummary},
  post::Post,
  store::BoardStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::ApiError, session::CurrentUser};

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /circles`
pub async fn list<S>(
  State(board): State<Board<S>>,
  CurrentUser(_user): CurrentUser,
) -> Result<Json<Vec<CircleSummary>>, ApiError>
where
  S: BoardStore + 'static,
{
  Ok(Json(board.list_circles().await?))
}

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  #[serde(default)]
  pub topic: String,
}

/// `POST /circles` — body: `{"topic":"books"}`
pub async fn create<S>(
  State(board): State<Board<S>>,
  CurrentUser(user): CurrentUser,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: BoardStore + 'static,
{
  let circle = board.create_circle(&body.topic, &user).await?;
  Ok((StatusCode::CREATED, Json(circle)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ShowParams {
  /// If `true`, deleted posts are included. Default `false`.
  #[serde(default)]
  pub include_deleted: bool,
}

#[derive(Debug, Serialize)]
pub struct CircleView {
  pub circle: Circle,
  pub posts:  Vec<Post>,
}

/// `GET /circles/:id[?include_deleted=true]`
pub async fn get_one<S>(
  State(board): State<Board<S>>,
  CurrentUser(_user): CurrentUser,
  Path(circle_id): Path<Uuid>,
  Query(params): Query<ShowParams>,
) -> Result<Json<CircleView>, ApiError>
where
  S: BoardStore + 'static,
{
  let circle = board.circle(circle_id).await?;
  let posts = board.list_posts(circle_id, params.include_deleted).await?;
  Ok(Json(CircleView { circle, posts }))
}
