//! Handlers for posts within a circle.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/circles/:id/posts` | Body: `{"content":"..."}`; 201, or 204 if empty |
//! | `GET`  | `/circles/:id/posts/:post_id/history` | Prior revisions, newest first |
//! | `POST` | `/circles/:id/posts/:post_id/edit` | Body: `{"content":"..."}`; 422 notice if empty |
//! | `POST` | `/circles/:id/posts/:post_id/delete` | Soft delete |
//! | `POST` | `/circles/:id/posts/:post_id/undelete` | |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use circles_core::{
  Error,
  board::Board,
  post::{Post, PostHistory},
  store::BoardStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::ApiError, session::CurrentUser};

/// JSON body accepted by post creation and edit.
#[derive(Debug, Deserialize)]
pub struct ContentBody {
  #[serde(default)]
  pub content: String,
}

/// Load a post, treating one filed under a different circle as missing.
async fn post_in_circle<S: BoardStore>(
  board: &Board<S>,
  circle_id: Uuid,
  post_id: Uuid,
) -> Result<Post, ApiError> {
  let post = board.post(post_id).await?;
  if post.circle_id != circle_id {
    return Err(Error::PostNotFound(post_id).into());
  }
  Ok(post)
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /circles/:id/posts` — returns 201 + the stored [`Post`], or 204 when
/// there was no content to post.
pub async fn create<S>(
  State(board): State<Board<S>>,
  CurrentUser(user): CurrentUser,
  Path(circle_id): Path<Uuid>,
  Json(body): Json<ContentBody>,
) -> Result<Response, ApiError>
where
  S: BoardStore + 'static,
{
  Ok(match board.create_post(circle_id, &body.content, &user).await? {
    Some(post) => (StatusCode::CREATED, Json(post)).into_response(),
    None => StatusCode::NO_CONTENT.into_response(),
  })
}

// ─── History ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct HistoryView {
  pub post:    Post,
  pub history: Vec<PostHistory>,
}

/// `GET /circles/:id/posts/:post_id/history`
pub async fn history<S>(
  State(board): State<Board<S>>,
  CurrentUser(_user): CurrentUser,
  Path((circle_id, post_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<HistoryView>, ApiError>
where
  S: BoardStore + 'static,
{
  let post = post_in_circle(&board, circle_id, post_id).await?;
  let history = board.list_history(post_id).await?;
  Ok(Json(HistoryView { post, history }))
}

// ─── Edit ─────────────────────────────────────────────────────────────────────

/// `POST /circles/:id/posts/:post_id/edit` — body: `{"content":"..."}`
pub async fn edit<S>(
  State(board): State<Board<S>>,
  CurrentUser(user): CurrentUser,
  Path((circle_id, post_id)): Path<(Uuid, Uuid)>,
  Json(body): Json<ContentBody>,
) -> Result<Json<Post>, ApiError>
where
  S: BoardStore + 'static,
{
  post_in_circle(&board, circle_id, post_id).await?;
  let (post, _snapshot) = board.edit_post(post_id, &body.content, &user).await?;
  Ok(Json(post))
}

// ─── Delete / undelete ────────────────────────────────────────────────────────

/// `POST /circles/:id/posts/:post_id/delete`
pub async fn delete<S>(
  State(board): State<Board<S>>,
  CurrentUser(user): CurrentUser,
  Path((circle_id, post_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Post>, ApiError>
where
  S: BoardStore + 'static,
{
  post_in_circle(&board, circle_id, post_id).await?;
  Ok(Json(board.delete_post(post_id, &user).await?))
}

/// `POST /circles/:id/posts/:post_id/undelete`
pub async fn undelete<S>(
  State(board): State<Board<S>>,
  CurrentUser(_user): CurrentUser,
  Path((circle_id, post_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Post>, ApiError>
where
  S: BoardStore + 'static,
{
  post_in_circle(&board, circle_id, post_id).await?;
  Ok(Json(board.undelete_post(post_id).await?))
}
