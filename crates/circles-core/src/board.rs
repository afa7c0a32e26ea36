//! [`Board`] — circle creation, listing, and the post revision lifecycle.
//!
//! Post states move `Active → Edited → Deleted` and back from `Deleted` via
//! undelete. An edit always snapshots the replaced content into the post's
//! history inside the same store transaction that overwrites it.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::{
  Error, Result,
  circle::{Circle, CircleSummary},
  post::{NewPost, Post, PostHistory, Revision},
  store::BoardStore,
  user::User,
};

/// The board's rules, layered over a [`BoardStore`].
///
/// Cloning is cheap — the store is reference-counted.
pub struct Board<S> {
  store: Arc<S>,
}

impl<S> Clone for Board<S> {
  fn clone(&self) -> Self { Self { store: Arc::clone(&self.store) } }
}

/// Content counts as absent only when it is empty. Whitespace is content.
fn present(content: &str) -> bool { !content.is_empty() }

impl<S: BoardStore> Board<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  pub fn store(&self) -> &Arc<S> { &self.store }

  // ── Circles ─────────────────────────────────────────────────────────────

  /// Found a new circle. A taken topic yields [`Error::DuplicateTopic`] and
  /// leaves the store untouched.
  pub async fn create_circle(&self, topic: &str, founder: &User) -> Result<Circle> {
    if !present(topic) {
      return Err(Error::EmptyTopic);
    }

    let circle = self
      .store
      .add_circle(topic.to_owned(), founder.user_id)
      .await
      .map_err(Error::storage)?
      .ok_or_else(|| Error::DuplicateTopic(topic.to_owned()))?;

    info!(circle_id = %circle.circle_id, founder_id = %founder.user_id, topic, "circle created");
    Ok(circle)
  }

  pub async fn circle(&self, circle_id: Uuid) -> Result<Circle> {
    self
      .store
      .get_circle(circle_id)
      .await
      .map_err(Error::storage)?
      .ok_or(Error::CircleNotFound(circle_id))
  }

  /// Every circle, by topic, with its live post count. Recomputed per call.
  pub async fn list_circles(&self) -> Result<Vec<CircleSummary>> {
    self.store.list_circles().await.map_err(Error::storage)
  }

  // ── Posts ───────────────────────────────────────────────────────────────

  /// Post into a circle. Absent content is a no-op and returns `None`.
  pub async fn create_post(
    &self,
    circle_id: Uuid,
    content: &str,
    author: &User,
  ) -> Result<Option<Post>> {
    if !present(content) {
      debug!(%circle_id, "ignoring post with no content");
      return Ok(None);
    }

    self.circle(circle_id).await?;

    let post = self
      .store
      .add_post(NewPost {
        circle_id,
        content: content.to_owned(),
        author_id: author.user_id,
      })
      .await
      .map_err(Error::storage)?;

    info!(post_id = %post.post_id, %circle_id, author_id = %author.user_id, "post created");
    Ok(Some(post))
  }

  pub async fn post(&self, post_id: Uuid) -> Result<Post> {
    self
      .store
      .get_post(post_id)
      .await
      .map_err(Error::storage)?
      .ok_or(Error::PostNotFound(post_id))
  }

  /// Replace a post's content, returning the updated post and the snapshot
  /// of what it replaced.
  pub async fn edit_post(
    &self,
    post_id: Uuid,
    content: &str,
    editor: &User,
  ) -> Result<(Post, PostHistory)> {
    if !present(content) {
      return Err(Error::EmptyEdit);
    }

    let revision = self
      .store
      .revise_post(post_id, content.to_owned(), editor.user_id)
      .await
      .map_err(Error::storage)?;

    match revision {
      Revision::Revised { post, snapshot } => {
        info!(%post_id, editor_id = %editor.user_id, "post edited");
        Ok((post, snapshot))
      }
      Revision::Deleted => Err(Error::PostDeleted(post_id)),
      Revision::Missing => Err(Error::PostNotFound(post_id)),
    }
  }

  /// Soft-delete a post. Content is kept so the deletion can be undone.
  pub async fn delete_post(&self, post_id: Uuid, deletor: &User) -> Result<Post> {
    let post = self
      .store
      .delete_post(post_id, deletor.user_id)
      .await
      .map_err(Error::storage)?
      .ok_or(Error::PostNotFound(post_id))?;

    info!(%post_id, deletor_id = %deletor.user_id, "post deleted");
    Ok(post)
  }

  pub async fn undelete_post(&self, post_id: Uuid) -> Result<Post> {
    let post = self
      .store
      .undelete_post(post_id)
      .await
      .map_err(Error::storage)?
      .ok_or(Error::PostNotFound(post_id))?;

    info!(%post_id, "post undeleted");
    Ok(post)
  }

  pub async fn list_posts(
    &self,
    circle_id: Uuid,
    include_deleted: bool,
  ) -> Result<Vec<Post>> {
    self
      .store
      .list_posts(circle_id, include_deleted)
      .await
      .map_err(Error::storage)
  }

  /// Prior revisions of a post, most recent first.
  pub async fn list_history(&self, post_id: Uuid) -> Result<Vec<PostHistory>> {
    self.store.list_history(post_id).await.map_err(Error::storage)
  }
}
