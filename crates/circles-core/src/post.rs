//! Posts and their revision history.
//!
//! A post's content is mutable, but every edit first appends an immutable
//! [`PostHistory`] snapshot of the content it replaces. Deletion is a flag,
//! never a row removal, so it can be undone.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Post ────────────────────────────────────────────────────────────────────

/// Who deleted a post and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deletion {
  pub deletor_id: Uuid,
  pub deleted_at: DateTime<Utc>,
}

/// A message within exactly one circle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
  pub post_id:         Uuid,
  pub circle_id:       Uuid,
  pub content:         String,
  /// Set at creation; never changes.
  pub author_id:       Uuid,
  pub last_editor_id:  Uuid,
  /// Server-assigned creation timestamp; never changes.
  pub created_at:      DateTime<Utc>,
  pub last_revised_at: DateTime<Utc>,
  pub edited:          bool,
  pub deleted:         bool,
  /// Present only while `deleted` is set. Undeleting leaves the stored
  /// deletor columns in place; they are not surfaced here.
  pub deletion:        Option<Deletion>,
}

/// The lifecycle state of a post, derived from its flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostState {
  Active,
  Edited,
  Deleted,
}

impl Post {
  pub fn state(&self) -> PostState {
    if self.deleted {
      PostState::Deleted
    } else if self.edited {
      PostState::Edited
    } else {
      PostState::Active
    }
  }
}

/// Input to [`crate::store::BoardStore::add_post`].
/// Timestamps are always set by the store.
#[derive(Debug, Clone)]
pub struct NewPost {
  pub circle_id: Uuid,
  pub content:   String,
  pub author_id: Uuid,
}

// ─── History ─────────────────────────────────────────────────────────────────

/// An immutable snapshot of a post's content taken just before an edit
/// overwrote it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostHistory {
  pub history_id:    Uuid,
  pub post_id:       Uuid,
  pub content:       String,
  /// The editor who produced the snapshotted revision.
  pub editor_id:     Uuid,
  /// The time the snapshotted content stopped being current, i.e. the
  /// post's `last_revised_at` before the edit.
  pub current_until: DateTime<Utc>,
}

/// Result of [`crate::store::BoardStore::revise_post`].
#[derive(Debug, Clone)]
pub enum Revision {
  /// The edit committed; the snapshot of the replaced content is included.
  Revised { post: Post, snapshot: PostHistory },
  /// The post is soft-deleted; nothing was written.
  Deleted,
  /// No post with that id.
  Missing,
}
