//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microseconds, `Z`
//! suffix) so that `ORDER BY` on the text column is chronological. UUIDs are
//! stored as hyphenated lowercase strings. Booleans are `0`/`1` integers.

use chrono::{DateTime, SecondsFormat, SubsecRound as _, Utc};
use circles_core::{
  circle::{Circle, CircleSummary},
  post::{Deletion, Post, PostHistory},
  user::{Category, Session, User},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

/// The current instant, truncated to the precision stored on disk so that a
/// value handed back to the caller equals the value read back later.
pub fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

// ─── Row types ───────────────────────────────────────────────────────────────

pub const USER_COLUMNS: &str = "u.user_id, u.provider_id, u.email, u.name, u.created_at";

/// Raw strings read directly from a `users` row.
pub struct RawUser {
  pub user_id:     String,
  pub provider_id: String,
  pub email:       String,
  pub name:        String,
  pub created_at:  String,
}

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:     row.get(0)?,
      provider_id: row.get(1)?,
      email:       row.get(2)?,
      name:        row.get(3)?,
      created_at:  row.get(4)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:     decode_uuid(&self.user_id)?,
      provider_id: self.provider_id,
      email:       self.email,
      name:        self.name,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `sessions` row.
pub struct RawSession {
  pub token:      String,
  pub user_id:    String,
  pub created_at: String,
}

impl RawSession {
  pub fn into_session(self) -> Result<Session> {
    Ok(Session {
      token:      self.token,
      user_id:    decode_uuid(&self.user_id)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `categories` row.
pub struct RawCategory {
  pub category_id: String,
  pub name:        String,
}

impl RawCategory {
  pub fn into_category(self) -> Result<Category> {
    Ok(Category {
      category_id: decode_uuid(&self.category_id)?,
      name:        self.name,
    })
  }
}

pub const CIRCLE_COLUMNS: &str = "c.circle_id, c.topic, c.founder_id, c.created_at";

/// Raw strings read directly from a `circles` row.
pub struct RawCircle {
  pub circle_id:  String,
  pub topic:      String,
  pub founder_id: String,
  pub created_at: String,
}

impl RawCircle {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      circle_id:  row.get(0)?,
      topic:      row.get(1)?,
      founder_id: row.get(2)?,
      created_at: row.get(3)?,
    })
  }

  pub fn into_circle(self) -> Result<Circle> {
    Ok(Circle {
      circle_id:  decode_uuid(&self.circle_id)?,
      topic:      self.topic,
      founder_id: decode_uuid(&self.founder_id)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// A `circles` row joined with its founder's name and live post count.
pub struct RawCircleSummary {
  pub circle:       RawCircle,
  pub founder_name: String,
  pub post_count:   i64,
}

impl RawCircleSummary {
  pub fn into_summary(self) -> Result<CircleSummary> {
    Ok(CircleSummary {
      circle:       self.circle.into_circle()?,
      founder_name: self.founder_name,
      post_count:   self.post_count.max(0) as u64,
    })
  }
}

pub const POST_COLUMNS: &str = "p.post_id, p.circle_id, p.content, p.author_id,
  p.last_editor_id, p.created_at, p.last_revised_at, p.edited, p.deleted,
  p.deletor_id, p.deleted_at";

/// Raw values read directly from a `posts` row.
pub struct RawPost {
  pub post_id:         String,
  pub circle_id:       String,
  pub content:         String,
  pub author_id:       String,
  pub last_editor_id:  String,
  pub created_at:      String,
  pub last_revised_at: String,
  pub edited:          bool,
  pub deleted:         bool,
  pub deletor_id:      Option<String>,
  pub deleted_at:      Option<String>,
}

impl RawPost {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      post_id:         row.get(0)?,
      circle_id:       row.get(1)?,
      content:         row.get(2)?,
      author_id:       row.get(3)?,
      last_editor_id:  row.get(4)?,
      created_at:      row.get(5)?,
      last_revised_at: row.get(6)?,
      edited:          row.get(7)?,
      deleted:         row.get(8)?,
      deletor_id:      row.get(9)?,
      deleted_at:      row.get(10)?,
    })
  }

  pub fn into_post(self) -> Result<Post> {
    // The deletor columns survive an undelete; only trust them while the
    // flag is set.
    let deletion = match (self.deleted, self.deletor_id, self.deleted_at) {
      (true, Some(deletor_id), Some(deleted_at)) => Some(Deletion {
        deletor_id: decode_uuid(&deletor_id)?,
        deleted_at: decode_dt(&deleted_at)?,
      }),
      _ => None,
    };

    Ok(Post {
      post_id: decode_uuid(&self.post_id)?,
      circle_id: decode_uuid(&self.circle_id)?,
      content: self.content,
      author_id: decode_uuid(&self.author_id)?,
      last_editor_id: decode_uuid(&self.last_editor_id)?,
      created_at: decode_dt(&self.created_at)?,
      last_revised_at: decode_dt(&self.last_revised_at)?,
      edited: self.edited,
      deleted: self.deleted,
      deletion,
    })
  }
}

pub const HISTORY_COLUMNS: &str = "h.history_id, h.post_id, h.content, h.editor_id, h.current_until";

/// Raw strings read directly from a `post_history` row.
pub struct RawHistory {
  pub history_id:    String,
  pub post_id:       String,
  pub content:       String,
  pub editor_id:     String,
  pub current_until: String,
}

impl RawHistory {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      history_id:    row.get(0)?,
      post_id:       row.get(1)?,
      content:       row.get(2)?,
      editor_id:     row.get(3)?,
      current_until: row.get(4)?,
    })
  }

  pub fn into_history(self) -> Result<PostHistory> {
    Ok(PostHistory {
      history_id:    decode_uuid(&self.history_id)?,
      post_id:       decode_uuid(&self.post_id)?,
      content:       self.content,
      editor_id:     decode_uuid(&self.editor_id)?,
      current_until: decode_dt(&self.current_until)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone as _;

  use super::*;

  #[test]
  fn timestamps_sort_lexicographically() {
    let early = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
    let late = early + chrono::Duration::microseconds(1500);
    let (a, b) = (encode_dt(early), encode_dt(late));
    assert_eq!(a.len(), b.len());
    assert!(a < b, "{a} !< {b}");
    assert_eq!(decode_dt(&b).unwrap(), late);
  }
}
