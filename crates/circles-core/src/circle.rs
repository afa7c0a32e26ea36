//! Circles — the topic containers posts live in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A discussion topic. The topic string is unique and the founder is fixed
/// at creation; circles are never renamed or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Circle {
  pub circle_id:  Uuid,
  pub topic:      String,
  pub founder_id: Uuid,
  pub created_at: DateTime<Utc>,
}

/// One row of the circle listing, computed at query time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircleSummary {
  pub circle:       Circle,
  pub founder_name: String,
  /// Number of posts in the circle that are not deleted.
  pub post_count:   u64,
}
