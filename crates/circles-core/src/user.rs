//! Users, login sessions, and categories.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An application account, created once at the first successful login of an
/// allow-listed identity. Never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub user_id:     Uuid,
  /// Opaque identity id assigned by the OAuth provider.
  pub provider_id: String,
  pub email:       String,
  /// Display name; unique across users.
  pub name:        String,
  pub created_at:  DateTime<Utc>,
}

/// Input to [`crate::store::BoardStore::add_user`].
#[derive(Debug, Clone)]
pub struct NewUser {
  pub provider_id: String,
  pub email:       String,
  pub name:        String,
}

/// A login session. The token is the only thing handed to the browser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
  pub token:      String,
  pub user_id:    Uuid,
  pub created_at: DateTime<Utc>,
}

/// A named tag. Stored, but not wired into any board behavior yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
  pub category_id: Uuid,
  pub name:        String,
}
