//! [`SqliteStore`] — the SQLite implementation of [`BoardStore`].

use std::path::Path;

use rand_core::{OsRng, RngCore as _};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use circles_core::{
  circle::{Circle, CircleSummary},
  post::{NewPost, Post, PostHistory, Revision},
  store::BoardStore,
  user::{Category, NewUser, Session, User},
};

use crate::{
  Result,
  encode::{
    CIRCLE_COLUMNS, HISTORY_COLUMNS, POST_COLUMNS, RawCategory, RawCircle,
    RawCircleSummary, RawHistory, RawPost, RawSession, RawUser, USER_COLUMNS,
    encode_dt, encode_uuid, now,
  },
  schema::SCHEMA,
};

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// True for `UNIQUE` / `PRIMARY KEY` violations, which callers report as a
/// conflict instead of a failure. Foreign-key violations are not included.
fn is_unique_violation(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(f, _)
      if f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        || f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
  )
}

/// Run an insert, mapping a uniqueness conflict to `Ok(false)`.
fn insert_unique(
  conn: &rusqlite::Connection,
  sql: &str,
  params: impl rusqlite::Params,
) -> tokio_rusqlite::Result<bool> {
  match conn.execute(sql, params) {
    Ok(_) => Ok(true),
    Err(e) if is_unique_violation(&e) => Ok(false),
    Err(e) => Err(e.into()),
  }
}

fn select_post(
  conn: &rusqlite::Connection,
  post_id: &str,
) -> rusqlite::Result<Option<RawPost>> {
  conn
    .query_row(
      &format!("SELECT {POST_COLUMNS} FROM posts p WHERE p.post_id = ?1"),
      rusqlite::params![post_id],
      RawPost::from_row,
    )
    .optional()
}

/// 256 bits from the OS RNG, hex-encoded.
fn generate_token() -> String {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  hex::encode(bytes)
}

/// What [`SqliteStore::revise_post`] saw inside its transaction.
enum RawRevision {
  Revised(RawPost, RawHistory),
  Deleted,
  Missing,
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Circles board store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Run raw SQL against the connection, for tests that need to break the
  /// schema underneath the store.
  #[cfg(test)]
  pub(crate) async fn execute_batch(&self, sql: &'static str) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(sql)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn user_where(&self, column: &'static str, value: String) -> Result<Option<User>> {
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users u WHERE u.{column} = ?1"),
            rusqlite::params![value],
            RawUser::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }
}

// ─── BoardStore impl ─────────────────────────────────────────────────────────

impl BoardStore for SqliteStore {
  type Error = crate::Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn add_user(&self, input: NewUser) -> Result<Option<User>> {
    let user = User {
      user_id:     Uuid::new_v4(),
      provider_id: input.provider_id,
      email:       input.email,
      name:        input.name,
      created_at:  now(),
    };

    let id_str      = encode_uuid(user.user_id);
    let provider_id = user.provider_id.clone();
    let email       = user.email.clone();
    let name        = user.name.clone();
    let at_str      = encode_dt(user.created_at);

    let inserted = self
      .conn
      .call(move |conn| {
        insert_unique(
          conn,
          "INSERT INTO users (user_id, provider_id, email, name, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, provider_id, email, name, at_str],
        )
      })
      .await?;

    Ok(inserted.then_some(user))
  }

  async fn find_user_by_provider_id<'a>(&'a self, provider_id: &'a str) -> Result<Option<User>> {
    self.user_where("provider_id", provider_id.to_owned()).await
  }

  // ── Sessions ──────────────────────────────────────────────────────────────

  async fn open_session(&self, user_id: Uuid) -> Result<Session> {
    let raw = RawSession {
      token:      generate_token(),
      user_id:    encode_uuid(user_id),
      created_at: encode_dt(now()),
    };

    let (token, user_str, at_str) =
      (raw.token.clone(), raw.user_id.clone(), raw.created_at.clone());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sessions (token, user_id, created_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![token, user_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    raw.into_session()
  }

  async fn session_user<'a>(&'a self, token: &'a str) -> Result<Option<User>> {
    let token = token.to_owned();

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {USER_COLUMNS}
               FROM sessions s
               JOIN users u ON u.user_id = s.user_id
               WHERE s.token = ?1"
            ),
            rusqlite::params![token],
            RawUser::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn close_session<'a>(&'a self, token: &'a str) -> Result<()> {
    let token = token.to_owned();

    self
      .conn
      .call(move |conn| {
        conn.execute("DELETE FROM sessions WHERE token = ?1", rusqlite::params![token])?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Categories ────────────────────────────────────────────────────────────

  async fn add_category(&self, name: String) -> Result<Option<Category>> {
    let category = Category { category_id: Uuid::new_v4(), name };

    let id_str = encode_uuid(category.category_id);
    let name   = category.name.clone();

    let inserted = self
      .conn
      .call(move |conn| {
        insert_unique(
          conn,
          "INSERT INTO categories (category_id, name) VALUES (?1, ?2)",
          rusqlite::params![id_str, name],
        )
      })
      .await?;

    Ok(inserted.then_some(category))
  }

  async fn list_categories(&self) -> Result<Vec<Category>> {
    let raws: Vec<RawCategory> = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT category_id, name FROM categories ORDER BY name ASC")?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawCategory {
              category_id: row.get(0)?,
              name:        row.get(1)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCategory::into_category).collect()
  }

  // ── Circles ───────────────────────────────────────────────────────────────

  async fn add_circle(&self, topic: String, founder_id: Uuid) -> Result<Option<Circle>> {
    let circle = Circle {
      circle_id: Uuid::new_v4(),
      topic,
      founder_id,
      created_at: now(),
    };

    let id_str      = encode_uuid(circle.circle_id);
    let topic       = circle.topic.clone();
    let founder_str = encode_uuid(founder_id);
    let at_str      = encode_dt(circle.created_at);

    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let inserted = insert_unique(
          &tx,
          "INSERT INTO circles (circle_id, topic, founder_id, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, topic, founder_str, at_str],
        )?;
        tx.commit()?;
        Ok(inserted)
      })
      .await?;

    Ok(inserted.then_some(circle))
  }

  async fn get_circle(&self, circle_id: Uuid) -> Result<Option<Circle>> {
    let id_str = encode_uuid(circle_id);

    let raw: Option<RawCircle> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {CIRCLE_COLUMNS} FROM circles c WHERE c.circle_id = ?1"),
            rusqlite::params![id_str],
            RawCircle::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawCircle::into_circle).transpose()
  }

  async fn list_circles(&self) -> Result<Vec<CircleSummary>> {
    let raws: Vec<RawCircleSummary> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CIRCLE_COLUMNS}, u.name, COUNT(p.post_id)
           FROM circles c
           JOIN users u      ON u.user_id   = c.founder_id
           LEFT JOIN posts p ON p.circle_id = c.circle_id AND p.deleted = 0
           GROUP BY c.circle_id
           ORDER BY c.topic ASC"
        ))?;

        let rows = stmt
          .query_map([], |row| {
            Ok(RawCircleSummary {
              circle:       RawCircle::from_row(row)?,
              founder_name: row.get(4)?,
              post_count:   row.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCircleSummary::into_summary).collect()
  }

  // ── Posts ─────────────────────────────────────────────────────────────────

  async fn add_post(&self, input: NewPost) -> Result<Post> {
    let post_id = Uuid::new_v4();

    let id_str     = encode_uuid(post_id);
    let circle_str = encode_uuid(input.circle_id);
    let content    = input.content.clone();
    let author_str = encode_uuid(input.author_id);

    // Stamped on the connection thread so timestamps follow commit order.
    let at = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let at = now();
        tx.execute(
          "INSERT INTO posts (
             post_id, circle_id, content, author_id, last_editor_id,
             created_at, last_revised_at, edited, deleted
           ) VALUES (?1, ?2, ?3, ?4, ?4, ?5, ?5, 0, 0)",
          rusqlite::params![id_str, circle_str, content, author_str, encode_dt(at)],
        )?;
        tx.commit()?;
        Ok(at)
      })
      .await?;

    Ok(Post {
      post_id,
      circle_id:       input.circle_id,
      content:         input.content,
      author_id:       input.author_id,
      last_editor_id:  input.author_id,
      created_at:      at,
      last_revised_at: at,
      edited:          false,
      deleted:         false,
      deletion:        None,
    })
  }

  async fn get_post(&self, post_id: Uuid) -> Result<Option<Post>> {
    let id_str = encode_uuid(post_id);

    let raw = self
      .conn
      .call(move |conn| Ok(select_post(conn, &id_str)?))
      .await?;

    raw.map(RawPost::into_post).transpose()
  }

  async fn revise_post(
    &self,
    post_id:   Uuid,
    content:   String,
    editor_id: Uuid,
  ) -> Result<Revision> {
    let id_str      = encode_uuid(post_id);
    let history_str = encode_uuid(Uuid::new_v4());
    let editor_str  = encode_uuid(editor_id);

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let at_str = encode_dt(now());

        // Snapshot from the pre-edit row before anything is overwritten.
        let Some(current) = select_post(&tx, &id_str)? else {
          return Ok(RawRevision::Missing);
        };
        if current.deleted {
          return Ok(RawRevision::Deleted);
        }

        let snapshot = RawHistory {
          history_id:    history_str,
          post_id:       id_str.clone(),
          content:       current.content,
          editor_id:     current.last_editor_id,
          current_until: current.last_revised_at,
        };

        tx.execute(
          "INSERT INTO post_history (history_id, post_id, content, editor_id, current_until)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![
            snapshot.history_id,
            snapshot.post_id,
            snapshot.content,
            snapshot.editor_id,
            snapshot.current_until,
          ],
        )?;

        tx.execute(
          "UPDATE posts
           SET content = ?2, last_editor_id = ?3, edited = 1, last_revised_at = ?4
           WHERE post_id = ?1",
          rusqlite::params![id_str, content, editor_str, at_str],
        )?;

        let updated = tx.query_row(
          &format!("SELECT {POST_COLUMNS} FROM posts p WHERE p.post_id = ?1"),
          rusqlite::params![id_str],
          RawPost::from_row,
        )?;

        tx.commit()?;
        Ok(RawRevision::Revised(updated, snapshot))
      })
      .await?;

    Ok(match raw {
      RawRevision::Revised(post, snapshot) => Revision::Revised {
        post:     post.into_post()?,
        snapshot: snapshot.into_history()?,
      },
      RawRevision::Deleted => Revision::Deleted,
      RawRevision::Missing => Revision::Missing,
    })
  }

  async fn delete_post(&self, post_id: Uuid, deletor_id: Uuid) -> Result<Option<Post>> {
    let id_str      = encode_uuid(post_id);
    let deletor_str = encode_uuid(deletor_id);

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let at_str = encode_dt(now());
        tx.execute(
          "UPDATE posts SET deleted = 1, deletor_id = ?2, deleted_at = ?3
           WHERE post_id = ?1 AND deleted = 0",
          rusqlite::params![id_str, deletor_str, at_str],
        )?;
        let raw = select_post(&tx, &id_str)?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.map(RawPost::into_post).transpose()
  }

  async fn undelete_post(&self, post_id: Uuid) -> Result<Option<Post>> {
    let id_str = encode_uuid(post_id);

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        // deletor_id / deleted_at are deliberately left in place.
        tx.execute(
          "UPDATE posts SET deleted = 0 WHERE post_id = ?1",
          rusqlite::params![id_str],
        )?;
        let raw = select_post(&tx, &id_str)?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.map(RawPost::into_post).transpose()
  }

  async fn list_posts(&self, circle_id: Uuid, include_deleted: bool) -> Result<Vec<Post>> {
    let circle_str = encode_uuid(circle_id);

    let raws: Vec<RawPost> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {POST_COLUMNS}
           FROM posts p
           WHERE p.circle_id = ?1
             AND (?2 = 1 OR p.deleted = 0)
           ORDER BY p.created_at ASC, p.rowid ASC"
        ))?;

        let rows = stmt
          .query_map(rusqlite::params![circle_str, include_deleted], RawPost::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPost::into_post).collect()
  }

  async fn list_history(&self, post_id: Uuid) -> Result<Vec<PostHistory>> {
    let id_str = encode_uuid(post_id);

    let raws: Vec<RawHistory> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {HISTORY_COLUMNS}
           FROM post_history h
           WHERE h.post_id = ?1
           ORDER BY h.current_until DESC, h.rowid DESC"
        ))?;

        let rows = stmt
          .query_map(rusqlite::params![id_str], RawHistory::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawHistory::into_history).collect()
  }
}
