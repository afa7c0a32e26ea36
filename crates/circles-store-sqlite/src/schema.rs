//! SQL schema for the Circles SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id     TEXT PRIMARY KEY,
    provider_id TEXT NOT NULL UNIQUE,
    email       TEXT NOT NULL,
    name        TEXT NOT NULL UNIQUE,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sessions (
    token       TEXT PRIMARY KEY,  -- 64 hex chars
    user_id     TEXT NOT NULL REFERENCES users(user_id),
    created_at  TEXT NOT NULL
);

-- Reserved; no board behavior reads categories yet.
CREATE TABLE IF NOT EXISTS categories (
    category_id TEXT PRIMARY KEY,
    name        TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS circles (
    circle_id   TEXT PRIMARY KEY,
    topic       TEXT NOT NULL UNIQUE,
    founder_id  TEXT NOT NULL REFERENCES users(user_id),
    created_at  TEXT NOT NULL
);

-- deletor_id / deleted_at are only meaningful while deleted = 1.
-- Undelete clears the flag and leaves them stale.
CREATE TABLE IF NOT EXISTS posts (
    post_id         TEXT PRIMARY KEY,
    circle_id       TEXT NOT NULL REFERENCES circles(circle_id),
    content         TEXT NOT NULL,
    author_id       TEXT NOT NULL REFERENCES users(user_id),
    last_editor_id  TEXT NOT NULL REFERENCES users(user_id),
    created_at      TEXT NOT NULL,
    last_revised_at TEXT NOT NULL,
    edited          INTEGER NOT NULL DEFAULT 0,
    deleted         INTEGER NOT NULL DEFAULT 0,
    deletor_id      TEXT REFERENCES users(user_id),
    deleted_at      TEXT
);

-- Strictly append-only: one row per committed edit.
CREATE TABLE IF NOT EXISTS post_history (
    history_id    TEXT PRIMARY KEY,
    post_id       TEXT NOT NULL REFERENCES posts(post_id),
    content       TEXT NOT NULL,
    editor_id     TEXT NOT NULL REFERENCES users(user_id),
    current_until TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS posts_circle_idx   ON posts(circle_id, created_at);
CREATE INDEX IF NOT EXISTS history_post_idx   ON post_history(post_id, current_until);
CREATE INDEX IF NOT EXISTS sessions_user_idx  ON sessions(user_id);

PRAGMA user_version = 1;
";
