pub mod config;
pub mod tasks;
pub mod tokens;
pub mod users;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::error::{Result, TodoError};

/// Shared handle; each operation holds the lock for its whole unit of work.
pub type Db = Arc<Mutex<Connection>>;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id                   INTEGER PRIMARY KEY AUTOINCREMENT,
    username             TEXT    NOT NULL UNIQUE,
    email                TEXT    UNIQUE,
    first_name           TEXT    NOT NULL,
    last_name            TEXT    NOT NULL,
    password_hash        TEXT    NOT NULL,
    is_active            INTEGER NOT NULL DEFAULT 1,
    date_joined          INTEGER NOT NULL,
    last_login           INTEGER,
    last_username_change INTEGER
);

CREATE TABLE IF NOT EXISTS auth_tokens (
    key_digest  TEXT    PRIMARY KEY,
    user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at  INTEGER NOT NULL,
    expires_at  INTEGER
);
CREATE INDEX IF NOT EXISTS idx_auth_tokens_user ON auth_tokens(user_id);

CREATE TABLE IF NOT EXISTS tasks (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    owner_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    title        TEXT    NOT NULL,
    description  TEXT,
    priority     TEXT    NOT NULL DEFAULT 'medium',
    due_at       INTEGER,
    completed    INTEGER NOT NULL DEFAULT 0,
    completed_at INTEGER,
    created_at   INTEGER NOT NULL,
    updated_at   INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_tasks_owner_completed ON tasks(owner_id, completed);
CREATE INDEX IF NOT EXISTS idx_tasks_due_at ON tasks(due_at);
CREATE INDEX IF NOT EXISTS idx_tasks_created_at ON tasks(created_at);
";

/// Default data directory: `~/.todo-rs/`
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".todo-rs")
}

/// Open (creating if needed) the SQLite file and apply the schema.
pub fn open_database(path: &Path) -> Result<Db> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }
    let conn = Connection::open(path)?;
    init_schema(&conn)?;
    tracing::debug!(path = %path.display(), "database opened");
    Ok(Arc::new(Mutex::new(conn)))
}

/// Fresh in-memory database
#[cfg(test)]
pub fn open_in_memory() -> Result<Db> {
    let conn = Connection::open_in_memory()?;
    init_schema(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "foreign_keys", true)?;
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// Lock the shared connection. A poisoned lock means a writer panicked
/// mid-operation; surface it instead of continuing on possibly torn state.
pub fn lock(db: &Db) -> Result<std::sync::MutexGuard<'_, Connection>> {
    db.lock()
        .map_err(|_| TodoError::Io(std::io::Error::other("database lock poisoned")))
}

/// Timestamps are stored as UTC epoch milliseconds.
pub(crate) fn to_millis(t: DateTime<Utc>) -> i64 {
    t.timestamp_millis()
}

pub(crate) fn from_millis(ms: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).ok_or(rusqlite::Error::IntegralValueOutOfRange(0, ms))
}

pub(crate) fn from_millis_opt(ms: Option<i64>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    ms.map(from_millis).transpose()
}
