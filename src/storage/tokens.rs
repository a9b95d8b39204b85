//! Auth token rows. Only the SHA-256 digest of a key is stored.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{from_millis_opt, to_millis};
use crate::error::Result;

/// Token row as seen by the authenticator
#[derive(Debug, Clone, PartialEq)]
pub struct TokenRecord {
    pub user_id: i64,
    pub expires_at: Option<DateTime<Utc>>,
}

pub fn insert_token(
    conn: &Connection,
    key_digest: &str,
    user_id: i64,
    now: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO auth_tokens (key_digest, user_id, created_at, expires_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![key_digest, user_id, to_millis(now), expires_at.map(to_millis)],
    )?;
    Ok(())
}

pub fn find_token(conn: &Connection, key_digest: &str) -> Result<Option<TokenRecord>> {
    let record = conn
        .query_row(
            "SELECT user_id, expires_at FROM auth_tokens WHERE key_digest = ?1",
            params![key_digest],
            |row| {
                Ok(TokenRecord {
                    user_id: row.get(0)?,
                    expires_at: from_millis_opt(row.get(1)?)?,
                })
            },
        )
        .optional()?;
    Ok(record)
}

/// Returns false when the digest was unknown.
pub fn delete_token(conn: &Connection, key_digest: &str) -> Result<bool> {
    let removed = conn.execute(
        "DELETE FROM auth_tokens WHERE key_digest = ?1",
        params![key_digest],
    )?;
    Ok(removed > 0)
}

/// Drop every token whose expiry has passed.
pub fn purge_expired(conn: &Connection, now: DateTime<Utc>) -> Result<usize> {
    let removed = conn.execute(
        "DELETE FROM auth_tokens WHERE expires_at IS NOT NULL AND expires_at <= ?1",
        params![to_millis(now)],
    )?;
    Ok(removed)
}
