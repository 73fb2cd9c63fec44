use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{format_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::Identity;

/// Store a bearer-token hash for `user_id`, valid until `expires_at`.
pub fn insert_session(
    conn: &Connection,
    token_hash: &str,
    user_id: &Uuid,
    created_at: &DateTime<Utc>,
    expires_at: &DateTime<Utc>,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO sessions (token_hash, user_id, created_at, expires_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            token_hash,
            user_id.to_string(),
            format_timestamp(created_at),
            format_timestamp(expires_at),
        ],
    )?;
    Ok(())
}

/// Resolve a token hash to the identity it was issued for.
/// Expired sessions resolve to `None`.
pub fn find_identity(
    conn: &Connection,
    token_hash: &str,
    now: &DateTime<Utc>,
) -> Result<Option<Identity>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT u.id, u.email, u.name
         FROM sessions s JOIN users u ON u.id = s.user_id
         WHERE s.token_hash = ?1 AND s.expires_at > ?2",
    )?;

    let result = stmt.query_row(params![token_hash, format_timestamp(now)], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
        ))
    });

    match result {
        Ok((id, email, name)) => Ok(Some(Identity {
            user_id: parse_uuid(&id)?,
            email,
            name,
        })),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Revoke a session. Returns whether a row was removed.
pub fn delete_session(conn: &Connection, token_hash: &str) -> Result<bool, DatabaseError> {
    let rows = conn.execute(
        "DELETE FROM sessions WHERE token_hash = ?1",
        params![token_hash],
    )?;
    Ok(rows > 0)
}

/// Drop every session that expired before `now`.
pub fn purge_expired_sessions(conn: &Connection, now: &DateTime<Utc>) -> Result<usize, DatabaseError> {
    let rows = conn.execute(
        "DELETE FROM sessions WHERE expires_at <= ?1",
        params![format_timestamp(now)],
    )?;
    if rows > 0 {
        tracing::debug!(purged = rows, "Expired sessions purged");
    }
    Ok(rows)
}
