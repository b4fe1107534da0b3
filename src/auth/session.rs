use chrono::{TimeDelta, Utc};
use rand::Rng;
use rusqlite::{params, OptionalExtension};

use crate::error::{AppError, AppResult};
use crate::state::DbPool;

/// Matches SQLite's `datetime('now')` so expiry can be compared in SQL.
const SQLITE_DATETIME: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone)]
pub struct AdminSession {
    pub token: String,
    pub expires_at: String,
}

/// Create a new admin session. Returns the token and its expiry.
pub fn create_session(pool: &DbPool, username: &str, hours: u64) -> AppResult<AdminSession> {
    let expires_at = i64::try_from(hours)
        .ok()
        .and_then(TimeDelta::try_hours)
        .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
        .ok_or_else(|| AppError::Internal(format!("Session lifetime of {} hours is out of range", hours)))?
        .format(SQLITE_DATETIME)
        .to_string();

    let conn = pool.get()?;
    let token = generate_token();
    let id = uuid::Uuid::now_v7().to_string();

    conn.execute(
        "INSERT INTO admin_sessions (id, username, token, expires_at) VALUES (?1, ?2, ?3, ?4)",
        params![id, username, token, expires_at],
    )?;

    Ok(AdminSession { token, expires_at })
}

/// Username owning an unexpired session, if any.
pub fn find_session(pool: &DbPool, token: &str) -> AppResult<Option<String>> {
    let conn = pool.get()?;
    let username = conn
        .query_row(
            "SELECT username FROM admin_sessions WHERE token = ?1 AND expires_at > datetime('now')",
            params![token],
            |row| row.get(0),
        )
        .optional()?;
    Ok(username)
}

/// Delete a session by token.
pub fn delete_session(pool: &DbPool, token: &str) -> AppResult<()> {
    let conn = pool.get()?;
    conn.execute("DELETE FROM admin_sessions WHERE token = ?1", params![token])?;
    Ok(())
}

/// Drop expired sessions. Returns how many were removed.
pub fn purge_expired(pool: &DbPool) -> AppResult<usize> {
    let conn = pool.get()?;
    let removed = conn.execute(
        "DELETE FROM admin_sessions WHERE expires_at <= datetime('now')",
        [],
    )?;
    Ok(removed)
}

/// Generate a cryptographically random 32-byte hex token.
fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    hex::encode(bytes)
}
