//! Persisted login token, so the CLI keeps its session between runs.

use rusqlite::{params, Connection, OptionalExtension};

const TOKEN_KEY: &str = "auth_token";

pub fn load_token(conn: &Connection) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM credentials WHERE key = ?1",
        [TOKEN_KEY],
        |row| row.get::<_, String>(0),
    )
    .optional()
}

pub fn store_token(conn: &Connection, token: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO credentials (key, value, updated_at) VALUES (?1, ?2, ?3)",
        params![TOKEN_KEY, token, chrono::Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

/// Returns `true` if a token was removed.
pub fn clear_token(conn: &Connection) -> rusqlite::Result<bool> {
    let removed = conn.execute("DELETE FROM credentials WHERE key = ?1", [TOKEN_KEY])?;
    Ok(removed > 0)
}
