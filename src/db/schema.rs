//! SQL DDL for the local mirror database.
//!
//! Defines the `ideas` and `schema_meta` tables. All DDL uses `IF NOT EXISTS` for idempotent
//! initialization.

use rusqlite::Connection;

const SCHEMA_SQL: &str = r#"
-- Last known remote idea set, disposable
CREATE TABLE IF NOT EXISTS ideas (
    id INTEGER PRIMARY KEY,
    position INTEGER NOT NULL,
    titulo TEXT NOT NULL,
    tag TEXT,
    ideia TEXT NOT NULL,
    data TEXT NOT NULL,
    embedding TEXT
);

CREATE INDEX IF NOT EXISTS idx_ideas_position ON ideas(position);

-- Schema metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}
