//! Database schema migrations.
//!
//! Applies the initial schema: the sessions table, the append-only messages
//! log, and the schema_migrations tracking table.

use rusqlite::Connection;
use tracing::info;

use ventas_core::error::VentasError;

/// Run all pending database migrations.
///
/// Currently implements the initial schema (version 1). Future migrations
/// can be added by checking the current version and applying incremental changes.
pub fn run_migrations(conn: &Connection) -> Result<(), VentasError> {
    // Create the migrations tracking table first.
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| VentasError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| VentasError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: initial_schema");
    }

    Ok(())
}

/// Version 1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<(), VentasError> {
    conn.execute_batch(
        "
        -- Conversation sessions. At most one row is marked active; it is the
        -- identifier handed out by SessionIdentity until an explicit reset.
        CREATE TABLE IF NOT EXISTS sessions (
            id          TEXT PRIMARY KEY NOT NULL,
            created_at  INTEGER NOT NULL,
            active      INTEGER NOT NULL DEFAULT 0
        );

        -- Append-only message log. seq preserves submission order within a
        -- session even when created_at collides at second resolution.
        CREATE TABLE IF NOT EXISTS messages (
            seq             INTEGER PRIMARY KEY AUTOINCREMENT,
            id              TEXT NOT NULL UNIQUE,
            session_id      TEXT NOT NULL,
            role            TEXT NOT NULL
                            CHECK (role IN ('USER', 'AGENT', 'SYSTEM')),
            text            TEXT NOT NULL,
            metadata        TEXT,
            linked_order_id TEXT,
            created_at      INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_session
            ON messages (session_id, seq ASC);

        CREATE INDEX IF NOT EXISTS idx_messages_order
            ON messages (linked_order_id)
            WHERE linked_order_id IS NOT NULL;

        INSERT INTO schema_migrations (version, name) VALUES (1, 'initial_schema');
        ",
    )
    .map_err(|e| VentasError::Storage(format!("Failed to apply v1 schema: {}", e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn test_migrations_create_tables() {
        let conn = open();
        let tables: Vec<String> = {
            let mut stmt = conn
                .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
                .unwrap();
            stmt.query_map([], |row| row.get(0))
                .unwrap()
                .map(|r| r.unwrap())
                .collect()
        };
        assert!(tables.contains(&"sessions".to_string()));
        assert!(tables.contains(&"messages".to_string()));
        assert!(tables.contains(&"schema_migrations".to_string()));
    }

    #[test]
    fn test_migrations_record_version() {
        let conn = open();
        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(version, 1);
    }

    #[test]
    fn test_migrations_idempotent() {
        let conn = open();
        // Running again must not re-apply v1.
        run_migrations(&conn).unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM schema_migrations WHERE version = 1",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_role_check_constraint() {
        let conn = open();
        let result = conn.execute(
            "INSERT INTO messages (id, session_id, role, text, created_at)
             VALUES ('m1', 's1', 'BOT', 'hi', 0)",
            [],
        );
        assert!(result.is_err());
    }
}
