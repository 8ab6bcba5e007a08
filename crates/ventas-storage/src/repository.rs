//! Repository implementations for SQLite-backed persistence.
//!
//! Provides MessageRepository (the append-only history store whose metadata
//! drives flow recovery) and SessionRepository (the durable session
//! identifier) operating on the Database struct using raw SQL.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use rusqlite::OptionalExtension;
use uuid::Uuid;

use ventas_core::error::VentasError;
use ventas_core::types::{Message, Role, Session};

use crate::db::Database;

/// Repository for the persisted conversation log.
pub struct MessageRepository {
    db: Arc<Database>,
}

impl MessageRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Append a message to a session's log and return the stored row.
    ///
    /// Messages are never mutated after append; submission order is
    /// preserved by the monotonic sequence column.
    pub fn append(
        &self,
        session_id: &str,
        role: Role,
        text: &str,
        metadata: Option<&serde_json::Value>,
        linked_order_id: Option<&str>,
    ) -> Result<Message, VentasError> {
        let message = Message {
            id: Uuid::new_v4(),
            session_id: session_id.to_string(),
            role,
            text: text.to_string(),
            created_at: Utc::now(),
            metadata: metadata.cloned(),
            linked_order_id: linked_order_id.map(|s| s.to_string()),
        };

        let metadata_json = match &message.metadata {
            Some(value) => Some(serde_json::to_string(value)?),
            None => None,
        };

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, session_id, role, text, metadata, linked_order_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    message.id.to_string(),
                    message.session_id,
                    message.role.as_str(),
                    message.text,
                    metadata_json,
                    message.linked_order_id,
                    message.created_at.timestamp(),
                ],
            )
            .map_err(|e| VentasError::Storage(format!("Failed to append message: {}", e)))?;
            Ok(())
        })?;

        Ok(message)
    }

    /// Fetch the most recent page of a session's messages, oldest-first.
    ///
    /// Only the tail of the log matters to recovery, so the page is taken
    /// from the end and re-sorted into submission order.
    pub fn fetch(&self, session_id: &str, limit: u32) -> Result<Vec<Message>, VentasError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, session_id, role, text, metadata, linked_order_id, created_at
                     FROM (SELECT * FROM messages WHERE session_id = ?1
                           ORDER BY seq DESC LIMIT ?2)
                     ORDER BY seq ASC",
                )
                .map_err(|e| VentasError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(rusqlite::params![session_id, limit], row_to_message)
                .map_err(|e| VentasError::Storage(e.to_string()))?;

            let mut messages = Vec::new();
            for row in rows {
                messages.push(row.map_err(|e| VentasError::Storage(e.to_string()))?);
            }
            Ok(messages)
        })
    }

    /// Fetch all messages linked to a specific order, oldest-first.
    pub fn fetch_by_order(&self, order_id: &str) -> Result<Vec<Message>, VentasError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, session_id, role, text, metadata, linked_order_id, created_at
                     FROM messages WHERE linked_order_id = ?1 ORDER BY seq ASC",
                )
                .map_err(|e| VentasError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(rusqlite::params![order_id], row_to_message)
                .map_err(|e| VentasError::Storage(e.to_string()))?;

            let mut messages = Vec::new();
            for row in rows {
                messages.push(row.map_err(|e| VentasError::Storage(e.to_string()))?);
            }
            Ok(messages)
        })
    }

    /// Delete all messages of a session. Returns how many were removed.
    pub fn clear_session(&self, session_id: &str) -> Result<usize, VentasError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "DELETE FROM messages WHERE session_id = ?1",
                rusqlite::params![session_id],
            )
            .map_err(|e| VentasError::Storage(format!("Failed to clear session: {}", e)))
        })
    }

    /// Count messages in a session.
    pub fn count(&self, session_id: &str) -> Result<u64, VentasError> {
        self.db.with_conn(|conn| {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM messages WHERE session_id = ?1",
                    rusqlite::params![session_id],
                    |row| row.get(0),
                )
                .map_err(|e| VentasError::Storage(e.to_string()))?;
            Ok(count as u64)
        })
    }
}

/// Repository for the durable conversation identifier.
///
/// At most one session row is active at a time; it survives restarts until
/// an explicit reset deactivates it.
pub struct SessionRepository {
    db: Arc<Database>,
}

impl SessionRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Return the currently active session, if any.
    pub fn current(&self) -> Result<Option<Session>, VentasError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT id, created_at FROM sessions WHERE active = 1 LIMIT 1",
                [],
                |row| {
                    let id: String = row.get(0)?;
                    let ts: i64 = row.get(1)?;
                    Ok((id, ts))
                },
            )
            .optional()
            .map_err(|e| VentasError::Storage(e.to_string()))?
            .map(|(id, ts)| {
                let created_at = Utc
                    .timestamp_opt(ts, 0)
                    .single()
                    .ok_or_else(|| VentasError::Storage(format!("Bad timestamp: {}", ts)))?;
                Ok(Session { id, created_at })
            })
            .transpose()
        })
    }

    /// Store a session and mark it as the active one.
    pub fn save_current(&self, session: &Session) -> Result<(), VentasError> {
        self.db.with_conn(|conn| {
            conn.execute("UPDATE sessions SET active = 0 WHERE active = 1", [])
                .map_err(|e| VentasError::Storage(e.to_string()))?;
            conn.execute(
                "INSERT INTO sessions (id, created_at, active) VALUES (?1, ?2, 1)
                 ON CONFLICT(id) DO UPDATE SET active = 1",
                rusqlite::params![session.id, session.created_at.timestamp()],
            )
            .map_err(|e| VentasError::Storage(format!("Failed to save session: {}", e)))?;
            Ok(())
        })
    }

    /// Deactivate the current session. The next `current()` returns None.
    pub fn clear_current(&self) -> Result<(), VentasError> {
        self.db.with_conn(|conn| {
            conn.execute("UPDATE sessions SET active = 0 WHERE active = 1", [])
                .map_err(|e| VentasError::Storage(e.to_string()))?;
            Ok(())
        })
    }
}

/// Map a messages row to a Message. Malformed metadata JSON is swallowed
/// into None so recovery degrades instead of failing.
fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let id_str: String = row.get(0)?;
    let session_id: String = row.get(1)?;
    let role_str: String = row.get(2)?;
    let text: String = row.get(3)?;
    let metadata_str: Option<String> = row.get(4)?;
    let linked_order_id: Option<String> = row.get(5)?;
    let ts: i64 = row.get(6)?;

    let id = Uuid::parse_str(&id_str).unwrap_or_else(|_| Uuid::nil());
    let role = Role::parse(&role_str).unwrap_or(Role::System);
    let metadata = metadata_str.and_then(|s| serde_json::from_str(&s).ok());
    let created_at = Utc
        .timestamp_opt(ts, 0)
        .single()
        .unwrap_or(chrono::DateTime::<Utc>::UNIX_EPOCH);

    Ok(Message {
        id,
        session_id,
        role,
        text,
        created_at,
        metadata,
        linked_order_id,
    })
}
