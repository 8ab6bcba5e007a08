//! Durable conversation identity.
//!
//! Owns the stable conversation identifier: created lazily on first use,
//! durable across restarts, replaced only by an explicit reset. Callers that
//! reset must also clear the flow states keyed off the old identifier.

use chrono::Utc;
use uuid::Uuid;

use ventas_core::error::Result;
use ventas_core::types::Session;
use ventas_storage::SessionRepository;

pub struct SessionIdentity {
    repo: SessionRepository,
}

impl SessionIdentity {
    pub fn new(repo: SessionRepository) -> Self {
        Self { repo }
    }

    /// Return the persisted identifier, minting and persisting a new one if
    /// none is active. Uniqueness is advisory (timestamp + random suffix).
    pub fn get_or_create(&self) -> Result<String> {
        if let Some(session) = self.repo.current()? {
            return Ok(session.id);
        }
        let session = mint_session();
        self.repo.save_current(&session)?;
        tracing::info!(session_id = %session.id, "New session created");
        Ok(session.id)
    }

    /// The active identifier without creating one.
    pub fn current(&self) -> Result<Option<String>> {
        Ok(self.repo.current()?.map(|s| s.id))
    }

    /// Discard the current identifier; the next access mints a new one.
    pub fn reset(&self) -> Result<()> {
        self.repo.clear_current()
    }
}

fn mint_session() -> Session {
    let now = Utc::now();
    let suffix = Uuid::new_v4().simple().to_string();
    Session {
        id: format!("sess-{}-{}", now.timestamp(), &suffix[..8]),
        created_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use ventas_storage::Database;

    fn identity() -> SessionIdentity {
        let db = Arc::new(Database::in_memory().unwrap());
        SessionIdentity::new(SessionRepository::new(db))
    }

    #[test]
    fn test_get_or_create_mints_once() {
        let identity = identity();
        let first = identity.get_or_create().unwrap();
        let second = identity.get_or_create().unwrap();
        assert_eq!(first, second);
        assert!(first.starts_with("sess-"));
    }

    #[test]
    fn test_current_none_before_first_use() {
        let identity = identity();
        assert!(identity.current().unwrap().is_none());
    }

    #[test]
    fn test_reset_mints_new_on_next_access() {
        let identity = identity();
        let first = identity.get_or_create().unwrap();
        identity.reset().unwrap();
        assert!(identity.current().unwrap().is_none());
        let second = identity.get_or_create().unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_minted_id_shape() {
        let session = mint_session();
        let parts: Vec<&str> = session.id.splitn(3, '-').collect();
        assert_eq!(parts[0], "sess");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 8);
    }
}
