//! SQLite-backed history store for the Ventas conversation orchestrator.
//!
//! Persists sessions and the append-only message log whose metadata is the
//! source of truth for flow recovery after a restart.

pub mod db;
pub mod migrations;
pub mod repository;

pub use db::Database;
pub use repository::{MessageRepository, SessionRepository};
