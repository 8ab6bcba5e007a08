//! Core types shared across the Ventas workspace.
//!
//! Defines the error taxonomy, the conversation data model (sessions,
//! messages, cart items, next-step tokens), and TOML configuration.

pub mod config;
pub mod error;
pub mod types;

pub use config::VentasConfig;
pub use error::{Result, VentasError};
pub use types::{CartItem, Message, NextStep, Role, Session};
