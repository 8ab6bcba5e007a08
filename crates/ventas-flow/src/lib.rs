//! Conversation-flow orchestrator for the Ventas sales assistant.
//!
//! Routes every inbound utterance to the active interaction mode (product
//! comparison, checkout, or free-form Q&A), drives each mode's state machine,
//! keeps the shopping cart consistent with what the active mode negotiates,
//! and reconstructs the active mode from persisted message metadata after a
//! restart.

pub mod cart;
pub mod checkout;
pub mod comparison;
pub mod controller;
pub mod error;
pub mod parser;
pub mod recovery;
pub mod router;
pub mod session;

pub use cart::CartLedger;
pub use checkout::{CheckoutState, CheckoutStep};
pub use comparison::ComparisonState;
pub use controller::{FlowController, TurnReply};
pub use error::FlowError;
pub use recovery::{recover, RecoveredFlow};
pub use router::{Intent, IntentRouter, RouteContext};
pub use session::SessionIdentity;
