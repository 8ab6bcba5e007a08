//! External-collaborator contracts for the Ventas orchestrator.
//!
//! The flow engine only ever talks to the answering, comparison, and order
//! backends through the traits defined here. Deterministic stub
//! implementations back the test suite and the demo binary.

pub mod stub;
pub mod traits;
pub mod types;

pub use stub::{StubAnswering, StubComparison, StubOrder};
pub use traits::{AnsweringBackend, ComparisonBackend, OrderBackend};
pub use types::{
    Answer, CandidateProduct, ComparisonReply, NegotiationReply, OrderContact, OrderItem,
    OrderReceipt, OrderRequest, Preferences, Priority, RankedProduct, Urgency,
};
