//! Service traits for the three external collaborators.
//!
//! The orchestrator depends only on these seams; production implementations
//! live outside this workspace, and `stub` provides deterministic in-process
//! versions for tests and the demo binary.

use async_trait::async_trait;

use ventas_core::error::Result;

use crate::types::{
    Answer, CandidateProduct, ComparisonReply, NegotiationReply, OrderReceipt, OrderRequest,
    Preferences,
};

/// Natural-language answering backend, used only on free-form turns.
#[async_trait]
pub trait AnsweringBackend: Send + Sync {
    async fn ask(&self, query: &str, session_id: &str) -> Result<Answer>;
}

/// Product-comparison backend driving the negotiation protocol.
#[async_trait]
pub trait ComparisonBackend: Send + Sync {
    /// Open a negotiation with the extracted candidates and preferences.
    async fn compare(
        &self,
        session_id: &str,
        candidates: &[CandidateProduct],
        preferences: &Preferences,
        raw_utterance: &str,
    ) -> Result<ComparisonReply>;

    /// Forward a mid-negotiation utterance verbatim. The backend owns
    /// accept/reject/alternative semantics.
    async fn continue_negotiation(
        &self,
        session_id: &str,
        utterance: &str,
    ) -> Result<NegotiationReply>;
}

/// Order persistence backend.
#[async_trait]
pub trait OrderBackend: Send + Sync {
    async fn create_order(&self, request: &OrderRequest) -> Result<OrderReceipt>;
}
