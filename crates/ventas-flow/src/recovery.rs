//! Flow recovery from persisted message metadata.
//!
//! The source of truth for "which flow are we in" after a restart is not a
//! server session object: it is encoded inside the most recent agent
//! message's metadata. `recover` is a pure, total function over the fetched
//! history — it never fails, it only finds something or nothing.

use ventas_core::types::{Message, NextStep, Role, META_BEST_OPTION, META_NEXT_STEP};

use crate::comparison::ComparisonState;

/// A comparison negotiation reconstructed from the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveredFlow {
    pub best_option_id: String,
    pub session_id: String,
}

impl RecoveredFlow {
    /// The reconstructed flow state. Recovered sessions carry no ranked
    /// list; the negotiation continues from the backend's replies.
    pub fn into_state(self) -> ComparisonState {
        ComparisonState {
            active: true,
            best_option_id: Some(self.best_option_id),
            session_id: self.session_id,
            ranked: Vec::new(),
        }
    }
}

/// Reconstruct the active flow from a session's history.
///
/// Scans newest-first for the most recent AGENT message whose metadata
/// carries both the best-option id and the next-step token as strings.
/// Messages missing either key do not qualify and are skipped. Once a
/// qualifying message is found it alone decides: a terminal or unparseable
/// step token yields nothing (parse failures are swallowed — degraded, never
/// fatal), a mid-negotiation token reactivates the comparison flow.
pub fn recover(messages: &[Message]) -> Option<RecoveredFlow> {
    for message in messages.iter().rev() {
        if message.role != Role::Agent {
            continue;
        }
        let Some(metadata) = message.metadata.as_ref().and_then(|m| m.as_object()) else {
            continue;
        };
        let (Some(best), Some(step)) = (
            metadata.get(META_BEST_OPTION).and_then(|v| v.as_str()),
            metadata.get(META_NEXT_STEP).and_then(|v| v.as_str()),
        ) else {
            continue;
        };

        // This message is the recovery record. An unknown token means the
        // record is corrupt; degrade to "no recoverable flow".
        let step = NextStep::parse(step)?;
        if step.is_terminal() {
            return None;
        }
        return Some(RecoveredFlow {
            best_option_id: best.to_string(),
            session_id: message.session_id.clone(),
        });
    }
    None
}
