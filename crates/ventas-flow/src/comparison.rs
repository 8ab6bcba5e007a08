//! Product-comparison ("guion") flow.
//!
//! State machine: Idle → Negotiating → {handoff, abandoned}. All transitions
//! are explicit functions over owned state; the controller performs the
//! actual backend calls and feeds the results in, so every transition here is
//! synchronous and independently testable.
//!
//! While negotiating, the backend owns accept/reject/alternative semantics;
//! this flow only follows the returned `next_step` token.

use rust_decimal::Decimal;
use serde_json::json;

use ventas_backend::types::{
    CandidateProduct, ComparisonReply, NegotiationReply, Preferences, RankedProduct,
};
use ventas_core::error::VentasError;
use ventas_core::types::{CartItem, NextStep, META_BEST_OPTION, META_NEXT_STEP};

use crate::parser;

/// "We are mid-negotiation over which product to buy."
///
/// The ranked list from the last backend reply is kept so a checkout handoff
/// can price the accepted product into the cart.
#[derive(Debug, Clone, Default)]
pub struct ComparisonState {
    pub active: bool,
    pub best_option_id: Option<String>,
    pub session_id: String,
    pub ranked: Vec<RankedProduct>,
}

impl ComparisonState {
    pub fn inactive() -> Self {
        Self::default()
    }

    /// Terminal outcome: drop everything negotiated.
    pub fn deactivate(&mut self) {
        self.active = false;
        self.best_option_id = None;
        self.session_id.clear();
        self.ranked.clear();
    }
}

/// What one comparison turn produced: the reply text, the metadata to persist
/// on the agent message, and (on handoff) the accepted product for the cart.
#[derive(Debug)]
pub struct ComparisonTurn {
    pub message: String,
    pub metadata: Option<serde_json::Value>,
    pub cart_add: Option<CartItem>,
}

/// Build the structured comparison request for an opening utterance.
pub fn open_request(utterance: &str) -> (Vec<CandidateProduct>, Preferences) {
    (
        parser::extract_candidates(utterance),
        parser::extract_preferences(utterance),
    )
}

/// Apply the result of the start call.
///
/// Success enters Negotiating and invites an accept/reject reply; failure
/// surfaces an apology and stays Idle.
pub fn apply_start(
    state: &mut ComparisonState,
    session_id: &str,
    result: Result<ComparisonReply, VentasError>,
) -> ComparisonTurn {
    match result {
        Ok(reply) => {
            state.active = true;
            state.best_option_id = Some(reply.best_option_id.clone());
            state.session_id = session_id.to_string();
            state.ranked = reply.ranked_products.clone();

            let mut message = reply.message.clone();
            message.push_str("\n\n");
            message.push_str(&render_ranked(&reply.ranked_products, &reply.best_option_id));
            message.push_str("\n¿Te interesa? Responde \"sí\" o \"no\".");

            ComparisonTurn {
                message,
                metadata: Some(json!({
                    META_BEST_OPTION: reply.best_option_id,
                    META_NEXT_STEP: reply.next_step.as_str(),
                    "productos_comparados": reply.ranked_products.len(),
                })),
                cart_add: None,
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Comparison start failed");
            ComparisonTurn {
                message: "Lo siento, no pude comparar los productos en este momento. \
                          ¿Puedes intentar de nuevo?"
                    .to_string(),
                metadata: None,
                cart_add: None,
            }
        }
    }
}

/// Apply the result of a continue call.
///
/// The reply's `next_step` drives the transition; a failed call forces
/// terminal abandonment so the user is never stuck in a flow that cannot
/// progress.
pub fn apply_continue(
    state: &mut ComparisonState,
    result: Result<NegotiationReply, VentasError>,
) -> ComparisonTurn {
    match result {
        Ok(reply) => {
            let cart_add = apply_next_step(state, reply.best_option_id.as_deref(), reply.next_step);
            ComparisonTurn {
                message: reply.message,
                metadata: Some(json!({
                    META_BEST_OPTION: state
                        .best_option_id
                        .clone()
                        .or(reply.best_option_id)
                        .unwrap_or_default(),
                    META_NEXT_STEP: reply.next_step.as_str(),
                })),
                cart_add,
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Negotiation call failed; abandoning comparison");
            let last_best = state.best_option_id.clone().unwrap_or_default();
            state.deactivate();
            ComparisonTurn {
                message: "Lo siento, tuve un problema siguiendo la conversación. \
                          Empecemos de nuevo cuando quieras."
                    .to_string(),
                metadata: Some(json!({
                    META_BEST_OPTION: last_best,
                    META_NEXT_STEP: NextStep::NuevaConversacion.as_str(),
                })),
                cart_add: None,
            }
        }
    }
}

/// Pure transition: fold one next-step token into the state.
///
/// Returns the accepted product as a cart item when the step is the checkout
/// handoff.
pub fn apply_next_step(
    state: &mut ComparisonState,
    best_option_id: Option<&str>,
    step: NextStep,
) -> Option<CartItem> {
    match step {
        NextStep::ConfirmarCompra | NextStep::SolicitarDatosEnvio => {
            if let Some(id) = best_option_id {
                state.best_option_id = Some(id.to_string());
            }
            None
        }
        NextStep::IrACheckout => {
            let accepted = best_option_id
                .map(|s| s.to_string())
                .or_else(|| state.best_option_id.clone());
            let item = accepted.map(|id| cart_item_for(state, &id));
            state.deactivate();
            item
        }
        NextStep::NuevaConversacion | NextStep::OrdenCompletada => {
            state.deactivate();
            None
        }
    }
}

/// Price the accepted product from the remembered ranked list. A state
/// recovered from persisted metadata has no ranked list; the order backend
/// owns real prices, so the fallback is display-only.
fn cart_item_for(state: &ComparisonState, product_id: &str) -> CartItem {
    match state.ranked.iter().find(|p| p.id == product_id) {
        Some(product) => CartItem {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            quantity: 1,
            unit_price: product.price,
        },
        None => CartItem {
            product_id: product_id.to_string(),
            product_name: product_id.to_string(),
            quantity: 1,
            unit_price: Decimal::ZERO,
        },
    }
}

/// Render the ranked alternatives block shown with the opening
/// recommendation.
fn render_ranked(products: &[RankedProduct], best_option_id: &str) -> String {
    let mut out = String::from("Productos comparados:\n");
    for product in products {
        let marker = if product.id == best_option_id { "⭐" } else { "•" };
        out.push_str(&format!(
            "{} {} — ${} (score {:.1}/100)\n   {}\n",
            marker,
            product.name,
            product.price.round_dp(2),
            product.score,
            product.rationale
        ));
    }
    out
}
