//! Deterministic in-process backend implementations.
//!
//! Used by the test suites and the demo binary so the orchestrator can run
//! end-to-end without any network service. The comparison stub mirrors the
//! production protocol: scoring by priority and budget fit, approval and
//! rejection keyword handling, and alternative cycling until exhaustion.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use rust_decimal::Decimal;

use ventas_core::error::{Result, VentasError};
use ventas_core::types::NextStep;

use crate::traits::{AnsweringBackend, ComparisonBackend, OrderBackend};
use crate::types::{
    Answer, CandidateProduct, ComparisonReply, NegotiationReply, OrderReceipt, OrderRequest,
    Preferences, Priority, RankedProduct,
};

/// Unit prices (in cents) for the demo inventory. Unknown products fall back
/// to [`DEFAULT_PRICE_CENTS`].
const PRICES: &[(&str, i64)] = &[
    ("shoe-airmax90", 10450),
    ("shoe-airforce1", 12990),
    ("shoe-pegasus40", 13000),
    ("shoe-ultraboost", 18000),
    ("shoe-rsx", 9500),
    ("shoe-samba", 11000),
];

const DEFAULT_PRICE_CENTS: i64 = 10000;

fn price_of(product_id: &str) -> Decimal {
    let cents = PRICES
        .iter()
        .find(|(id, _)| *id == product_id)
        .map(|(_, cents)| *cents)
        .unwrap_or(DEFAULT_PRICE_CENTS);
    Decimal::new(cents, 2)
}

/// Words the comparison stub reads as approval of the current best option.
const APPROVAL_WORDS: &[&str] = &[
    "si", "sí", "yes", "ok", "dale", "va", "claro", "perfecto", "bueno",
];

/// Words the comparison stub reads as rejection of the current best option.
const REJECTION_WORDS: &[&str] = &["no", "nop", "nope", "nah", "otra", "diferente", "siguiente"];

// =============================================================================
// Answering
// =============================================================================

/// Canned answering backend for free-form questions.
pub struct StubAnswering;

#[async_trait]
impl AnsweringBackend for StubAnswering {
    async fn ask(&self, query: &str, _session_id: &str) -> Result<Answer> {
        Ok(Answer {
            text: format!(
                "Sobre tu consulta \"{}\": con gusto te ayudo. \
                 ¿Buscas algún modelo en particular?",
                query.trim()
            ),
        })
    }
}

// =============================================================================
// Comparison
// =============================================================================

struct Negotiation {
    ranked: Vec<RankedProduct>,
    current_index: usize,
    approved: bool,
}

/// Deterministic comparison backend.
///
/// Ranks candidates by mention priority and budget fit, then walks the
/// negotiation protocol: approval moves toward shipping data and then the
/// checkout handoff; rejection cycles to the next alternative until none
/// remain.
pub struct StubComparison {
    sessions: Mutex<HashMap<String, Negotiation>>,
}

impl StubComparison {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn score(candidate: &CandidateProduct, preferences: &Preferences) -> (f64, String) {
        let mut score: f64 = match candidate.priority {
            Priority::Alta => 25.0,
            Priority::Media => 15.0,
            Priority::Baja => 5.0,
        };
        let mut reasons: Vec<String> = Vec::new();
        if candidate.priority == Priority::Alta {
            reasons.push("Producto de alta prioridad según tus preferencias".to_string());
        }

        let price = price_of(&candidate.id);
        match preferences.budget {
            Some(budget) if price <= budget => {
                score += 25.0;
                reasons.push(format!("Precio dentro de tu presupuesto (${})", price));
            }
            Some(_) => {
                score += 5.0;
                reasons.push("Precio superior a tu presupuesto".to_string());
            }
            None => score += 15.0,
        }

        if let Some(ref uso) = preferences.intended_use {
            score += 10.0;
            reasons.push(format!("Adecuado para {}", uso));
        }

        if reasons.is_empty() {
            reasons.push("Buena relación calidad-precio".to_string());
        }
        (score.clamp(0.0, 100.0), reasons.join("; "))
    }
}

impl Default for StubComparison {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ComparisonBackend for StubComparison {
    async fn compare(
        &self,
        session_id: &str,
        candidates: &[CandidateProduct],
        preferences: &Preferences,
        _raw_utterance: &str,
    ) -> Result<ComparisonReply> {
        if candidates.is_empty() {
            return Err(VentasError::Backend(
                "no candidate products in request".to_string(),
            ));
        }

        let mut ranked: Vec<RankedProduct> = candidates
            .iter()
            .map(|c| {
                let (score, rationale) = Self::score(c, preferences);
                RankedProduct {
                    id: c.id.clone(),
                    name: c.name.clone(),
                    price: price_of(&c.id),
                    score,
                    rationale,
                }
            })
            .collect();
        ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

        let best = ranked[0].clone();
        let message = format!(
            "Te recomiendo los {} a ${}. ¿Te interesan? Responde \"sí\" o \"no\".",
            best.name, best.price
        );

        let mut sessions = self
            .sessions
            .lock()
            .map_err(|e| VentasError::Backend(format!("session lock poisoned: {}", e)))?;
        sessions.insert(
            session_id.to_string(),
            Negotiation {
                ranked: ranked.clone(),
                current_index: 0,
                approved: false,
            },
        );

        Ok(ComparisonReply {
            message,
            ranked_products: ranked,
            best_option_id: best.id,
            next_step: NextStep::ConfirmarCompra,
        })
    }

    async fn continue_negotiation(
        &self,
        session_id: &str,
        utterance: &str,
    ) -> Result<NegotiationReply> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|e| VentasError::Backend(format!("session lock poisoned: {}", e)))?;
        let negotiation = sessions
            .get_mut(session_id)
            .ok_or_else(|| VentasError::Backend(format!("unknown session: {}", session_id)))?;

        let lower = utterance.to_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        let is_approval = words.iter().any(|w| APPROVAL_WORDS.contains(w));
        let is_rejection = words.iter().any(|w| REJECTION_WORDS.contains(w));

        let current = negotiation.ranked[negotiation.current_index].clone();

        if negotiation.approved {
            // The user already accepted; whatever they just said answers the
            // shipping prompt, so comparison is done and checkout takes over.
            sessions.remove(session_id);
            return Ok(NegotiationReply {
                message: "¡Listo! Cuando quieras, dime \"comprar\" para armar tu pedido."
                    .to_string(),
                best_option_id: Some(current.id),
                next_step: NextStep::IrACheckout,
            });
        }

        if is_approval {
            negotiation.approved = true;
            return Ok(NegotiationReply {
                message: format!(
                    "¡Qué bien que te gustaron los {}! ¿A qué dirección te los enviamos?",
                    current.name
                ),
                best_option_id: Some(current.id),
                next_step: NextStep::SolicitarDatosEnvio,
            });
        }

        if is_rejection {
            if negotiation.current_index + 1 < negotiation.ranked.len() {
                negotiation.current_index += 1;
                let alt = negotiation.ranked[negotiation.current_index].clone();
                return Ok(NegotiationReply {
                    message: format!(
                        "Entiendo. Tengo otra opción que puede gustarte: los {} a ${}. \
                         ¿Qué te parecen?",
                        alt.name, alt.price
                    ),
                    best_option_id: Some(alt.id),
                    next_step: NextStep::ConfirmarCompra,
                });
            }
            sessions.remove(session_id);
            return Ok(NegotiationReply {
                message: "Entiendo que ninguno te convenció. ¿Buscamos otros estilos?"
                    .to_string(),
                best_option_id: None,
                next_step: NextStep::NuevaConversacion,
            });
        }

        Ok(NegotiationReply {
            message: format!(
                "¿Te interesan los {}? Responde \"sí\" o \"no\".",
                current.name
            ),
            best_option_id: Some(current.id),
            next_step: NextStep::ConfirmarCompra,
        })
    }
}

// =============================================================================
// Orders
// =============================================================================

/// In-memory order backend with sequential order numbers.
pub struct StubOrder {
    counter: AtomicU64,
}

impl StubOrder {
    pub fn new() -> Self {
        Self {
            counter: AtomicU64::new(1),
        }
    }
}

impl Default for StubOrder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderBackend for StubOrder {
    async fn create_order(&self, request: &OrderRequest) -> Result<OrderReceipt> {
        if request.items.is_empty() {
            return Ok(OrderReceipt {
                success: false,
                order_id: None,
                order_number: None,
                total: None,
                item_count: None,
                error_code: Some("empty_order".to_string()),
                message: "No hay productos en el pedido".to_string(),
            });
        }

        let total: Decimal = request
            .items
            .iter()
            .map(|item| Decimal::from(item.quantity) * price_of(&item.product_id))
            .sum();
        let item_count: u32 = request.items.iter().map(|item| item.quantity).sum();

        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let order_id = format!("order-{:06}", n);
        let order_number = format!("ORD-{:08}", n);
        tracing::debug!(%order_number, %total, "Stub order created");

        Ok(OrderReceipt {
            success: true,
            order_id: Some(order_id),
            order_number: Some(order_number),
            total: Some(total),
            item_count: Some(item_count),
            error_code: None,
            message: "Pedido creado exitosamente".to_string(),
        })
    }
}
