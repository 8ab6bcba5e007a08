//! Wire types for the external backend contracts.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use ventas_core::types::NextStep;

/// Candidate priority, assigned by order of first mention in the utterance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Alta,
    Media,
    Baja,
}

/// A product the user mentioned, as submitted to the comparison backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidateProduct {
    pub id: String,
    pub name: String,
    pub priority: Priority,
}

/// How urgently the user wants to buy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Alta,
    Media,
    Baja,
}

impl Default for Urgency {
    fn default() -> Self {
        Urgency::Media
    }
}

/// Coarse user preferences extracted from the opening utterance.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Preferences {
    pub budget: Option<Decimal>,
    pub intended_use: Option<String>,
    #[serde(default)]
    pub urgency: Urgency,
}

/// A ranked alternative in the comparison backend's reply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedProduct {
    pub id: String,
    pub name: String,
    pub price: Decimal,
    pub score: f64,
    pub rationale: String,
}

/// Reply to the structured comparison request that opens a negotiation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReply {
    pub message: String,
    pub ranked_products: Vec<RankedProduct>,
    pub best_option_id: String,
    pub next_step: NextStep,
}

/// Reply to a continue-negotiation call. The backend owns the
/// accept/reject/alternative semantics; the flow only follows `next_step`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NegotiationReply {
    pub message: String,
    pub best_option_id: Option<String>,
    pub next_step: NextStep,
}

/// One line of an order request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    pub product_id: String,
    pub quantity: u32,
}

/// Optional contact data collected by the checkout flow.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OrderContact {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// Order submission built from the cart and checkout state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub user_id: Option<String>,
    pub items: Vec<OrderItem>,
    pub shipping_address: String,
    #[serde(default)]
    pub contact: OrderContact,
    pub session_id: Option<String>,
}

/// Order backend response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub success: bool,
    pub order_id: Option<String>,
    pub order_number: Option<String>,
    pub total: Option<Decimal>,
    pub item_count: Option<u32>,
    pub error_code: Option<String>,
    pub message: String,
}

/// Answering backend response for free-form questions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Priority::Alta).unwrap(), "\"alta\"");
        let back: Priority = serde_json::from_str("\"media\"").unwrap();
        assert_eq!(back, Priority::Media);
    }

    #[test]
    fn test_urgency_default_is_media() {
        assert_eq!(Urgency::default(), Urgency::Media);
    }

    #[test]
    fn test_preferences_default_empty() {
        let prefs = Preferences::default();
        assert!(prefs.budget.is_none());
        assert!(prefs.intended_use.is_none());
        assert_eq!(prefs.urgency, Urgency::Media);
    }

    #[test]
    fn test_comparison_reply_serde_round_trip() {
        let reply = ComparisonReply {
            message: "te recomiendo".to_string(),
            ranked_products: vec![RankedProduct {
                id: "p1".to_string(),
                name: "Nike Air Max 90".to_string(),
                price: Decimal::new(10450, 2),
                score: 87.5,
                rationale: "dentro de tu presupuesto".to_string(),
            }],
            best_option_id: "p1".to_string(),
            next_step: NextStep::ConfirmarCompra,
        };
        let json = serde_json::to_string(&reply).unwrap();
        assert!(json.contains("\"confirmar_compra\""));
        let back: ComparisonReply = serde_json::from_str(&json).unwrap();
        assert_eq!(back.best_option_id, "p1");
        assert_eq!(back.ranked_products.len(), 1);
    }

    #[test]
    fn test_order_request_serde_defaults_contact() {
        let json = r#"{
            "user_id": null,
            "items": [{"product_id": "p1", "quantity": 2}],
            "shipping_address": "Av. Solano 1-23",
            "session_id": "sess-1"
        }"#;
        let request: OrderRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.items[0].quantity, 2);
        assert!(request.contact.name.is_none());
    }
}
