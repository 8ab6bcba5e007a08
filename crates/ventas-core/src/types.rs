//! Shared data model for the conversation-flow orchestrator.
//!
//! These types cross crate boundaries: the storage layer persists them, the
//! flow engine mutates them, and the recovery reconciler reads them back.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata key carrying the recommended product id on agent messages.
pub const META_BEST_OPTION: &str = "mejor_opcion_id";

/// Metadata key carrying the next-step token on agent messages.
pub const META_NEXT_STEP: &str = "siguiente_paso";

/// A chat conversation, identified by an opaque string id.
///
/// Created lazily on first use and durable across restarts until an explicit
/// user-initiated reset replaces it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub created_at: DateTime<Utc>,
}

/// Who authored a message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Agent,
    System,
}

impl Role {
    /// Column/token representation used by the history store.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Agent => "AGENT",
            Role::System => "SYSTEM",
        }
    }

    /// Parse the stored token back into a role.
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "USER" => Some(Role::User),
            "AGENT" => Some(Role::Agent),
            "SYSTEM" => Some(Role::System),
            _ => None,
        }
    }
}

/// One persisted conversation turn half.
///
/// `metadata` is opaque to storage; the recovery reconciler interprets the
/// `mejor_opcion_id` / `siguiente_paso` keys on agent messages. Messages are
/// ordered by submission within a session and never mutated after append.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub session_id: String,
    pub role: Role,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub metadata: Option<serde_json::Value>,
    pub linked_order_id: Option<String>,
}

/// A line item in the shopping cart.
///
/// At most one item exists per `product_id`; merging adds quantities.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartItem {
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}

impl CartItem {
    /// Line subtotal: quantity × unit price.
    pub fn subtotal(&self) -> Decimal {
        Decimal::from(self.quantity) * self.unit_price
    }
}

/// Next-step token driving the comparison flow and encoded into persisted
/// agent-message metadata for recovery.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NextStep {
    /// Keep negotiating over the current best option.
    ConfirmarCompra,
    /// The conversation moves toward collecting shipping data; the flow
    /// remains comparison-owned until an explicit handoff.
    SolicitarDatosEnvio,
    /// Terminal handoff: comparison ends, checkout is up to the user.
    IrACheckout,
    /// Terminal abandonment: comparison ends with nothing agreed.
    NuevaConversacion,
    /// An order was placed; written by the checkout flow.
    OrdenCompletada,
}

impl NextStep {
    /// Wire token as written into message metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            NextStep::ConfirmarCompra => "confirmar_compra",
            NextStep::SolicitarDatosEnvio => "solicitar_datos_envio",
            NextStep::IrACheckout => "ir_a_checkout",
            NextStep::NuevaConversacion => "nueva_conversacion",
            NextStep::OrdenCompletada => "orden_completada",
        }
    }

    /// Parse a wire token. Unknown tokens yield `None`.
    pub fn parse(s: &str) -> Option<NextStep> {
        match s {
            "confirmar_compra" => Some(NextStep::ConfirmarCompra),
            "solicitar_datos_envio" => Some(NextStep::SolicitarDatosEnvio),
            "ir_a_checkout" => Some(NextStep::IrACheckout),
            "nueva_conversacion" => Some(NextStep::NuevaConversacion),
            "orden_completada" => Some(NextStep::OrdenCompletada),
            _ => None,
        }
    }

    /// Whether this token ends the comparison flow. Terminal steps are never
    /// resumed by recovery: abandonment, order completion, and the checkout
    /// handoff (handoff is terminal, not resumable as comparison).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            NextStep::IrACheckout | NextStep::NuevaConversacion | NextStep::OrdenCompletada
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---- Role ----

    #[test]
    fn test_role_round_trip() {
        for role in [Role::User, Role::Agent, Role::System] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
    }

    #[test]
    fn test_role_parse_unknown() {
        assert_eq!(Role::parse("BOT"), None);
        assert_eq!(Role::parse("user"), None);
        assert_eq!(Role::parse(""), None);
    }

    #[test]
    fn test_role_serde_uppercase() {
        let json = serde_json::to_string(&Role::Agent).unwrap();
        assert_eq!(json, "\"AGENT\"");
        let back: Role = serde_json::from_str("\"USER\"").unwrap();
        assert_eq!(back, Role::User);
    }

    // ---- NextStep ----

    #[test]
    fn test_next_step_tokens() {
        assert_eq!(NextStep::ConfirmarCompra.as_str(), "confirmar_compra");
        assert_eq!(
            NextStep::SolicitarDatosEnvio.as_str(),
            "solicitar_datos_envio"
        );
        assert_eq!(NextStep::IrACheckout.as_str(), "ir_a_checkout");
        assert_eq!(NextStep::NuevaConversacion.as_str(), "nueva_conversacion");
        assert_eq!(NextStep::OrdenCompletada.as_str(), "orden_completada");
    }

    #[test]
    fn test_next_step_round_trip() {
        for step in [
            NextStep::ConfirmarCompra,
            NextStep::SolicitarDatosEnvio,
            NextStep::IrACheckout,
            NextStep::NuevaConversacion,
            NextStep::OrdenCompletada,
        ] {
            assert_eq!(NextStep::parse(step.as_str()), Some(step));
        }
    }

    #[test]
    fn test_next_step_parse_unknown() {
        assert_eq!(NextStep::parse("reintentar"), None);
        assert_eq!(NextStep::parse(""), None);
        assert_eq!(NextStep::parse("CONFIRMAR_COMPRA"), None);
    }

    #[test]
    fn test_next_step_serde_matches_wire_token() {
        let json = serde_json::to_string(&NextStep::IrACheckout).unwrap();
        assert_eq!(json, "\"ir_a_checkout\"");
        let back: NextStep = serde_json::from_str("\"solicitar_datos_envio\"").unwrap();
        assert_eq!(back, NextStep::SolicitarDatosEnvio);
    }

    #[test]
    fn test_next_step_terminality() {
        assert!(!NextStep::ConfirmarCompra.is_terminal());
        assert!(!NextStep::SolicitarDatosEnvio.is_terminal());
        assert!(NextStep::IrACheckout.is_terminal());
        assert!(NextStep::NuevaConversacion.is_terminal());
        assert!(NextStep::OrdenCompletada.is_terminal());
    }

    // ---- CartItem ----

    #[test]
    fn test_cart_item_subtotal() {
        let item = CartItem {
            product_id: "p1".to_string(),
            product_name: "Nike Air Max 90".to_string(),
            quantity: 3,
            unit_price: Decimal::new(10450, 2), // 104.50
        };
        assert_eq!(item.subtotal(), Decimal::new(31350, 2)); // 313.50
    }

    #[test]
    fn test_cart_item_serde_round_trip() {
        let item = CartItem {
            product_id: "p1".to_string(),
            product_name: "Nike Pegasus 40".to_string(),
            quantity: 1,
            unit_price: Decimal::from(130),
        };
        let json = serde_json::to_string(&item).unwrap();
        let back: CartItem = serde_json::from_str(&json).unwrap();
        assert_eq!(back, item);
    }

    // ---- Message ----

    #[test]
    fn test_message_serde_with_metadata() {
        let msg = Message {
            id: Uuid::new_v4(),
            session_id: "sess-1".to_string(),
            role: Role::Agent,
            text: "hola".to_string(),
            created_at: Utc::now(),
            metadata: Some(serde_json::json!({
                META_BEST_OPTION: "p9",
                META_NEXT_STEP: "confirmar_compra",
            })),
            linked_order_id: None,
        };
        let json = serde_json::to_string(&msg).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back.role, Role::Agent);
        assert_eq!(
            back.metadata.unwrap()[META_BEST_OPTION],
            serde_json::json!("p9")
        );
    }
}
