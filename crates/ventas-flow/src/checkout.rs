//! Checkout flow.
//!
//! State machine: None → Address → Confirm → Processing → {done, None}.
//! Collects the shipping address and optional contact data, then submits an
//! order built from the cart. Transitions are explicit functions over owned
//! state; the controller performs the order-backend call and feeds the
//! receipt back in.

use serde_json::json;

use ventas_backend::types::{OrderContact, OrderItem, OrderReceipt, OrderRequest};
use ventas_core::error::VentasError;
use ventas_core::types::{NextStep, META_NEXT_STEP};

use crate::cart::CartLedger;
use crate::error::FlowError;
use crate::parser;

/// Where the checkout conversation currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutStep {
    Address,
    Confirm,
    Processing,
}

/// Data collected across the checkout conversation.
#[derive(Debug, Clone, Default)]
pub struct CheckoutState {
    pub step: Option<CheckoutStep>,
    pub shipping_address: Option<String>,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
}

impl CheckoutState {
    pub fn inactive() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.step.is_some()
    }

    /// Back to inactive, dropping everything collected.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// What the synchronous part of a checkout turn decided.
#[derive(Debug, PartialEq, Eq)]
pub enum CheckoutAdvance {
    /// Reply with this prompt; no external call needed.
    Prompt(String),
    /// The user confirmed: build the order and submit it.
    ReadyToSubmit,
}

/// Outcome of the order submission.
#[derive(Debug)]
pub struct CheckoutOutcome {
    pub message: String,
    pub metadata: Option<serde_json::Value>,
    pub linked_order_id: Option<String>,
    pub clear_cart: bool,
}

/// Enter the flow. Requires a non-empty cart; otherwise reports the error
/// and does not transition.
pub fn start(state: &mut CheckoutState, cart_non_empty: bool) -> Result<String, FlowError> {
    if !cart_non_empty {
        return Err(FlowError::EmptyCart);
    }
    state.step = Some(CheckoutStep::Address);
    Ok("¡Perfecto! Para coordinar el envío, ¿a qué dirección te lo hacemos llegar?".to_string())
}

/// Advance the conversation one utterance.
///
/// Address accepts any non-empty utterance verbatim as the shipping address.
/// Confirm scans for an email, then a phone-like digit run; if neither
/// matched the utterance is the contact name. Detected fields overwrite
/// their slot without clearing the others. The exact confirmation keyword
/// moves to Processing.
pub fn advance(
    state: &mut CheckoutState,
    utterance: &str,
    confirmation_keyword: &str,
) -> CheckoutAdvance {
    match state.step {
        Some(CheckoutStep::Address) => {
            state.shipping_address = Some(utterance.to_string());
            state.step = Some(CheckoutStep::Confirm);
            CheckoutAdvance::Prompt(format!(
                "Anotado: enviaremos a \"{}\". Si quieres, déjame un nombre de contacto, \
                 teléfono o correo. Cuando estés listo, escribe \"{}\" para crear el pedido.",
                utterance.trim(),
                confirmation_keyword
            ))
        }
        Some(CheckoutStep::Confirm) => {
            if parser::is_confirmation(utterance, confirmation_keyword) {
                state.step = Some(CheckoutStep::Processing);
                return CheckoutAdvance::ReadyToSubmit;
            }

            let email = parser::find_email(utterance);
            let phone = parser::find_phone(utterance);
            let mut captured: Vec<String> = Vec::new();

            if let Some(email) = email {
                captured.push(format!("correo {}", email));
                state.contact_email = Some(email);
            }
            if let Some(phone) = phone {
                captured.push(format!("teléfono {}", phone));
                state.contact_phone = Some(phone);
            }
            if captured.is_empty() {
                let name = utterance.trim().to_string();
                captured.push(format!("nombre {}", name));
                state.contact_name = Some(name);
            }

            CheckoutAdvance::Prompt(format!(
                "Guardado: {}. Escribe \"{}\" para crear el pedido, o sigue \
                 agregando datos de contacto.",
                captured.join(", "),
                confirmation_keyword
            ))
        }
        Some(CheckoutStep::Processing) | None => {
            CheckoutAdvance::Prompt("Estoy procesando tu pedido, dame un momento.".to_string())
        }
    }
}

/// Build the order submission from the cart and collected contact data.
///
/// The cart is read-only here; it is cleared only after a successful receipt.
pub fn build_order_request(
    state: &CheckoutState,
    cart: &CartLedger,
    session_id: &str,
) -> OrderRequest {
    OrderRequest {
        user_id: None,
        items: cart
            .items()
            .iter()
            .map(|item| OrderItem {
                product_id: item.product_id.clone(),
                quantity: item.quantity,
            })
            .collect(),
        shipping_address: state.shipping_address.clone().unwrap_or_default(),
        contact: OrderContact {
            name: state.contact_name.clone(),
            phone: state.contact_phone.clone(),
            email: state.contact_email.clone(),
        },
        session_id: Some(session_id.to_string()),
    }
}

/// Fold the order backend's answer into the state.
///
/// Success clears the cart and deactivates; any failure also deactivates
/// (fail-closed, no automatic retry) but preserves the cart so the user can
/// try checkout again.
pub fn apply_receipt(
    state: &mut CheckoutState,
    result: Result<OrderReceipt, VentasError>,
) -> CheckoutOutcome {
    match result {
        Ok(receipt) if receipt.success => {
            state.reset();
            let order_number = receipt
                .order_number
                .clone()
                .or(receipt.order_id.clone())
                .unwrap_or_else(|| "N/A".to_string());
            let total = receipt
                .total
                .map(|t| format!("${}", t.round_dp(2)))
                .unwrap_or_else(|| "N/A".to_string());
            CheckoutOutcome {
                message: format!(
                    "¡Listo! Tu pedido {} fue creado exitosamente. Total: {}. \
                     ¡Gracias por tu compra!",
                    order_number, total
                ),
                metadata: Some(json!({
                    META_NEXT_STEP: NextStep::OrdenCompletada.as_str(),
                    "order_number": order_number,
                })),
                linked_order_id: receipt.order_id,
                clear_cart: true,
            }
        }
        Ok(receipt) => {
            tracing::warn!(
                error_code = receipt.error_code.as_deref().unwrap_or("unknown"),
                "Order rejected by backend"
            );
            state.reset();
            CheckoutOutcome {
                message: format!(
                    "Lo siento, no pude crear tu pedido: {}. Tu carrito sigue \
                     intacto, puedes intentarlo de nuevo cuando quieras.",
                    receipt.message
                ),
                metadata: None,
                linked_order_id: None,
                clear_cart: false,
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Order submission failed");
            state.reset();
            CheckoutOutcome {
                message: "Lo siento, hubo un problema creando tu pedido. Tu carrito \
                          sigue intacto, puedes intentarlo de nuevo en un momento."
                    .to_string(),
                metadata: None,
                linked_order_id: None,
                clear_cart: false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use ventas_core::types::CartItem;

    const KEYWORD: &str = "confirmar";

    fn cart_with_item() -> CartLedger {
        let mut cart = CartLedger::new();
        cart.add(CartItem {
            product_id: "shoe-airmax90".to_string(),
            product_name: "Nike Air Max 90".to_string(),
            quantity: 2,
            unit_price: Decimal::new(10450, 2),
        })
        .unwrap();
        cart
    }

    fn ok_receipt() -> Result<OrderReceipt, VentasError> {
        Ok(OrderReceipt {
            success: true,
            order_id: Some("order-000001".to_string()),
            order_number: Some("ORD-00000001".to_string()),
            total: Some(Decimal::new(20900, 2)),
            item_count: Some(2),
            error_code: None,
            message: "ok".to_string(),
        })
    }

    // ---- Entry ----

    #[test]
    fn test_start_with_empty_cart_does_not_transition() {
        let mut state = CheckoutState::inactive();
        let result = start(&mut state, false);
        assert!(matches!(result, Err(FlowError::EmptyCart)));
        assert_eq!(state.step, None);
    }

    #[test]
    fn test_start_with_items_enters_address() {
        let mut state = CheckoutState::inactive();
        let prompt = start(&mut state, true).unwrap();
        assert_eq!(state.step, Some(CheckoutStep::Address));
        assert!(prompt.contains("dirección"));
    }

    // ---- Address step ----

    #[test]
    fn test_address_stored_verbatim() {
        let mut state = CheckoutState::inactive();
        start(&mut state, true).unwrap();
        let advance_result = advance(&mut state, "Av. Solano 1-23, Cuenca", KEYWORD);
        assert!(matches!(advance_result, CheckoutAdvance::Prompt(_)));
        assert_eq!(
            state.shipping_address.as_deref(),
            Some("Av. Solano 1-23, Cuenca")
        );
        assert_eq!(state.step, Some(CheckoutStep::Confirm));
    }

    // ---- Confirm step: field capture ----

    fn confirm_state() -> CheckoutState {
        let mut state = CheckoutState::inactive();
        start(&mut state, true).unwrap();
        advance(&mut state, "Av. Solano 1-23", KEYWORD);
        state
    }

    #[test]
    fn test_confirm_captures_email_only() {
        let mut state = confirm_state();
        advance(&mut state, "juan@example.com", KEYWORD);
        assert_eq!(state.contact_email.as_deref(), Some("juan@example.com"));
        assert_eq!(state.contact_name, None);
        assert_eq!(state.contact_phone, None);
        assert_eq!(state.step, Some(CheckoutStep::Confirm));
    }

    #[test]
    fn test_confirm_captures_phone() {
        let mut state = confirm_state();
        advance(&mut state, "0991234567", KEYWORD);
        assert_eq!(state.contact_phone.as_deref(), Some("0991234567"));
        assert_eq!(state.contact_name, None);
    }

    #[test]
    fn test_confirm_treats_plain_text_as_name() {
        let mut state = confirm_state();
        advance(&mut state, "Juan Pérez", KEYWORD);
        assert_eq!(state.contact_name.as_deref(), Some("Juan Pérez"));
    }

    #[test]
    fn test_confirm_last_write_wins_preserves_other_slots() {
        let mut state = confirm_state();
        advance(&mut state, "Juan Pérez", KEYWORD);
        advance(&mut state, "juan@example.com", KEYWORD);
        advance(&mut state, "otro@example.com", KEYWORD);
        // Email overwritten, name untouched.
        assert_eq!(state.contact_email.as_deref(), Some("otro@example.com"));
        assert_eq!(state.contact_name.as_deref(), Some("Juan Pérez"));
    }

    #[test]
    fn test_confirm_email_and_phone_in_one_utterance() {
        let mut state = confirm_state();
        advance(&mut state, "juan@example.com o al 0991234567", KEYWORD);
        assert_eq!(state.contact_email.as_deref(), Some("juan@example.com"));
        assert_eq!(state.contact_phone.as_deref(), Some("0991234567"));
        assert_eq!(state.contact_name, None);
    }

    // ---- Confirm step: keyword ----

    #[test]
    fn test_confirmation_keyword_moves_to_processing() {
        let mut state = confirm_state();
        let advance_result = advance(&mut state, " Confirmar ", KEYWORD);
        assert_eq!(advance_result, CheckoutAdvance::ReadyToSubmit);
        assert_eq!(state.step, Some(CheckoutStep::Processing));
    }

    #[test]
    fn test_embedded_keyword_is_contact_name() {
        let mut state = confirm_state();
        let advance_result = advance(&mut state, "quiero confirmar", KEYWORD);
        assert!(matches!(advance_result, CheckoutAdvance::Prompt(_)));
        assert_eq!(state.step, Some(CheckoutStep::Confirm));
    }

    // ---- Order request ----

    #[test]
    fn test_build_order_request_from_cart_and_contact() {
        let mut state = confirm_state();
        advance(&mut state, "juan@example.com", KEYWORD);
        let cart = cart_with_item();
        let request = build_order_request(&state, &cart, "sess-1");

        assert_eq!(request.items.len(), 1);
        assert_eq!(request.items[0].product_id, "shoe-airmax90");
        assert_eq!(request.items[0].quantity, 2);
        assert_eq!(request.shipping_address, "Av. Solano 1-23");
        assert_eq!(request.contact.email.as_deref(), Some("juan@example.com"));
        assert_eq!(request.session_id.as_deref(), Some("sess-1"));
    }

    // ---- Receipt handling ----

    #[test]
    fn test_receipt_success_clears_cart_and_deactivates() {
        let mut state = confirm_state();
        state.step = Some(CheckoutStep::Processing);
        let outcome = apply_receipt(&mut state, ok_receipt());

        assert!(outcome.clear_cart);
        assert_eq!(outcome.linked_order_id.as_deref(), Some("order-000001"));
        assert!(outcome.message.contains("ORD-00000001"));
        assert!(outcome.message.contains("$209.00"));
        assert_eq!(
            outcome.metadata.unwrap()[META_NEXT_STEP],
            "orden_completada"
        );
        assert!(!state.is_active());
    }

    #[test]
    fn test_receipt_rejection_preserves_cart_and_deactivates() {
        let mut state = confirm_state();
        state.step = Some(CheckoutStep::Processing);
        let outcome = apply_receipt(
            &mut state,
            Ok(OrderReceipt {
                success: false,
                order_id: None,
                order_number: None,
                total: None,
                item_count: None,
                error_code: Some("insufficient_stock".to_string()),
                message: "Stock insuficiente".to_string(),
            }),
        );
        assert!(!outcome.clear_cart);
        assert!(outcome.linked_order_id.is_none());
        assert!(outcome.message.contains("Stock insuficiente"));
        assert!(!state.is_active());
    }

    #[test]
    fn test_receipt_transport_error_fail_closed() {
        let mut state = confirm_state();
        state.step = Some(CheckoutStep::Processing);
        let outcome = apply_receipt(
            &mut state,
            Err(VentasError::Network("timed out".to_string())),
        );
        assert!(!outcome.clear_cart);
        assert!(!state.is_active());
        assert!(outcome.message.contains("carrito sigue intacto"));
    }
}
