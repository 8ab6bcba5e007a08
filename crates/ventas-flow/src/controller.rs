//! Flow controller: the single entry point the rest of the application calls.
//!
//! Holds which flow is active, delegates each incoming utterance to the
//! active flow or to the intent router when none is, performs the external
//! backend calls under a timeout, and persists both halves of every turn to
//! the message log. Turns serialize through `&mut self`; there is no shared
//! mutable mode field.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use ventas_backend::traits::{AnsweringBackend, ComparisonBackend, OrderBackend};
use ventas_core::config::VentasConfig;
use ventas_core::error::VentasError;
use ventas_core::types::Role;
use ventas_storage::{Database, MessageRepository, SessionRepository};

use crate::cart::CartLedger;
use crate::checkout::{self, CheckoutAdvance, CheckoutState};
use crate::comparison::{self, ComparisonState, ComparisonTurn};
use crate::error::FlowError;
use crate::recovery;
use crate::router::{Intent, IntentRouter, RouteContext};
use crate::session::SessionIdentity;

/// What one processed turn hands back to the caller.
#[derive(Debug)]
pub struct TurnReply {
    pub message: String,
    pub session_id: String,
    pub intent: Intent,
}

/// Top-level coordinator for one conversation.
///
/// Exclusively owns the comparison and checkout states; at most one is
/// logically active at a time, which the router's precedence order
/// guarantees structurally.
pub struct FlowController {
    config: VentasConfig,
    session: SessionIdentity,
    cart: CartLedger,
    comparison: ComparisonState,
    checkout: CheckoutState,
    router: IntentRouter,
    messages: MessageRepository,
    answering: Arc<dyn AnsweringBackend>,
    comparisons: Arc<dyn ComparisonBackend>,
    orders: Arc<dyn OrderBackend>,
}

impl FlowController {
    pub fn new(
        config: VentasConfig,
        db: Arc<Database>,
        answering: Arc<dyn AnsweringBackend>,
        comparisons: Arc<dyn ComparisonBackend>,
        orders: Arc<dyn OrderBackend>,
    ) -> Self {
        Self {
            config,
            session: SessionIdentity::new(SessionRepository::new(Arc::clone(&db))),
            cart: CartLedger::new(),
            comparison: ComparisonState::inactive(),
            checkout: CheckoutState::inactive(),
            router: IntentRouter::new(),
            messages: MessageRepository::new(db),
            answering,
            comparisons,
            orders,
        }
    }

    /// Process one user utterance and return the agent's reply.
    pub async fn handle_message(&mut self, text: &str) -> Result<TurnReply, FlowError> {
        if text.trim().is_empty() {
            return Err(FlowError::EmptyMessage);
        }
        let max_len = self.config.chat.max_message_length;
        if text.chars().count() > max_len {
            return Err(FlowError::MessageTooLong(max_len));
        }

        let session_id = self.session.get_or_create()?;
        let ctx = RouteContext {
            comparison_active: self.comparison.active,
            checkout_active: self.checkout.is_active(),
            cart_non_empty: !self.cart.is_empty(),
        };
        let intent = self.router.route(text, &ctx);
        tracing::info!(session_id = %session_id, ?intent, "Turn started");

        self.messages.append(&session_id, Role::User, text, None, None)?;

        let (message, metadata, linked_order_id) = match intent {
            Intent::ContinueComparison => self.continue_comparison(text).await,
            Intent::ContinueCheckout => self.continue_checkout(&session_id, text).await,
            Intent::StartCheckout => self.start_checkout(),
            Intent::StartComparison => self.start_comparison(&session_id, text).await,
            Intent::FreeForm => self.free_form(&session_id, text).await,
        };

        self.messages.append(
            &session_id,
            Role::Agent,
            &message,
            metadata.as_ref(),
            linked_order_id.as_deref(),
        )?;

        Ok(TurnReply {
            message,
            session_id,
            intent,
        })
    }

    /// Reconstruct the active flow from the persisted log. Run on cold start
    /// before any new user input; idempotent, and a no-op when no session
    /// exists yet.
    pub fn reconcile(&mut self) -> Result<(), FlowError> {
        let Some(session_id) = self.session.current()? else {
            return Ok(());
        };
        let history = self
            .messages
            .fetch(&session_id, self.config.chat.history_page_size)?;
        self.comparison = match recovery::recover(&history) {
            Some(found) => {
                tracing::info!(
                    session_id = %session_id,
                    best_option_id = %found.best_option_id,
                    "Comparison flow recovered from history"
                );
                found.into_state()
            }
            None => ComparisonState::inactive(),
        };
        Ok(())
    }

    /// User-initiated reset: clears the history, both flow states, the cart,
    /// and the session identifier.
    pub fn reset_session(&mut self) -> Result<(), FlowError> {
        if let Some(session_id) = self.session.current()? {
            let removed = self.messages.clear_session(&session_id)?;
            tracing::info!(session_id = %session_id, removed, "Session cleared");
        }
        self.session.reset()?;
        self.comparison.deactivate();
        self.checkout.reset();
        self.cart.clear();
        Ok(())
    }

    pub fn cart(&self) -> &CartLedger {
        &self.cart
    }

    pub fn comparison_state(&self) -> &ComparisonState {
        &self.comparison
    }

    pub fn checkout_state(&self) -> &CheckoutState {
        &self.checkout
    }

    /// Persisted history page for the current session (oldest-first).
    pub fn history(&self) -> Result<Vec<ventas_core::types::Message>, FlowError> {
        match self.session.current()? {
            Some(session_id) => Ok(self
                .messages
                .fetch(&session_id, self.config.chat.history_page_size)?),
            None => Ok(Vec::new()),
        }
    }

    // -- Turn handlers --

    async fn start_comparison(
        &mut self,
        session_id: &str,
        text: &str,
    ) -> (String, Option<serde_json::Value>, Option<String>) {
        let (candidates, preferences) = comparison::open_request(text);
        let result = self
            .call(self.comparisons.compare(session_id, &candidates, &preferences, text))
            .await;
        let turn = comparison::apply_start(&mut self.comparison, session_id, result);
        self.absorb_turn(turn)
    }

    async fn continue_comparison(
        &mut self,
        text: &str,
    ) -> (String, Option<serde_json::Value>, Option<String>) {
        let negotiation_session = self.comparison.session_id.clone();
        let result = self
            .call(self.comparisons.continue_negotiation(&negotiation_session, text))
            .await;
        let turn = comparison::apply_continue(&mut self.comparison, result);
        self.absorb_turn(turn)
    }

    fn absorb_turn(
        &mut self,
        turn: ComparisonTurn,
    ) -> (String, Option<serde_json::Value>, Option<String>) {
        if let Some(item) = turn.cart_add {
            tracing::info!(product_id = %item.product_id, "Handoff: product added to cart");
            if let Err(e) = self.cart.add(item) {
                tracing::warn!(error = %e, "Handoff product rejected by cart");
            }
        }
        (turn.message, turn.metadata, None)
    }

    fn start_checkout(&mut self) -> (String, Option<serde_json::Value>, Option<String>) {
        match checkout::start(&mut self.checkout, !self.cart.is_empty()) {
            Ok(prompt) => (prompt, None, None),
            // Validation failure: corrective prompt, no transition.
            Err(_) => (
                "Tu carrito está vacío, así que aún no hay nada que pagar. \
                 Cuéntame qué producto te interesa."
                    .to_string(),
                None,
                None,
            ),
        }
    }

    async fn continue_checkout(
        &mut self,
        session_id: &str,
        text: &str,
    ) -> (String, Option<serde_json::Value>, Option<String>) {
        let keyword = self.config.chat.confirmation_keyword.clone();
        match checkout::advance(&mut self.checkout, text, &keyword) {
            CheckoutAdvance::Prompt(prompt) => (prompt, None, None),
            CheckoutAdvance::ReadyToSubmit => {
                let request = checkout::build_order_request(&self.checkout, &self.cart, session_id);
                let result = self.call(self.orders.create_order(&request)).await;
                let outcome = checkout::apply_receipt(&mut self.checkout, result);
                if outcome.clear_cart {
                    self.cart.clear();
                }
                (outcome.message, outcome.metadata, outcome.linked_order_id)
            }
        }
    }

    async fn free_form(
        &mut self,
        session_id: &str,
        text: &str,
    ) -> (String, Option<serde_json::Value>, Option<String>) {
        match self.call(self.answering.ask(text, session_id)).await {
            Ok(answer) => (answer.text, None, None),
            Err(e) => {
                tracing::warn!(error = %e, "Answering backend failed");
                (
                    "Lo siento, no puedo responder eso en este momento. \
                     ¿Puedes intentar de nuevo?"
                        .to_string(),
                    None,
                    None,
                )
            }
        }
    }

    /// Run a backend call under the configured timeout. Expiry is a call
    /// failure in the Network class; the caller's fail-closed semantics
    /// apply.
    async fn call<T, F>(&self, fut: F) -> Result<T, VentasError>
    where
        F: Future<Output = Result<T, VentasError>>,
    {
        let secs = self.config.backend.call_timeout_secs;
        match timeout(Duration::from_secs(secs), fut).await {
            Ok(result) => result,
            Err(_) => Err(VentasError::Network(format!(
                "backend call timed out after {}s",
                secs
            ))),
        }
    }
}
