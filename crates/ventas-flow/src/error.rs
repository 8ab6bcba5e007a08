//! Error types for the flow engine.

use ventas_core::error::VentasError;

/// Errors from the conversation-flow engine.
///
/// Validation variants are recovered locally with a corrective prompt;
/// Network/Backend terminate the active flow fail-closed and surface an
/// apology; Storage is a genuine turn failure.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("quantity must be greater than zero")]
    InvalidQuantity,
    #[error("unit price cannot be negative")]
    InvalidPrice,
    #[error("cart is empty")]
    EmptyCart,
    #[error("network failure: {0}")]
    Network(String),
    #[error("backend failure: {0}")]
    Backend(String),
    #[error("storage failure: {0}")]
    Storage(String),
}

impl From<VentasError> for FlowError {
    fn from(err: VentasError) -> Self {
        match err {
            VentasError::Network(msg) => FlowError::Network(msg),
            VentasError::Backend(msg) => FlowError::Backend(msg),
            other => FlowError::Storage(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_error_display() {
        assert_eq!(FlowError::EmptyMessage.to_string(), "message cannot be empty");
        assert_eq!(
            FlowError::MessageTooLong(2000).to_string(),
            "message exceeds maximum length of 2000 characters"
        );
        assert_eq!(
            FlowError::InvalidQuantity.to_string(),
            "quantity must be greater than zero"
        );
        assert_eq!(FlowError::EmptyCart.to_string(), "cart is empty");
        assert_eq!(
            FlowError::Network("timed out".to_string()).to_string(),
            "network failure: timed out"
        );
    }

    #[test]
    fn test_from_ventas_error_preserves_class() {
        let err: FlowError = VentasError::Network("reset".to_string()).into();
        assert!(matches!(err, FlowError::Network(_)));

        let err: FlowError = VentasError::Backend("bad reply".to_string()).into();
        assert!(matches!(err, FlowError::Backend(_)));

        let err: FlowError = VentasError::Storage("disk full".to_string()).into();
        assert!(matches!(err, FlowError::Storage(_)));
        assert!(err.to_string().contains("disk full"));
    }
}
