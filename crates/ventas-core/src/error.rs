use thiserror::Error;

/// Top-level error type for the Ventas system.
///
/// Each variant wraps a subsystem-specific failure. Subsystem crates define
/// their own error types and implement `From<SubsystemError> for VentasError`
/// so that the `?` operator works seamlessly across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum VentasError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for VentasError {
    fn from(err: toml::de::Error) -> Self {
        VentasError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for VentasError {
    fn from(err: toml::ser::Error) -> Self {
        VentasError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for VentasError {
    fn from(err: serde_json::Error) -> Self {
        VentasError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Ventas operations.
pub type Result<T> = std::result::Result<T, VentasError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = VentasError::Config("missing field".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing field");

        let err = VentasError::Storage("disk full".to_string());
        assert_eq!(err.to_string(), "Storage error: disk full");

        let err = VentasError::Network("connection reset".to_string());
        assert_eq!(err.to_string(), "Network error: connection reset");

        let err = VentasError::Backend("invalid response".to_string());
        assert_eq!(err.to_string(), "Backend error: invalid response");

        let err = VentasError::Validation("empty cart".to_string());
        assert_eq!(err.to_string(), "Validation error: empty cart");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: VentasError = io_err.into();
        assert!(matches!(err, VentasError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_from_toml_de() {
        let bad_toml = "invalid = [[[";
        let parsed: std::result::Result<toml::Value, _> = toml::from_str(bad_toml);
        assert!(parsed.is_err());
        let err: VentasError = parsed.unwrap_err().into();
        assert!(matches!(err, VentasError::Config(_)));
    }

    #[test]
    fn test_error_from_serde_json() {
        let bad_json = "{ invalid json }";
        let parsed: std::result::Result<serde_json::Value, _> = serde_json::from_str(bad_json);
        assert!(parsed.is_err());
        let err: VentasError = parsed.unwrap_err().into();
        assert!(matches!(err, VentasError::Serialization(_)));
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_ok() -> Result<i32> {
            Ok(42)
        }

        fn returns_err() -> Result<i32> {
            Err(VentasError::Validation("fail".to_string()))
        }

        assert_eq!(returns_ok().unwrap(), 42);
        assert!(returns_err().is_err());
    }

    #[test]
    fn test_error_debug_impl() {
        let err = VentasError::Backend("test debug".to_string());
        let dbg = format!("{:?}", err);
        assert!(dbg.contains("Backend"));
        assert!(dbg.contains("test debug"));
    }
}
