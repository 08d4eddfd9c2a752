//! Domain error types
//!
//! This module defines the error hierarchy for Vigil. All errors are
//! domain-specific and don't expose third-party types.

use thiserror::Error;

/// Result type alias for Vigil operations
pub type Result<T> = std::result::Result<T, VigilError>;

/// Main Vigil error type
///
/// This is the primary error type used throughout the library.
/// It wraps specific error types and provides context for error handling.
#[derive(Debug, Error)]
pub enum VigilError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid domain values (e.g. an entity span with `start >= end`)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Pattern library errors (bad TOML, bad regex, unknown category)
    #[error("Pattern library error: {0}")]
    Pattern(String),

    /// Statistical model inference errors
    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),

    /// The run was cancelled by the caller
    #[error("Processing cancelled")]
    Cancelled,

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

/// Errors raised at the statistical model boundary.
///
/// The display strings intentionally carry the vocabulary inspected by
/// [`crate::detection::retry::is_retryable_error`]; keep them in sync.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InferenceError {
    /// A single attempt exceeded its timeout
    #[error("Inference timeout: {0}")]
    Timeout(String),

    /// Transport failure between caller and model host
    #[error("Network connection failed: {0}")]
    Connection(String),

    /// Model still loading
    #[error("Model not ready: {0}")]
    ModelNotReady(String),

    /// Host throttled the request
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// Gateway-class failure (502/503/504)
    #[error("Gateway error {status}: {message}")]
    Gateway { status: u16, message: String },

    /// Input rejected before or by the model
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Model weights missing
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// Model weights unreadable
    #[error("Model corrupted: {0}")]
    ModelCorrupted(String),

    /// Host ran out of memory
    #[error("Out of memory: {0}")]
    OutOfMemory(String),

    /// Background worker has shut down
    #[error("Inference worker unavailable: {0}")]
    WorkerUnavailable(String),

    /// Anything else
    #[error("{0}")]
    Other(String),
}

// Conversion from std::io::Error
impl From<std::io::Error> for VigilError {
    fn from(err: std::io::Error) -> Self {
        VigilError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for VigilError {
    fn from(err: serde_json::Error) -> Self {
        VigilError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for VigilError {
    fn from(err: toml::de::Error) -> Self {
        VigilError::Configuration(format!("TOML parse error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vigil_error_display() {
        let err = VigilError::Configuration("Invalid config".to_string());
        assert_eq!(err.to_string(), "Configuration error: Invalid config");
    }

    #[test]
    fn test_inference_error_conversion() {
        let inference_err = InferenceError::Timeout("chunk 3".to_string());
        let vigil_err: VigilError = inference_err.into();
        assert!(matches!(vigil_err, VigilError::Inference(_)));
    }

    #[test]
    fn test_inference_error_messages_carry_vocabulary() {
        let timeout = InferenceError::Timeout("after 30000ms".to_string());
        assert!(timeout.to_string().to_lowercase().contains("timeout"));

        let gateway = InferenceError::Gateway {
            status: 503,
            message: "unavailable".to_string(),
        };
        assert!(gateway.to_string().contains("503"));

        let oom = InferenceError::OutOfMemory("tensor alloc".to_string());
        assert!(oom.to_string().to_lowercase().contains("out of memory"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let vigil_err: VigilError = io_err.into();
        assert!(matches!(vigil_err, VigilError::Io(_)));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let vigil_err: VigilError = json_err.into();
        assert!(matches!(vigil_err, VigilError::Serialization(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let vigil_err: VigilError = toml_err.into();
        assert!(matches!(vigil_err, VigilError::Configuration(_)));
        assert!(vigil_err.to_string().contains("TOML parse error"));
    }

    #[test]
    fn test_result_alias_propagates_span_errors() {
        fn email_at(start: usize, end: usize) -> Result<usize> {
            let entity = crate::domain::Entity::new(
                crate::domain::EntityType::Email,
                start,
                end,
                "anna@example.ch",
                0.9,
                crate::domain::DetectionSource::Pattern,
            )?;
            Ok(entity.len())
        }

        assert_eq!(email_at(0, 15).unwrap(), 15);
        assert!(matches!(email_at(15, 15), Err(VigilError::Validation(_))));
    }

    #[test]
    fn test_vigil_error_implements_std_error() {
        let err = VigilError::Validation("Test error".to_string());
        let _: &dyn std::error::Error = &err;
    }
}
