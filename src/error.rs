//! Error types for the query learning core
//!
//! A cache miss is not an error: lookups report it as `Ok(None)`. The
//! variants here cover the genuine failure modes of the five stores.

use thiserror::Error;

/// Main error type for query learning operations
#[derive(Error, Debug)]
pub enum LearningError {
    /// Persistence layer unreachable; the call made no partial write
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Malformed input (empty key, zero TTL, ...) rejected before any mutation
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Payload serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic error with context
    #[error("Error: {0}")]
    Other(String),
}

/// Result type alias for query learning operations
pub type Result<T> = std::result::Result<T, LearningError>;

impl From<String> for LearningError {
    fn from(s: String) -> Self {
        LearningError::Other(s)
    }
}

impl From<&str> for LearningError {
    fn from(s: &str) -> Self {
        LearningError::Other(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = LearningError::StorageUnavailable("connection refused".to_string());
        assert_eq!(error.to_string(), "Storage unavailable: connection refused");

        let error = LearningError::InvalidInput("empty fingerprint".to_string());
        assert_eq!(error.to_string(), "Invalid input: empty fingerprint");

        let error = LearningError::Serialization("unexpected end of input".to_string());
        assert!(error.to_string().contains("Serialization"));
    }

    #[test]
    fn test_error_conversion() {
        let error: LearningError = "test error".into();
        assert!(matches!(error, LearningError::Other(_)));

        let error: LearningError = "test error".to_string().into();
        assert!(matches!(error, LearningError::Other(_)));
    }
}
