//! Error types for routerchat wire handling.

use thiserror::Error;

/// Errors that can occur while encoding or decoding backend bodies.
#[derive(Debug, Error)]
pub enum TypesError {
    /// JSON serialization failed
    #[error("serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    /// JSON deserialization failed
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let source = serde_json::from_str::<u8>("nope").unwrap_err();
        let err = TypesError::Deserialization(source);
        assert!(err.to_string().starts_with("deserialization failed: "));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TypesError>();
    }
}
