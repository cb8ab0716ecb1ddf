//! errors.rs - Custom error types for the datawash-core library.
//!
//! Rule-level, record-level and catastrophic cleaning failures are reported as
//! data on a `CleanedRecord`. Everything in this enum is a transport or setup
//! fault that the caller (usually the queue consumer) has to act on.
//!
//! License: MIT OR APACHE 2.0

use thiserror::Error;

/// This enum represents all possible error types in the `datawash-core` library.
///
/// By using `#[non_exhaustive]`, we signal to consumers of this library that
/// new variants may be added in future versions.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum DatawashError {
    #[error("Failed to compile cleaning rule '{0}': {1}")]
    RuleCompilationError(String, regex::Error),

    #[error("Rule '{0}': pattern length ({1}) exceeds maximum allowed ({2})")]
    PatternLengthExceeded(String, usize, usize),

    #[error("Invalid cleaning configuration: {0}")]
    InvalidConfig(String),

    #[error("Malformed payload on route '{route}': {reason}")]
    MalformedPayload { route: String, reason: String },

    #[error("No handler registered for route '{0}'")]
    Unroutable(String),

    #[error("Broker connection is closed")]
    BrokerClosed,

    #[error("Request on route '{route}' timed out after {timeout_ms} ms")]
    Timeout { route: String, timeout_ms: u128 },

    #[error("Remote handler for route '{route}' failed: {message}")]
    Remote { route: String, message: String },

    #[error("Handler task failed: {0}")]
    HandlerCrashed(String),

    #[error("Failed to serialize message: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("An unexpected I/O error occurred: {0}")]
    IoError(#[from] std::io::Error),

    #[error("A critical system error occurred: {0}")]
    AnyhowWrapper(#[from] anyhow::Error),

    #[error("A fatal error occurred: {0}")]
    Fatal(String),
}

impl DatawashError {
    /// Whether redelivering the same message could ever succeed.
    ///
    /// A message nobody handles is dead-lettered straight away; everything
    /// else goes through the consumer's retry budget.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, DatawashError::Unroutable(_))
    }
}

/// Extracts a readable message from a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unroutable_is_not_retryable() {
        let err = DatawashError::Unroutable("reindex".to_string());
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("reindex"));
    }

    #[test]
    fn test_malformed_payload_is_retryable() {
        let err = DatawashError::MalformedPayload {
            route: "single-record-received".to_string(),
            reason: "expected value".to_string(),
        };
        assert!(err.is_retryable());
        assert!(err.to_string().contains("single-record-received"));
    }

    #[test]
    fn test_panic_message_extracts_str_and_string() {
        let boxed: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let boxed: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "bang");
    }

    #[test]
    fn test_handler_crash_is_retryable() {
        assert!(DatawashError::HandlerCrashed("panicked".to_string()).is_retryable());
    }
}
