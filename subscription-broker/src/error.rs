//! Error types for the subscription-broker crate.

/// Errors from broker lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// An error occurred during shutdown
    #[error("shutdown error: {0}")]
    ShutdownError(String),
}

/// Errors from the event dispatch pipeline.
///
/// Any of these, raised while processing one delivered event, causes that
/// event to be parked with the error message as the reason. They never
/// affect the owning subscription's connection state.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// No event shape is mapped to this wire event type
    #[error("no mapping registered for event type: {0}")]
    NotMapped(String),

    /// The payload could not be deserialized into the mapped shape
    #[error("failed to deserialize {event_type}: {source}")]
    Deserialize {
        /// The wire event type
        event_type: String,
        /// The underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// The registered handler failed
    #[error("handler failed: {0}")]
    Handler(String),
}

/// Error returned by application event handlers.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct HandlerError(String);

impl HandlerError {
    /// Create a new handler error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

/// Convenience type alias for Results using BrokerError.
pub type Result<T> = std::result::Result<T, BrokerError>;
