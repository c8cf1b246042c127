//! Error types for the store-client contract.

/// Errors surfaced by persistent subscription client implementations.
///
/// The distinction between `GroupNotFound` and `Connection` matters to
/// callers: a missing group is a configuration fault that must not be
/// retried, while a connection fault is transient and retryable.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The subscription group does not exist on the remote store
    #[error("subscription group not found: {stream}::{group}")]
    GroupNotFound {
        /// The stream name
        stream: String,
        /// The group name
        group: String,
    },

    /// A transient fault establishing or maintaining a connection
    #[error("connection error: {0}")]
    Connection(String),

    /// Acknowledging or negatively-acknowledging an event failed
    #[error("acknowledge failed: {0}")]
    Ack(String),
}

impl ClientError {
    /// Whether the fault is transient and worth retrying.
    pub fn is_transient(&self) -> bool {
        !matches!(self, ClientError::GroupNotFound { .. })
    }
}

/// Convenience type alias for Results using ClientError.
pub type ClientResult<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_display() {
        let error = ClientError::GroupNotFound {
            stream: "orders".to_string(),
            group: "billing".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "subscription group not found: orders::billing"
        );

        let error = ClientError::Connection("endpoint unreachable".to_string());
        assert_eq!(error.to_string(), "connection error: endpoint unreachable");

        let error = ClientError::Ack("handle closed".to_string());
        assert_eq!(error.to_string(), "acknowledge failed: handle closed");
    }

    #[test]
    fn test_is_transient() {
        assert!(ClientError::Connection("timeout".to_string()).is_transient());
        assert!(ClientError::Ack("closed".to_string()).is_transient());
        assert!(!ClientError::GroupNotFound {
            stream: "s".to_string(),
            group: "g".to_string(),
        }
        .is_transient());
    }
}
