//! Core types for the store-client contract.

use std::time::Duration;

use bytes::Bytes;
use uuid::Uuid;

/// A single event as delivered by the remote store.
///
/// The payload is kept as raw bytes; resolving it into a typed application
/// event is the consumer's job.
#[derive(Debug, Clone)]
pub struct RecordedEvent {
    /// The stream this event was recorded on
    pub stream_id: String,
    /// Unique identifier of the event
    pub event_id: Uuid,
    /// Wire-level event type string, used for type resolution
    pub event_type: String,
    /// Position of the event within its stream
    pub event_number: u64,
    /// Raw payload bytes (structured, typically JSON)
    pub data: Bytes,
}

impl RecordedEvent {
    /// Create a new recorded event.
    pub fn new(
        stream_id: impl Into<String>,
        event_type: impl Into<String>,
        event_number: u64,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            stream_id: stream_id.into(),
            event_id: Uuid::new_v4(),
            event_type: event_type.into(),
            event_number,
            data: data.into(),
        }
    }
}

/// Action to take when negatively acknowledging an event.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum NakAction {
    /// Set the event aside server-side for manual or later handling
    Park,
    /// Ask the store to redeliver the event
    Retry,
    /// Skip the event without parking it
    Skip,
}

/// Why an established subscription was terminated.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum DropReason {
    /// The handle was closed by its owner
    Disposed,
    /// The subscriber side failed (e.g. an escaping callback error)
    SubscriberError,
    /// The server or transport terminated the subscription
    ServerError,
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DropReason::Disposed => write!(f, "disposed"),
            DropReason::SubscriberError => write!(f, "subscriber error"),
            DropReason::ServerError => write!(f, "server error"),
        }
    }
}

/// A consumer connection as reported by the remote store.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    /// Name the connecting client identified itself with
    pub connection_name: String,
}

/// Server-side view of one subscription group on a stream.
#[derive(Debug, Clone)]
pub struct SubscriptionInfo {
    /// The group name
    pub group_name: String,
    /// Currently attached consumer connections
    pub connections: Vec<ConnectionInfo>,
}

/// Settings used when creating a subscription group on the store.
#[derive(Debug, Clone)]
pub struct GroupSettings {
    /// Resolve link events to their original payloads
    pub resolve_link_tos: bool,
    /// How many times the store redelivers an event before parking it
    pub max_retry_count: u32,
    /// How long the store waits for an ack before redelivering
    pub message_timeout: Duration,
}

impl Default for GroupSettings {
    fn default() -> Self {
        Self {
            resolve_link_tos: true,
            max_retry_count: 10,
            message_timeout: Duration::from_secs(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorded_event_new() {
        let event = RecordedEvent::new("user-1", "UserCreated", 7, &b"{}"[..]);

        assert_eq!(event.stream_id, "user-1");
        assert_eq!(event.event_type, "UserCreated");
        assert_eq!(event.event_number, 7);
        assert_eq!(event.data.as_ref(), b"{}");
    }

    #[test]
    fn test_drop_reason_display() {
        assert_eq!(DropReason::Disposed.to_string(), "disposed");
        assert_eq!(DropReason::SubscriberError.to_string(), "subscriber error");
        assert_eq!(DropReason::ServerError.to_string(), "server error");
    }

    #[test]
    fn test_group_settings_default() {
        let settings = GroupSettings::default();

        assert!(settings.resolve_link_tos);
        assert_eq!(settings.max_retry_count, 10);
        assert_eq!(settings.message_timeout, Duration::from_secs(30));
    }
}
