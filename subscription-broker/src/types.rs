//! Core types for the subscription-broker crate.

/// Composite identity of one durable subscription: a stream and a consumer
/// group subscribed to it.
///
/// Rendered as `stream::group` for lookup and logging.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct SubscriptionKey {
    stream: String,
    group: String,
}

impl SubscriptionKey {
    /// Create a new subscription key.
    pub fn new(stream: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            stream: stream.into(),
            group: group.into(),
        }
    }

    /// The stream name.
    pub fn stream(&self) -> &str {
        &self.stream
    }

    /// The consumer group name.
    pub fn group(&self) -> &str {
        &self.group
    }
}

impl std::fmt::Display for SubscriptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}", self.stream, self.group)
    }
}

impl std::str::FromStr for SubscriptionKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once("::") {
            Some((stream, group)) if !stream.is_empty() && !group.is_empty() => {
                Ok(Self::new(stream, group))
            }
            _ => Err(format!("invalid subscription key: {s}")),
        }
    }
}

/// Lifecycle state of one registered subscription.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SubscriptionState {
    /// Registered, no connection attempt started yet
    Pending,
    /// A connection attempt is in flight
    Connecting,
    /// Connected, events are flowing
    Active,
    /// Connection lost or failed, waiting for the next retry
    Retrying,
}

impl std::fmt::Display for SubscriptionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubscriptionState::Pending => write!(f, "pending"),
            SubscriptionState::Connecting => write!(f, "connecting"),
            SubscriptionState::Active => write!(f, "active"),
            SubscriptionState::Retrying => write!(f, "retrying"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_display() {
        let key = SubscriptionKey::new("$et-CaseCreated", "billing");
        assert_eq!(key.to_string(), "$et-CaseCreated::billing");
    }

    #[test]
    fn test_key_parse() {
        let key: SubscriptionKey = "orders::shipping".parse().unwrap();
        assert_eq!(key.stream(), "orders");
        assert_eq!(key.group(), "shipping");
    }

    #[test]
    fn test_key_parse_rejects_malformed() {
        assert!("orders".parse::<SubscriptionKey>().is_err());
        assert!("::group".parse::<SubscriptionKey>().is_err());
        assert!("stream::".parse::<SubscriptionKey>().is_err());
    }

    #[test]
    fn test_key_equality() {
        let a = SubscriptionKey::new("s", "g");
        let b: SubscriptionKey = "s::g".parse().unwrap();
        assert_eq!(a, b);
    }
}
