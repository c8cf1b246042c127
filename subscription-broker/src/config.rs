//! Configuration for the subscription broker.

use std::time::Duration;

use store_client::GroupSettings;

/// Configuration for the [`SubscriptionManager`](crate::SubscriptionManager).
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Interval between poll ticks of the retry scheduler. Doubles as the
    /// fixed backoff before a failed connection attempt is retried.
    /// Default: 10 seconds
    pub poll_interval: Duration,

    /// How long shutdown waits for the poll loop and in-flight retries
    /// before giving up.
    /// Default: 5 seconds
    pub shutdown_timeout: Duration,

    /// Create the subscription group on the store when it does not exist,
    /// instead of treating the missing group as a configuration fault.
    /// Default: false
    pub auto_create_group: bool,

    /// Settings used when `auto_create_group` creates a group.
    pub group_settings: GroupSettings,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            shutdown_timeout: Duration::from_secs(5),
            auto_create_group: false,
            group_settings: GroupSettings::default(),
        }
    }
}
