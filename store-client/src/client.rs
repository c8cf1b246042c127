//! Trait boundary for the remote persistent subscription surface.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ClientResult;
use crate::types::{DropReason, GroupSettings, NakAction, RecordedEvent, SubscriptionInfo};

/// A live, disposable handle to one established subscription.
///
/// The handle is the only way to acknowledge delivered events back to the
/// store. Closing it terminates the subscription and causes a drop
/// notification with [`DropReason::Disposed`] on the owning observer.
#[async_trait]
pub trait SubscriptionHandle: Send + Sync {
    /// Server-assigned identifier for this subscription connection.
    fn subscription_id(&self) -> &str;

    /// Acknowledge that an event was processed successfully.
    async fn ack(&self, event: &RecordedEvent) -> ClientResult<()>;

    /// Negatively acknowledge an event with the given action and reason.
    async fn nack(&self, action: NakAction, reason: &str, event: &RecordedEvent)
        -> ClientResult<()>;

    /// Close the subscription. Idempotent.
    ///
    /// Implementations must deliver a final drop notification with
    /// [`DropReason::Disposed`] so owners can tell an intentional close
    /// apart from a remote drop.
    async fn close(&self);
}

/// Receiver for events and lifecycle notifications on one subscription.
///
/// Implementations are invoked from the client's internal concurrency:
/// `event_appeared` may run concurrently across subscriptions and, depending
/// on the client's buffering, for multiple in-flight events on the same
/// subscription. No callback may panic across this boundary.
#[async_trait]
pub trait SubscriptionObserver: Send + Sync {
    /// A new event was delivered on the subscription.
    async fn event_appeared(
        &self,
        subscription: Arc<dyn SubscriptionHandle>,
        event: RecordedEvent,
        retry_count: Option<u32>,
    );

    /// The subscription was terminated, intentionally or not.
    async fn subscription_dropped(
        &self,
        subscription: Arc<dyn SubscriptionHandle>,
        reason: DropReason,
        message: Option<String>,
    );
}

/// Client capability for the store's persistent subscription API.
///
/// This is the adapter boundary the subscription manager consumes; concrete
/// implementations own the wire protocol and transport.
#[async_trait]
pub trait PersistentSubscriptionsClient: Send + Sync {
    /// The connection identity this client presents to the store.
    ///
    /// Used to recognize connections we already hold when the local registry
    /// is out of sync with remote reality (e.g. after a restart).
    fn connection_name(&self) -> &str;

    /// List all subscription groups on a stream with their attached
    /// consumer connections.
    async fn list_to_stream(&self, stream: &str) -> ClientResult<Vec<SubscriptionInfo>>;

    /// Fetch info for one subscription group.
    ///
    /// Fails with [`crate::ClientError::GroupNotFound`] if the group does
    /// not exist.
    async fn get_info_to_stream(&self, stream: &str, group: &str)
        -> ClientResult<SubscriptionInfo>;

    /// Create a subscription group on a stream.
    async fn create_to_stream(
        &self,
        stream: &str,
        group: &str,
        settings: &GroupSettings,
    ) -> ClientResult<()>;

    /// Open a durable subscription to a stream/group pair.
    ///
    /// Events and drop notifications flow through `observer` until the
    /// returned handle is closed or the store drops the subscription.
    async fn subscribe_to_stream(
        &self,
        stream: &str,
        group: &str,
        observer: Arc<dyn SubscriptionObserver>,
    ) -> ClientResult<Arc<dyn SubscriptionHandle>>;
}
