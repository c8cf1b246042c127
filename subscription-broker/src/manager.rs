//! Subscription registry and lifecycle management.
//!
//! The [`SubscriptionManager`] owns the authoritative set of desired
//! subscriptions and drives each toward the `Active` state, surviving drops
//! and transient faults. Connection attempts that fail are never retried
//! inline; they are handed to the [`Poller`] so callers of `subscribe` are
//! not blocked and retries stay centrally rate-limited.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use store_client::{
    ClientError, ClientResult, DropReason, PersistentSubscriptionsClient, RecordedEvent,
    SubscriptionHandle, SubscriptionObserver,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::BrokerConfig;
use crate::dispatch::{EventDispatcher, HandlerRegistry};
use crate::error::{BrokerError, Result};
use crate::poller::{PollOutcome, Poller};
use crate::types::{SubscriptionKey, SubscriptionState};

/// Per-key state tracked by the registry.
///
/// The handle is present only while actively connected. The cancellation
/// token is scoped to the entry's lifetime: created on subscribe, cancelled
/// on unsubscribe, checked by every deferred retry before it reconnects.
struct SubscriptionEntry {
    state: SubscriptionState,
    handle: Option<Arc<dyn SubscriptionHandle>>,
    cancel: CancellationToken,
}

impl SubscriptionEntry {
    fn new() -> Self {
        Self {
            state: SubscriptionState::Pending,
            handle: None,
            cancel: CancellationToken::new(),
        }
    }
}

/// Manager for durable subscription lifecycles.
///
/// Holds at most one entry per `stream::group` key and at most one live
/// remote connection per key. All registry mutations are per-key atomic
/// operations on a concurrent map; no global lock is taken.
pub struct SubscriptionManager {
    inner: Arc<ManagerInner>,
    shutdown: CancellationToken,
    poll_task: JoinHandle<()>,
}

struct ManagerInner {
    client: Arc<dyn PersistentSubscriptionsClient>,
    dispatcher: EventDispatcher,
    registry: DashMap<SubscriptionKey, SubscriptionEntry>,
    poller: Poller<SubscriptionKey>,
    config: BrokerConfig,
    // Handed out to observers and deferred retry actions. Everything that
    // outlives the manager holds it weakly, so dropping the manager tears
    // the whole structure down.
    self_ref: Weak<ManagerInner>,
}

impl SubscriptionManager {
    /// Create the manager and start its retry poll loop.
    pub fn start(
        client: Arc<dyn PersistentSubscriptionsClient>,
        handlers: Arc<HandlerRegistry>,
        config: BrokerConfig,
    ) -> Self {
        let inner = Arc::new_cyclic(|weak| ManagerInner {
            client,
            dispatcher: EventDispatcher::new(handlers),
            registry: DashMap::new(),
            poller: Poller::new(),
            config,
            self_ref: weak.clone(),
        });

        let shutdown = CancellationToken::new();
        let poll_task = {
            let poller = inner.poller.clone();
            let interval = inner.config.poll_interval;
            let shutdown = shutdown.clone();
            tokio::spawn(async move { poller.run(interval, shutdown).await })
        };

        Self {
            inner,
            shutdown,
            poll_task,
        }
    }

    /// Register a subscription for `(stream, group)` and attempt to connect.
    ///
    /// Idempotent: if the key is already registered, this logs and returns
    /// without side effects. A transient connection failure is handed to the
    /// poller; this method never blocks on retries.
    pub async fn subscribe(&self, stream: &str, group: &str) {
        let key = SubscriptionKey::new(stream, group);

        // The entry API is the sole gate against two concurrent subscribes
        // for the same key racing each other to a connection attempt.
        match self.inner.registry.entry(key.clone()) {
            Entry::Occupied(_) => {
                warn!(key = %key, "subscription already exists");
                return;
            }
            Entry::Vacant(vacant) => {
                vacant.insert(SubscriptionEntry::new());
            }
        }
        info!(key = %key, "subscription registered");

        if self.inner.try_connect(&key).await == PollOutcome::Retry {
            self.inner.schedule_resubscribe(key);
        }
    }

    /// Remove a subscription: cancel its retries and close its handle.
    ///
    /// No-op if the key is unknown.
    pub async fn unsubscribe(&self, stream: &str, group: &str) {
        let key = SubscriptionKey::new(stream, group);
        let Some((_, entry)) = self.inner.registry.remove(&key) else {
            debug!(key = %key, "unsubscribe for unknown key");
            return;
        };

        info!(key = %key, "unsubscribing");
        entry.cancel.cancel();
        self.inner.poller.remove(&key);
        if let Some(handle) = entry.handle {
            handle.close().await;
        }
    }

    /// Snapshot of currently registered keys.
    pub fn subscriptions(&self) -> Vec<SubscriptionKey> {
        self.inner
            .registry
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Current lifecycle state for a key, if registered.
    pub fn state(&self, stream: &str, group: &str) -> Option<SubscriptionState> {
        self.inner
            .registry
            .get(&SubscriptionKey::new(stream, group))
            .map(|entry| entry.state)
    }

    /// Cancel and close every registered subscription.
    pub async fn dispose_all(&self) {
        let keys: Vec<SubscriptionKey> = self
            .inner
            .registry
            .iter()
            .map(|entry| entry.key().clone())
            .collect();

        for key in keys {
            if let Some((_, entry)) = self.inner.registry.remove(&key) {
                entry.cancel.cancel();
                self.inner.poller.remove(&key);
                if let Some(handle) = entry.handle {
                    handle.close().await;
                }
            }
        }
    }

    /// Dispose all subscriptions and stop the poll loop, waiting for
    /// in-flight retries up to the configured shutdown timeout.
    pub async fn shutdown(self) -> Result<()> {
        self.dispose_all().await;
        self.shutdown.cancel();

        let timeout = self.inner.config.shutdown_timeout;
        match tokio::time::timeout(timeout, self.poll_task).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(BrokerError::ShutdownError(format!(
                "poll loop panicked: {e}"
            ))),
            Err(_) => Err(BrokerError::ShutdownError(format!(
                "poll loop did not stop within {timeout:?}"
            ))),
        }
    }
}

impl ManagerInner {
    /// One connection attempt for `key`, shared by the initial subscribe and
    /// every deferred retry.
    async fn try_connect(&self, key: &SubscriptionKey) -> PollOutcome {
        // A concurrent unsubscribe must short-circuit the attempt.
        let cancel = match self.registry.get(key) {
            Some(entry) if !entry.cancel.is_cancelled() => entry.cancel.clone(),
            _ => {
                debug!(key = %key, "entry removed or cancelled, skipping connect");
                return PollOutcome::Stop;
            }
        };
        self.set_state(key, SubscriptionState::Connecting);

        if self.config.auto_create_group {
            if let Err(e) = self.ensure_group(key).await {
                warn!(key = %key, error = %e, "failed to ensure subscription group");
                self.set_state(key, SubscriptionState::Retrying);
                return PollOutcome::Retry;
            }
        }

        // The remote store is the source of truth for "already connected":
        // after a restart the registry may lag behind remote reality.
        match self.client.list_to_stream(key.stream()).await {
            Ok(groups) => {
                let ours = self.client.connection_name();
                let already_connected = groups
                    .iter()
                    .any(|g| g.connections.iter().any(|c| c.connection_name == ours));
                if already_connected {
                    warn!(key = %key, "already connected on the remote store");
                    self.set_state(key, SubscriptionState::Active);
                    return PollOutcome::Stop;
                }
            }
            Err(ClientError::GroupNotFound { .. }) => {
                warn!(key = %key, "subscription group not found, removing");
                self.registry.remove(key);
                return PollOutcome::Stop;
            }
            Err(e) => {
                warn!(key = %key, error = %e, "listing remote connections failed");
                self.set_state(key, SubscriptionState::Retrying);
                return PollOutcome::Retry;
            }
        }

        if cancel.is_cancelled() {
            debug!(key = %key, "cancelled before subscribing");
            return PollOutcome::Stop;
        }

        let observer = Arc::new(ManagerObserver {
            inner: self.self_ref.clone(),
            key: key.clone(),
        });
        match self
            .client
            .subscribe_to_stream(key.stream(), key.group(), observer)
            .await
        {
            Ok(handle) => {
                // Compare-and-update: attach only if the entry still exists
                // and unsubscribe has not raced the connection attempt.
                let attached = match self.registry.get_mut(key) {
                    Some(mut entry) if !entry.cancel.is_cancelled() => {
                        entry.handle = Some(Arc::clone(&handle));
                        entry.state = SubscriptionState::Active;
                        true
                    }
                    _ => false,
                };

                if attached {
                    info!(
                        key = %key,
                        subscription_id = handle.subscription_id(),
                        "subscribed"
                    );
                    PollOutcome::Succeeded
                } else {
                    warn!(key = %key, "unsubscribed during connect, closing fresh handle");
                    handle.close().await;
                    PollOutcome::Stop
                }
            }
            Err(ClientError::GroupNotFound { .. }) => {
                warn!(key = %key, "subscription group not found, removing");
                self.registry.remove(key);
                PollOutcome::Stop
            }
            Err(e) => {
                warn!(key = %key, error = %e, "connection error");
                self.set_state(key, SubscriptionState::Retrying);
                PollOutcome::Retry
            }
        }
    }

    /// Create the subscription group if the store does not know it yet.
    async fn ensure_group(&self, key: &SubscriptionKey) -> ClientResult<()> {
        match self
            .client
            .get_info_to_stream(key.stream(), key.group())
            .await
        {
            Ok(_) => Ok(()),
            Err(ClientError::GroupNotFound { .. }) => {
                info!(key = %key, "creating subscription group");
                self.client
                    .create_to_stream(key.stream(), key.group(), &self.config.group_settings)
                    .await
            }
            Err(e) => Err(e),
        }
    }

    /// Queue exactly one resubscribe attempt for `key` on the poller.
    ///
    /// The action holds the manager weakly: a retry that outlives the
    /// manager resolves to `Stop` instead of keeping the registry, the
    /// dispatcher, and the client alive through the poller's work sets.
    fn schedule_resubscribe(&self, key: SubscriptionKey) {
        if self.poller.move_to_pending(&key) {
            return;
        }

        let inner = self.self_ref.clone();
        let action_key = key.clone();
        self.poller.add_pending(key, move || {
            let inner = inner.clone();
            let key = action_key.clone();
            Box::pin(async move {
                match inner.upgrade() {
                    Some(inner) => inner.try_connect(&key).await,
                    None => PollOutcome::Stop,
                }
            })
        });
    }

    /// Handle a drop notification from the remote client.
    async fn on_dropped(
        &self,
        key: &SubscriptionKey,
        subscription: Arc<dyn SubscriptionHandle>,
        reason: DropReason,
        message: Option<String>,
    ) {
        subscription.close().await;
        warn!(
            key = %key,
            reason = %reason,
            message = message.as_deref().unwrap_or(""),
            "subscription dropped"
        );

        // A drop we caused ourselves (unsubscribe/dispose) must not trigger
        // a spurious resubscribe.
        if reason == DropReason::Disposed {
            return;
        }

        // Only the currently attached handle may trigger a resubscribe; a
        // late notification for a superseded handle must not orphan its
        // replacement.
        let retrying = match self.registry.get_mut(key) {
            Some(mut entry) if !entry.cancel.is_cancelled() => {
                let current = entry
                    .handle
                    .as_ref()
                    .is_some_and(|h| h.subscription_id() == subscription.subscription_id());
                if current {
                    entry.handle = None;
                    entry.state = SubscriptionState::Retrying;
                }
                current
            }
            _ => false,
        };

        if retrying {
            self.schedule_resubscribe(key.clone());
        }
    }

    fn set_state(&self, key: &SubscriptionKey, state: SubscriptionState) {
        if let Some(mut entry) = self.registry.get_mut(key) {
            entry.state = state;
        }
    }
}

/// Observer wired into the remote client for one subscription key.
///
/// Holds the manager weakly so a torn-down manager does not keep receiving
/// callbacks through handles the client still owns.
struct ManagerObserver {
    inner: Weak<ManagerInner>,
    key: SubscriptionKey,
}

#[async_trait]
impl SubscriptionObserver for ManagerObserver {
    async fn event_appeared(
        &self,
        subscription: Arc<dyn SubscriptionHandle>,
        event: RecordedEvent,
        _retry_count: Option<u32>,
    ) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        inner.dispatcher.dispatch(&subscription, &event).await;
    }

    async fn subscription_dropped(
        &self,
        subscription: Arc<dyn SubscriptionHandle>,
        reason: DropReason,
        message: Option<String>,
    ) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        inner.on_dropped(&self.key, subscription, reason, message).await;
    }
}
