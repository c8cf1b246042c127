//! Mock persistent subscription client for integration tests.
//!
//! Implements the `store-client` traits without any wire transport and with
//! configurable failure modes, so tests can script connectivity faults,
//! missing groups, remote duplicate connections, server-side drops, and
//! event delivery.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, Once, Weak};

use async_trait::async_trait;
use store_client::{
    ClientError, ClientResult, ConnectionInfo, DropReason, GroupSettings, NakAction,
    PersistentSubscriptionsClient, RecordedEvent, SubscriptionHandle, SubscriptionInfo,
    SubscriptionObserver,
};

static TRACING: Once = Once::new();

/// Install a fmt subscriber once per test binary so runs honor `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A live mock subscription: records acks/parks and delivers a `Disposed`
/// drop notification when closed, like a real client handle.
pub struct MockHandle {
    id: String,
    observer: Arc<dyn SubscriptionObserver>,
    closed: AtomicBool,
    self_ref: Weak<MockHandle>,
    pub acks: AtomicU32,
    pub parks: Mutex<Vec<String>>,
}

impl MockHandle {
    fn as_dyn(&self) -> Arc<dyn SubscriptionHandle> {
        self.self_ref
            .upgrade()
            .expect("handle alive while delivering")
    }

    /// Deliver one event through the observer, as the store would.
    pub async fn deliver(&self, event: RecordedEvent) {
        self.observer
            .event_appeared(self.as_dyn(), event, None)
            .await;
    }

    /// Simulate a drop initiated by the server or transport.
    pub async fn drop_from_server(&self, reason: DropReason, message: Option<String>) {
        self.observer
            .subscription_dropped(self.as_dyn(), reason, message)
            .await;
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SubscriptionHandle for MockHandle {
    fn subscription_id(&self) -> &str {
        &self.id
    }

    async fn ack(&self, _event: &RecordedEvent) -> ClientResult<()> {
        self.acks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn nack(
        &self,
        action: NakAction,
        reason: &str,
        _event: &RecordedEvent,
    ) -> ClientResult<()> {
        assert_eq!(action, NakAction::Park);
        self.parks.lock().unwrap().push(reason.to_string());
        Ok(())
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.observer
            .subscription_dropped(self.as_dyn(), DropReason::Disposed, None)
            .await;
    }
}

/// Scriptable in-memory client.
pub struct MockClient {
    connection_name: String,
    /// How many subscribe attempts fail with a connection error before one
    /// succeeds. `u32::MAX` means always fail.
    pub fail_subscribes: AtomicU32,
    /// Report the subscription group as missing.
    pub group_missing: AtomicBool,
    /// Report an existing remote connection bearing our connection name.
    pub already_connected: AtomicBool,
    pub list_calls: AtomicU32,
    pub subscribe_calls: AtomicU32,
    pub create_calls: AtomicU32,
    handles: Mutex<HashMap<String, Arc<MockHandle>>>,
}

impl MockClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            connection_name: "test-connection".to_string(),
            fail_subscribes: AtomicU32::new(0),
            group_missing: AtomicBool::new(false),
            already_connected: AtomicBool::new(false),
            list_calls: AtomicU32::new(0),
            subscribe_calls: AtomicU32::new(0),
            create_calls: AtomicU32::new(0),
            handles: Mutex::new(HashMap::new()),
        })
    }

    /// The live handle for `stream::group`, if one was established.
    pub fn handle(&self, stream: &str, group: &str) -> Option<Arc<MockHandle>> {
        self.handles
            .lock()
            .unwrap()
            .get(&format!("{stream}::{group}"))
            .cloned()
    }
}

#[async_trait]
impl PersistentSubscriptionsClient for MockClient {
    fn connection_name(&self) -> &str {
        &self.connection_name
    }

    async fn list_to_stream(&self, stream: &str) -> ClientResult<Vec<SubscriptionInfo>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        if self.group_missing.load(Ordering::SeqCst) {
            return Err(ClientError::GroupNotFound {
                stream: stream.to_string(),
                group: "*".to_string(),
            });
        }

        if self.already_connected.load(Ordering::SeqCst) {
            return Ok(vec![SubscriptionInfo {
                group_name: "remote-group".to_string(),
                connections: vec![ConnectionInfo {
                    connection_name: self.connection_name.clone(),
                }],
            }]);
        }

        Ok(Vec::new())
    }

    async fn get_info_to_stream(
        &self,
        stream: &str,
        group: &str,
    ) -> ClientResult<SubscriptionInfo> {
        if self.group_missing.load(Ordering::SeqCst) {
            return Err(ClientError::GroupNotFound {
                stream: stream.to_string(),
                group: group.to_string(),
            });
        }
        Ok(SubscriptionInfo {
            group_name: group.to_string(),
            connections: Vec::new(),
        })
    }

    async fn create_to_stream(
        &self,
        _stream: &str,
        _group: &str,
        _settings: &GroupSettings,
    ) -> ClientResult<()> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        // Creation makes the group exist for subsequent calls.
        self.group_missing.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn subscribe_to_stream(
        &self,
        stream: &str,
        group: &str,
        observer: Arc<dyn SubscriptionObserver>,
    ) -> ClientResult<Arc<dyn SubscriptionHandle>> {
        let attempt = self.subscribe_calls.fetch_add(1, Ordering::SeqCst);

        let failures = self.fail_subscribes.load(Ordering::SeqCst);
        if failures == u32::MAX || attempt < failures {
            return Err(ClientError::Connection("store unreachable".to_string()));
        }

        let key = format!("{stream}::{group}");
        let handle = Arc::new_cyclic(|weak| MockHandle {
            id: format!("{key}#{attempt}"),
            observer,
            closed: AtomicBool::new(false),
            self_ref: weak.clone(),
            acks: AtomicU32::new(0),
            parks: Mutex::new(Vec::new()),
        });

        self.handles
            .lock()
            .unwrap()
            .insert(key, Arc::clone(&handle));
        Ok(handle)
    }
}
