//! Generic deferred-retry execution engine.
//!
//! The [`Poller`] decouples "what to retry" from "when to retry": callers
//! register keyed async actions, and a single poll loop drains the pending
//! set on a fixed interval, spawning each action without waiting for it to
//! complete. Each action's [`PollOutcome`] decides whether it is done,
//! re-queued for the next tick, or dropped. Keeping one interval and one
//! concurrency policy here means call sites never implement their own
//! delay loops.

use std::fmt::Display;
use std::hash::Hash;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

/// Result of one execution of a poll action.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PollOutcome {
    /// Done; the action moves to the executed set and is not polled again
    /// unless explicitly moved back to pending
    Succeeded,
    /// Try again on the next poll tick
    Retry,
    /// Done without success; drop the action entirely
    Stop,
}

/// A re-invokable asynchronous action producing a [`PollOutcome`].
pub type PollAction = Arc<dyn Fn() -> BoxFuture<'static, PollOutcome> + Send + Sync>;

/// Keyed deferred-work executor polled on a fixed interval.
///
/// Pending and executed sets are concurrent maps mutated per key; the poll
/// loop never holds a lock across an await. Spawned actions are tracked so
/// shutdown can wait for in-flight work instead of abandoning it.
#[derive(Clone)]
pub struct Poller<K>
where
    K: Eq + Hash + Clone + Display + Send + Sync + 'static,
{
    pending: Arc<DashMap<K, PollAction>>,
    executed: Arc<DashMap<K, PollAction>>,
    tasks: TaskTracker,
}

impl<K> Poller<K>
where
    K: Eq + Hash + Clone + Display + Send + Sync + 'static,
{
    /// Create a new poller with empty work sets.
    pub fn new() -> Self {
        Self {
            pending: Arc::new(DashMap::new()),
            executed: Arc::new(DashMap::new()),
            tasks: TaskTracker::new(),
        }
    }

    /// Register an action under `key` for the next poll tick.
    ///
    /// If `key` already has a pending action, the new one is dropped: the
    /// first registration wins until it runs.
    pub fn add_pending<F>(&self, key: K, action: F)
    where
        F: Fn() -> BoxFuture<'static, PollOutcome> + Send + Sync + 'static,
    {
        self.pending.entry(key).or_insert_with(|| Arc::new(action));
    }

    /// Forget any action tracked for `key`, pending or executed.
    ///
    /// Callers retiring a key permanently use this to keep the work sets
    /// from accumulating actions that will never run again.
    pub fn remove(&self, key: &K) {
        self.pending.remove(key);
        self.executed.remove(key);
    }

    /// Move a previously succeeded action back to the pending set.
    ///
    /// Returns whether `key` was found in the executed set. Used when an
    /// externally observed event invalidates an earlier success.
    pub fn move_to_pending(&self, key: &K) -> bool {
        match self.executed.remove(key) {
            Some((key, action)) => {
                self.pending.entry(key).or_insert(action);
                true
            }
            None => false,
        }
    }

    /// Run the poll loop until `shutdown` is cancelled.
    ///
    /// On each tick the pending set is snapshotted and drained; every action
    /// is spawned concurrently and the loop moves on without awaiting it.
    /// After cancellation, in-flight actions are awaited before returning.
    pub async fn run(&self, interval: Duration, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.run_pending(),
                _ = shutdown.cancelled() => break,
            }
        }

        self.tasks.close();
        self.tasks.wait().await;
    }

    /// Drain the pending set, spawning one task per action.
    fn run_pending(&self) {
        let keys: Vec<K> = self.pending.iter().map(|entry| entry.key().clone()).collect();

        for key in keys {
            // A concurrent completion may have removed the key already.
            let Some((key, action)) = self.pending.remove(&key) else {
                continue;
            };

            debug!(key = %key, "executing poll action");
            let pending = Arc::clone(&self.pending);
            let executed = Arc::clone(&self.executed);
            self.tasks.spawn(async move {
                match AssertUnwindSafe(action()).catch_unwind().await {
                    Ok(PollOutcome::Succeeded) => {
                        debug!(key = %key, "poll action succeeded");
                        executed.insert(key, action);
                    }
                    Ok(PollOutcome::Retry) => {
                        debug!(key = %key, "poll action will retry");
                        pending.entry(key).or_insert(action);
                    }
                    Ok(PollOutcome::Stop) => {
                        debug!(key = %key, "poll action stopped");
                    }
                    Err(_) => {
                        warn!(key = %key, "poll action panicked, dropping it");
                    }
                }
            });
        }
    }
}

impl<K> Default for Poller<K>
where
    K: Eq + Hash + Clone + Display + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
