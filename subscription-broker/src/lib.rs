//! # subscription-broker
//!
//! Durable subscription management over a remote event store's persistent
//! subscription surface.
//!
//! The crate drives three cooperating pieces:
//! - a [`SubscriptionManager`] owning the concurrent registry of desired
//!   subscriptions and their lifecycle state machine,
//! - a generic [`Poller`] that executes deferred resubscribe attempts on a
//!   fixed interval instead of retrying inline,
//! - an event [`dispatch`] pipeline resolving opaque wire events into typed
//!   handler invocations and acknowledging or parking each one.
//!
//! The wire protocol itself lives behind the traits in the `store-client`
//! crate; any implementation of `PersistentSubscriptionsClient` plugs in.

mod config;
mod error;
mod manager;
mod poller;
mod types;

pub mod dispatch;

pub use config::BrokerConfig;
pub use error::{BrokerError, DispatchError, HandlerError, Result};
pub use manager::SubscriptionManager;
pub use poller::{PollAction, PollOutcome, Poller};
pub use types::{SubscriptionKey, SubscriptionState};
