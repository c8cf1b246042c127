//! # store-client
//!
//! Contract for talking to a remote event store's persistent subscription
//! surface. This crate defines the trait boundary that subscription
//! management code programs against: a client capability for listing and
//! creating subscription groups and opening durable subscriptions, a handle
//! for acknowledging delivered events, and an observer seam through which
//! the store pushes events and drop notifications.
//!
//! The actual wire transport (gRPC, discovery, reconnection of the raw
//! channel) lives behind implementations of these traits and is out of
//! scope here.

mod client;
mod error;
mod types;

pub use client::*;
pub use error::*;
pub use types::*;
