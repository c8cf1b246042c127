//! Event type resolution and handler dispatch.
//!
//! This module turns an opaque delivered event into a typed handler
//! invocation and turns the handler outcome into an acknowledge or a park:
//! - [`EventTypeMapper`] maps wire event-type strings to concrete event
//!   shapes and deserializes payloads.
//! - [`EventHandlerInvoker`] finds and calls the single handler registered
//!   for a typed event.
//! - [`HandlerRegistry`] is the immutable startup-time registration table
//!   feeding both.
//! - [`EventDispatcher`] runs the per-event pipeline from the subscription
//!   callback.

mod dispatcher;
mod invoker;
mod mapper;
mod registry;

pub use dispatcher::EventDispatcher;
pub use invoker::{EventHandler, EventHandlerInvoker};
pub use mapper::EventTypeMapper;
pub use registry::{HandlerRegistry, HandlerRegistryBuilder};
