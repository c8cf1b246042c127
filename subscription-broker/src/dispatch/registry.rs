//! Startup-time registration table for event shapes and handlers.

use serde::de::DeserializeOwned;

use super::invoker::{EventHandler, EventHandlerInvoker};
use super::mapper::EventTypeMapper;

/// Immutable table pairing the event-type mapper with the handler invoker.
///
/// Built once through [`HandlerRegistryBuilder`] before any subscription is
/// established; there is no runtime re-registration.
pub struct HandlerRegistry {
    mapper: EventTypeMapper,
    invoker: EventHandlerInvoker,
}

impl HandlerRegistry {
    /// Start building a registry.
    pub fn builder() -> HandlerRegistryBuilder {
        HandlerRegistryBuilder {
            mapper: EventTypeMapper::new(),
            invoker: EventHandlerInvoker::new(),
        }
    }

    /// The event-type mapper.
    pub fn mapper(&self) -> &EventTypeMapper {
        &self.mapper
    }

    /// The handler invoker.
    pub fn invoker(&self) -> &EventHandlerInvoker {
        &self.invoker
    }
}

/// Builder collecting explicit `(event shape, wire type string, handler)`
/// registrations.
pub struct HandlerRegistryBuilder {
    mapper: EventTypeMapper,
    invoker: EventHandlerInvoker,
}

impl HandlerRegistryBuilder {
    /// Register a shape under a wire event type together with its handler.
    pub fn register<E, H>(mut self, event_type: impl Into<String>, handler: H) -> Self
    where
        E: DeserializeOwned + Send + Sync + 'static,
        H: EventHandler<E> + 'static,
    {
        self.mapper.map::<E>(event_type);
        self.invoker.register::<E, H>(handler);
        self
    }

    /// Register a shape under a wire event type without a handler.
    ///
    /// Events of this type deserialize successfully and are acknowledged
    /// without invoking anything.
    pub fn map_event<E>(mut self, event_type: impl Into<String>) -> Self
    where
        E: DeserializeOwned + Send + Sync + 'static,
    {
        self.mapper.map::<E>(event_type);
        self
    }

    /// Freeze the registrations into an immutable registry.
    pub fn build(self) -> HandlerRegistry {
        HandlerRegistry {
            mapper: self.mapper,
            invoker: self.invoker,
        }
    }
}
