//! Handler lookup and invocation for typed events.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;

use async_trait::async_trait;

use crate::error::{DispatchError, HandlerError};

/// An application handler for events of shape `E`.
#[async_trait]
pub trait EventHandler<E>: Send + Sync {
    /// Process one event. A returned error parks the event with the error
    /// message as the reason.
    async fn handle(&self, event: &E) -> Result<(), HandlerError>;
}

/// Object-safe wrapper that downcasts and delegates to a typed handler.
#[async_trait]
trait ErasedHandler: Send + Sync {
    async fn handle_any(&self, event: &(dyn Any + Send + Sync)) -> Result<(), DispatchError>;
}

struct TypedHandler<E, H> {
    handler: H,
    _event: PhantomData<fn(E)>,
}

#[async_trait]
impl<E, H> ErasedHandler for TypedHandler<E, H>
where
    E: Send + Sync + 'static,
    H: EventHandler<E>,
{
    async fn handle_any(&self, event: &(dyn Any + Send + Sync)) -> Result<(), DispatchError> {
        let event = event
            .downcast_ref::<E>()
            .ok_or_else(|| DispatchError::Handler("event shape mismatch".to_string()))?;

        self.handler
            .handle(event)
            .await
            .map_err(|e| DispatchError::Handler(e.to_string()))
    }
}

/// Resolves the single registered handler for an event's runtime type and
/// invokes it.
///
/// An event whose type has no registered handler is a silent no-op: type
/// mapping and handler registration are independently configurable, so a
/// mapped-but-unhandled event is acknowledged without side effect.
#[derive(Default)]
pub struct EventHandlerInvoker {
    handlers: HashMap<TypeId, Box<dyn ErasedHandler>>,
}

impl EventHandlerInvoker {
    /// Create an empty invoker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for events of shape `E`. A later registration for
    /// the same shape replaces the earlier one.
    pub fn register<E, H>(&mut self, handler: H)
    where
        E: Send + Sync + 'static,
        H: EventHandler<E> + 'static,
    {
        self.handlers.insert(
            TypeId::of::<E>(),
            Box::new(TypedHandler {
                handler,
                _event: PhantomData,
            }),
        );
    }

    /// Invoke the handler registered for the event's runtime type, if any.
    pub async fn invoke(&self, event: &(dyn Any + Send + Sync)) -> Result<(), DispatchError> {
        match self.handlers.get(&event.type_id()) {
            Some(handler) => handler.handle_any(event).await,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct Ping;
    struct Pong;

    struct CountingHandler {
        calls: Arc<AtomicU32>,
        fail_with: Option<String>,
    }

    #[async_trait]
    impl EventHandler<Ping> for CountingHandler {
        async fn handle(&self, _event: &Ping) -> Result<(), HandlerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.fail_with {
                Some(message) => Err(HandlerError::new(message.as_str())),
                None => Ok(()),
            }
        }
    }

    #[tokio::test]
    async fn test_invoke_registered_handler() {
        let calls = Arc::new(AtomicU32::new(0));
        let mut invoker = EventHandlerInvoker::new();
        invoker.register::<Ping, _>(CountingHandler {
            calls: Arc::clone(&calls),
            fail_with: None,
        });

        let event: Box<dyn Any + Send + Sync> = Box::new(Ping);
        invoker.invoke(event.as_ref()).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invoke_without_handler_is_noop() {
        let invoker = EventHandlerInvoker::new();

        let event: Box<dyn Any + Send + Sync> = Box::new(Pong);
        assert!(invoker.invoke(event.as_ref()).await.is_ok());
    }

    #[tokio::test]
    async fn test_handler_failure_becomes_dispatch_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let mut invoker = EventHandlerInvoker::new();
        invoker.register::<Ping, _>(CountingHandler {
            calls,
            fail_with: Some("db unavailable".to_string()),
        });

        let event: Box<dyn Any + Send + Sync> = Box::new(Ping);
        let error = invoker.invoke(event.as_ref()).await.err().unwrap();

        assert_eq!(error.to_string(), "handler failed: db unavailable");
    }
}
