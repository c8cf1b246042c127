//! Per-event pipeline: resolve, invoke, acknowledge or park.

use std::sync::Arc;

use store_client::{NakAction, RecordedEvent, SubscriptionHandle};
use tracing::{debug, warn};

use super::registry::HandlerRegistry;
use crate::error::DispatchError;

/// Runs the per-event pipeline for delivered events.
///
/// Any failure anywhere in the pipeline (mapping miss, deserialization
/// failure, handler error) parks the event with the error message as the
/// reason. Nothing escapes [`dispatch`](EventDispatcher::dispatch): a
/// poisoned event must never crash the subscription or block subsequent
/// events.
#[derive(Clone)]
pub struct EventDispatcher {
    registry: Arc<HandlerRegistry>,
}

impl EventDispatcher {
    /// Create a dispatcher over an immutable handler registry.
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self { registry }
    }

    /// Process one delivered event and acknowledge or park it.
    pub async fn dispatch(&self, subscription: &Arc<dyn SubscriptionHandle>, event: &RecordedEvent) {
        debug!(
            stream_id = %event.stream_id,
            event_id = %event.event_id,
            event_type = %event.event_type,
            event_number = event.event_number,
            "event appeared"
        );

        match self.process(event).await {
            Ok(()) => {
                if let Err(e) = subscription.ack(event).await {
                    warn!(event_id = %event.event_id, error = %e, "failed to ack event");
                }
            }
            Err(e) => {
                warn!(
                    event_id = %event.event_id,
                    event_type = %event.event_type,
                    error = %e,
                    "event processing failed, parking"
                );
                if let Err(nack_error) = subscription
                    .nack(NakAction::Park, &e.to_string(), event)
                    .await
                {
                    warn!(event_id = %event.event_id, error = %nack_error, "failed to park event");
                }
            }
        }
    }

    async fn process(&self, event: &RecordedEvent) -> Result<(), DispatchError> {
        let typed = self.registry.mapper().resolve(event)?;
        self.registry.invoker().invoke(typed.as_ref()).await
    }
}
