//! Mapping from wire event-type strings to concrete event shapes.

use std::any::Any;
use std::collections::HashMap;

use serde::de::DeserializeOwned;
use store_client::RecordedEvent;

use crate::error::DispatchError;

type Decoder =
    Box<dyn Fn(&[u8]) -> Result<Box<dyn Any + Send + Sync>, serde_json::Error> + Send + Sync>;

/// One-way mapping from wire event-type string to a concrete event shape.
///
/// Populated once at startup; an unmapped event type is an error, not a
/// silent skip, so it surfaces in the per-event error path.
#[derive(Default)]
pub struct EventTypeMapper {
    decoders: HashMap<String, Decoder>,
}

impl EventTypeMapper {
    /// Create an empty mapper.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `E` as the shape for the given wire event type.
    pub fn map<E>(&mut self, event_type: impl Into<String>)
    where
        E: DeserializeOwned + Send + Sync + 'static,
    {
        self.decoders.insert(
            event_type.into(),
            Box::new(|payload| {
                serde_json::from_slice::<E>(payload)
                    .map(|event| Box::new(event) as Box<dyn Any + Send + Sync>)
            }),
        );
    }

    /// Whether a shape is registered for the given wire event type.
    pub fn is_mapped(&self, event_type: &str) -> bool {
        self.decoders.contains_key(event_type)
    }

    /// Resolve a delivered event into its mapped typed shape.
    pub fn resolve(
        &self,
        event: &RecordedEvent,
    ) -> Result<Box<dyn Any + Send + Sync>, DispatchError> {
        let decoder = self
            .decoders
            .get(&event.event_type)
            .ok_or_else(|| DispatchError::NotMapped(event.event_type.clone()))?;

        decoder(&event.data).map_err(|source| DispatchError::Deserialize {
            event_type: event.event_type.clone(),
            source,
        })
    }
}
