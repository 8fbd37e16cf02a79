//! Recording event bus for assertions on published events.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Test utilities document panics where critical

use fulfillment_core::event::{DomainEvent, SerializedEvent};
use fulfillment_core::event_bus::{EventBus, EventBusError};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

/// Event bus that records every publication instead of delivering it.
///
/// # Example
///
/// ```
/// use fulfillment_testing::RecordingEventBus;
///
/// let bus = RecordingEventBus::new();
/// assert!(bus.published().is_empty());
/// ```
#[derive(Clone, Debug, Default)]
pub struct RecordingEventBus {
    published: Arc<Mutex<Vec<(String, SerializedEvent)>>>,
}

impl RecordingEventBus {
    /// Create a new empty recording bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All publications so far, as `(topic, event)` pairs.
    #[must_use]
    pub fn published(&self) -> Vec<(String, SerializedEvent)> {
        self.published.lock().unwrap().clone()
    }

    /// The event type names published so far, in order.
    #[must_use]
    pub fn event_types(&self) -> Vec<String> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .map(|(_, event)| event.event_type.clone())
            .collect()
    }

    /// Decode all published events back into domain events.
    #[must_use]
    pub fn decoded(&self) -> Vec<DomainEvent> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .filter_map(|(_, event)| DomainEvent::from_serialized(event).ok())
            .collect()
    }

    /// Count publications of one event type.
    #[must_use]
    pub fn count_of(&self, event_type: &str) -> usize {
        self.published
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, event)| event.event_type == event_type)
            .count()
    }

    /// Drop all recorded publications (for test isolation).
    pub fn clear(&self) {
        self.published.lock().unwrap().clear();
    }
}

impl EventBus for RecordingEventBus {
    fn publish<'a>(
        &'a self,
        topic: &'a str,
        event: &'a SerializedEvent,
    ) -> Pin<Box<dyn Future<Output = Result<(), EventBusError>> + Send + 'a>> {
        Box::pin(async move {
            self.published
                .lock()
                .unwrap()
                .push((topic.to_string(), event.clone()));
            Ok(())
        })
    }
}
