//! Event bus abstraction for publishing domain events.
//!
//! The core emits events *after* the owning transition has been committed to
//! the repository: the persisted records are the source of truth and the bus
//! is best-effort delivery for external consumers (notification dispatch,
//! projections, dashboards). Subscribers must tolerate at-least-once
//! delivery; the core never blocks a command on publication success.
//!
//! # Topic Naming Convention
//!
//! Topics follow the pattern `{aggregate-type}-events`:
//! - `order-events`: order lifecycle and payout events
//! - `return-events`: return/refund lifecycle events

use crate::event::SerializedEvent;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur during event bus operations.
#[derive(Error, Debug, Clone)]
pub enum EventBusError {
    /// Failed to publish an event to a topic.
    #[error("Publish failed for topic '{topic}': {reason}")]
    PublishFailed {
        /// The topic that failed.
        topic: String,
        /// The reason for failure.
        reason: String,
    },

    /// Failed to serialize an event.
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    /// Network or transport error.
    #[error("Transport error: {0}")]
    TransportError(String),
}

/// Publisher of serialized domain events.
///
/// # Dyn Compatibility
///
/// Methods return explicit `Pin<Box<dyn Future>>` instead of `async fn` so
/// the trait can be held as `Arc<dyn EventBus>` by the runtime.
///
/// # Implementations
///
/// - `RecordingEventBus` (in `fulfillment-testing`): captures publications
///   for assertions.
/// - Production implementations adapt a broker client behind this trait.
pub trait EventBus: Send + Sync {
    /// Publish one event to a topic.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError`] when the event cannot be handed to the
    /// transport. Callers treat publication as best-effort: a failure is
    /// logged, never rolled back into the owning command.
    fn publish<'a>(
        &'a self,
        topic: &'a str,
        event: &'a SerializedEvent,
    ) -> Pin<Box<dyn Future<Output = Result<(), EventBusError>> + Send + 'a>>;
}
