//! Domain events emitted by the fulfillment core.
//!
//! Events are facts about committed transitions, published for external
//! consumers (notification dispatch, projections). Delivery and ordering of
//! notifications is *not* a core guarantee: the persisted Order and
//! ReturnRequest records are the source of truth, and events are emitted
//! only after the owning transition has been committed.
//!
//! Payloads are serialized with `bincode`: compact, fast, and uniform for
//! all-Rust consumers. Event type names carry a version suffix
//! (`"OrderConfirmed.v1"`) to allow schema evolution.

use crate::ids::{OrderId, ReturnId};
use crate::money::Money;
use crate::returns::ReturnReason;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Topic for order lifecycle events.
pub const ORDER_TOPIC: &str = "order-events";
/// Topic for return/refund lifecycle events.
pub const RETURN_TOPIC: &str = "return-events";

/// Error types for event serialization.
#[derive(Error, Debug)]
pub enum EventError {
    /// Failed to serialize an event to bytes.
    #[error("Failed to serialize event: {0}")]
    SerializationError(String),

    /// Failed to deserialize an event from bytes.
    #[error("Failed to deserialize event: {0}")]
    DeserializationError(String),
}

/// A serialized event ready for publication.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedEvent {
    /// Versioned event type name, e.g. `"OrderShipped.v1"`.
    pub event_type: String,
    /// Bincode-encoded payload.
    pub data: Vec<u8>,
    /// Optional transport metadata.
    pub metadata: Option<Vec<u8>>,
}

impl SerializedEvent {
    /// Create a new serialized event.
    #[must_use]
    pub const fn new(event_type: String, data: Vec<u8>, metadata: Option<Vec<u8>>) -> Self {
        Self {
            event_type,
            data,
            metadata,
        }
    }
}

/// Events emitted by the order ledger, return workflow, and payout
/// reconciler.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DomainEvent {
    /// An order was created.
    OrderPlaced {
        /// The order.
        order_id: OrderId,
        /// Order total.
        amount: Money,
        /// When it happened.
        at: DateTime<Utc>,
    },
    /// The seller confirmed an order.
    OrderConfirmed {
        /// The order.
        order_id: OrderId,
        /// When it happened.
        at: DateTime<Utc>,
    },
    /// The seller started preparing an order.
    OrderProcessing {
        /// The order.
        order_id: OrderId,
        /// When it happened.
        at: DateTime<Utc>,
    },
    /// An order was handed to a carrier.
    OrderShipped {
        /// The order.
        order_id: OrderId,
        /// Carrier tracking number.
        tracking_number: String,
        /// Carrier name.
        carrier: String,
        /// When it happened.
        at: DateTime<Utc>,
    },
    /// Delivery of an order was confirmed.
    OrderDelivered {
        /// The order.
        order_id: OrderId,
        /// When it happened.
        at: DateTime<Utc>,
    },
    /// An order was canceled before shipment.
    OrderCanceled {
        /// The order.
        order_id: OrderId,
        /// Cancellation reason.
        reason: String,
        /// When it happened.
        at: DateTime<Utc>,
    },
    /// An order was returned via a completed return request.
    OrderReturned {
        /// The order.
        order_id: OrderId,
        /// The completed return.
        return_id: ReturnId,
        /// When it happened.
        at: DateTime<Utc>,
    },
    /// Funds entered the post-delivery hold window.
    PayoutProcessing {
        /// The order.
        order_id: OrderId,
        /// When it happened.
        at: DateTime<Utc>,
    },
    /// Funds were released to the seller.
    PayoutReleased {
        /// The order.
        order_id: OrderId,
        /// Amount released.
        amount: Money,
        /// When it happened.
        at: DateTime<Utc>,
    },
    /// Funds were reversed to the buyer.
    PayoutReversed {
        /// The order.
        order_id: OrderId,
        /// Amount reversed.
        amount: Money,
        /// When it happened.
        at: DateTime<Utc>,
    },
    /// A return was approved after the payout had already been paid;
    /// requires administrative settlement.
    PayoutFlaggedForReview {
        /// The order.
        order_id: OrderId,
        /// Amount at risk of reversal.
        amount_at_risk: Money,
        /// When it happened.
        at: DateTime<Utc>,
    },
    /// A buyer requested a return.
    ReturnRequested {
        /// The return.
        return_id: ReturnId,
        /// The order.
        order_id: OrderId,
        /// Declared reason.
        reason: ReturnReason,
        /// Quantity being returned.
        quantity: u32,
        /// When it happened.
        at: DateTime<Utc>,
    },
    /// A return was approved.
    ReturnApproved {
        /// The return.
        return_id: ReturnId,
        /// The order.
        order_id: OrderId,
        /// When it happened.
        at: DateTime<Utc>,
    },
    /// A return was rejected.
    ReturnRejected {
        /// The return.
        return_id: ReturnId,
        /// The order.
        order_id: OrderId,
        /// Rejection reason.
        reason: String,
        /// When it happened.
        at: DateTime<Utc>,
    },
    /// A returned item is on its way back to the seller.
    ReturnInTransit {
        /// The return.
        return_id: ReturnId,
        /// The order.
        order_id: OrderId,
        /// Return shipment tracking number.
        tracking_number: String,
        /// When it happened.
        at: DateTime<Utc>,
    },
    /// A returned item was received by the seller.
    ReturnReceived {
        /// The return.
        return_id: ReturnId,
        /// The order.
        order_id: OrderId,
        /// When it happened.
        at: DateTime<Utc>,
    },
    /// A return inspection was recorded and the refund amount finalized.
    ReturnInspected {
        /// The return.
        return_id: ReturnId,
        /// The order.
        order_id: OrderId,
        /// Finalized refund amount.
        refund_amount: Money,
        /// When it happened.
        at: DateTime<Utc>,
    },
    /// A return was withdrawn by the buyer.
    ReturnCanceled {
        /// The return.
        return_id: ReturnId,
        /// The order.
        order_id: OrderId,
        /// When it happened.
        at: DateTime<Utc>,
    },
    /// A stale requested return was expired administratively.
    ReturnExpired {
        /// The return.
        return_id: ReturnId,
        /// The order.
        order_id: OrderId,
        /// When it happened.
        at: DateTime<Utc>,
    },
    /// A refund settled successfully.
    RefundCompleted {
        /// The return.
        return_id: ReturnId,
        /// The order.
        order_id: OrderId,
        /// Amount refunded.
        amount: Money,
        /// When it happened.
        at: DateTime<Utc>,
    },
    /// A refund attempt failed; the return remains retryable.
    RefundFailed {
        /// The return.
        return_id: ReturnId,
        /// The order.
        order_id: OrderId,
        /// Failure reason from the gateway.
        reason: String,
        /// When it happened.
        at: DateTime<Utc>,
    },
}

impl DomainEvent {
    /// The versioned event type name.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::OrderPlaced { .. } => "OrderPlaced.v1",
            Self::OrderConfirmed { .. } => "OrderConfirmed.v1",
            Self::OrderProcessing { .. } => "OrderProcessing.v1",
            Self::OrderShipped { .. } => "OrderShipped.v1",
            Self::OrderDelivered { .. } => "OrderDelivered.v1",
            Self::OrderCanceled { .. } => "OrderCanceled.v1",
            Self::OrderReturned { .. } => "OrderReturned.v1",
            Self::PayoutProcessing { .. } => "PayoutProcessing.v1",
            Self::PayoutReleased { .. } => "PayoutReleased.v1",
            Self::PayoutReversed { .. } => "PayoutReversed.v1",
            Self::PayoutFlaggedForReview { .. } => "PayoutFlaggedForReview.v1",
            Self::ReturnRequested { .. } => "ReturnRequested.v1",
            Self::ReturnApproved { .. } => "ReturnApproved.v1",
            Self::ReturnRejected { .. } => "ReturnRejected.v1",
            Self::ReturnInTransit { .. } => "ReturnInTransit.v1",
            Self::ReturnReceived { .. } => "ReturnReceived.v1",
            Self::ReturnInspected { .. } => "ReturnInspected.v1",
            Self::ReturnCanceled { .. } => "ReturnCanceled.v1",
            Self::ReturnExpired { .. } => "ReturnExpired.v1",
            Self::RefundCompleted { .. } => "RefundCompleted.v1",
            Self::RefundFailed { .. } => "RefundFailed.v1",
        }
    }

    /// The topic this event is published on.
    #[must_use]
    pub const fn topic(&self) -> &'static str {
        match self {
            Self::OrderPlaced { .. }
            | Self::OrderConfirmed { .. }
            | Self::OrderProcessing { .. }
            | Self::OrderShipped { .. }
            | Self::OrderDelivered { .. }
            | Self::OrderCanceled { .. }
            | Self::OrderReturned { .. }
            | Self::PayoutProcessing { .. }
            | Self::PayoutReleased { .. }
            | Self::PayoutReversed { .. }
            | Self::PayoutFlaggedForReview { .. } => ORDER_TOPIC,
            Self::ReturnRequested { .. }
            | Self::ReturnApproved { .. }
            | Self::ReturnRejected { .. }
            | Self::ReturnInTransit { .. }
            | Self::ReturnReceived { .. }
            | Self::ReturnInspected { .. }
            | Self::ReturnCanceled { .. }
            | Self::ReturnExpired { .. }
            | Self::RefundCompleted { .. }
            | Self::RefundFailed { .. } => RETURN_TOPIC,
        }
    }

    /// Serialize this event to a publishable form.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::SerializationError`] if bincode encoding fails.
    pub fn to_serialized(&self) -> Result<SerializedEvent, EventError> {
        let data = bincode::serialize(self)
            .map_err(|e| EventError::SerializationError(e.to_string()))?;
        Ok(SerializedEvent::new(
            self.event_type().to_string(),
            data,
            None,
        ))
    }

    /// Deserialize an event from its published form.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::DeserializationError`] if bincode decoding
    /// fails.
    pub fn from_serialized(serialized: &SerializedEvent) -> Result<Self, EventError> {
        bincode::deserialize(&serialized.data)
            .map_err(|e| EventError::DeserializationError(e.to_string()))
    }
}
