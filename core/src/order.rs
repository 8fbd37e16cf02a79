//! Order record and its fulfillment commands.
//!
//! An order carries three sub-states:
//!
//! - [`OrderStatus`]: the single source of truth for fulfillment progress,
//!   monotonic along the happy path with two absorbing exits;
//! - [`DeliveryStatus`]: the logistics view, which may lag or lead slightly
//!   but never contradicts the order status;
//! - [`PayoutStatus`]: the money view, written exclusively by the payout
//!   reconciler.
//!
//! Orders are never hard-deleted; canceled and returned orders are retained
//! for audit.

use crate::ids::{BuyerId, ListingId, OrderId, ReturnId, SellerId};
use crate::money::{Currency, Money};
use crate::version::Version;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fulfillment progress of an order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Placed, awaiting seller confirmation.
    Pending,
    /// Confirmed by the seller.
    Confirmed,
    /// Being prepared for shipment.
    Processing,
    /// Handed to the carrier.
    Shipped,
    /// Delivery confirmed.
    Delivered,
    /// Canceled before shipment (absorbing).
    Canceled,
    /// Returned after delivery via a completed return request (absorbing).
    Returned,
}

impl OrderStatus {
    /// Whether no further fulfillment transitions are permitted.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Canceled | Self::Returned)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Canceled => "canceled",
            Self::Returned => "returned",
        };
        write!(f, "{s}")
    }
}

/// Logistics sub-state of an order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// Not yet handed to a carrier.
    NotShipped,
    /// With the carrier.
    InTransit,
    /// Delivered to the buyer.
    Delivered,
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotShipped => "not_shipped",
            Self::InTransit => "in_transit",
            Self::Delivered => "delivered",
        };
        write!(f, "{s}")
    }
}

/// Money sub-state of an order, computed by the payout reconciler.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    /// Funds held by the platform.
    InEscrow,
    /// Delivery confirmed; funds inside the hold window.
    Processing,
    /// Funds released to the seller.
    Paid,
    /// Funds returned to the buyer.
    Reversed,
}

impl fmt::Display for PayoutStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::InEscrow => "in_escrow",
            Self::Processing => "processing",
            Self::Paid => "paid",
            Self::Reversed => "reversed",
        };
        write!(f, "{s}")
    }
}

/// Logistics metadata required before an order can be marked shipped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingInfo {
    /// Carrier tracking number.
    pub tracking_number: String,
    /// Carrier name.
    pub carrier: String,
    /// Estimated delivery date.
    pub estimated_delivery: DateTime<Utc>,
}

/// Payload for creating a new order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewOrder {
    /// Unique order identifier.
    pub order_id: OrderId,
    /// Buyer placing the order.
    pub buyer_id: BuyerId,
    /// Seller fulfilling the order.
    pub seller_id: SellerId,
    /// Listing the order was placed against.
    pub listing_id: ListingId,
    /// Total amount in cents.
    pub amount: Money,
    /// Currency of the amount.
    pub currency: Currency,
    /// Ordered quantity.
    pub quantity: u32,
}

/// One order record, mutated exclusively through validated commands.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Unique identifier, immutable.
    pub order_id: OrderId,
    /// Buyer reference, immutable after creation.
    pub buyer_id: BuyerId,
    /// Seller reference, immutable after creation.
    pub seller_id: SellerId,
    /// Listing reference, immutable after creation.
    pub listing_id: ListingId,
    /// Total amount in cents.
    pub amount: Money,
    /// Currency of the amount.
    pub currency: Currency,
    /// Ordered quantity; denominator for proportional refunds.
    pub quantity: u32,
    /// Fulfillment progress.
    pub order_status: OrderStatus,
    /// Logistics sub-state.
    pub delivery_status: DeliveryStatus,
    /// Money sub-state, written only by the payout reconciler.
    pub payout_status: PayoutStatus,
    /// Logistics metadata, present from `shipped` onward.
    pub shipping: Option<ShippingInfo>,
    /// Reason recorded by a cancellation.
    pub cancel_reason: Option<String>,
    /// Set when a return was approved after the payout had already been
    /// paid; cleared only by administrative settlement.
    pub payout_flagged_for_review: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
    /// Delivery confirmation timestamp; set once, immutable once written.
    pub delivered_at: Option<DateTime<Utc>>,
    /// Aggregate version for optimistic concurrency (covers this order and
    /// all of its return requests).
    pub version: Version,
}

impl Order {
    /// Whether the delivery sub-state is consistent with the order status.
    ///
    /// `delivery_status = delivered` implies
    /// `order_status ∈ {delivered, returned}`.
    #[must_use]
    pub const fn delivery_consistent(&self) -> bool {
        !matches!(self.delivery_status, DeliveryStatus::Delivered)
            || matches!(
                self.order_status,
                OrderStatus::Delivered | OrderStatus::Returned
            )
    }
}

/// Commands accepted by the order ledger.
///
/// Each variant corresponds to one row of the order state machine. All
/// commands are idempotent: repeating a command whose target state already
/// holds is a no-op success.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OrderCommand {
    /// Seller confirms the order.
    Confirm,
    /// Seller begins preparing the order.
    MarkProcessing,
    /// Seller hands the order to a carrier.
    MarkShipped {
        /// Carrier tracking number (required, non-empty).
        tracking_number: String,
        /// Carrier name.
        carrier: String,
        /// Estimated delivery date (present or future).
        estimated_delivery: DateTime<Utc>,
    },
    /// Buyer or seller confirms delivery.
    ConfirmDelivery,
    /// Buyer, seller, or admin cancels before shipment.
    Cancel {
        /// Reason for cancellation (required, non-empty).
        reason: String,
    },
    /// Raised internally when a return request completes.
    CompleteReturn {
        /// The completed return request.
        return_id: ReturnId,
    },
}

/// Discriminant of an [`OrderCommand`], used as a transition-table key.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum OrderCommandKind {
    /// [`OrderCommand::Confirm`]
    Confirm,
    /// [`OrderCommand::MarkProcessing`]
    MarkProcessing,
    /// [`OrderCommand::MarkShipped`]
    MarkShipped,
    /// [`OrderCommand::ConfirmDelivery`]
    ConfirmDelivery,
    /// [`OrderCommand::Cancel`]
    Cancel,
    /// [`OrderCommand::CompleteReturn`]
    CompleteReturn,
}

impl OrderCommandKind {
    /// Stable command name for errors and logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Confirm => "ConfirmOrder",
            Self::MarkProcessing => "MarkProcessing",
            Self::MarkShipped => "MarkShipped",
            Self::ConfirmDelivery => "ConfirmDelivery",
            Self::Cancel => "CancelOrder",
            Self::CompleteReturn => "CompleteReturn",
        }
    }
}

impl OrderCommand {
    /// The transition-table key for this command.
    #[must_use]
    pub const fn kind(&self) -> OrderCommandKind {
        match self {
            Self::Confirm => OrderCommandKind::Confirm,
            Self::MarkProcessing => OrderCommandKind::MarkProcessing,
            Self::MarkShipped { .. } => OrderCommandKind::MarkShipped,
            Self::ConfirmDelivery => OrderCommandKind::ConfirmDelivery,
            Self::Cancel { .. } => OrderCommandKind::Cancel,
            Self::CompleteReturn { .. } => OrderCommandKind::CompleteReturn,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(OrderStatus::Canceled.is_terminal());
        assert!(OrderStatus::Returned.is_terminal());
        assert!(!OrderStatus::Delivered.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
    }

    #[test]
    fn status_display_matches_wire_names() {
        assert_eq!(OrderStatus::Pending.to_string(), "pending");
        assert_eq!(DeliveryStatus::NotShipped.to_string(), "not_shipped");
        assert_eq!(PayoutStatus::InEscrow.to_string(), "in_escrow");
    }

    #[test]
    fn command_kind_names() {
        let cmd = OrderCommand::Cancel {
            reason: "out_of_stock".to_string(),
        };
        assert_eq!(cmd.kind().name(), "CancelOrder");
    }
}
