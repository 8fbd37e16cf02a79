//! Order ledger state machine.
//!
//! Commands are validated in two stages: payload validation first (missing
//! or malformed fields), then legality against the transition table. A
//! command whose target state already holds is a no-op success: duplicate
//! and retried requests fall through without touching the record.
//!
//! The ledger mutates only the order's fulfillment and delivery sub-states.
//! The payout sub-state belongs to the reconciler and is written by the
//! runtime after every committed transition.

use crate::error::FulfillmentError;
use crate::event::DomainEvent;
use crate::order::{
    DeliveryStatus, NewOrder, Order, OrderCommand, OrderStatus, PayoutStatus, ShippingInfo,
};
use crate::transition::{self, Decision};
use crate::version::Version;
use chrono::{DateTime, Utc};
use smallvec::{SmallVec, smallvec};

/// Result of applying an order command.
#[derive(Debug)]
pub struct LedgerOutcome {
    /// Whether the record changed (false for idempotent no-op replays).
    pub changed: bool,
    /// Events describing what happened, in occurrence order.
    pub events: SmallVec<[DomainEvent; 4]>,
}

impl LedgerOutcome {
    fn unchanged() -> Self {
        Self {
            changed: false,
            events: SmallVec::new(),
        }
    }
}

/// Create a new order in its initial state.
///
/// # Errors
///
/// Returns [`FulfillmentError::Validation`] when the amount is negative or
/// the quantity is zero.
pub fn place_order(
    input: NewOrder,
    now: DateTime<Utc>,
) -> Result<(Order, SmallVec<[DomainEvent; 4]>), FulfillmentError> {
    if input.amount.is_negative() {
        return Err(FulfillmentError::Validation(
            "order amount cannot be negative".to_string(),
        ));
    }
    if input.quantity == 0 {
        return Err(FulfillmentError::Validation(
            "order quantity must be at least 1".to_string(),
        ));
    }

    let order = Order {
        order_id: input.order_id.clone(),
        buyer_id: input.buyer_id,
        seller_id: input.seller_id,
        listing_id: input.listing_id,
        amount: input.amount,
        currency: input.currency,
        quantity: input.quantity,
        order_status: OrderStatus::Pending,
        delivery_status: DeliveryStatus::NotShipped,
        payout_status: PayoutStatus::InEscrow,
        shipping: None,
        cancel_reason: None,
        payout_flagged_for_review: false,
        created_at: now,
        updated_at: now,
        delivered_at: None,
        version: Version::INITIAL,
    };

    tracing::info!(order_id = %order.order_id, amount = %order.amount, "order placed");

    let events = smallvec![DomainEvent::OrderPlaced {
        order_id: input.order_id,
        amount: input.amount,
        at: now,
    }];
    Ok((order, events))
}

/// Apply an order command to the order record.
///
/// # Errors
///
/// - [`FulfillmentError::Validation`]: missing or malformed payload fields.
/// - [`FulfillmentError::InvalidTransition`]: the command is not legal from
///   the order's current status.
pub fn handle(
    order: &mut Order,
    command: &OrderCommand,
    now: DateTime<Utc>,
) -> Result<LedgerOutcome, FulfillmentError> {
    validate_payload(command, now)?;

    let next = match transition::order_transition(order.order_status, command.kind())? {
        Decision::Accepted(next) => next,
        Decision::AlreadyApplied => {
            tracing::debug!(
                order_id = %order.order_id,
                command = command.kind().name(),
                "duplicate command ignored"
            );
            return Ok(LedgerOutcome::unchanged());
        },
    };

    let events = apply(order, command, now);
    order.order_status = next;
    order.updated_at = now;

    tracing::info!(
        order_id = %order.order_id,
        command = command.kind().name(),
        status = %order.order_status,
        "order transition applied"
    );

    Ok(LedgerOutcome {
        changed: true,
        events,
    })
}

/// Payload validation, independent of the current state.
fn validate_payload(command: &OrderCommand, now: DateTime<Utc>) -> Result<(), FulfillmentError> {
    match command {
        OrderCommand::MarkShipped {
            tracking_number,
            carrier,
            estimated_delivery,
        } => {
            if tracking_number.trim().is_empty() {
                return Err(FulfillmentError::Validation(
                    "tracking number is required".to_string(),
                ));
            }
            if carrier.trim().is_empty() {
                return Err(FulfillmentError::Validation(
                    "carrier is required".to_string(),
                ));
            }
            if estimated_delivery.date_naive() < now.date_naive() {
                return Err(FulfillmentError::Validation(
                    "estimated delivery cannot be in the past".to_string(),
                ));
            }
            Ok(())
        },
        OrderCommand::Cancel { reason } => {
            if reason.trim().is_empty() {
                return Err(FulfillmentError::Validation(
                    "cancellation reason is required".to_string(),
                ));
            }
            Ok(())
        },
        OrderCommand::Confirm
        | OrderCommand::MarkProcessing
        | OrderCommand::ConfirmDelivery
        | OrderCommand::CompleteReturn { .. } => Ok(()),
    }
}

/// Record the command's side data and produce its events. The status switch
/// itself happens in `handle` after the table lookup.
fn apply(
    order: &mut Order,
    command: &OrderCommand,
    now: DateTime<Utc>,
) -> SmallVec<[DomainEvent; 4]> {
    match command {
        OrderCommand::Confirm => smallvec![DomainEvent::OrderConfirmed {
            order_id: order.order_id.clone(),
            at: now,
        }],
        OrderCommand::MarkProcessing => smallvec![DomainEvent::OrderProcessing {
            order_id: order.order_id.clone(),
            at: now,
        }],
        OrderCommand::MarkShipped {
            tracking_number,
            carrier,
            estimated_delivery,
        } => {
            order.shipping = Some(ShippingInfo {
                tracking_number: tracking_number.clone(),
                carrier: carrier.clone(),
                estimated_delivery: *estimated_delivery,
            });
            order.delivery_status = DeliveryStatus::InTransit;
            smallvec![DomainEvent::OrderShipped {
                order_id: order.order_id.clone(),
                tracking_number: tracking_number.clone(),
                carrier: carrier.clone(),
                at: now,
            }]
        },
        OrderCommand::ConfirmDelivery => {
            order.delivery_status = DeliveryStatus::Delivered;
            // delivered_at is written exactly once
            if order.delivered_at.is_none() {
                order.delivered_at = Some(now);
            }
            smallvec![DomainEvent::OrderDelivered {
                order_id: order.order_id.clone(),
                at: now,
            }]
        },
        OrderCommand::Cancel { reason } => {
            order.cancel_reason = Some(reason.clone());
            smallvec![DomainEvent::OrderCanceled {
                order_id: order.order_id.clone(),
                reason: reason.clone(),
                at: now,
            }]
        },
        OrderCommand::CompleteReturn { return_id } => smallvec![DomainEvent::OrderReturned {
            order_id: order.order_id.clone(),
            return_id: return_id.clone(),
            at: now,
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{BuyerId, ListingId, OrderId, ReturnId, SellerId};
    use crate::money::{Currency, Money};
    use chrono::TimeZone;

    #[allow(clippy::unwrap_used)] // fixed test timestamp always resolves
    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, day, 10, 0, 0).unwrap()
    }

    fn new_order() -> NewOrder {
        NewOrder {
            order_id: OrderId::new("order-1"),
            buyer_id: BuyerId::new("buyer-1"),
            seller_id: SellerId::new("seller-1"),
            listing_id: ListingId::new("listing-1"),
            amount: Money::from_cents(450_000),
            currency: Currency::new("USD"),
            quantity: 1,
        }
    }

    #[allow(clippy::unwrap_used)] // helpers drive known-good transitions
    fn delivered_order() -> Order {
        let (mut order, _) = place_order(new_order(), ts(1)).unwrap();
        handle(&mut order, &OrderCommand::Confirm, ts(1)).unwrap();
        handle(&mut order, &OrderCommand::MarkProcessing, ts(2)).unwrap();
        handle(
            &mut order,
            &OrderCommand::MarkShipped {
                tracking_number: "T1".to_string(),
                carrier: "dhl".to_string(),
                estimated_delivery: ts(5),
            },
            ts(3),
        )
        .unwrap();
        handle(&mut order, &OrderCommand::ConfirmDelivery, ts(4)).unwrap();
        order
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn place_order_starts_in_initial_states() {
        let (order, events) = place_order(new_order(), ts(1)).unwrap();
        assert_eq!(order.order_status, OrderStatus::Pending);
        assert_eq!(order.delivery_status, DeliveryStatus::NotShipped);
        assert_eq!(order.payout_status, PayoutStatus::InEscrow);
        assert_eq!(order.version, Version::INITIAL);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn place_order_rejects_zero_quantity() {
        let mut input = new_order();
        input.quantity = 0;
        assert!(matches!(
            place_order(input, ts(1)),
            Err(FulfillmentError::Validation(_))
        ));
    }

    #[test]
    fn place_order_rejects_negative_amount() {
        let mut input = new_order();
        input.amount = Money::from_cents(-1);
        assert!(matches!(
            place_order(input, ts(1)),
            Err(FulfillmentError::Validation(_))
        ));
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn happy_path_reaches_delivered() {
        let order = delivered_order();
        assert_eq!(order.order_status, OrderStatus::Delivered);
        assert_eq!(order.delivery_status, DeliveryStatus::Delivered);
        assert_eq!(order.delivered_at, Some(ts(4)));
        assert!(order.shipping.is_some());
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn confirm_twice_is_noop() {
        let (mut order, _) = place_order(new_order(), ts(1)).unwrap();
        let first = handle(&mut order, &OrderCommand::Confirm, ts(1)).unwrap();
        let second = handle(&mut order, &OrderCommand::Confirm, ts(2)).unwrap();
        assert!(first.changed);
        assert!(!second.changed);
        assert!(second.events.is_empty());
        assert_eq!(order.order_status, OrderStatus::Confirmed);
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn duplicate_delivery_does_not_rewrite_delivered_at() {
        let mut order = delivered_order();
        let outcome = handle(&mut order, &OrderCommand::ConfirmDelivery, ts(9)).unwrap();
        assert!(!outcome.changed);
        assert_eq!(order.delivered_at, Some(ts(4)));
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn mark_shipped_requires_tracking() {
        let (mut order, _) = place_order(new_order(), ts(1)).unwrap();
        handle(&mut order, &OrderCommand::Confirm, ts(1)).unwrap();
        handle(&mut order, &OrderCommand::MarkProcessing, ts(1)).unwrap();
        let err = handle(
            &mut order,
            &OrderCommand::MarkShipped {
                tracking_number: "  ".to_string(),
                carrier: "dhl".to_string(),
                estimated_delivery: ts(5),
            },
            ts(2),
        )
        .unwrap_err();
        assert!(matches!(err, FulfillmentError::Validation(_)));
        assert_eq!(order.order_status, OrderStatus::Processing);
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn mark_shipped_rejects_past_eta() {
        let (mut order, _) = place_order(new_order(), ts(1)).unwrap();
        handle(&mut order, &OrderCommand::Confirm, ts(1)).unwrap();
        handle(&mut order, &OrderCommand::MarkProcessing, ts(1)).unwrap();
        let err = handle(
            &mut order,
            &OrderCommand::MarkShipped {
                tracking_number: "T1".to_string(),
                carrier: "dhl".to_string(),
                estimated_delivery: ts(2),
            },
            ts(10),
        )
        .unwrap_err();
        assert!(matches!(err, FulfillmentError::Validation(_)));
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn cancel_requires_reason() {
        let (mut order, _) = place_order(new_order(), ts(1)).unwrap();
        let err = handle(
            &mut order,
            &OrderCommand::Cancel {
                reason: String::new(),
            },
            ts(1),
        )
        .unwrap_err();
        assert!(matches!(err, FulfillmentError::Validation(_)));
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn confirm_after_cancel_is_invalid_transition() {
        let (mut order, _) = place_order(new_order(), ts(1)).unwrap();
        handle(
            &mut order,
            &OrderCommand::Cancel {
                reason: "out_of_stock".to_string(),
            },
            ts(1),
        )
        .unwrap();
        assert_eq!(order.order_status, OrderStatus::Canceled);
        let err = handle(&mut order, &OrderCommand::Confirm, ts(2)).unwrap_err();
        assert!(matches!(err, FulfillmentError::InvalidTransition { .. }));
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn complete_return_moves_delivered_order_to_returned() {
        let mut order = delivered_order();
        let outcome = handle(
            &mut order,
            &OrderCommand::CompleteReturn {
                return_id: ReturnId::new("return-1"),
            },
            ts(6),
        )
        .unwrap();
        assert!(outcome.changed);
        assert_eq!(order.order_status, OrderStatus::Returned);
        // logistics history is preserved
        assert_eq!(order.delivery_status, DeliveryStatus::Delivered);
        assert!(order.delivery_consistent());
    }
}
