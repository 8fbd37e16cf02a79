//! Domain fixtures shared across test suites.

use fulfillment_core::{
    BuyerId, Currency, ListingId, Money, NewOrder, OrderId, ReturnPolicy, ReturnReason,
    ReturnRequestInput, SellerId,
};

/// A single-item $4,500.00 order under the given id.
#[must_use]
pub fn new_order(order_id: &str) -> NewOrder {
    new_order_with_quantity(order_id, 1)
}

/// An order for `quantity` items totalling $4,500.00.
#[must_use]
pub fn new_order_with_quantity(order_id: &str, quantity: u32) -> NewOrder {
    NewOrder {
        order_id: OrderId::new(order_id),
        buyer_id: BuyerId::new("buyer-1"),
        seller_id: SellerId::new("seller-1"),
        listing_id: ListingId::new("listing-1"),
        amount: Money::from_cents(450_000),
        currency: Currency::new("USD"),
        quantity,
    }
}

/// A permissive policy: auto-approval, no inspection, long window.
#[must_use]
pub fn lenient_policy() -> ReturnPolicy {
    ReturnPolicy {
        auto_approve_returns: true,
        require_inspection: false,
        return_window_days: 60,
        ..ReturnPolicy::default()
    }
}

/// A defective-item return request for `quantity` units.
#[must_use]
pub fn return_input(quantity: u32) -> ReturnRequestInput {
    ReturnRequestInput {
        reason: ReturnReason::Defective,
        reason_description: "stops working after an hour".to_string(),
        image_urls: vec![],
        quantity,
    }
}
