//! Payout reconciler.
//!
//! [`decide_payout`] is a pure function from the persisted aggregate to the
//! payout sub-state plus the money motions that state implies. It holds no
//! state of its own: the runtime re-invokes it after every committed Order
//! or ReturnRequest transition, and recovery after a crash is simply a
//! recomputation from the records, not an event log replay.
//!
//! Decision rules:
//!
//! - Funds already `paid` never move back automatically. A return turning
//!   active against a paid order raises the review flag instead; the actual
//!   reversal is an out-of-band administrative settlement.
//! - An active (non-terminal) return re-freezes funds to `in_escrow`, even
//!   out of `processing`.
//! - Absent a return, delivery starts the hold window: `processing` until
//!   it elapses, `paid` after.
//! - A completed refund reverses the refunded portion; a partial refund
//!   releases the remainder to the seller pro-rata rather than reversing
//!   everything.

use crate::money::Money;
use crate::order::{Order, OrderStatus, PayoutStatus};
use crate::returns::{ReturnRequest, ReturnStatus};
use chrono::{DateTime, Duration, Utc};
use smallvec::{SmallVec, smallvec};

/// A money movement implied by a payout decision.
///
/// Motions are executed by the runtime through the payment gateway, and
/// only when the decision actually changes the stored payout status; a
/// recomputation that lands on the same status moves nothing.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PayoutMotion {
    /// Release the amount from escrow to the seller.
    Release(Money),
    /// Reverse the amount from escrow to the buyer.
    Reverse(Money),
}

/// The reconciler's verdict for one aggregate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PayoutDecision {
    /// The payout status the order should carry.
    pub status: PayoutStatus,
    /// Money movements implied by the status.
    pub motions: SmallVec<[PayoutMotion; 2]>,
    /// Whether the order must be flagged for administrative settlement
    /// (return approved after funds were already paid).
    pub flag_for_review: bool,
}

impl PayoutDecision {
    fn settled(status: PayoutStatus) -> Self {
        Self {
            status,
            motions: SmallVec::new(),
            flag_for_review: false,
        }
    }
}

/// Decide the payout status for an order given all of its returns.
///
/// Pure and idempotent: same inputs, same decision.
#[must_use]
pub fn decide_payout(
    order: &Order,
    returns: &[ReturnRequest],
    now: DateTime<Utc>,
    hold: Duration,
) -> PayoutDecision {
    let active = returns.iter().find(|r| r.is_active());

    // Paid is sticky: an automated path never claws funds back from the
    // seller. A return arriving after payout is flagged for manual
    // settlement.
    if order.payout_status == PayoutStatus::Paid {
        return PayoutDecision {
            status: PayoutStatus::Paid,
            motions: SmallVec::new(),
            flag_for_review: active.is_some() && !order.payout_flagged_for_review,
        };
    }

    match order.order_status {
        OrderStatus::Canceled => PayoutDecision {
            status: PayoutStatus::Reversed,
            motions: smallvec![PayoutMotion::Reverse(order.amount)],
            flag_for_review: false,
        },
        OrderStatus::Delivered | OrderStatus::Returned => {
            if active.is_some() {
                // An open return withholds the payout, re-freezing funds
                // that were already in the hold window.
                return PayoutDecision::settled(PayoutStatus::InEscrow);
            }

            let refunded = refunded_total(returns);
            if !refunded.is_zero() {
                let remainder = order.amount.saturating_sub(refunded);
                let mut motions: SmallVec<[PayoutMotion; 2]> =
                    smallvec![PayoutMotion::Reverse(refunded)];
                if !remainder.is_zero() {
                    motions.push(PayoutMotion::Release(remainder));
                }
                return PayoutDecision {
                    status: PayoutStatus::Reversed,
                    motions,
                    flag_for_review: false,
                };
            }

            match order.delivered_at {
                Some(delivered_at) if now >= delivered_at + hold => PayoutDecision {
                    status: PayoutStatus::Paid,
                    motions: smallvec![PayoutMotion::Release(order.amount)],
                    flag_for_review: false,
                },
                Some(_) => PayoutDecision::settled(PayoutStatus::Processing),
                // Defensive: a delivered order always has a delivery
                // timestamp.
                None => PayoutDecision::settled(PayoutStatus::InEscrow),
            }
        },
        OrderStatus::Pending
        | OrderStatus::Confirmed
        | OrderStatus::Processing
        | OrderStatus::Shipped => PayoutDecision::settled(PayoutStatus::InEscrow),
    }
}

/// Total settled refund across completed returns.
fn refunded_total(returns: &[ReturnRequest]) -> Money {
    Money::from_cents(
        returns
            .iter()
            .filter(|r| r.status == ReturnStatus::Completed)
            .filter_map(|r| r.refund_amount)
            .map(Money::cents)
            .sum(),
    )
}
