//! Property tests over generated command sequences.
//!
//! A synchronous simulation drives the two state machines and the payout
//! reconciler exactly the way the runtime does (minus I/O), then checks the
//! system invariants after every step:
//!
//! - delivery/order consistency
//! - payout monotonicity (paid is sticky; monotonic absent returns)
//! - refund bounds on completed returns
//! - terminal exclusivity for returns
//! - idempotence of duplicated commands

#![allow(clippy::unwrap_used, clippy::expect_used)] // test drivers use known-good construction

use chrono::{DateTime, Duration, TimeZone, Utc};
use fulfillment_core::order::DeliveryStatus;
use fulfillment_core::payout::decide_payout;
use fulfillment_core::returns::ReturnCommandKind;
use fulfillment_core::{
    BuyerId, Currency, FulfillmentError, InspectionOutcome, ledger, ListingId, Money, NewOrder,
    Order, OrderCommand, OrderId, OrderStatus, PayoutStatus, RefundMethod, ReturnCommand,
    ReturnPolicy, ReturnReason, ReturnRequest, ReturnRequestInput, ReturnStatus, SellerId,
    workflow,
};
use proptest::prelude::*;

/// One step a simulated actor can attempt.
#[derive(Clone, Debug)]
enum Step {
    Order(OrderCommand),
    OpenReturn(ReturnRequestInput),
    Return(ReturnCommand),
    AdvanceHours(u32),
}

struct Sim {
    order: Order,
    returns: Vec<ReturnRequest>,
    policy: ReturnPolicy,
    now: DateTime<Utc>,
    hold: Duration,
}

impl Sim {
    fn new(policy: ReturnPolicy) -> Self {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let (order, _) = ledger::place_order(
            NewOrder {
                order_id: OrderId::new("order-sim"),
                buyer_id: BuyerId::new("buyer-sim"),
                seller_id: SellerId::new("seller-sim"),
                listing_id: ListingId::new("listing-sim"),
                amount: Money::from_cents(120_000),
                currency: Currency::new("USD"),
                quantity: 4,
            },
            now,
        )
        .unwrap();
        Self {
            order,
            returns: Vec::new(),
            policy,
            now,
            hold: Duration::days(7),
        }
    }

    fn active_index(&self) -> Option<usize> {
        self.returns.iter().position(ReturnRequest::is_active)
    }

    /// Apply one step the way the runtime does: transition, then reconcile.
    fn apply(&mut self, step: &Step) -> Result<(), FulfillmentError> {
        let result = match step {
            Step::AdvanceHours(h) => {
                self.now += Duration::hours(i64::from(*h));
                Ok(())
            },
            Step::Order(cmd) => ledger::handle(&mut self.order, cmd, self.now).map(|_| ()),
            Step::OpenReturn(input) => {
                let has_active = self.active_index().is_some();
                workflow::open_return(
                    &self.order,
                    has_active,
                    &self.policy,
                    input.clone(),
                    self.now,
                )
                .map(|(request, _)| self.returns.push(request))
            },
            Step::Return(cmd) => self.apply_return(cmd),
        };
        self.reconcile();
        result
    }

    fn apply_return(&mut self, cmd: &ReturnCommand) -> Result<(), FulfillmentError> {
        let Some(idx) = self.active_index() else {
            // No active return to act on; the runtime would answer NotFound.
            return Err(FulfillmentError::ReturnNotFound(
                fulfillment_core::ReturnId::new("none"),
            ));
        };
        if cmd.kind() == ReturnCommandKind::ProcessRefund {
            if self.order.payout_flagged_for_review {
                return Err(FulfillmentError::PolicyViolation(
                    "payout already released; requires administrative settlement".to_string(),
                ));
            }
            let ReturnCommand::ProcessRefund { method } = cmd else {
                return Ok(());
            };
            let plan = workflow::begin_refund(&mut self.returns[idx], *method)?;
            if let Some(plan) = plan {
                // gateway assumed successful in the simulation
                workflow::complete_refund(&mut self.returns[idx], &plan, self.now);
                let return_id = self.returns[idx].id.clone();
                ledger::handle(
                    &mut self.order,
                    &OrderCommand::CompleteReturn { return_id },
                    self.now,
                )?;
            }
            Ok(())
        } else {
            workflow::handle(&mut self.returns[idx], cmd, self.now).map(|_| ())
        }
    }

    fn reconcile(&mut self) {
        let decision = decide_payout(&self.order, &self.returns, self.now, self.hold);
        if decision.flag_for_review {
            self.order.payout_flagged_for_review = true;
        }
        self.order.payout_status = decision.status;
    }
}

fn payout_rank(status: PayoutStatus) -> u8 {
    match status {
        PayoutStatus::InEscrow => 0,
        PayoutStatus::Processing => 1,
        PayoutStatus::Paid => 2,
        PayoutStatus::Reversed => 3,
    }
}

fn check_invariants(
    sim: &Sim,
    prior_payout: PayoutStatus,
    prior_terminal: &[(usize, ReturnStatus)],
) {
    // delivery/order consistency
    if sim.order.delivery_status == DeliveryStatus::Delivered {
        assert!(
            matches!(
                sim.order.order_status,
                OrderStatus::Delivered | OrderStatus::Returned
            ),
            "delivery_status=delivered with order_status={}",
            sim.order.order_status
        );
    }

    // paid is sticky
    if prior_payout == PayoutStatus::Paid {
        assert_eq!(
            sim.order.payout_status,
            PayoutStatus::Paid,
            "paid payout moved automatically"
        );
    }

    // monotonic payout absent any return
    if sim.returns.is_empty() && sim.order.order_status != OrderStatus::Canceled {
        assert!(
            payout_rank(sim.order.payout_status) >= payout_rank(prior_payout),
            "payout regressed from {prior_payout} to {} without a return",
            sim.order.payout_status
        );
    }

    // refund bounds on completed returns
    for request in &sim.returns {
        if request.status == ReturnStatus::Completed {
            let refund = request.refund_amount.expect("completed without amount");
            assert!(refund >= Money::ZERO);
            assert!(refund <= request.original_amount);
            // refund ≤ (qty / ordered_qty) × order amount, in integers
            assert!(
                refund.cents() * i64::from(request.ordered_quantity)
                    <= sim.order.amount.cents() * i64::from(request.quantity),
                "refund {refund} exceeds proportional share"
            );
        }
    }

    // at most one active return
    assert!(
        sim.returns.iter().filter(|r| r.is_active()).count() <= 1,
        "more than one active return"
    );

    // terminal returns never change state again
    for (idx, status) in prior_terminal {
        assert_eq!(
            sim.returns[*idx].status, *status,
            "terminal return mutated"
        );
    }

    // payout=paid only on delivered/returned orders
    if sim.order.payout_status == PayoutStatus::Paid {
        assert!(matches!(
            sim.order.order_status,
            OrderStatus::Delivered | OrderStatus::Returned
        ));
    }
}

fn order_command_strategy() -> impl Strategy<Value = OrderCommand> {
    prop_oneof![
        Just(OrderCommand::Confirm),
        Just(OrderCommand::MarkProcessing),
        Just(OrderCommand::ConfirmDelivery),
        ("[a-z]{1,8}").prop_map(|tracking| OrderCommand::MarkShipped {
            tracking_number: tracking,
            carrier: "dhl".to_string(),
            estimated_delivery: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        }),
        Just(OrderCommand::Cancel {
            reason: "changed plans".to_string(),
        }),
    ]
}

fn return_command_strategy() -> impl Strategy<Value = ReturnCommand> {
    prop_oneof![
        Just(ReturnCommand::Approve { return_label: None }),
        Just(ReturnCommand::Reject {
            reason: "outside policy".to_string(),
        }),
        Just(ReturnCommand::MarkInTransit {
            tracking_number: "RT1".to_string(),
        }),
        Just(ReturnCommand::ConfirmReceipt {
            tracking_number: "RT1".to_string(),
            inspection_notes: None,
        }),
        prop_oneof![
            Just(InspectionOutcome::Accepted),
            Just(InspectionOutcome::Rejected)
        ]
        .prop_map(|outcome| ReturnCommand::RecordInspection {
            notes: "checked".to_string(),
            outcome,
        }),
        Just(ReturnCommand::ProcessRefund {
            method: RefundMethod::OriginalPayment,
        }),
        Just(ReturnCommand::Cancel {
            reason: "changed my mind".to_string(),
        }),
        Just(ReturnCommand::Expire),
    ]
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => order_command_strategy().prop_map(Step::Order),
        2 => (1_u32..=4).prop_map(|quantity| {
            Step::OpenReturn(ReturnRequestInput {
                reason: ReturnReason::Defective,
                reason_description: "broken".to_string(),
                image_urls: vec![],
                quantity,
            })
        }),
        4 => return_command_strategy().prop_map(Step::Return),
        2 => (1_u32..240).prop_map(Step::AdvanceHours),
    ]
}

fn policy_strategy() -> impl Strategy<Value = ReturnPolicy> {
    (
        0_u8..=100,
        any::<bool>(),
        any::<bool>(),
        5_u32..=60,
    )
        .prop_map(
            |(refund_percentage, auto_approve_returns, require_inspection, window)| ReturnPolicy {
                refund_percentage,
                auto_approve_returns,
                require_inspection,
                return_window_days: window,
                ..ReturnPolicy::default()
            },
        )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn invariants_hold_for_any_command_sequence(
        policy in policy_strategy(),
        steps in prop::collection::vec(step_strategy(), 1..40),
    ) {
        let mut sim = Sim::new(policy);
        for step in &steps {
            let prior_payout = sim.order.payout_status;
            let prior_terminal: Vec<(usize, ReturnStatus)> = sim
                .returns
                .iter()
                .enumerate()
                .filter(|(_, r)| r.status.is_terminal())
                .map(|(i, r)| (i, r.status))
                .collect();

            // Errors are fine (illegal attempts); the state must stay sound
            // either way.
            let _ = sim.apply(step);

            check_invariants(&sim, prior_payout, &prior_terminal);
        }
    }

    #[test]
    fn duplicated_commands_are_idempotent(
        policy in policy_strategy(),
        steps in prop::collection::vec(step_strategy(), 1..25),
    ) {
        let mut sim = Sim::new(policy);
        for step in &steps {
            let _ = sim.apply(step);

            if matches!(step, Step::AdvanceHours(_) | Step::OpenReturn(_)) {
                continue;
            }

            // Re-issuing the exact same command must either be a no-op
            // success or a typed rejection; the state must not change.
            let order_before = sim.order.clone();
            let returns_before = sim.returns.clone();
            let _ = sim.apply(step);
            prop_assert_eq!(&sim.order, &order_before);
            prop_assert_eq!(&sim.returns, &returns_before);
        }
    }
}
