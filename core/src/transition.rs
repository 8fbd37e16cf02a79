//! Shared transition validator for both state machines.
//!
//! Legality of every `(current state, command)` pair is decided by a static
//! transition table, not by string comparison or polymorphism. Illegal
//! states are unrepresentable and the full state space is auditable in one
//! place.
//!
//! A lookup yields one of three answers:
//!
//! - [`Decision::Accepted`]: the transition is legal; the next state is
//!   returned for the caller to apply.
//! - [`Decision::AlreadyApplied`]: the command's target state already
//!   holds. Duplicate and retried requests land here and are treated as
//!   no-op successes rather than errors.
//! - `Err(InvalidTransition)`: the entity is in a state the command cannot
//!   act on (including every terminal state). Never silently ignored, so
//!   callers can distinguish "already done" from "never happened".

use crate::error::FulfillmentError;
use crate::order::{OrderCommandKind, OrderStatus};
use crate::returns::{ReturnCommandKind, ReturnStatus};

/// A validator verdict for a legal command.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Decision<S> {
    /// The transition is legal; apply the contained next state.
    Accepted(S),
    /// The command's target state already holds; treat as a no-op success.
    AlreadyApplied,
}

/// Legal order transitions: `(current, command) → next`.
const ORDER_TRANSITIONS: &[(OrderStatus, OrderCommandKind, OrderStatus)] = &[
    (OrderStatus::Pending, OrderCommandKind::Confirm, OrderStatus::Confirmed),
    (OrderStatus::Confirmed, OrderCommandKind::MarkProcessing, OrderStatus::Processing),
    (OrderStatus::Processing, OrderCommandKind::MarkShipped, OrderStatus::Shipped),
    (OrderStatus::Shipped, OrderCommandKind::ConfirmDelivery, OrderStatus::Delivered),
    (OrderStatus::Pending, OrderCommandKind::Cancel, OrderStatus::Canceled),
    (OrderStatus::Confirmed, OrderCommandKind::Cancel, OrderStatus::Canceled),
    (OrderStatus::Processing, OrderCommandKind::Cancel, OrderStatus::Canceled),
    (OrderStatus::Delivered, OrderCommandKind::CompleteReturn, OrderStatus::Returned),
];

/// Legal return transitions: `(current, command) → next`.
const RETURN_TRANSITIONS: &[(ReturnStatus, ReturnCommandKind, ReturnStatus)] = &[
    (ReturnStatus::Requested, ReturnCommandKind::Approve, ReturnStatus::Approved),
    (ReturnStatus::Requested, ReturnCommandKind::Reject, ReturnStatus::Rejected),
    (ReturnStatus::Approved, ReturnCommandKind::MarkInTransit, ReturnStatus::InTransit),
    (ReturnStatus::InTransit, ReturnCommandKind::ConfirmReceipt, ReturnStatus::Received),
    (ReturnStatus::Received, ReturnCommandKind::RecordInspection, ReturnStatus::Inspected),
    (ReturnStatus::Inspected, ReturnCommandKind::ProcessRefund, ReturnStatus::Completed),
    (ReturnStatus::Requested, ReturnCommandKind::Cancel, ReturnStatus::Canceled),
    (ReturnStatus::Approved, ReturnCommandKind::Cancel, ReturnStatus::Canceled),
    (ReturnStatus::Requested, ReturnCommandKind::Expire, ReturnStatus::Canceled),
];

fn lookup<S: Copy + PartialEq, C: Copy + PartialEq>(
    table: &[(S, C, S)],
    current: S,
    command: C,
) -> Option<Decision<S>> {
    for (from, kind, to) in table {
        if *kind == command && *from == current {
            return Some(Decision::Accepted(*to));
        }
    }
    // No edge from the current state; if the command's target state is the
    // one we are already in, this is a duplicate of an applied command.
    if table
        .iter()
        .any(|(_, kind, to)| *kind == command && *to == current)
    {
        return Some(Decision::AlreadyApplied);
    }
    None
}

/// Validate an order command against the current order status.
///
/// # Errors
///
/// Returns [`FulfillmentError::InvalidTransition`] when the order's current
/// status has no edge for the command and the command's target state does
/// not already hold.
pub fn order_transition(
    current: OrderStatus,
    command: OrderCommandKind,
) -> Result<Decision<OrderStatus>, FulfillmentError> {
    lookup(ORDER_TRANSITIONS, current, command).ok_or_else(|| {
        FulfillmentError::InvalidTransition {
            entity: "order",
            state: current.to_string(),
            command: command.name(),
        }
    })
}

/// Validate a return command against the current return status.
///
/// # Errors
///
/// Returns [`FulfillmentError::InvalidTransition`] when the return's current
/// status has no edge for the command and the command's target state does
/// not already hold.
pub fn return_transition(
    current: ReturnStatus,
    command: ReturnCommandKind,
) -> Result<Decision<ReturnStatus>, FulfillmentError> {
    lookup(RETURN_TRANSITIONS, current, command).ok_or_else(|| {
        FulfillmentError::InvalidTransition {
            entity: "return",
            state: current.to_string(),
            command: command.name(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    mod order_table_tests {
        use super::*;

        #[test]
        fn happy_path_edges() {
            assert_eq!(
                order_transition(OrderStatus::Pending, OrderCommandKind::Confirm),
                Ok(Decision::Accepted(OrderStatus::Confirmed))
            );
            assert_eq!(
                order_transition(OrderStatus::Shipped, OrderCommandKind::ConfirmDelivery),
                Ok(Decision::Accepted(OrderStatus::Delivered))
            );
        }

        #[test]
        fn duplicate_command_is_already_applied() {
            assert_eq!(
                order_transition(OrderStatus::Confirmed, OrderCommandKind::Confirm),
                Ok(Decision::AlreadyApplied)
            );
            assert_eq!(
                order_transition(OrderStatus::Delivered, OrderCommandKind::ConfirmDelivery),
                Ok(Decision::AlreadyApplied)
            );
            assert_eq!(
                order_transition(OrderStatus::Canceled, OrderCommandKind::Cancel),
                Ok(Decision::AlreadyApplied)
            );
        }

        #[test]
        fn command_past_its_point_is_invalid() {
            // Confirm after the order has moved beyond `confirmed`
            assert!(order_transition(OrderStatus::Shipped, OrderCommandKind::Confirm).is_err());
            assert!(order_transition(OrderStatus::Canceled, OrderCommandKind::Confirm).is_err());
        }

        #[test]
        fn cancel_only_before_shipment() {
            for status in [OrderStatus::Pending, OrderStatus::Confirmed, OrderStatus::Processing] {
                assert_eq!(
                    order_transition(status, OrderCommandKind::Cancel),
                    Ok(Decision::Accepted(OrderStatus::Canceled))
                );
            }
            assert!(order_transition(OrderStatus::Shipped, OrderCommandKind::Cancel).is_err());
            assert!(order_transition(OrderStatus::Delivered, OrderCommandKind::Cancel).is_err());
        }

        #[test]
        fn returned_only_from_delivered() {
            assert_eq!(
                order_transition(OrderStatus::Delivered, OrderCommandKind::CompleteReturn),
                Ok(Decision::Accepted(OrderStatus::Returned))
            );
            assert!(
                order_transition(OrderStatus::Shipped, OrderCommandKind::CompleteReturn).is_err()
            );
        }

        #[test]
        fn terminal_states_reject_everything_not_already_applied() {
            for cmd in [
                OrderCommandKind::Confirm,
                OrderCommandKind::MarkProcessing,
                OrderCommandKind::MarkShipped,
                OrderCommandKind::ConfirmDelivery,
            ] {
                assert!(order_transition(OrderStatus::Canceled, cmd).is_err());
                assert!(order_transition(OrderStatus::Returned, cmd).is_err());
            }
        }
    }

    mod return_table_tests {
        use super::*;

        #[test]
        fn happy_path_edges() {
            assert_eq!(
                return_transition(ReturnStatus::Requested, ReturnCommandKind::Approve),
                Ok(Decision::Accepted(ReturnStatus::Approved))
            );
            assert_eq!(
                return_transition(ReturnStatus::Inspected, ReturnCommandKind::ProcessRefund),
                Ok(Decision::Accepted(ReturnStatus::Completed))
            );
        }

        #[test]
        fn duplicate_refund_is_already_applied_not_reprocessed() {
            // The double-refund guard: a second ProcessRefund against a
            // completed return is a no-op, never a second settlement.
            assert_eq!(
                return_transition(ReturnStatus::Completed, ReturnCommandKind::ProcessRefund),
                Ok(Decision::AlreadyApplied)
            );
        }

        #[test]
        fn reject_only_while_requested() {
            assert_eq!(
                return_transition(ReturnStatus::Requested, ReturnCommandKind::Reject),
                Ok(Decision::Accepted(ReturnStatus::Rejected))
            );
            assert!(return_transition(ReturnStatus::Approved, ReturnCommandKind::Reject).is_err());
            assert!(return_transition(ReturnStatus::Received, ReturnCommandKind::Reject).is_err());
        }

        #[test]
        fn cancel_only_before_shipment() {
            for status in [ReturnStatus::Requested, ReturnStatus::Approved] {
                assert_eq!(
                    return_transition(status, ReturnCommandKind::Cancel),
                    Ok(Decision::Accepted(ReturnStatus::Canceled))
                );
            }
            assert!(return_transition(ReturnStatus::InTransit, ReturnCommandKind::Cancel).is_err());
            assert!(return_transition(ReturnStatus::Inspected, ReturnCommandKind::Cancel).is_err());
        }

        #[test]
        fn expire_only_while_requested() {
            assert_eq!(
                return_transition(ReturnStatus::Requested, ReturnCommandKind::Expire),
                Ok(Decision::Accepted(ReturnStatus::Canceled))
            );
            assert!(return_transition(ReturnStatus::Approved, ReturnCommandKind::Expire).is_err());
        }

        #[test]
        fn terminal_states_reject_forward_commands() {
            for terminal in [
                ReturnStatus::Rejected,
                ReturnStatus::Completed,
                ReturnStatus::Canceled,
            ] {
                for cmd in [
                    ReturnCommandKind::Approve,
                    ReturnCommandKind::MarkInTransit,
                    ReturnCommandKind::ConfirmReceipt,
                    ReturnCommandKind::RecordInspection,
                ] {
                    assert!(return_transition(terminal, cmd).is_err());
                }
            }
        }
    }
}
