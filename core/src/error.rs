//! Error taxonomy for the fulfillment core.
//!
//! Every command returns either the updated entity or one of these typed
//! errors; nothing is swallowed. The variants map to distinct caller
//! recoveries:
//!
//! - [`FulfillmentError::InvalidTransition`]: wrong current state; re-fetch
//!   and reconsider.
//! - [`FulfillmentError::Validation`]: malformed input; correct and resubmit.
//! - [`FulfillmentError::PolicyViolation`]: business rule rejection;
//!   permanent for this request.
//! - [`FulfillmentError::ConcurrencyConflict`]: optimistic-lock failure that
//!   survived the internal retry budget.
//! - [`FulfillmentError::ExternalCapability`]: a payment-gateway call
//!   failed; the workflow state already persisted remains valid and the
//!   payout sub-state is left in a retryable position.

use crate::ids::{OrderId, ReturnId};
use crate::version::Version;
use thiserror::Error;

/// Errors returned by fulfillment commands.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FulfillmentError {
    /// The command is not legal from the entity's current state.
    #[error("invalid transition: {entity} in state '{state}' cannot accept {command}")]
    InvalidTransition {
        /// Which state machine rejected the command.
        entity: &'static str,
        /// The current persisted state.
        state: String,
        /// The rejected command.
        command: &'static str,
    },

    /// The command payload is missing or malformed a required field.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A business rule rejected the command (return window, quantity, ...).
    #[error("policy violation: {0}")]
    PolicyViolation(String),

    /// Optimistic concurrency conflict that exhausted the internal retries.
    #[error("concurrency conflict on order {order_id}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        /// The contended aggregate.
        order_id: OrderId,
        /// The version the command was applied against.
        expected: Version,
        /// The version actually found at commit time.
        actual: Version,
    },

    /// A call to an external capability (payment gateway) failed.
    #[error("external capability '{operation}' failed: {reason}")]
    ExternalCapability {
        /// The capability operation that failed.
        operation: &'static str,
        /// The reason reported by the capability.
        reason: String,
    },

    /// No order exists under the given id.
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// No return request exists under the given id for the order.
    #[error("return request not found: {0}")]
    ReturnNotFound(ReturnId),

    /// An order with this id already exists.
    #[error("order already exists: {0}")]
    AlreadyExists(OrderId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_transition_message_names_state_and_command() {
        let err = FulfillmentError::InvalidTransition {
            entity: "order",
            state: "canceled".to_string(),
            command: "ConfirmOrder",
        };
        let msg = err.to_string();
        assert!(msg.contains("canceled"));
        assert!(msg.contains("ConfirmOrder"));
    }

    #[test]
    fn conflict_message_carries_versions() {
        let err = FulfillmentError::ConcurrencyConflict {
            order_id: OrderId::new("order-1"),
            expected: Version::new(3),
            actual: Version::new(5),
        };
        let msg = err.to_string();
        assert!(msg.contains("expected version 3"));
        assert!(msg.contains("found 5"));
    }
}
