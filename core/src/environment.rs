//! Injected capabilities: clock and payment gateway.
//!
//! All external dependencies are abstracted behind traits so the core stays
//! deterministic and testable. Production wires `SystemClock` and a real
//! gateway adapter; tests wire fixed clocks and scriptable stubs.

use crate::ids::OrderId;
use crate::money::Money;
use crate::version::Version;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Clock trait - abstracts time operations for testability.
pub trait Clock: Send + Sync {
    /// Get the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
#[derive(Copy, Clone, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Errors reported by the payment gateway capability.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The gateway could not be reached or timed out; safe to retry.
    #[error("gateway unavailable: {0}")]
    Unavailable(String),

    /// The gateway refused the operation.
    #[error("gateway declined: {0}")]
    Declined(String),
}

/// External money-movement capability.
///
/// The gateway is an external collaborator with its own retry/idempotency
/// contract: both calls must be idempotent given the same order id and
/// transition version, so a command retried after a torn response cannot
/// move money twice.
///
/// # Dyn Compatibility
///
/// Methods return explicit `Pin<Box<dyn Future>>` instead of `async fn` so
/// the trait can be held as `Arc<dyn PaymentGateway>` by the runtime.
pub trait PaymentGateway: Send + Sync {
    /// Release held funds to the seller.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] when the release could not be performed; the
    /// caller leaves the payout sub-state unchanged for retry.
    fn release_funds<'a>(
        &'a self,
        order_id: &'a OrderId,
        amount: Money,
        version: Version,
    ) -> Pin<Box<dyn Future<Output = Result<(), GatewayError>> + Send + 'a>>;

    /// Reverse funds to the buyer.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] when the reversal could not be performed;
    /// the caller marks the refund sub-state `failed` for retry.
    fn reverse_funds<'a>(
        &'a self,
        order_id: &'a OrderId,
        amount: Money,
        version: Version,
    ) -> Pin<Box<dyn Future<Output = Result<(), GatewayError>> + Send + 'a>>;
}
