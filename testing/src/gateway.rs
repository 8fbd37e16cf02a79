//! Scriptable payment gateway stub.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Test utilities document panics where critical

use fulfillment_core::environment::{GatewayError, PaymentGateway};
use fulfillment_core::ids::OrderId;
use fulfillment_core::money::Money;
use fulfillment_core::version::Version;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

/// One recorded gateway invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GatewayCall {
    /// `"release_funds"` or `"reverse_funds"`.
    pub operation: &'static str,
    /// The order the money moved for.
    pub order_id: OrderId,
    /// The amount moved.
    pub amount: Money,
    /// The idempotency version the caller supplied.
    pub version: Version,
}

/// Payment gateway stub that records calls and can be scripted to fail.
///
/// Succeeds by default. `fail_next_releases` / `fail_next_reversals` make
/// the next N calls of that operation fail with
/// [`GatewayError::Unavailable`], after which calls succeed again;
/// convenient for retry tests.
#[derive(Clone, Debug, Default)]
pub struct StubPaymentGateway {
    calls: Arc<Mutex<Vec<GatewayCall>>>,
    release_failures: Arc<AtomicU32>,
    reverse_failures: Arc<AtomicU32>,
}

impl StubPaymentGateway {
    /// Create a new always-succeeding stub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` `release_funds` calls fail.
    pub fn fail_next_releases(&self, n: u32) {
        self.release_failures.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` `reverse_funds` calls fail.
    pub fn fail_next_reversals(&self, n: u32) {
        self.reverse_failures.store(n, Ordering::SeqCst);
    }

    /// Every call recorded so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Recorded `release_funds` calls.
    #[must_use]
    pub fn releases(&self) -> Vec<GatewayCall> {
        self.of_operation("release_funds")
    }

    /// Recorded `reverse_funds` calls.
    #[must_use]
    pub fn reversals(&self) -> Vec<GatewayCall> {
        self.of_operation("reverse_funds")
    }

    fn of_operation(&self, operation: &str) -> Vec<GatewayCall> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.operation == operation)
            .cloned()
            .collect()
    }

    fn record(
        &self,
        operation: &'static str,
        order_id: &OrderId,
        amount: Money,
        version: Version,
        failures: &AtomicU32,
    ) -> Result<(), GatewayError> {
        self.calls.lock().unwrap().push(GatewayCall {
            operation,
            order_id: order_id.clone(),
            amount,
            version,
        });
        let scripted_failure = failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if scripted_failure {
            return Err(GatewayError::Unavailable("scripted failure".to_string()));
        }
        Ok(())
    }
}

impl PaymentGateway for StubPaymentGateway {
    fn release_funds<'a>(
        &'a self,
        order_id: &'a OrderId,
        amount: Money,
        version: Version,
    ) -> Pin<Box<dyn Future<Output = Result<(), GatewayError>> + Send + 'a>> {
        Box::pin(async move {
            self.record(
                "release_funds",
                order_id,
                amount,
                version,
                &self.release_failures,
            )
        })
    }

    fn reverse_funds<'a>(
        &'a self,
        order_id: &'a OrderId,
        amount: Money,
        version: Version,
    ) -> Pin<Box<dyn Future<Output = Result<(), GatewayError>> + Send + 'a>> {
        Box::pin(async move {
            self.record(
                "reverse_funds",
                order_id,
                amount,
                version,
                &self.reverse_failures,
            )
        })
    }
}
