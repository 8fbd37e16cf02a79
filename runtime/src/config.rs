//! Service configuration.

use crate::retry::RetryPolicy;
use chrono::Duration;

/// Tunable knobs for [`FulfillmentService`](crate::FulfillmentService).
///
/// # Default Values
///
/// - `payout_hold`: 7 days after delivery before funds are released
/// - `return_request_expiry`: 14 days before a stale requested return can
///   be expired administratively
/// - `conflict_retries`: 3 internal retries of the read-validate-write
///   cycle before a conflict surfaces to the caller
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    /// Hold window between delivery confirmation and payout release.
    pub payout_hold: Duration,
    /// Minimum age before a `requested` return may be expired.
    pub return_request_expiry: Duration,
    /// Internal retries of the read-validate-write cycle on version
    /// conflicts.
    pub conflict_retries: usize,
    /// Backoff between conflict retries.
    pub retry: RetryPolicy,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            payout_hold: Duration::days(7),
            return_request_expiry: Duration::days(14),
            conflict_retries: 3,
            retry: RetryPolicy::default(),
        }
    }
}

impl ServiceConfig {
    /// Set the payout hold window.
    #[must_use]
    pub const fn with_payout_hold(mut self, hold: Duration) -> Self {
        self.payout_hold = hold;
        self
    }

    /// Set the requested-return expiry age.
    #[must_use]
    pub const fn with_return_request_expiry(mut self, expiry: Duration) -> Self {
        self.return_request_expiry = expiry;
        self
    }

    /// Set the conflict retry budget.
    #[must_use]
    pub const fn with_conflict_retries(mut self, retries: usize) -> Self {
        self.conflict_retries = retries;
        self
    }

    /// Set the conflict retry backoff policy.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}
