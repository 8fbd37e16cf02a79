//! Seller-scoped return policy.
//!
//! The policy is configuration read by the return workflow, never mutated by
//! it. A copy is snapshotted onto every [`ReturnRequest`](crate::returns::ReturnRequest)
//! at request time, so in-flight returns are immune to later policy edits.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A seller's return policy, consumed by the return workflow engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnPolicy {
    /// Days after delivery during which a return may be requested.
    pub return_window_days: u32,
    /// Percentage of the original amount refunded on an accepted return
    /// (0–100; values above 100 are clamped at refund computation time).
    pub refund_percentage: u8,
    /// Whether the item must be in its original condition.
    pub condition_required: bool,
    /// Whether the original packaging must be included.
    pub original_packaging_required: bool,
    /// Whether the seller pays return shipping.
    pub return_shipping_paid: bool,
    /// Whether this seller accepts returns at all.
    pub enable_returns: bool,
    /// Whether requested returns are approved without a manual step.
    pub auto_approve_returns: bool,
    /// Whether photographic evidence is required with the request.
    pub require_image_proof: bool,
    /// Whether a received return must be inspected before refund.
    pub require_inspection: bool,
    /// Days the seller has to inspect a received return.
    pub inspection_days: u32,
}

impl ReturnPolicy {
    /// The return window as a duration from the delivery timestamp.
    #[must_use]
    pub fn return_window(&self) -> Duration {
        Duration::days(i64::from(self.return_window_days))
    }

    /// Whether `now` falls within the return window of a delivery.
    #[must_use]
    pub fn within_return_window(&self, delivered_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now <= delivered_at + self.return_window()
    }
}

impl Default for ReturnPolicy {
    fn default() -> Self {
        Self {
            return_window_days: 30,
            refund_percentage: 100,
            condition_required: true,
            original_packaging_required: false,
            return_shipping_paid: false,
            enable_returns: true,
            auto_approve_returns: false,
            require_image_proof: false,
            require_inspection: true,
            inspection_days: 7,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[allow(clippy::unwrap_used)] // fixed test timestamps always resolve
    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn window_includes_last_day() {
        let policy = ReturnPolicy {
            return_window_days: 14,
            ..ReturnPolicy::default()
        };
        assert!(policy.within_return_window(at(1), at(15)));
        assert!(!policy.within_return_window(at(1), at(16)));
    }

    #[test]
    fn zero_day_window_accepts_same_instant_only() {
        let policy = ReturnPolicy {
            return_window_days: 0,
            ..ReturnPolicy::default()
        };
        assert!(policy.within_return_window(at(1), at(1)));
        assert!(!policy.within_return_window(at(1), at(2)));
    }
}
