//! Deterministic clocks.

#![allow(clippy::unwrap_used, clippy::expect_used)] // Test infrastructure keeps error paths simple
#![allow(clippy::missing_panics_doc)] // Test utilities document panics where critical

use chrono::{DateTime, Duration, Utc};
use fulfillment_core::environment::Clock;
use std::sync::{Arc, RwLock};

/// Fixed clock for deterministic tests.
///
/// Always returns the same time, making tests reproducible.
///
/// # Example
///
/// ```
/// use fulfillment_testing::FixedClock;
/// use fulfillment_core::environment::Clock;
/// use chrono::Utc;
///
/// let clock = FixedClock::new(Utc::now());
/// assert_eq!(clock.now(), clock.now());
/// ```
#[derive(Debug, Clone)]
pub struct FixedClock {
    time: DateTime<Utc>,
}

impl FixedClock {
    /// Create a new fixed clock with the given time.
    #[must_use]
    pub const fn new(time: DateTime<Utc>) -> Self {
        Self { time }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.time
    }
}

/// Adjustable clock for tests that walk through hold windows and expiry
/// deadlines.
///
/// Clones share the same underlying time, so a clock handed to the service
/// can be advanced from the test body.
#[derive(Debug, Clone)]
pub struct AdjustableClock {
    time: Arc<RwLock<DateTime<Utc>>>,
}

impl AdjustableClock {
    /// Create a new adjustable clock starting at the given time.
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            time: Arc::new(RwLock::new(start)),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut time = self.time.write().unwrap();
        *time += by;
    }

    /// Set the clock to an absolute time.
    pub fn set(&self, to: DateTime<Utc>) {
        *self.time.write().unwrap() = to;
    }
}

impl Clock for AdjustableClock {
    fn now(&self) -> DateTime<Utc> {
        *self.time.read().unwrap()
    }
}

/// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC).
///
/// # Panics
///
/// Panics if the hardcoded timestamp fails to parse, which cannot happen.
#[must_use]
pub fn test_clock() -> FixedClock {
    FixedClock::new(test_epoch())
}

/// The default test timestamp (2025-01-01 00:00:00 UTC).
///
/// # Panics
///
/// Panics if the hardcoded timestamp fails to parse, which cannot happen.
#[must_use]
pub fn test_epoch() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
        .expect("hardcoded timestamp should always parse")
        .with_timezone(&Utc)
}
