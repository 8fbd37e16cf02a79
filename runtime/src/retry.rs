//! Backoff policy for internal conflict retries.
//!
//! Version conflicts between concurrent commands are expected and transient:
//! the losing writer simply re-reads and re-applies. The backoff spreads the
//! retries out, and the jitter keeps two symmetric losers from colliding
//! again on the same schedule.

use std::time::Duration;

/// Exponential backoff configuration.
///
/// # Default Values
///
/// - `initial_delay`: 10ms
/// - `max_delay`: 500ms
/// - `multiplier`: 2.0 (delay doubles each retry)
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Initial delay before the first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries (cap for exponential backoff).
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(500),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Calculate the base delay for a given attempt number.
    ///
    /// Uses exponential backoff: `initial_delay * multiplier^attempt`,
    /// capped at `max_delay`.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        if attempt == 0 {
            return self.initial_delay;
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
        #[allow(clippy::cast_sign_loss)]
        let delay_ms =
            (self.initial_delay.as_millis() as f64 * self.multiplier.powi(attempt as i32)) as u64;

        let delay = Duration::from_millis(delay_ms);
        if delay > self.max_delay {
            self.max_delay
        } else {
            delay
        }
    }

    /// The delay for an attempt with full jitter applied (50%–100% of the
    /// base delay).
    #[must_use]
    pub fn jittered_delay(&self, attempt: usize) -> Duration {
        use rand::Rng;
        let base = self.delay_for_attempt(attempt);
        base.mul_f64(rand::thread_rng().gen_range(0.5..=1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_grows_exponentially() {
        let policy = RetryPolicy {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        };
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(400));
    }

    #[test]
    fn delay_is_capped() {
        let policy = RetryPolicy {
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(2),
            multiplier: 10.0,
        };
        assert_eq!(policy.delay_for_attempt(5), Duration::from_secs(2));
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let policy = RetryPolicy::default();
        for attempt in 0..4 {
            let base = policy.delay_for_attempt(attempt);
            let jittered = policy.jittered_delay(attempt);
            assert!(jittered <= base);
            assert!(jittered >= base.mul_f64(0.5));
        }
    }
}
