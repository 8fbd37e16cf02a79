//! Metric counters for command throughput and settlement activity.
//!
//! Names are registered once via [`describe_metrics`]; any `metrics`
//! recorder installed by the embedding application picks them up. No
//! exporter is bundled here.

use metrics::{counter, describe_counter};

/// Commands processed, labeled by command name and outcome.
pub const COMMANDS_TOTAL: &str = "fulfillment_commands_total";
/// Version-conflict retries of the read-validate-write cycle.
pub const CONFLICT_RETRIES_TOTAL: &str = "fulfillment_conflict_retries_total";
/// Refund settlements that completed.
pub const REFUNDS_COMPLETED_TOTAL: &str = "fulfillment_refunds_completed_total";
/// Refund settlements that failed at the gateway.
pub const REFUNDS_FAILED_TOTAL: &str = "fulfillment_refunds_failed_total";
/// Payouts released to sellers.
pub const PAYOUTS_RELEASED_TOTAL: &str = "fulfillment_payouts_released_total";
/// Payouts reversed to buyers.
pub const PAYOUTS_REVERSED_TOTAL: &str = "fulfillment_payouts_reversed_total";
/// Domain events handed to the event bus.
pub const EVENTS_PUBLISHED_TOTAL: &str = "fulfillment_events_published_total";

/// Register metric descriptions with the installed recorder.
///
/// Call once at startup; calling it without a recorder installed is a no-op.
pub fn describe_metrics() {
    describe_counter!(
        COMMANDS_TOTAL,
        "Fulfillment commands processed, labeled by command and outcome"
    );
    describe_counter!(
        CONFLICT_RETRIES_TOTAL,
        "Optimistic-concurrency conflicts retried internally"
    );
    describe_counter!(REFUNDS_COMPLETED_TOTAL, "Refund settlements completed");
    describe_counter!(
        REFUNDS_FAILED_TOTAL,
        "Refund settlements failed at the payment gateway"
    );
    describe_counter!(PAYOUTS_RELEASED_TOTAL, "Payouts released to sellers");
    describe_counter!(PAYOUTS_REVERSED_TOTAL, "Payouts reversed to buyers");
    describe_counter!(
        EVENTS_PUBLISHED_TOTAL,
        "Domain events handed to the event bus"
    );
}

/// Record a processed command.
pub fn record_command(command: &'static str, outcome: &'static str) {
    counter!(COMMANDS_TOTAL, "command" => command, "outcome" => outcome).increment(1);
}

/// Record a conflict retry.
pub fn record_conflict_retry() {
    counter!(CONFLICT_RETRIES_TOTAL).increment(1);
}

/// Record a completed refund settlement.
pub fn record_refund_completed() {
    counter!(REFUNDS_COMPLETED_TOTAL).increment(1);
}

/// Record a failed refund settlement.
pub fn record_refund_failed() {
    counter!(REFUNDS_FAILED_TOTAL).increment(1);
}

/// Record a released payout.
pub fn record_payout_released() {
    counter!(PAYOUTS_RELEASED_TOTAL).increment(1);
}

/// Record a reversed payout.
pub fn record_payout_reversed() {
    counter!(PAYOUTS_REVERSED_TOTAL).increment(1);
}

/// Record a published event.
pub fn record_event_published(topic: &'static str) {
    counter!(EVENTS_PUBLISHED_TOTAL, "topic" => topic).increment(1);
}
