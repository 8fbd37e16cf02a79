//! Command execution against persisted aggregates.
//!
//! Every mutating command runs as a single atomic read-validate-write
//! cycle:
//!
//! 1. load the aggregate (order plus returns) as one consistent snapshot;
//! 2. validate and apply the transition through the pure core;
//! 3. re-run the payout reconciler and execute any money motions through
//!    the payment gateway;
//! 4. commit with a compare-and-swap on the aggregate version;
//! 5. publish domain events (best-effort, after the commit).
//!
//! A version conflict at step 4 re-runs the whole cycle against the freshly
//! re-read state, up to the configured retry budget, then surfaces
//! [`FulfillmentError::ConcurrencyConflict`]. A gateway failure at step 3
//! never rolls back an already-validated workflow transition: the payout
//! sub-state is simply left where it was (or marked `failed` for refunds)
//! and the caller gets [`FulfillmentError::ExternalCapability`].

use crate::config::ServiceConfig;
use crate::metrics;
use chrono::{DateTime, Utc};
use fulfillment_core::environment::{Clock, PaymentGateway};
use fulfillment_core::event_bus::EventBus;
use fulfillment_core::payout::{PayoutMotion, decide_payout};
use fulfillment_core::repository::{FulfillmentRepository, OrderAggregate, RepositoryError};
use fulfillment_core::returns::ReturnStatus;
use fulfillment_core::{
    DomainEvent, FulfillmentError, Money, NewOrder, Order, OrderCommand, OrderId, PayoutStatus,
    RefundMethod, ReturnCommand, ReturnId, ReturnPolicy, ReturnRequest, ReturnRequestInput,
    ledger, workflow,
};
use smallvec::SmallVec;
use std::sync::Arc;

type Events = SmallVec<[DomainEvent; 8]>;

/// The fulfillment command processor.
///
/// Stateless between calls: every command reads the persisted aggregate,
/// applies the core state machines, and commits. Cloning is cheap (all
/// dependencies are behind `Arc`).
#[derive(Clone)]
pub struct FulfillmentService {
    repository: Arc<dyn FulfillmentRepository>,
    event_bus: Arc<dyn EventBus>,
    gateway: Arc<dyn PaymentGateway>,
    clock: Arc<dyn Clock>,
    config: ServiceConfig,
}

impl FulfillmentService {
    /// Create a service with the default configuration.
    #[must_use]
    pub fn new(
        repository: Arc<dyn FulfillmentRepository>,
        event_bus: Arc<dyn EventBus>,
        gateway: Arc<dyn PaymentGateway>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::with_config(repository, event_bus, gateway, clock, ServiceConfig::default())
    }

    /// Create a service with an explicit configuration.
    #[must_use]
    pub fn with_config(
        repository: Arc<dyn FulfillmentRepository>,
        event_bus: Arc<dyn EventBus>,
        gateway: Arc<dyn PaymentGateway>,
        clock: Arc<dyn Clock>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            repository,
            event_bus,
            gateway,
            clock,
            config,
        }
    }

    /// Create an order in its initial state (pending, escrowed, unshipped).
    ///
    /// # Errors
    ///
    /// - [`FulfillmentError::Validation`]: negative amount or zero quantity.
    /// - [`FulfillmentError::AlreadyExists`]: an order with this id exists.
    pub async fn place_order(&self, input: NewOrder) -> Result<Order, FulfillmentError> {
        let now = self.clock.now();
        let (order, events) = ledger::place_order(input, now)?;
        self.repository
            .create_order(order.clone())
            .await
            .map_err(map_repository_error)?;
        self.publish(&events).await;
        metrics::record_command("PlaceOrder", "ok");
        Ok(order)
    }

    /// Execute an order command (confirm, process, ship, deliver, cancel).
    ///
    /// # Errors
    ///
    /// Any [`FulfillmentError`] from validation, the transition table, the
    /// repository, or the payment gateway.
    pub async fn execute_order(
        &self,
        order_id: &OrderId,
        command: OrderCommand,
    ) -> Result<Order, FulfillmentError> {
        let name = command.kind().name();
        let result = self
            .run(order_id, |aggregate, now| {
                if let OrderCommand::CompleteReturn { return_id } = &command {
                    verify_return_completed(aggregate, return_id)?;
                }
                let outcome = ledger::handle(&mut aggregate.order, &command, now)?;
                Ok(StepOutcome {
                    changed: outcome.changed,
                    events: outcome.events.into_iter().collect(),
                })
            })
            .await;
        metrics::record_command(name, if result.is_ok() { "ok" } else { "error" });
        result.map(|aggregate| aggregate.order)
    }

    /// Open a return request against a delivered order.
    ///
    /// The caller supplies the seller's current return policy; the workflow
    /// snapshots it onto the request.
    ///
    /// # Errors
    ///
    /// Any [`FulfillmentError`] from the workflow preconditions or the
    /// repository.
    pub async fn request_return(
        &self,
        order_id: &OrderId,
        policy: ReturnPolicy,
        input: ReturnRequestInput,
    ) -> Result<ReturnRequest, FulfillmentError> {
        let result = self
            .run(order_id, |aggregate, now| {
                let has_active = aggregate.active_return().is_some();
                let (request, events) = workflow::open_return(
                    &aggregate.order,
                    has_active,
                    &policy,
                    input.clone(),
                    now,
                )?;
                aggregate.returns.push(request);
                Ok(StepOutcome {
                    changed: true,
                    events: events.into_iter().collect(),
                })
            })
            .await;
        metrics::record_command("RequestReturn", if result.is_ok() { "ok" } else { "error" });
        result.and_then(|aggregate| {
            aggregate
                .returns
                .last()
                .cloned()
                .ok_or_else(|| FulfillmentError::OrderNotFound(order_id.clone()))
        })
    }

    /// Execute a return command.
    ///
    /// `ProcessRefund` settles through the payment gateway; `Expire` checks
    /// the configured expiry age first; everything else is a plain workflow
    /// transition.
    ///
    /// # Errors
    ///
    /// Any [`FulfillmentError`] from validation, the transition table, the
    /// repository, or the payment gateway.
    pub async fn execute_return(
        &self,
        order_id: &OrderId,
        return_id: &ReturnId,
        command: ReturnCommand,
    ) -> Result<ReturnRequest, FulfillmentError> {
        let name = command.kind().name();
        let result = match command {
            ReturnCommand::ProcessRefund { method } => {
                self.process_refund(order_id, return_id, method).await
            },
            other => self.transition_return(order_id, return_id, other).await,
        };
        metrics::record_command(name, if result.is_ok() { "ok" } else { "error" });
        result
    }

    /// Release a due payout: delivered, hold window elapsed, no active
    /// return.
    ///
    /// Administrative/scheduled sweep command. When nothing is due the
    /// order is returned unchanged, so sweeps can re-issue it freely.
    ///
    /// # Errors
    ///
    /// Any [`FulfillmentError`] from the repository or the payment gateway.
    pub async fn release_due_payout(&self, order_id: &OrderId) -> Result<Order, FulfillmentError> {
        let result = self
            .run(order_id, |_, _| {
                Ok(StepOutcome {
                    changed: false,
                    events: SmallVec::new(),
                })
            })
            .await;
        metrics::record_command("ReleaseDuePayout", if result.is_ok() { "ok" } else { "error" });
        result.map(|aggregate| aggregate.order)
    }

    /// Administratively settle an order whose payout was paid before a
    /// return was approved.
    ///
    /// Reverses the inspected refund out-of-band, completes the return,
    /// moves the order to `returned`, and clears the review flag. This is
    /// the only path that moves a `paid` payout.
    ///
    /// # Errors
    ///
    /// - [`FulfillmentError::PolicyViolation`]: the order is not flagged,
    ///   or its active return has not been inspected yet.
    /// - Any [`FulfillmentError`] from the repository or gateway.
    pub async fn settle_flagged_payout(
        &self,
        order_id: &OrderId,
    ) -> Result<Order, FulfillmentError> {
        let mut attempt = 0;
        loop {
            let now = self.clock.now();
            let mut aggregate = self
                .repository
                .load(order_id)
                .await
                .map_err(map_repository_error)?;
            let expected = aggregate.order.version;

            if !aggregate.order.payout_flagged_for_review {
                return Err(FulfillmentError::PolicyViolation(
                    "payout is not flagged for review".to_string(),
                ));
            }

            let mut events: Events = SmallVec::new();
            let settlement = match aggregate.active_return() {
                None => None,
                Some(request) if request.status == ReturnStatus::Inspected => {
                    let amount = request.refund_amount.ok_or_else(|| {
                        FulfillmentError::Validation(
                            "refund amount has not been finalized".to_string(),
                        )
                    })?;
                    Some((request.id.clone(), amount))
                },
                Some(request) => {
                    return Err(FulfillmentError::PolicyViolation(format!(
                        "active return is '{}'; it must be inspected before settlement",
                        request.status
                    )));
                },
            };

            if let Some((return_id, amount)) = settlement {
                if !amount.is_zero() {
                    self.gateway
                        .reverse_funds(order_id, amount, expected)
                        .await
                        .map_err(|e| FulfillmentError::ExternalCapability {
                            operation: "reverse_funds",
                            reason: e.to_string(),
                        })?;
                    metrics::record_payout_reversed();
                }
                let plan = workflow::RefundPlan {
                    amount,
                    method: RefundMethod::OriginalPayment,
                };
                if let Some(request) = aggregate.find_return_mut(&return_id) {
                    let outcome = workflow::complete_refund(request, &plan, now);
                    events.extend(outcome.events);
                }
                let outcome = ledger::handle(
                    &mut aggregate.order,
                    &OrderCommand::CompleteReturn { return_id },
                    now,
                )?;
                events.extend(outcome.events);
                aggregate.order.payout_status = PayoutStatus::Reversed;
                events.push(DomainEvent::PayoutReversed {
                    order_id: order_id.clone(),
                    amount,
                    at: now,
                });
            }
            aggregate.order.payout_flagged_for_review = false;
            aggregate.order.updated_at = now;

            match self.repository.commit(aggregate.clone(), expected).await {
                Ok(version) => {
                    aggregate.order.version = version;
                    self.publish(&events).await;
                    metrics::record_command("SettleFlaggedPayout", "ok");
                    return Ok(aggregate.order);
                },
                Err(RepositoryError::Conflict { .. }) if attempt < self.config.conflict_retries => {
                    self.backoff(attempt).await;
                    attempt += 1;
                },
                Err(err) => return Err(map_repository_error(err)),
            }
        }
    }

    /// Read the current order snapshot.
    ///
    /// # Errors
    ///
    /// [`FulfillmentError::OrderNotFound`] when the order does not exist.
    pub async fn order(&self, order_id: &OrderId) -> Result<Order, FulfillmentError> {
        self.repository
            .load(order_id)
            .await
            .map(|aggregate| aggregate.order)
            .map_err(map_repository_error)
    }

    /// Read the current aggregate snapshot (order plus all returns).
    ///
    /// # Errors
    ///
    /// [`FulfillmentError::OrderNotFound`] when the order does not exist.
    pub async fn aggregate(&self, order_id: &OrderId) -> Result<OrderAggregate, FulfillmentError> {
        self.repository
            .load(order_id)
            .await
            .map_err(map_repository_error)
    }

    /// Plain workflow transitions (everything except refund settlement).
    async fn transition_return(
        &self,
        order_id: &OrderId,
        return_id: &ReturnId,
        command: ReturnCommand,
    ) -> Result<ReturnRequest, FulfillmentError> {
        let expiry = self.config.return_request_expiry;
        let result = self
            .run(order_id, |aggregate, now| {
                let request = aggregate
                    .find_return_mut(return_id)
                    .ok_or_else(|| FulfillmentError::ReturnNotFound(return_id.clone()))?;
                if matches!(command, ReturnCommand::Expire)
                    && request.status == ReturnStatus::Requested
                    && now < request.requested_at + expiry
                {
                    return Err(FulfillmentError::PolicyViolation(
                        "return request has not yet expired".to_string(),
                    ));
                }
                let outcome = workflow::handle(request, &command, now)?;
                Ok(StepOutcome {
                    changed: outcome.changed,
                    events: outcome.events.into_iter().collect(),
                })
            })
            .await?;
        result
            .find_return(return_id)
            .cloned()
            .ok_or_else(|| FulfillmentError::ReturnNotFound(return_id.clone()))
    }

    /// Refund settlement: validate, move money, then commit the completed
    /// workflow state in one write.
    ///
    /// On gateway failure the refund sub-state is committed as `failed`
    /// with the return still `inspected`, so the settlement can simply be
    /// retried without repeating any buyer/seller workflow step.
    async fn process_refund(
        &self,
        order_id: &OrderId,
        return_id: &ReturnId,
        method: RefundMethod,
    ) -> Result<ReturnRequest, FulfillmentError> {
        let mut attempt = 0;
        loop {
            let now = self.clock.now();
            let mut aggregate = self
                .repository
                .load(order_id)
                .await
                .map_err(map_repository_error)?;
            let expected = aggregate.order.version;

            if aggregate.order.payout_flagged_for_review {
                return Err(FulfillmentError::PolicyViolation(
                    "payout was already released; settle via administrative reversal".to_string(),
                ));
            }

            let request = aggregate
                .find_return_mut(return_id)
                .ok_or_else(|| FulfillmentError::ReturnNotFound(return_id.clone()))?;
            let Some(plan) = workflow::begin_refund(request, method)? else {
                // Already completed: idempotent no-op, never a second
                // settlement.
                let request = request.clone();
                return Ok(request);
            };

            // Tentatively complete the workflow in memory, reconcile, and
            // move the money. Only a fully successful attempt is committed
            // in this shape; a gateway failure commits the `failed` refund
            // state instead.
            let mut events: Events = SmallVec::new();
            let outcome = workflow::complete_refund(request, &plan, now);
            events.extend(outcome.events);
            let ledger_outcome = ledger::handle(
                &mut aggregate.order,
                &OrderCommand::CompleteReturn {
                    return_id: return_id.clone(),
                },
                now,
            )?;
            events.extend(ledger_outcome.events);

            let mut changed = true;
            let gateway_failure = self
                .apply_payout_decision(&mut aggregate, &mut events, &mut changed, now)
                .await;

            if let Some(failure) = gateway_failure {
                // Re-read and commit only the failed-refund marker; the
                // tentative completion above is discarded with our local
                // copy.
                metrics::record_refund_failed();
                let mut fresh = self
                    .repository
                    .load(order_id)
                    .await
                    .map_err(map_repository_error)?;
                let fresh_expected = fresh.order.version;
                let reason = failure.to_string();
                let mut fail_events: Events = SmallVec::new();
                if let Some(request) = fresh.find_return_mut(return_id) {
                    let outcome = workflow::fail_refund(request, reason, now);
                    fail_events.extend(outcome.events);
                }
                match self.repository.commit(fresh, fresh_expected).await {
                    Ok(_) => {
                        self.publish(&fail_events).await;
                        return Err(failure);
                    },
                    Err(RepositoryError::Conflict { .. })
                        if attempt < self.config.conflict_retries =>
                    {
                        self.backoff(attempt).await;
                        attempt += 1;
                        continue;
                    },
                    Err(err) => return Err(map_repository_error(err)),
                }
            }

            match self.repository.commit(aggregate.clone(), expected).await {
                Ok(version) => {
                    aggregate.order.version = version;
                    self.publish(&events).await;
                    metrics::record_refund_completed();
                    return aggregate
                        .find_return(return_id)
                        .cloned()
                        .ok_or_else(|| FulfillmentError::ReturnNotFound(return_id.clone()));
                },
                Err(RepositoryError::Conflict { .. }) if attempt < self.config.conflict_retries => {
                    metrics::record_conflict_retry();
                    self.backoff(attempt).await;
                    attempt += 1;
                },
                Err(err) => return Err(map_repository_error(err)),
            }
        }
    }

    /// The shared read-validate-write cycle with conflict retry.
    async fn run<F>(
        &self,
        order_id: &OrderId,
        mut transition: F,
    ) -> Result<OrderAggregate, FulfillmentError>
    where
        F: FnMut(&mut OrderAggregate, DateTime<Utc>) -> Result<StepOutcome, FulfillmentError>,
    {
        let mut attempt = 0;
        loop {
            let now = self.clock.now();
            let mut aggregate = self
                .repository
                .load(order_id)
                .await
                .map_err(map_repository_error)?;
            let expected = aggregate.order.version;

            // The validator always sees the just-re-read state, never a
            // cached copy.
            let step = transition(&mut aggregate, now)?;
            let mut events = step.events;
            let mut changed = step.changed;

            let gateway_failure = self
                .apply_payout_decision(&mut aggregate, &mut events, &mut changed, now)
                .await;

            if !changed {
                return match gateway_failure {
                    Some(failure) => Err(failure),
                    None => Ok(aggregate),
                };
            }

            match self.repository.commit(aggregate.clone(), expected).await {
                Ok(version) => {
                    aggregate.order.version = version;
                    self.publish(&events).await;
                    return match gateway_failure {
                        Some(failure) => Err(failure),
                        None => Ok(aggregate),
                    };
                },
                Err(RepositoryError::Conflict {
                    order_id: id,
                    expected,
                    actual,
                }) => {
                    metrics::record_conflict_retry();
                    if attempt >= self.config.conflict_retries {
                        return Err(FulfillmentError::ConcurrencyConflict {
                            order_id: id,
                            expected,
                            actual,
                        });
                    }
                    tracing::warn!(
                        order_id = %id,
                        attempt,
                        %expected,
                        %actual,
                        "version conflict, retrying command"
                    );
                    self.backoff(attempt).await;
                    attempt += 1;
                },
                Err(err) => return Err(map_repository_error(err)),
            }
        }
    }

    /// Re-run the payout reconciler and execute the money motions its
    /// decision implies.
    ///
    /// Motions run only when the decision changes the stored payout status;
    /// recomputations that land on the same status move nothing. On a
    /// gateway failure the stored status is left untouched (so the next
    /// reconciliation retries the motion) and the failure is returned for
    /// the caller to surface after committing the workflow part.
    async fn apply_payout_decision(
        &self,
        aggregate: &mut OrderAggregate,
        events: &mut Events,
        changed: &mut bool,
        now: DateTime<Utc>,
    ) -> Option<FulfillmentError> {
        let decision = decide_payout(
            &aggregate.order,
            &aggregate.returns,
            now,
            self.config.payout_hold,
        );

        if decision.flag_for_review {
            aggregate.order.payout_flagged_for_review = true;
            aggregate.order.updated_at = now;
            *changed = true;
            let amount_at_risk = aggregate
                .active_return()
                .map_or(aggregate.order.amount, |r| {
                    r.refund_amount.unwrap_or(r.original_amount)
                });
            events.push(DomainEvent::PayoutFlaggedForReview {
                order_id: aggregate.order.order_id.clone(),
                amount_at_risk,
                at: now,
            });
            tracing::warn!(
                order_id = %aggregate.order.order_id,
                "return approved after payout was paid; flagged for administrative settlement"
            );
        }

        if decision.status == aggregate.order.payout_status {
            return None;
        }

        let mut released = Money::ZERO;
        let mut reversed = Money::ZERO;
        for motion in &decision.motions {
            // Gateway calls are idempotent per (order id, version); a
            // conflicting commit re-reads and recomputes before any
            // re-issue.
            let result = match motion {
                PayoutMotion::Release(amount) => {
                    released = *amount;
                    self.gateway
                        .release_funds(&aggregate.order.order_id, *amount, aggregate.order.version)
                        .await
                        .map_err(|e| FulfillmentError::ExternalCapability {
                            operation: "release_funds",
                            reason: e.to_string(),
                        })
                },
                PayoutMotion::Reverse(amount) => {
                    reversed = *amount;
                    self.gateway
                        .reverse_funds(&aggregate.order.order_id, *amount, aggregate.order.version)
                        .await
                        .map_err(|e| FulfillmentError::ExternalCapability {
                            operation: "reverse_funds",
                            reason: e.to_string(),
                        })
                },
            };
            if let Err(failure) = result {
                tracing::warn!(
                    order_id = %aggregate.order.order_id,
                    error = %failure,
                    "payout motion failed; payout status left for retry"
                );
                return Some(failure);
            }
        }

        match decision.status {
            PayoutStatus::Processing => events.push(DomainEvent::PayoutProcessing {
                order_id: aggregate.order.order_id.clone(),
                at: now,
            }),
            PayoutStatus::Paid => {
                metrics::record_payout_released();
                events.push(DomainEvent::PayoutReleased {
                    order_id: aggregate.order.order_id.clone(),
                    amount: released,
                    at: now,
                });
            },
            PayoutStatus::Reversed => {
                metrics::record_payout_reversed();
                events.push(DomainEvent::PayoutReversed {
                    order_id: aggregate.order.order_id.clone(),
                    amount: reversed,
                    at: now,
                });
            },
            PayoutStatus::InEscrow => {},
        }

        tracing::info!(
            order_id = %aggregate.order.order_id,
            from = %aggregate.order.payout_status,
            to = %decision.status,
            "payout status reconciled"
        );
        aggregate.order.payout_status = decision.status;
        aggregate.order.updated_at = now;
        *changed = true;
        None
    }

    /// Publish events after a successful commit. Best-effort: failures are
    /// logged, never surfaced into the command result.
    async fn publish(&self, events: &[DomainEvent]) {
        for event in events {
            let serialized = match event.to_serialized() {
                Ok(serialized) => serialized,
                Err(error) => {
                    tracing::error!(event_type = event.event_type(), %error, "event serialization failed");
                    continue;
                },
            };
            let topic = event.topic();
            if let Err(error) = self.event_bus.publish(topic, &serialized).await {
                tracing::warn!(topic, event_type = event.event_type(), %error, "event publish failed");
            } else {
                metrics::record_event_published(topic);
            }
        }
    }

    async fn backoff(&self, attempt: usize) {
        tokio::time::sleep(self.config.retry.jittered_delay(attempt)).await;
    }
}

/// Outcome of the pure transition step inside the read-validate-write cycle.
struct StepOutcome {
    changed: bool,
    events: Events,
}

fn verify_return_completed(
    aggregate: &OrderAggregate,
    return_id: &ReturnId,
) -> Result<(), FulfillmentError> {
    let request = aggregate
        .find_return(return_id)
        .ok_or_else(|| FulfillmentError::ReturnNotFound(return_id.clone()))?;
    if request.status == ReturnStatus::Completed {
        Ok(())
    } else {
        Err(FulfillmentError::InvalidTransition {
            entity: "return",
            state: request.status.to_string(),
            command: "CompleteReturn",
        })
    }
}

fn map_repository_error(error: RepositoryError) -> FulfillmentError {
    match error {
        RepositoryError::NotFound(order_id) => FulfillmentError::OrderNotFound(order_id),
        RepositoryError::AlreadyExists(order_id) => FulfillmentError::AlreadyExists(order_id),
        RepositoryError::Conflict {
            order_id,
            expected,
            actual,
        } => FulfillmentError::ConcurrencyConflict {
            order_id,
            expected,
            actual,
        },
        RepositoryError::Storage(reason) => FulfillmentError::ExternalCapability {
            operation: "repository",
            reason,
        },
    }
}
