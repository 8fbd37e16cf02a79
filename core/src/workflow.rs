//! Return workflow engine.
//!
//! Opening a return creates the record ([`open_return`]); every later step
//! transitions it ([`handle`]). Refund settlement involves the payment
//! gateway and is split into [`begin_refund`] (validate and reserve) and
//! [`complete_refund`]/[`fail_refund`] (record the gateway outcome), so the
//! runtime can commit a well-defined state whichever way the gateway call
//! goes.
//!
//! Policy flags can collapse several externally visible steps into one
//! command (auto-approval at request time, auto-inspection at receipt), but
//! every intermediate timestamp is still persisted.

use crate::error::FulfillmentError;
use crate::event::DomainEvent;
use crate::money::Money;
use crate::order::{Order, OrderStatus};
use crate::policy::ReturnPolicy;
use crate::returns::{
    InspectionOutcome, RefundMethod, RefundStatus, ReturnCommand, ReturnRequest,
    ReturnRequestInput, ReturnStatus,
};
use crate::ids::ReturnId;
use crate::transition::{self, Decision};
use chrono::{DateTime, Utc};
use smallvec::{SmallVec, smallvec};

/// Result of applying a return command.
#[derive(Debug)]
pub struct WorkflowOutcome {
    /// Whether the record changed (false for idempotent no-op replays).
    pub changed: bool,
    /// Events describing what happened, in occurrence order.
    pub events: SmallVec<[DomainEvent; 4]>,
}

impl WorkflowOutcome {
    fn unchanged() -> Self {
        Self {
            changed: false,
            events: SmallVec::new(),
        }
    }
}

/// A validated refund ready to be settled through the gateway.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefundPlan {
    /// The finalized refund amount.
    pub amount: Money,
    /// How the refund is paid out.
    pub method: RefundMethod,
}

/// Open a new return request against a delivered order.
///
/// The caller supplies the seller's current [`ReturnPolicy`]; a copy is
/// snapshotted onto the request so later policy edits cannot affect it.
/// When the policy auto-approves returns, the request is created already
/// approved, with both edge timestamps persisted.
///
/// # Errors
///
/// - [`FulfillmentError::Validation`]: zero quantity.
/// - [`FulfillmentError::PolicyViolation`]: order not delivered, returns
///   disabled, window closed, another active return, quantity exceeds the
///   ordered quantity, or missing required image proof.
pub fn open_return(
    order: &Order,
    has_active_return: bool,
    policy: &ReturnPolicy,
    input: ReturnRequestInput,
    now: DateTime<Utc>,
) -> Result<(ReturnRequest, SmallVec<[DomainEvent; 4]>), FulfillmentError> {
    if input.quantity == 0 {
        return Err(FulfillmentError::Validation(
            "return quantity must be at least 1".to_string(),
        ));
    }
    if order.order_status != OrderStatus::Delivered {
        return Err(FulfillmentError::PolicyViolation(format!(
            "order is not delivered (status '{}')",
            order.order_status
        )));
    }
    if !policy.enable_returns {
        return Err(FulfillmentError::PolicyViolation(
            "seller does not accept returns".to_string(),
        ));
    }
    let Some(delivered_at) = order.delivered_at else {
        return Err(FulfillmentError::PolicyViolation(
            "order has no delivery timestamp".to_string(),
        ));
    };
    if !policy.within_return_window(delivered_at, now) {
        return Err(FulfillmentError::PolicyViolation(format!(
            "return window of {} days has closed",
            policy.return_window_days
        )));
    }
    if has_active_return {
        return Err(FulfillmentError::PolicyViolation(
            "an active return already exists for this order".to_string(),
        ));
    }
    if input.quantity > order.quantity {
        return Err(FulfillmentError::PolicyViolation(
            "return quantity exceeds ordered quantity".to_string(),
        ));
    }
    if policy.require_image_proof && input.image_urls.is_empty() {
        return Err(FulfillmentError::PolicyViolation(
            "image proof is required by the seller's return policy".to_string(),
        ));
    }

    let mut request = ReturnRequest {
        id: ReturnId::generate(),
        order_id: order.order_id.clone(),
        buyer_id: order.buyer_id.clone(),
        seller_id: order.seller_id.clone(),
        reason: input.reason,
        reason_description: input.reason_description,
        image_urls: input.image_urls,
        quantity: input.quantity,
        ordered_quantity: order.quantity,
        status: ReturnStatus::Requested,
        refund_status: RefundStatus::Pending,
        original_amount: order.amount,
        refund_amount: None,
        refund_method: None,
        requested_at: now,
        approved_at: None,
        rejected_at: None,
        shipped_at: None,
        received_at: None,
        inspected_at: None,
        completed_at: None,
        canceled_at: None,
        return_label: None,
        return_tracking_number: None,
        inspection_notes: None,
        rejection_reason: None,
        cancel_reason: None,
        policy: policy.clone(),
        created_at: now,
        updated_at: now,
    };

    let mut events: SmallVec<[DomainEvent; 4]> = smallvec![DomainEvent::ReturnRequested {
        return_id: request.id.clone(),
        order_id: request.order_id.clone(),
        reason: request.reason,
        quantity: request.quantity,
        at: now,
    }];

    // Auto-approval collapses requested→approved into one visible step; the
    // requested edge keeps its own timestamp in storage.
    if policy.auto_approve_returns {
        request.status = ReturnStatus::Approved;
        request.approved_at = Some(now);
        events.push(DomainEvent::ReturnApproved {
            return_id: request.id.clone(),
            order_id: request.order_id.clone(),
            at: now,
        });
    }

    tracing::info!(
        return_id = %request.id,
        order_id = %request.order_id,
        reason = %request.reason,
        auto_approved = policy.auto_approve_returns,
        "return requested"
    );

    Ok((request, events))
}

/// Apply a non-refund return command.
///
/// `ProcessRefund` is not accepted here: refund settlement needs the
/// payment gateway and goes through [`begin_refund`] /
/// [`complete_refund`] / [`fail_refund`].
///
/// # Errors
///
/// - [`FulfillmentError::Validation`]: missing or malformed payload fields,
///   or a `ProcessRefund` routed here.
/// - [`FulfillmentError::InvalidTransition`]: the command is not legal from
///   the return's current status.
pub fn handle(
    request: &mut ReturnRequest,
    command: &ReturnCommand,
    now: DateTime<Utc>,
) -> Result<WorkflowOutcome, FulfillmentError> {
    if matches!(command, ReturnCommand::ProcessRefund { .. }) {
        return Err(FulfillmentError::Validation(
            "refund settlement must go through the refund flow".to_string(),
        ));
    }
    validate_payload(command)?;

    let next = match transition::return_transition(request.status, command.kind())? {
        Decision::Accepted(next) => next,
        Decision::AlreadyApplied => {
            tracing::debug!(
                return_id = %request.id,
                command = command.kind().name(),
                "duplicate command ignored"
            );
            return Ok(WorkflowOutcome::unchanged());
        },
    };

    let mut events = apply(request, command, now);
    request.status = next;
    request.updated_at = now;

    // Receipt auto-advances to inspected when the policy waives inspection;
    // both the received and inspected edges keep their timestamps.
    if matches!(command, ReturnCommand::ConfirmReceipt { .. })
        && !request.policy.require_inspection
    {
        let refund = computed_refund(request);
        request.status = ReturnStatus::Inspected;
        request.inspected_at = Some(now);
        request.refund_amount = Some(refund);
        events.push(DomainEvent::ReturnInspected {
            return_id: request.id.clone(),
            order_id: request.order_id.clone(),
            refund_amount: refund,
            at: now,
        });
    }

    tracing::info!(
        return_id = %request.id,
        command = command.kind().name(),
        status = %request.status,
        "return transition applied"
    );

    Ok(WorkflowOutcome {
        changed: true,
        events,
    })
}

/// Validate and reserve a refund settlement.
///
/// Returns `Ok(None)` when the return is already completed: the duplicate
/// `ProcessRefund` is a no-op success, never a second settlement. On
/// acceptance the refund sub-state moves to `processing` and the plan
/// carries the finalized amount for the gateway call.
///
/// # Errors
///
/// - [`FulfillmentError::InvalidTransition`]: the return is not in
///   `inspected`.
/// - [`FulfillmentError::Validation`]: no finalized refund amount (cannot
///   happen through the normal workflow; guards corrupted records).
pub fn begin_refund(
    request: &mut ReturnRequest,
    method: RefundMethod,
) -> Result<Option<RefundPlan>, FulfillmentError> {
    match transition::return_transition(
        request.status,
        crate::returns::ReturnCommandKind::ProcessRefund,
    )? {
        Decision::AlreadyApplied => Ok(None),
        Decision::Accepted(_) => {
            let amount = request.refund_amount.ok_or_else(|| {
                FulfillmentError::Validation(
                    "refund amount has not been finalized".to_string(),
                )
            })?;
            request.refund_status = RefundStatus::Processing;
            Ok(Some(RefundPlan { amount, method }))
        },
    }
}

/// Record a successful refund settlement.
///
/// The refund sub-state reflects the settled amount: `completed` for a full
/// refund, `partial` below the original amount, `canceled` when nothing was
/// owed (rejected at inspection).
pub fn complete_refund(
    request: &mut ReturnRequest,
    plan: &RefundPlan,
    now: DateTime<Utc>,
) -> WorkflowOutcome {
    request.status = ReturnStatus::Completed;
    request.completed_at = Some(now);
    request.refund_method = Some(plan.method);
    request.refund_status = if plan.amount.is_zero() {
        RefundStatus::Canceled
    } else if plan.amount < request.original_amount {
        RefundStatus::Partial
    } else {
        RefundStatus::Completed
    };
    request.updated_at = now;

    tracing::info!(
        return_id = %request.id,
        amount = %plan.amount,
        refund_status = %request.refund_status,
        "refund settled"
    );

    WorkflowOutcome {
        changed: true,
        events: smallvec![DomainEvent::RefundCompleted {
            return_id: request.id.clone(),
            order_id: request.order_id.clone(),
            amount: plan.amount,
            at: now,
        }],
    }
}

/// Record a failed refund settlement.
///
/// The return stays in `inspected` with the refund sub-state `failed`, so
/// the buyer/seller workflow is untouched and the settlement can simply be
/// retried.
pub fn fail_refund(
    request: &mut ReturnRequest,
    reason: String,
    now: DateTime<Utc>,
) -> WorkflowOutcome {
    request.refund_status = RefundStatus::Failed;
    request.updated_at = now;

    tracing::warn!(return_id = %request.id, reason = %reason, "refund attempt failed");

    WorkflowOutcome {
        changed: true,
        events: smallvec![DomainEvent::RefundFailed {
            return_id: request.id.clone(),
            order_id: request.order_id.clone(),
            reason,
            at: now,
        }],
    }
}

/// The clamped refund for this request under its snapshotted policy.
fn computed_refund(request: &ReturnRequest) -> Money {
    request.original_amount.refund_share(
        request.policy.refund_percentage,
        request.quantity,
        request.ordered_quantity,
    )
}

fn validate_payload(command: &ReturnCommand) -> Result<(), FulfillmentError> {
    match command {
        ReturnCommand::Reject { reason } | ReturnCommand::Cancel { reason } => {
            if reason.trim().is_empty() {
                return Err(FulfillmentError::Validation(
                    "a reason is required".to_string(),
                ));
            }
            Ok(())
        },
        ReturnCommand::MarkInTransit { tracking_number }
        | ReturnCommand::ConfirmReceipt {
            tracking_number, ..
        } => {
            if tracking_number.trim().is_empty() {
                return Err(FulfillmentError::Validation(
                    "tracking number is required".to_string(),
                ));
            }
            Ok(())
        },
        ReturnCommand::RecordInspection { .. }
        | ReturnCommand::Approve { .. }
        | ReturnCommand::ProcessRefund { .. }
        | ReturnCommand::Expire => Ok(()),
    }
}

fn apply(
    request: &mut ReturnRequest,
    command: &ReturnCommand,
    now: DateTime<Utc>,
) -> SmallVec<[DomainEvent; 4]> {
    match command {
        ReturnCommand::Approve { return_label } => {
            if request.approved_at.is_none() {
                request.approved_at = Some(now);
            }
            if return_label.is_some() {
                request.return_label.clone_from(return_label);
            }
            smallvec![DomainEvent::ReturnApproved {
                return_id: request.id.clone(),
                order_id: request.order_id.clone(),
                at: now,
            }]
        },
        ReturnCommand::Reject { reason } => {
            request.rejected_at = Some(now);
            request.rejection_reason = Some(reason.clone());
            request.refund_status = RefundStatus::Canceled;
            smallvec![DomainEvent::ReturnRejected {
                return_id: request.id.clone(),
                order_id: request.order_id.clone(),
                reason: reason.clone(),
                at: now,
            }]
        },
        ReturnCommand::MarkInTransit { tracking_number } => {
            request.shipped_at = Some(now);
            request.return_tracking_number = Some(tracking_number.clone());
            smallvec![DomainEvent::ReturnInTransit {
                return_id: request.id.clone(),
                order_id: request.order_id.clone(),
                tracking_number: tracking_number.clone(),
                at: now,
            }]
        },
        ReturnCommand::ConfirmReceipt {
            inspection_notes, ..
        } => {
            request.received_at = Some(now);
            if inspection_notes.is_some() {
                request.inspection_notes.clone_from(inspection_notes);
            }
            smallvec![DomainEvent::ReturnReceived {
                return_id: request.id.clone(),
                order_id: request.order_id.clone(),
                at: now,
            }]
        },
        ReturnCommand::RecordInspection { notes, outcome } => {
            request.inspected_at = Some(now);
            request.inspection_notes = Some(notes.clone());
            let refund = match outcome {
                InspectionOutcome::Accepted => computed_refund(request),
                InspectionOutcome::Rejected => Money::ZERO,
            };
            request.refund_amount = Some(refund);
            smallvec![DomainEvent::ReturnInspected {
                return_id: request.id.clone(),
                order_id: request.order_id.clone(),
                refund_amount: refund,
                at: now,
            }]
        },
        ReturnCommand::Cancel { reason } => {
            request.canceled_at = Some(now);
            request.cancel_reason = Some(reason.clone());
            request.refund_status = RefundStatus::Canceled;
            smallvec![DomainEvent::ReturnCanceled {
                return_id: request.id.clone(),
                order_id: request.order_id.clone(),
                at: now,
            }]
        },
        ReturnCommand::Expire => {
            request.canceled_at = Some(now);
            request.cancel_reason = Some("return request expired".to_string());
            request.refund_status = RefundStatus::Canceled;
            smallvec![DomainEvent::ReturnExpired {
                return_id: request.id.clone(),
                order_id: request.order_id.clone(),
                at: now,
            }]
        },
        // Intercepted by `handle` before reaching here.
        ReturnCommand::ProcessRefund { .. } => SmallVec::new(),
    }
}
