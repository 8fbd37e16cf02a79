//! Return request record and its workflow commands.
//!
//! A return request is tied to exactly one order; an order may accumulate
//! several historical return requests but at most one *active*
//! (non-terminal) request at a time. Terminal states are `rejected`,
//! `completed`, and `canceled`: once reached, no further mutation is
//! permitted.
//!
//! Every transition edge records its timestamp, even when policy flags
//! collapse several externally visible steps into one command: states are
//! skipped only in wall-clock latency, never in storage.

use crate::ids::{BuyerId, OrderId, ReturnId, SellerId};
use crate::money::Money;
use crate::policy::ReturnPolicy;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Buyer-declared reason for a return.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)] // variant names are the vocabulary
pub enum ReturnReason {
    Defective,
    Damaged,
    NotAsDescribed,
    Unwanted,
    TooSmall,
    TooLarge,
    ColorMismatch,
    WrongItem,
    Other,
}

impl fmt::Display for ReturnReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Defective => "defective",
            Self::Damaged => "damaged",
            Self::NotAsDescribed => "not_as_described",
            Self::Unwanted => "unwanted",
            Self::TooSmall => "too_small",
            Self::TooLarge => "too_large",
            Self::ColorMismatch => "color_mismatch",
            Self::WrongItem => "wrong_item",
            Self::Other => "other",
        };
        write!(f, "{s}")
    }
}

/// Workflow state of a return request.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnStatus {
    /// Requested by the buyer, awaiting a decision.
    Requested,
    /// Approved by the seller (or auto-approved by policy).
    Approved,
    /// Rejected by the seller (terminal).
    Rejected,
    /// Item on its way back to the seller.
    InTransit,
    /// Item received by the seller.
    Received,
    /// Inspection recorded; refund amount finalized.
    Inspected,
    /// Refund settled (terminal).
    Completed,
    /// Withdrawn by the buyer or expired administratively (terminal).
    Canceled,
}

impl ReturnStatus {
    /// Whether no further workflow transitions are permitted.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Completed | Self::Canceled)
    }

    /// Whether the return still withholds the seller payout.
    #[must_use]
    pub const fn is_active(self) -> bool {
        !self.is_terminal()
    }
}

impl fmt::Display for ReturnStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Requested => "requested",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::InTransit => "in_transit",
            Self::Received => "received",
            Self::Inspected => "inspected",
            Self::Completed => "completed",
            Self::Canceled => "canceled",
        };
        write!(f, "{s}")
    }
}

/// Money sub-state of a return, updated only by the refund-moving step.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    /// No refund decision yet.
    Pending,
    /// A refund attempt is underway.
    Processing,
    /// The full computed refund was settled.
    Completed,
    /// The last refund attempt failed; safe to retry.
    Failed,
    /// A partial refund (less than the original amount) was settled.
    Partial,
    /// No refund will be made (rejection, withdrawal, or zero-value outcome).
    Canceled,
}

impl fmt::Display for RefundStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Partial => "partial",
            Self::Canceled => "canceled",
        };
        write!(f, "{s}")
    }
}

/// How a refund is paid out.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundMethod {
    /// Reverse onto the original payment instrument.
    OriginalPayment,
    /// Issue store credit.
    StoreCredit,
}

/// Outcome of a seller inspection of a received return.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InspectionOutcome {
    /// Item accepted; refund computed from the snapshotted policy.
    Accepted,
    /// Item rejected at inspection; refund amount is zero.
    Rejected,
}

/// Payload for opening a new return request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReturnRequestInput {
    /// Buyer-declared reason.
    pub reason: ReturnReason,
    /// Free-text elaboration of the reason.
    pub reason_description: String,
    /// Photographic evidence, required when the policy demands proof.
    pub image_urls: Vec<String>,
    /// Quantity being returned (≥ 1, ≤ ordered quantity).
    pub quantity: u32,
}

/// One return request record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnRequest {
    /// Unique identifier.
    pub id: ReturnId,
    /// The order being returned against.
    pub order_id: OrderId,
    /// Buyer reference.
    pub buyer_id: BuyerId,
    /// Seller reference.
    pub seller_id: SellerId,
    /// Buyer-declared reason.
    pub reason: ReturnReason,
    /// Free-text elaboration.
    pub reason_description: String,
    /// Photographic evidence.
    pub image_urls: Vec<String>,
    /// Quantity being returned.
    pub quantity: u32,
    /// Ordered quantity at request time; denominator for proration.
    pub ordered_quantity: u32,
    /// Workflow state.
    pub status: ReturnStatus,
    /// Money sub-state.
    pub refund_status: RefundStatus,
    /// Order amount at request time.
    pub original_amount: Money,
    /// Final refund amount; `None` until inspection (or receipt, when the
    /// policy waives inspection) finalizes it.
    pub refund_amount: Option<Money>,
    /// Chosen refund method; `None` until the refund is processed.
    pub refund_method: Option<RefundMethod>,
    /// When the return was requested.
    pub requested_at: DateTime<Utc>,
    /// When the return was approved.
    pub approved_at: Option<DateTime<Utc>>,
    /// When the return was rejected.
    pub rejected_at: Option<DateTime<Utc>>,
    /// When the buyer shipped the item back.
    pub shipped_at: Option<DateTime<Utc>>,
    /// When the seller received the item.
    pub received_at: Option<DateTime<Utc>>,
    /// When the inspection was recorded.
    pub inspected_at: Option<DateTime<Utc>>,
    /// When the refund settled.
    pub completed_at: Option<DateTime<Utc>>,
    /// When the return was withdrawn or expired.
    pub canceled_at: Option<DateTime<Utc>>,
    /// Return shipping label, populated on approval.
    pub return_label: Option<String>,
    /// Return shipment tracking number, populated when in transit.
    pub return_tracking_number: Option<String>,
    /// Notes recorded at receipt or inspection.
    pub inspection_notes: Option<String>,
    /// Reason recorded by a rejection.
    pub rejection_reason: Option<String>,
    /// Reason recorded by a withdrawal or expiry.
    pub cancel_reason: Option<String>,
    /// The seller's return policy as of request time. In-flight returns are
    /// immune to later policy edits.
    pub policy: ReturnPolicy,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl ReturnRequest {
    /// Whether this return still withholds the seller payout.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

/// Commands accepted by the return workflow engine for an existing return.
///
/// Opening a return is a separate operation
/// ([`workflow::open_return`](crate::workflow::open_return)) because it
/// creates the record rather than transitioning it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReturnCommand {
    /// Seller approves the return.
    Approve {
        /// Optional prepaid return shipping label.
        return_label: Option<String>,
    },
    /// Seller rejects the return.
    Reject {
        /// Reason for rejection (required, non-empty).
        reason: String,
    },
    /// Buyer ships the item back.
    MarkInTransit {
        /// Return shipment tracking number (required, non-empty).
        tracking_number: String,
    },
    /// Seller confirms receipt of the returned item.
    ConfirmReceipt {
        /// Tracking number of the received shipment.
        tracking_number: String,
        /// Optional notes recorded at receipt.
        inspection_notes: Option<String>,
    },
    /// Seller records the inspection outcome.
    RecordInspection {
        /// Inspection notes.
        notes: String,
        /// Whether the item passed inspection.
        outcome: InspectionOutcome,
    },
    /// Settle the refund through the payment gateway.
    ProcessRefund {
        /// How the refund is paid out.
        method: RefundMethod,
    },
    /// Buyer withdraws the return.
    Cancel {
        /// Reason for withdrawal (required, non-empty).
        reason: String,
    },
    /// Administrative expiry of a stale requested return.
    Expire,
}

/// Discriminant of a [`ReturnCommand`], used as a transition-table key.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ReturnCommandKind {
    /// [`ReturnCommand::Approve`]
    Approve,
    /// [`ReturnCommand::Reject`]
    Reject,
    /// [`ReturnCommand::MarkInTransit`]
    MarkInTransit,
    /// [`ReturnCommand::ConfirmReceipt`]
    ConfirmReceipt,
    /// [`ReturnCommand::RecordInspection`]
    RecordInspection,
    /// [`ReturnCommand::ProcessRefund`]
    ProcessRefund,
    /// [`ReturnCommand::Cancel`]
    Cancel,
    /// [`ReturnCommand::Expire`]
    Expire,
}

impl ReturnCommandKind {
    /// Stable command name for errors and logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Approve => "ApproveReturn",
            Self::Reject => "RejectReturn",
            Self::MarkInTransit => "MarkReturnInTransit",
            Self::ConfirmReceipt => "ConfirmReturnReceipt",
            Self::RecordInspection => "RecordInspection",
            Self::ProcessRefund => "ProcessRefund",
            Self::Cancel => "CancelReturn",
            Self::Expire => "ExpireReturn",
        }
    }
}

impl ReturnCommand {
    /// The transition-table key for this command.
    #[must_use]
    pub const fn kind(&self) -> ReturnCommandKind {
        match self {
            Self::Approve { .. } => ReturnCommandKind::Approve,
            Self::Reject { .. } => ReturnCommandKind::Reject,
            Self::MarkInTransit { .. } => ReturnCommandKind::MarkInTransit,
            Self::ConfirmReceipt { .. } => ReturnCommandKind::ConfirmReceipt,
            Self::RecordInspection { .. } => ReturnCommandKind::RecordInspection,
            Self::ProcessRefund { .. } => ReturnCommandKind::ProcessRefund,
            Self::Cancel { .. } => ReturnCommandKind::Cancel,
            Self::Expire => ReturnCommandKind::Expire,
        }
    }
}
