//! # Fulfillment Core
//!
//! Domain core for the marketplace order fulfillment, escrow payout, and
//! return/refund lifecycle.
//!
//! This crate holds the pure half of the system: record types, the two
//! state machines, the payout reconciler, and the trait boundaries the
//! runtime wires to real infrastructure. Nothing in here performs I/O.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐
//! │   Command   │  (buyer / seller / administrative action)
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────────────┐
//! │ Transition Validator │◄── static (state, command) tables
//! └──────────┬──────────┘
//!            │ Accepted(next) / AlreadyApplied / InvalidTransition
//!            ▼
//! ┌─────────────────────┐     ┌─────────────────────┐
//! │    Order Ledger     │     │   Return Workflow    │
//! │  (order machine)    │     │   (return machine)   │
//! └──────────┬──────────┘     └──────────┬──────────┘
//!            │ committed transition       │
//!            └────────────┬───────────────┘
//!                         ▼
//!               ┌──────────────────┐
//!               │ Payout Reconciler │◄── pure recomputation, no state
//!               └────────┬─────────┘
//!                        │ status + money motions
//!                        ▼
//!            release / reverse / flag  +  domain events
//! ```
//!
//! ## Core Guarantees
//!
//! - Money is released to a seller only when delivery is confirmed and no
//!   active return exists.
//! - Every transition is validated against a static table; duplicates are
//!   no-op successes, commands past their point are typed rejections.
//! - A return resolves to exactly one terminal outcome, and a refund is
//!   settled at most once.
//! - The Order and its ReturnRequests form one aggregate under a single
//!   optimistic-concurrency version.

pub mod environment;
pub mod error;
pub mod event;
pub mod event_bus;
pub mod ids;
pub mod ledger;
pub mod money;
pub mod order;
pub mod payout;
pub mod policy;
pub mod repository;
pub mod returns;
pub mod transition;
pub mod version;
pub mod workflow;

pub use error::FulfillmentError;
pub use event::{DomainEvent, SerializedEvent};
pub use ids::{BuyerId, ListingId, OrderId, ReturnId, SellerId};
pub use money::{Currency, Money};
pub use order::{
    DeliveryStatus, NewOrder, Order, OrderCommand, OrderStatus, PayoutStatus, ShippingInfo,
};
pub use policy::ReturnPolicy;
pub use repository::{FulfillmentRepository, OrderAggregate, RepositoryError};
pub use returns::{
    InspectionOutcome, RefundMethod, RefundStatus, ReturnCommand, ReturnReason, ReturnRequest,
    ReturnRequestInput, ReturnStatus,
};
pub use version::Version;

// Re-export commonly used external types
pub use chrono::{DateTime, Utc};
pub use smallvec::SmallVec;
