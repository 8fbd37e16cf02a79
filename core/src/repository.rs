//! Aggregate persistence abstraction.
//!
//! The Order and its ReturnRequests are one aggregate for locking purposes:
//! they are loaded as a single consistent snapshot and committed with a
//! compare-and-swap on the order's [`Version`]. Any command affecting either
//! side therefore serializes against both, and the payout reconciler can
//! never observe a torn read.
//!
//! Records are append/update-only: neither orders nor return requests are
//! ever hard-deleted, and historical (terminal) returns remain in the
//! aggregate for audit.
//!
//! # Implementations
//!
//! - `InMemoryRepository` (in `fulfillment-testing`): `HashMap` behind a
//!   lock, for fast deterministic tests and standalone use.
//! - Production implementations back this trait with a database whose
//!   update predicates the stored version.

use crate::ids::{OrderId, ReturnId};
use crate::order::Order;
use crate::returns::ReturnRequest;
use crate::version::Version;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur during repository operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// No aggregate exists under the given order id.
    #[error("order not found: {0}")]
    NotFound(OrderId),

    /// An aggregate already exists under the given order id.
    #[error("order already exists: {0}")]
    AlreadyExists(OrderId),

    /// Optimistic concurrency conflict: the stored version moved.
    #[error("version conflict on order {order_id}: expected {expected}, found {actual}")]
    Conflict {
        /// The contended aggregate.
        order_id: OrderId,
        /// The version the writer expected.
        expected: Version,
        /// The version actually stored.
        actual: Version,
    },

    /// Backend storage failure.
    #[error("storage error: {0}")]
    Storage(String),
}

/// A consistent snapshot of an order and all of its return requests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderAggregate {
    /// The order record.
    pub order: Order,
    /// Every return request ever opened against the order, newest last.
    pub returns: Vec<ReturnRequest>,
}

impl OrderAggregate {
    /// A fresh aggregate around a newly created order.
    #[must_use]
    pub const fn new(order: Order) -> Self {
        Self {
            order,
            returns: Vec::new(),
        }
    }

    /// The active (non-terminal) return request, if any.
    ///
    /// At most one return is active at a time; the workflow engine enforces
    /// this at request time.
    #[must_use]
    pub fn active_return(&self) -> Option<&ReturnRequest> {
        self.returns.iter().find(|r| r.is_active())
    }

    /// Mutable access to the active return request, if any.
    #[must_use]
    pub fn active_return_mut(&mut self) -> Option<&mut ReturnRequest> {
        self.returns.iter_mut().find(|r| r.is_active())
    }

    /// Look up a return request by id.
    #[must_use]
    pub fn find_return(&self, id: &ReturnId) -> Option<&ReturnRequest> {
        self.returns.iter().find(|r| &r.id == id)
    }

    /// Mutable lookup of a return request by id.
    #[must_use]
    pub fn find_return_mut(&mut self, id: &ReturnId) -> Option<&mut ReturnRequest> {
        self.returns.iter_mut().find(|r| &r.id == id)
    }
}

/// Persistent store for order aggregates with optimistic concurrency.
///
/// # Dyn Compatibility
///
/// Methods return explicit `Pin<Box<dyn Future>>` instead of `async fn` so
/// the trait can be held as `Arc<dyn FulfillmentRepository>` by the runtime.
pub trait FulfillmentRepository: Send + Sync {
    /// Persist a newly created order.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::AlreadyExists`] when an aggregate with the
    /// same order id is already stored.
    fn create_order<'a>(
        &'a self,
        order: Order,
    ) -> Pin<Box<dyn Future<Output = Result<(), RepositoryError>> + Send + 'a>>;

    /// Load the aggregate (order plus all returns) as one consistent
    /// snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] when no aggregate exists under
    /// the id.
    fn load<'a>(
        &'a self,
        order_id: &'a OrderId,
    ) -> Pin<Box<dyn Future<Output = Result<OrderAggregate, RepositoryError>> + Send + 'a>>;

    /// Commit a mutated aggregate.
    ///
    /// The write succeeds only when the stored version still equals
    /// `expected`; the aggregate is then persisted at `expected.next()`,
    /// which is returned. On a mismatch nothing is written and
    /// [`RepositoryError::Conflict`] reports the stored version, so the
    /// caller can re-read and retry the whole read-validate-write cycle.
    ///
    /// # Errors
    ///
    /// - [`RepositoryError::Conflict`]: concurrent writer won the race.
    /// - [`RepositoryError::NotFound`]: the aggregate was never created.
    fn commit<'a>(
        &'a self,
        aggregate: OrderAggregate,
        expected: Version,
    ) -> Pin<Box<dyn Future<Output = Result<Version, RepositoryError>> + Send + 'a>>;
}
