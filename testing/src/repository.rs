//! In-memory aggregate repository for fast, deterministic tests.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Test utilities document panics where critical

use fulfillment_core::ids::OrderId;
use fulfillment_core::order::Order;
use fulfillment_core::repository::{FulfillmentRepository, OrderAggregate, RepositoryError};
use fulfillment_core::version::Version;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock};

/// In-memory implementation of
/// [`FulfillmentRepository`](fulfillment_core::repository::FulfillmentRepository).
///
/// Aggregates live in a `HashMap` behind one lock, so a load always sees a
/// consistent snapshot of the order and its returns, and a commit performs
/// the version compare-and-swap atomically, the same contract a database
/// implementation provides with a predicated update.
#[derive(Clone, Debug, Default)]
pub struct InMemoryRepository {
    data: Arc<RwLock<HashMap<OrderId, OrderAggregate>>>,
}

impl InMemoryRepository {
    /// Create a new empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove all stored aggregates (for test isolation).
    pub fn clear(&self) {
        self.data.write().unwrap().clear();
    }

    /// Number of stored aggregates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.read().unwrap().len()
    }

    /// Whether the repository is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FulfillmentRepository for InMemoryRepository {
    fn create_order<'a>(
        &'a self,
        order: Order,
    ) -> Pin<Box<dyn Future<Output = Result<(), RepositoryError>> + Send + 'a>> {
        Box::pin(async move {
            let mut data = self.data.write().unwrap();
            if data.contains_key(&order.order_id) {
                return Err(RepositoryError::AlreadyExists(order.order_id));
            }
            data.insert(order.order_id.clone(), OrderAggregate::new(order));
            Ok(())
        })
    }

    fn load<'a>(
        &'a self,
        order_id: &'a OrderId,
    ) -> Pin<Box<dyn Future<Output = Result<OrderAggregate, RepositoryError>> + Send + 'a>> {
        Box::pin(async move {
            self.data
                .read()
                .unwrap()
                .get(order_id)
                .cloned()
                .ok_or_else(|| RepositoryError::NotFound(order_id.clone()))
        })
    }

    fn commit<'a>(
        &'a self,
        aggregate: OrderAggregate,
        expected: Version,
    ) -> Pin<Box<dyn Future<Output = Result<Version, RepositoryError>> + Send + 'a>> {
        Box::pin(async move {
            let mut data = self.data.write().unwrap();
            let order_id = aggregate.order.order_id.clone();
            let Some(stored) = data.get(&order_id) else {
                return Err(RepositoryError::NotFound(order_id));
            };
            if stored.order.version != expected {
                return Err(RepositoryError::Conflict {
                    order_id,
                    expected,
                    actual: stored.order.version,
                });
            }
            let mut next = aggregate;
            let version = expected.next();
            next.order.version = version;
            data.insert(order_id, next);
            Ok(version)
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // test assertions
mod tests {
    use super::*;
    use crate::fixtures;
    use fulfillment_core::ledger;

    fn order(id: &str) -> Order {
        let (order, _) = ledger::place_order(fixtures::new_order(id), crate::test_epoch())
            .expect("valid fixture");
        order
    }

    #[tokio::test]
    async fn create_then_load_roundtrips() {
        let repo = InMemoryRepository::new();
        let order = order("order-1");
        repo.create_order(order.clone()).await.unwrap();
        let aggregate = repo.load(&order.order_id).await.unwrap();
        assert_eq!(aggregate.order, order);
        assert!(aggregate.returns.is_empty());
    }

    #[tokio::test]
    async fn duplicate_create_is_rejected() {
        let repo = InMemoryRepository::new();
        let order = order("order-1");
        repo.create_order(order.clone()).await.unwrap();
        assert!(matches!(
            repo.create_order(order).await,
            Err(RepositoryError::AlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn commit_bumps_version() {
        let repo = InMemoryRepository::new();
        let order = order("order-1");
        repo.create_order(order.clone()).await.unwrap();
        let aggregate = repo.load(&order.order_id).await.unwrap();
        let version = repo.commit(aggregate, Version::INITIAL).await.unwrap();
        assert_eq!(version, Version::new(1));
    }

    #[tokio::test]
    async fn stale_commit_conflicts() {
        let repo = InMemoryRepository::new();
        let order = order("order-1");
        repo.create_order(order.clone()).await.unwrap();
        let aggregate = repo.load(&order.order_id).await.unwrap();
        repo.commit(aggregate.clone(), Version::INITIAL).await.unwrap();

        // a second writer holding the old snapshot loses
        let err = repo.commit(aggregate, Version::INITIAL).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict { .. }));
    }
}
