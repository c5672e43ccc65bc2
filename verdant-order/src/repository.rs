use crate::models::Order;
use async_trait::async_trait;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("Order not found: {0}")]
    NotFound(Uuid),

    #[error("Version conflict for order {id}: expected {expected}, found {found}")]
    VersionConflict { id: Uuid, expected: u64, found: u64 },
}

/// Repository trait for order data access. `update` is a compare-and-swap
/// on the order's version: a stale write is rejected rather than applied.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn insert(&self, order: Order) -> Result<(), RepoError>;

    async fn get(&self, id: Uuid) -> Result<Option<Order>, RepoError>;

    /// Persist an updated order. The stored version must equal
    /// `order.version`; on success the stored copy carries `version + 1`.
    async fn update(&self, order: Order) -> Result<Order, RepoError>;

    async fn list_for_customer(&self, customer_id: Uuid) -> Result<Vec<Order>, RepoError>;
}
