use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;
use verdant_order::models::Order;
use verdant_order::repository::{OrderRepository, RepoError};

/// In-memory order store. `update` is a compare-and-swap on the order's
/// version counter, so a writer working from a stale read is rejected
/// with a conflict instead of silently overwriting.
pub struct MemoryOrderRepository {
    orders: RwLock<HashMap<Uuid, Order>>,
}

impl MemoryOrderRepository {
    pub fn new() -> Self {
        Self {
            orders: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryOrderRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderRepository for MemoryOrderRepository {
    async fn insert(&self, order: Order) -> Result<(), RepoError> {
        self.orders.write().await.insert(order.id, order);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Order>, RepoError> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn update(&self, mut order: Order) -> Result<Order, RepoError> {
        let mut orders = self.orders.write().await;
        let stored = orders
            .get(&order.id)
            .ok_or(RepoError::NotFound(order.id))?;

        if stored.version != order.version {
            return Err(RepoError::VersionConflict {
                id: order.id,
                expected: order.version,
                found: stored.version,
            });
        }

        order.version += 1;
        orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn list_for_customer(&self, customer_id: Uuid) -> Result<Vec<Order>, RepoError> {
        let mut orders: Vec<Order> = self
            .orders
            .read()
            .await
            .values()
            .filter(|o| o.customer_id == customer_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verdant_order::models::{DeliveryAssignment, LineItem, PaymentMethod};

    fn order() -> Order {
        Order::new(
            Uuid::new_v4(),
            vec![LineItem::new("Ficus", 10_000, 1)],
            PaymentMethod::Balance,
            false,
            DeliveryAssignment::new("Barnaul, Lenina 1", Some(Uuid::new_v4())),
        )
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let repo = MemoryOrderRepository::new();
        let order = order();
        let id = order.id;

        repo.insert(order).await.unwrap();
        assert!(repo.get(id).await.unwrap().is_some());
        assert!(repo.get(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_bumps_version() {
        let repo = MemoryOrderRepository::new();
        let order = order();
        repo.insert(order.clone()).await.unwrap();

        let updated = repo.update(order).await.unwrap();
        assert_eq!(updated.version, 1);
    }

    #[tokio::test]
    async fn test_stale_update_conflicts() {
        let repo = MemoryOrderRepository::new();
        let order = order();
        repo.insert(order.clone()).await.unwrap();

        // First writer wins, the stale copy is rejected.
        repo.update(order.clone()).await.unwrap();
        let err = repo.update(order).await.unwrap_err();
        assert!(matches!(err, RepoError::VersionConflict { .. }));
    }

    #[tokio::test]
    async fn test_list_is_scoped_to_customer() {
        let repo = MemoryOrderRepository::new();
        let mine = order();
        let customer_id = mine.customer_id;
        repo.insert(mine).await.unwrap();
        repo.insert(order()).await.unwrap();

        let listed = repo.list_for_customer(customer_id).await.unwrap();
        assert_eq!(listed.len(), 1);
    }
}
