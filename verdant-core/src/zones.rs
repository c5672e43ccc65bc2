use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A delivery zone with a fixed courier price. Addresses outside every
/// configured zone need an admin-assigned custom price instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryZone {
    pub id: Uuid,
    pub name: String,
    pub price_minor: i64,
}

#[async_trait]
pub trait ZoneDirectory: Send + Sync {
    /// Resolve a free-form delivery address to a configured zone.
    async fn lookup_zone(
        &self,
        address: &str,
    ) -> Result<Option<DeliveryZone>, Box<dyn std::error::Error + Send + Sync>>;
}
