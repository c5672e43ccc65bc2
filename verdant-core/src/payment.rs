use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    Pending,
    Succeeded,
    Failed,
}

/// A charge registered with the external payment processor. The engine
/// only records the intent; the processor reports the outcome through a
/// later confirmation callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeIntent {
    pub id: String, // Provider's ID (e.g., pi_123)
    pub order_id: Uuid,
    pub customer_id: Uuid,
    pub amount_minor: i64,
    pub status: IntentStatus,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Register a charge with the provider and return the intent.
    async fn initiate_charge(
        &self,
        customer_id: Uuid,
        amount_minor: i64,
        order_id: Uuid,
    ) -> Result<ChargeIntent, Box<dyn std::error::Error + Send + Sync>>;
}
