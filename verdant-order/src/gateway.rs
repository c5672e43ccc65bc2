use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;
use verdant_core::payment::{ChargeIntent, IntentStatus, PaymentProcessor};

/// Stand-in for the external card/QR gateway. Registers intents and
/// reports them back; the real confirmation arrives later through the
/// webhook, so intents stay pending here.
pub struct MockPaymentProcessor {
    fail_initiation: AtomicBool,
}

impl MockPaymentProcessor {
    pub fn new() -> Self {
        Self {
            fail_initiation: AtomicBool::new(false),
        }
    }

    /// A processor whose initiations fail, for exercising gateway
    /// outages.
    pub fn failing() -> Self {
        Self {
            fail_initiation: AtomicBool::new(true),
        }
    }
}

impl Default for MockPaymentProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentProcessor for MockPaymentProcessor {
    async fn initiate_charge(
        &self,
        customer_id: Uuid,
        amount_minor: i64,
        order_id: Uuid,
    ) -> Result<ChargeIntent, Box<dyn std::error::Error + Send + Sync>> {
        if self.fail_initiation.load(Ordering::Relaxed) {
            return Err("simulated gateway failure".into());
        }

        Ok(ChargeIntent {
            // Encode order_id in intent_id for the mock to "remember" it
            id: format!("mock_pi_{}_{}", order_id.simple(), Uuid::new_v4().simple()),
            order_id,
            customer_id,
            amount_minor,
            status: IntentStatus::Pending,
            created_at: Utc::now(),
        })
    }
}
