use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;
use verdant_order::models::ChargeKind;
use verdant_order::OrderView;

#[derive(Debug, Deserialize)]
pub struct PaymentWebhook {
    pub order_id: Uuid,
    pub payment_kind: ChargeKind,
    pub success: bool,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/webhooks/payments", post(handle_payment_webhook))
}

/// POST /v1/webhooks/payments
/// Receive the outcome of an external collection: a gateway callback
/// for card/QR intents, or a courier confirming cash at handover
async fn handle_payment_webhook(
    State(state): State<AppState>,
    Json(payload): Json<PaymentWebhook>,
) -> Result<Json<OrderView>, ApiError> {
    tracing::info!(
        order_id = %payload.order_id,
        kind = ?payload.payment_kind,
        success = payload.success,
        "payment confirmation received"
    );

    let view = state
        .engine
        .confirm_external_payment(payload.order_id, payload.payment_kind, payload.success)
        .await?;
    Ok(Json(view))
}
