use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use verdant_order::SettlementError;

#[derive(Debug)]
pub enum ApiError {
    Settlement(SettlementError),
    Anyhow(anyhow::Error),
}

impl From<SettlementError> for ApiError {
    fn from(err: SettlementError) -> Self {
        Self::Settlement(err)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Anyhow(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::Settlement(err) => {
                let (status, code) = match err {
                    SettlementError::OrderNotFound(_) | SettlementError::ItemNotFound(_) => {
                        (StatusCode::NOT_FOUND, "not_found")
                    }
                    SettlementError::InvalidTransition { .. } => {
                        (StatusCode::CONFLICT, "invalid_transition")
                    }
                    SettlementError::IllegalCancellation => {
                        (StatusCode::CONFLICT, "illegal_cancellation")
                    }
                    SettlementError::OrderTerminal => (StatusCode::CONFLICT, "order_terminal"),
                    SettlementError::AlreadyCharged => (StatusCode::CONFLICT, "already_charged"),
                    SettlementError::DeliveryFeePaid => {
                        (StatusCode::CONFLICT, "delivery_fee_paid")
                    }
                    // Safe for the caller to retry with a fresh read.
                    SettlementError::ConcurrentModification(_) => {
                        (StatusCode::CONFLICT, "concurrent_modification")
                    }
                    SettlementError::EmptyOrder => (StatusCode::BAD_REQUEST, "empty_order"),
                    SettlementError::InvalidQuantity { .. } => {
                        (StatusCode::BAD_REQUEST, "invalid_quantity")
                    }
                    SettlementError::InvalidPrice(_) => (StatusCode::BAD_REQUEST, "invalid_price"),
                    SettlementError::RejectionReasonRequired => {
                        (StatusCode::BAD_REQUEST, "rejection_reason_required")
                    }
                    SettlementError::PaymentNotDue(_) => {
                        (StatusCode::BAD_REQUEST, "payment_not_due")
                    }
                    SettlementError::CashUnavailable => {
                        (StatusCode::BAD_REQUEST, "cash_unavailable")
                    }
                    SettlementError::DeliveryZoneFixed => {
                        (StatusCode::BAD_REQUEST, "delivery_zone_fixed")
                    }
                    SettlementError::DeliveryPriceRequired => {
                        (StatusCode::BAD_REQUEST, "delivery_price_required")
                    }
                    SettlementError::InsufficientBalance { .. } => {
                        (StatusCode::PAYMENT_REQUIRED, "insufficient_balance")
                    }
                    SettlementError::ExternalPaymentFailed(_) => {
                        (StatusCode::BAD_GATEWAY, "external_payment_failed")
                    }
                    SettlementError::ZoneLookup(_) | SettlementError::Ledger(_) => {
                        tracing::error!("Internal settlement error: {err}");
                        (StatusCode::INTERNAL_SERVER_ERROR, "internal")
                    }
                };
                (status, code, err.to_string())
            }
            ApiError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal",
                    "Internal Server Error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message,
            "code": code,
        }));

        (status, body).into_response()
    }
}
