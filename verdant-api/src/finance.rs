use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;
use verdant_ledger::LedgerEntry;

#[derive(Debug, Serialize)]
pub struct LedgerResponse {
    pub customer_id: Uuid,
    pub entries: Vec<LedgerEntry>,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub customer_id: Uuid,
    pub balance_minor: i64,
    pub cashback_minor: i64,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/customers/{id}/ledger", get(get_customer_ledger))
        .route("/v1/customers/{id}/balance", get(get_customer_balance))
}

/// GET /v1/customers/{id}/ledger
/// Full transaction history of a customer account
async fn get_customer_ledger(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
) -> Result<Json<LedgerResponse>, ApiError> {
    let entries = state.ledger.entries_for_customer(customer_id).await;
    Ok(Json(LedgerResponse {
        customer_id,
        entries,
    }))
}

/// GET /v1/customers/{id}/balance
/// Balance and cashback derived from the ledger
async fn get_customer_balance(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let balance_minor = state.ledger.balance(customer_id).await;
    let cashback_minor = state.ledger.cashback(customer_id).await;
    Ok(Json(BalanceResponse {
        customer_id,
        balance_minor,
        cashback_minor,
    }))
}
