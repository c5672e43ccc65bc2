use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;
use verdant_order::models::{Actor, PaymentMethod};
use verdant_order::{NewOrder, OrderView};

// ============================================================================
// Request types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    pub customer_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct CancelOrderRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    pub method: PaymentMethod,
}

// ============================================================================
// Routes
// ============================================================================

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/orders", post(create_order).get(list_orders))
        .route("/v1/orders/{id}", get(get_order))
        .route("/v1/orders/{id}/cancel", post(cancel_order))
        .route("/v1/orders/{id}/payments/deposit", post(pay_deposit))
        .route("/v1/orders/{id}/payments/second", post(pay_second_payment))
        .route("/v1/orders/{id}/payments/delivery", post(pay_delivery))
}

/// POST /v1/orders
/// Create an order and collect its initial charge
async fn create_order(
    State(state): State<AppState>,
    Json(req): Json<NewOrder>,
) -> Result<Json<OrderView>, ApiError> {
    let view = state.engine.create_order(req).await?;
    Ok(Json(view))
}

/// GET /v1/orders/{id}
/// Retrieve order details with computed totals and settlement state
async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderView>, ApiError> {
    let view = state.engine.get_order(order_id).await?;
    Ok(Json(view))
}

/// GET /v1/orders?customer_id=...
/// List a customer's orders, newest first
async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<Vec<OrderView>>, ApiError> {
    let views = state.engine.list_orders(query.customer_id).await?;
    Ok(Json(views))
}

/// POST /v1/orders/{id}/cancel
/// Customer cancellation, allowed while the order is pending
async fn cancel_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(req): Json<CancelOrderRequest>,
) -> Result<Json<OrderView>, ApiError> {
    let view = state
        .engine
        .cancel(order_id, Actor::Customer, req.reason)
        .await?;
    Ok(Json(view))
}

/// POST /v1/orders/{id}/payments/deposit
/// Re-collect a preorder deposit whose external payment fell through
async fn pay_deposit(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(req): Json<PaymentRequest>,
) -> Result<Json<OrderView>, ApiError> {
    let view = state.engine.charge_deposit(order_id, req.method).await?;
    Ok(Json(view))
}

/// POST /v1/orders/{id}/payments/second
/// Collect the remainder of a preorder
async fn pay_second_payment(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(req): Json<PaymentRequest>,
) -> Result<Json<OrderView>, ApiError> {
    let view = state
        .engine
        .charge_second_payment(order_id, req.method)
        .await?;
    Ok(Json(view))
}

/// POST /v1/orders/{id}/payments/delivery
/// Collect the delivery fee of an out-of-zone order
async fn pay_delivery(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(req): Json<PaymentRequest>,
) -> Result<Json<OrderView>, ApiError> {
    let view = state.engine.charge_delivery(order_id, req.method).await?;
    Ok(Json(view))
}
