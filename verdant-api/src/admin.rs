use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;
use verdant_order::models::{Actor, OrderStatus};
use verdant_order::OrderView;

// ============================================================================
// Request types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetDeliveryPriceRequest {
    pub price_minor: i64,
}

#[derive(Debug, Deserialize)]
pub struct SetItemStockRequest {
    pub out_of_stock: bool,
}

#[derive(Debug, Deserialize)]
pub struct SetItemAvailabilityRequest {
    pub quantity: i64,
    pub price_minor: Option<i64>,
}

// ============================================================================
// Routes
// ============================================================================

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/admin/orders/{id}/status", post(update_status))
        .route(
            "/v1/admin/orders/{id}/delivery-price",
            post(set_delivery_price),
        )
        .route(
            "/v1/admin/orders/{id}/items/{item_id}/stock",
            post(set_item_stock),
        )
        .route(
            "/v1/admin/orders/{id}/items/{item_id}/availability",
            post(set_item_availability),
        )
}

/// POST /v1/admin/orders/{id}/status
/// Move an order along the lifecycle; cancellation and rejection
/// reconcile the customer's money
async fn update_status(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<OrderView>, ApiError> {
    let view = state
        .engine
        .transition(order_id, req.status, Actor::Admin, req.reason)
        .await?;
    Ok(Json(view))
}

/// POST /v1/admin/orders/{id}/delivery-price
/// Assign the courier price for an out-of-zone address
async fn set_delivery_price(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(req): Json<SetDeliveryPriceRequest>,
) -> Result<Json<OrderView>, ApiError> {
    let view = state
        .engine
        .set_delivery_price(order_id, req.price_minor)
        .await?;
    Ok(Json(view))
}

/// POST /v1/admin/orders/{id}/items/{item_id}/stock
/// Toggle an item's out-of-stock flag
async fn set_item_stock(
    State(state): State<AppState>,
    Path((order_id, item_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<SetItemStockRequest>,
) -> Result<Json<OrderView>, ApiError> {
    let view = state
        .engine
        .mark_out_of_stock(order_id, item_id, req.out_of_stock)
        .await?;
    Ok(Json(view))
}

/// POST /v1/admin/orders/{id}/items/{item_id}/availability
/// Record the partially fulfillable quantity and price for an item
async fn set_item_availability(
    State(state): State<AppState>,
    Path((order_id, item_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<SetItemAvailabilityRequest>,
) -> Result<Json<OrderView>, ApiError> {
    let view = state
        .engine
        .set_availability(order_id, item_id, req.quantity, req.price_minor)
        .await?;
    Ok(Json(view))
}
