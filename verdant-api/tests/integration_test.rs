use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;
use verdant_api::{app, AppState};
use verdant_ledger::{EntryKind, LedgerEntry, LedgerStore, MoneyLedger};
use verdant_order::{MockPaymentProcessor, SettlementEngine, SettlementRules};
use verdant_store::{MemoryOrderRepository, MemoryZoneDirectory};

fn test_app() -> (Router, Arc<MoneyLedger>) {
    let ledger = Arc::new(MoneyLedger::new());
    let engine = Arc::new(SettlementEngine::new(
        Arc::new(MemoryOrderRepository::new()),
        ledger.clone(),
        Arc::new(MockPaymentProcessor::new()),
        Arc::new(MemoryZoneDirectory::with_zone("Barnaul", 20_000)),
        SettlementRules::default(),
    ));
    let state = AppState {
        engine,
        ledger: ledger.clone(),
    };
    (app(state), ledger)
}

async fn request(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn top_up(ledger: &MoneyLedger, customer: Uuid, amount_minor: i64) {
    ledger
        .append(LedgerEntry::new(
            customer,
            EntryKind::Deposit,
            amount_minor,
            "Top-up",
            None,
        ))
        .await
        .unwrap();
}

fn order_body(customer: Uuid, method: &str, is_preorder: bool, address: &str) -> Value {
    json!({
        "customer_id": customer,
        "items": [
            {"product_name": "Ficus", "unit_price_minor": 10_000, "quantity": 3},
            {"product_name": "Monstera", "unit_price_minor": 5_000, "quantity": 1},
        ],
        "payment_method": method,
        "is_preorder": is_preorder,
        "delivery_address": address,
    })
}

#[tokio::test]
async fn test_order_creation_and_lookup() {
    let (app, ledger) = test_app();
    let customer = Uuid::new_v4();
    top_up(&ledger, customer, 100_000).await;

    let (status, created) = request(
        &app,
        Method::POST,
        "/v1/orders",
        Some(order_body(customer, "balance", false, "Barnaul, Lenina 1")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["status"], "pending");
    assert_eq!(created["effective_total_minor"], 35_000);
    assert_eq!(created["is_fully_settled"], true);

    let order_id = created["id"].as_str().unwrap();
    let (status, fetched) =
        request(&app, Method::GET, &format!("/v1/orders/{order_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], created["id"]);

    let (status, listed) = request(
        &app,
        Method::GET,
        &format!("/v1/orders?customer_id={customer}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_insufficient_balance_maps_to_payment_required() {
    let (app, ledger) = test_app();
    let customer = Uuid::new_v4();
    top_up(&ledger, customer, 1_000).await;

    let (status, body) = request(
        &app,
        Method::POST,
        "/v1/orders",
        Some(order_body(customer, "balance", false, "Barnaul, Lenina 1")),
    )
    .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["code"], "insufficient_balance");
}

#[tokio::test]
async fn test_admin_availability_edit_reprices_order() {
    let (app, ledger) = test_app();
    let customer = Uuid::new_v4();
    top_up(&ledger, customer, 100_000).await;

    let (_, created) = request(
        &app,
        Method::POST,
        "/v1/orders",
        Some(order_body(customer, "balance", false, "Barnaul, Lenina 1")),
    )
    .await;
    let order_id = created["id"].as_str().unwrap().to_string();
    let item_id = created["items"][0]["id"].as_str().unwrap().to_string();

    let (status, _) = request(
        &app,
        Method::POST,
        &format!("/v1/admin/orders/{order_id}/items/{item_id}/stock"),
        Some(json!({"out_of_stock": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, view) = request(
        &app,
        Method::POST,
        &format!("/v1/admin/orders/{order_id}/items/{item_id}/availability"),
        Some(json!({"quantity": 1, "price_minor": 9_000})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["effective_total_minor"], 14_000);

    let (status, body) = request(
        &app,
        Method::POST,
        &format!("/v1/admin/orders/{order_id}/items/{item_id}/availability"),
        Some(json!({"quantity": 10})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_quantity");
}

#[tokio::test]
async fn test_cancellation_restores_customer_balance() {
    let (app, ledger) = test_app();
    let customer = Uuid::new_v4();
    top_up(&ledger, customer, 100_000).await;

    let (_, created) = request(
        &app,
        Method::POST,
        "/v1/orders",
        Some(order_body(customer, "balance", false, "Barnaul, Lenina 1")),
    )
    .await;
    let order_id = created["id"].as_str().unwrap().to_string();

    let (status, cancelled) = request(
        &app,
        Method::POST,
        &format!("/v1/orders/{order_id}/cancel"),
        Some(json!({"reason": "changed my mind"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");
    assert_eq!(cancelled["cancelled_by"], "customer");

    let (status, balance) = request(
        &app,
        Method::GET,
        &format!("/v1/customers/{customer}/balance"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(balance["balance_minor"], 100_000);
    assert_eq!(balance["cashback_minor"], 0);

    // A second cancel is rejected without further refunds.
    let (status, body) = request(
        &app,
        Method::POST,
        &format!("/v1/orders/{order_id}/cancel"),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "illegal_cancellation");
}

#[tokio::test]
async fn test_card_order_settles_through_webhook() {
    let (app, _ledger) = test_app();
    let customer = Uuid::new_v4();

    let (status, created) = request(
        &app,
        Method::POST,
        "/v1/orders",
        Some(order_body(customer, "card", false, "Barnaul, Lenina 1")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["is_fully_settled"], false);
    let order_id = created["id"].as_str().unwrap().to_string();

    let (status, confirmed) = request(
        &app,
        Method::POST,
        "/v1/webhooks/payments",
        Some(json!({
            "order_id": order_id,
            "payment_kind": "order_total",
            "success": true,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(confirmed["is_fully_settled"], true);
}

#[tokio::test]
async fn test_invalid_transition_maps_to_conflict() {
    let (app, ledger) = test_app();
    let customer = Uuid::new_v4();
    top_up(&ledger, customer, 100_000).await;

    let (_, created) = request(
        &app,
        Method::POST,
        "/v1/orders",
        Some(order_body(customer, "balance", false, "Barnaul, Lenina 1")),
    )
    .await;
    let order_id = created["id"].as_str().unwrap().to_string();

    // Pending orders cannot jump straight to delivered.
    let (status, body) = request(
        &app,
        Method::POST,
        &format!("/v1/admin/orders/{order_id}/status"),
        Some(json!({"status": "delivered"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "invalid_transition");

    let (status, _) = request(
        &app,
        Method::POST,
        &format!("/v1/admin/orders/{order_id}/status"),
        Some(json!({"status": "processing"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = request(
        &app,
        Method::GET,
        &format!("/v1/orders/{}", Uuid::new_v4()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn test_preorder_two_phase_payment_over_api() {
    let (app, ledger) = test_app();
    let customer = Uuid::new_v4();
    top_up(&ledger, customer, 100_000).await;

    let (status, created) = request(
        &app,
        Method::POST,
        "/v1/orders",
        Some(order_body(customer, "balance", true, "Barnaul, Lenina 1")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["plan"]["deposit_amount_minor"], 17_500);
    assert_eq!(created["plan"]["deposit_paid"], true);
    assert_eq!(created["is_fully_settled"], false);
    let order_id = created["id"].as_str().unwrap().to_string();

    let (status, paid) = request(
        &app,
        Method::POST,
        &format!("/v1/orders/{order_id}/payments/second"),
        Some(json!({"method": "balance"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["plan"]["second_payment_paid"], true);
    assert_eq!(paid["is_fully_settled"], true);

    // Customer paid the full 350.00 across both phases.
    let (_, balance) = request(
        &app,
        Method::GET,
        &format!("/v1/customers/{customer}/balance"),
        None,
    )
    .await;
    assert_eq!(balance["balance_minor"], 65_000);

    let (_, ledger_view) = request(
        &app,
        Method::GET,
        &format!("/v1/customers/{customer}/ledger"),
        None,
    )
    .await;
    let kinds: Vec<&str> = ledger_view["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["kind"].as_str().unwrap())
        .collect();
    assert_eq!(
        kinds.into_iter().filter(|k| *k == "order_payment").count(),
        2
    );
}
