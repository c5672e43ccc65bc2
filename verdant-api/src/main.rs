use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;
use verdant_api::{app, AppState};
use verdant_core::zones::DeliveryZone;
use verdant_ledger::MoneyLedger;
use verdant_order::{MockPaymentProcessor, SettlementEngine};
use verdant_store::{MemoryOrderRepository, MemoryZoneDirectory};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "verdant_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = verdant_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Verdant API on port {}", config.server.port);

    let zones = config
        .delivery_zones
        .iter()
        .map(|z| DeliveryZone {
            id: Uuid::new_v4(),
            name: z.name.clone(),
            price_minor: z.price_minor,
        })
        .collect();

    let ledger = Arc::new(MoneyLedger::new());
    let engine = Arc::new(SettlementEngine::new(
        Arc::new(MemoryOrderRepository::new()),
        ledger.clone(),
        Arc::new(MockPaymentProcessor::new()),
        Arc::new(MemoryZoneDirectory::new(zones)),
        config.settlement.clone(),
    ));

    let state = AppState {
        engine,
        ledger: ledger.clone(),
    };
    let app = app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
