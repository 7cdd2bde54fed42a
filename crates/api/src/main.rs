use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wayside_api::background::PaymentCapture;
use wayside_api::config::ServerConfig;
use wayside_api::notifications::NotificationRouter;
use wayside_api::router::build_app_router;
use wayside_api::state::AppState;
use wayside_dispatch::{AvailabilityManager, DispatchCoordinator, GeospatialIndex, OfferBoard};
use wayside_events::EventBus;
use wayside_gateway::{
    BlobStore, InMemoryBlobStore, MockPaymentGateway, Notifier, PaymentGateway, TracingNotifier,
};
use wayside_store::Store;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wayside_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Engine wiring ---
    let store = Arc::new(Store::new());
    let index = Arc::new(GeospatialIndex::new());
    let bus = Arc::new(EventBus::default());
    let availability = Arc::new(AvailabilityManager::new(
        Arc::clone(&store.mechanics),
        Arc::clone(&index),
        Arc::clone(&bus),
    ));
    let offers = Arc::new(OfferBoard::new());
    let coordinator = Arc::new(DispatchCoordinator::new(
        Arc::clone(&store),
        Arc::clone(&index),
        Arc::clone(&availability),
        offers,
        Arc::clone(&bus),
        config.dispatch.clone(),
    ));
    tracing::info!("Dispatch engine initialized");

    // --- External capabilities (mock/local implementations) ---
    let blobs: Arc<dyn BlobStore> = Arc::new(InMemoryBlobStore::new());
    let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);
    let payments: Arc<dyn PaymentGateway> = Arc::new(MockPaymentGateway::new());

    // --- Background tasks ---
    tokio::spawn(NotificationRouter::new(Arc::clone(&store), notifier).run(bus.subscribe()));
    tokio::spawn(PaymentCapture::new(payments).run(bus.subscribe()));
    tracing::info!("Notification router and payment capture started");

    // --- HTTP server ---
    let state = AppState {
        store,
        index,
        availability,
        coordinator,
        bus,
        blobs,
        config: Arc::new(config.clone()),
    };
    let app = build_app_router(state, &config);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("HOST/PORT must form a valid socket address");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    tracing::info!(%addr, "Wayside API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received");
}
