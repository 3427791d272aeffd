use anyhow::Result;
use axum::{routing::get, Router};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};

use marketguard::{
    create_federated_router, create_fraud_router, create_marketplace_router,
    create_trust_router, AppConfig, FederatedApiState, FederatedOrchestrator, FraudApiState,
    FraudDetector, MarketStore, MarketplaceApiState, RiskCoordinator, TrustApiState,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Arc::new(AppConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        eprintln!("Please check environment variables.");
        e
    })?);

    init_logging(&config)?;

    info!("Starting Marketguard risk and reputation server");

    // Initialize components
    let store = Arc::new(MarketStore::new());

    let mut detector = FraudDetector::new();
    if let Some(path) = &config.fraud.model_path {
        match detector.load_model(path) {
            Ok(true) => info!(path = %path.display(), "fraud model loaded"),
            Ok(false) => info!(
                path = %path.display(),
                "no fraud model artifact found, starting rule-based"
            ),
            Err(e) => warn!(error = %e, "failed to load fraud model, starting rule-based"),
        }
    }
    let detector = Arc::new(RwLock::new(detector));

    let orchestrator = Arc::new(FederatedOrchestrator::new(config.federated.model_dim));
    orchestrator
        .initialize_global_model(config.federated.model_dim)
        .await;

    let coordinator = Arc::new(RiskCoordinator::new(
        store.clone(),
        detector.clone(),
        config.fraud.alert_risk_threshold,
    ));
    info!(
        alert_risk_threshold = config.fraud.alert_risk_threshold,
        model_dim = config.federated.model_dim,
        "risk coordinator initialized"
    );

    // Build the application with routes
    let app = Router::new()
        // Actors and booking lifecycle
        .merge(create_marketplace_router(MarketplaceApiState {
            coordinator: coordinator.clone(),
        }))
        // Trust lookups
        .nest(
            "/trust",
            create_trust_router(TrustApiState {
                coordinator: coordinator.clone(),
            }),
        )
        // Fraud detection, training and alert review
        .nest(
            "/fraud",
            create_fraud_router(FraudApiState {
                detector: detector.clone(),
                store: store.clone(),
                model_path: config.fraud.model_path.clone(),
            }),
        )
        // Federated learning rounds
        .nest(
            "/federated",
            create_federated_router(FederatedApiState {
                orchestrator: orchestrator.clone(),
                store: store.clone(),
            }),
        )
        // Health check
        .route("/health", get(|| async { "OK" }))
        .layer(TraceLayer::new_for_http());

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", bind_addr, e))?;

    info!("Marketguard server listening on {}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_logging(config: &AppConfig) -> Result<()> {
    let log_level = match config.logging.level.to_lowercase().as_str() {
        "error" => Level::ERROR,
        "warn" => Level::WARN,
        "info" => Level::INFO,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set logging subscriber: {}", e))?;

    Ok(())
}
