//! Fraud API Endpoints
//!
//! Direct detector access: ad-hoc screening, training, metrics and the
//! alert review queue.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};
use uuid::Uuid;

use crate::fraud::{
    BookingFeatures, Detection, FraudDetector, FraudError, MetricsReport,
};
use crate::marketplace::MarketStore;
use crate::reputation::FraudAlert;

/// API state for fraud endpoints
#[derive(Clone)]
pub struct FraudApiState {
    pub detector: Arc<RwLock<FraudDetector>>,
    pub store: Arc<MarketStore>,
    /// When set, every successful training run is persisted here.
    pub model_path: Option<PathBuf>,
}

// Request/response types

#[derive(Debug, Deserialize)]
pub struct TrainRequest {
    pub samples: Vec<Vec<f64>>,
    pub labels: Option<Vec<bool>>,
}

#[derive(Debug, Serialize)]
pub struct TrainResponse {
    pub trained: bool,
    pub samples: usize,
    pub metrics: MetricsReport,
}

#[derive(Debug, Serialize)]
pub struct AlertsResponse {
    pub total: usize,
    pub alerts: Vec<FraudAlert>,
}

// Endpoints

/// POST /fraud/detect - Screen an ad-hoc feature vector
pub async fn detect(
    State(state): State<FraudApiState>,
    Json(features): Json<BookingFeatures>,
) -> Json<Detection> {
    Json(state.detector.read().await.detect(&features))
}

/// POST /fraud/train - Fit the anomaly model
pub async fn train(
    State(state): State<FraudApiState>,
    Json(payload): Json<TrainRequest>,
) -> Result<Json<TrainResponse>, (StatusCode, String)> {
    let samples = payload.samples.len();
    let mut detector = state.detector.write().await;

    detector
        .train(&payload.samples, payload.labels.as_deref())
        .map_err(|e| match e {
            FraudError::InsufficientSamples { .. } | FraudError::DimensionMismatch { .. } => {
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        })?;

    if let Some(path) = &state.model_path {
        // Training already succeeded; persistence failure only costs the
        // ability to reload after restart.
        match detector.save_model(path) {
            Ok(true) => info!(path = %path.display(), "fraud model persisted"),
            Ok(false) => {}
            Err(e) => error!(error = %e, "failed to persist fraud model"),
        }
    }

    let metrics = detector
        .metrics()
        .ok_or((StatusCode::INTERNAL_SERVER_ERROR, "Metrics unavailable after training".to_string()))?;

    Ok(Json(TrainResponse {
        trained: true,
        samples,
        metrics,
    }))
}

/// GET /fraud/metrics - Evaluation metrics of the trained model
pub async fn get_metrics(
    State(state): State<FraudApiState>,
) -> Result<Json<MetricsReport>, (StatusCode, String)> {
    state
        .detector
        .read()
        .await
        .metrics()
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Model not trained yet".to_string()))
}

/// GET /fraud/alerts - Pending alerts, most recent first
pub async fn get_alerts(State(state): State<FraudApiState>) -> Json<AlertsResponse> {
    let alerts = state.store.pending_alerts().await;
    Json(AlertsResponse {
        total: alerts.len(),
        alerts,
    })
}

/// POST /fraud/alerts/:id/resolve - Mark an alert reviewed
pub async fn resolve_alert(
    State(state): State<FraudApiState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FraudAlert>, (StatusCode, String)> {
    state
        .store
        .resolve_alert(id)
        .await
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, format!("Alert {id} not found")))
}

/// Create the fraud API router
pub fn create_fraud_router(state: FraudApiState) -> Router {
    Router::new()
        .route("/detect", post(detect))
        .route("/train", post(train))
        .route("/metrics", get(get_metrics))
        .route("/alerts", get(get_alerts))
        .route("/alerts/{id}/resolve", post(resolve_alert))
        .with_state(state)
}
