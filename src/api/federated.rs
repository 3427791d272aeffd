//! Federated API Endpoints
//!
//! Client update submission, aggregation and the training simulation.
//! Request-shape validation happens here; weight dimensions are checked by
//! the orchestrator itself.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::federated::{
    AggregationOutcome, FederatedError, FederatedOrchestrator, GlobalModelSnapshot,
    LocalTrainingResult, OrchestratorStats,
};
use crate::marketplace::MarketStore;

/// API state for federated endpoints
#[derive(Clone)]
pub struct FederatedApiState {
    pub orchestrator: Arc<FederatedOrchestrator>,
    pub store: Arc<MarketStore>,
}

// Request/response types

#[derive(Debug, Deserialize)]
pub struct SubmitUpdateRequest {
    pub client_id: String,
    pub weights: Vec<f64>,
    pub num_samples: u64,
}

#[derive(Debug, Serialize)]
pub struct SubmitUpdateResponse {
    pub pending_updates: usize,
    pub model_version: u64,
}

#[derive(Debug, Deserialize)]
pub struct SimulateRequest {
    pub num_samples: u64,
    #[serde(default = "default_epochs")]
    pub epochs: u32,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
}

fn default_epochs() -> u32 {
    5
}

fn default_learning_rate() -> f64 {
    0.01
}

// Endpoints

/// POST /federated/updates - Submit a locally trained update
pub async fn submit_update(
    State(state): State<FederatedApiState>,
    Json(payload): Json<SubmitUpdateRequest>,
) -> Result<Json<SubmitUpdateResponse>, (StatusCode, String)> {
    if payload.client_id.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Client id cannot be empty".to_string(),
        ));
    }
    if payload.num_samples == 0 {
        return Err((
            StatusCode::BAD_REQUEST,
            "Sample count must be positive".to_string(),
        ));
    }

    let model = state.orchestrator.get_global_model().await;
    let pending_updates = state
        .orchestrator
        .receive_local_update(&payload.client_id, payload.weights, payload.num_samples)
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    Ok(Json(SubmitUpdateResponse {
        pending_updates,
        model_version: model.version,
    }))
}

/// GET /federated/model - Current global model snapshot
pub async fn get_model(State(state): State<FederatedApiState>) -> Json<GlobalModelSnapshot> {
    Json(state.orchestrator.get_global_model().await)
}

/// POST /federated/aggregate - Run a FedAvg round over the pending buffer
pub async fn aggregate(
    State(state): State<FederatedApiState>,
) -> Result<Json<AggregationOutcome>, (StatusCode, String)> {
    let outcome = state
        .orchestrator
        .aggregate_updates()
        .await
        .map_err(|e| match e {
            FederatedError::InsufficientUpdates { .. }
            | FederatedError::ZeroTotalSamples
            | FederatedError::WeightDimensionMismatch { .. } => {
                (StatusCode::CONFLICT, e.to_string())
            }
        })?;

    // Persist the new snapshot as the single active model record.
    let model = state.orchestrator.get_global_model().await;
    state
        .store
        .insert_global_model(outcome.new_version, model.weights, outcome.updates_aggregated)
        .await;

    Ok(Json(outcome))
}

/// GET /federated/stats - Round progress
pub async fn get_stats(State(state): State<FederatedApiState>) -> Json<OrchestratorStats> {
    Json(state.orchestrator.get_stats().await)
}

/// POST /federated/simulate - Simulate one client's local training
pub async fn simulate(
    State(state): State<FederatedApiState>,
    Json(payload): Json<SimulateRequest>,
) -> Result<Json<LocalTrainingResult>, (StatusCode, String)> {
    if payload.num_samples == 0 {
        return Err((
            StatusCode::BAD_REQUEST,
            "Sample count must be positive".to_string(),
        ));
    }

    let result = state
        .orchestrator
        .simulate_local_training(payload.num_samples, payload.epochs, payload.learning_rate)
        .await;
    Ok(Json(result))
}

/// Create the federated API router
pub fn create_federated_router(state: FederatedApiState) -> Router {
    Router::new()
        .route("/updates", post(submit_update))
        .route("/model", get(get_model))
        .route("/aggregate", post(aggregate))
        .route("/stats", get(get_stats))
        .route("/simulate", post(simulate))
        .with_state(state)
}
