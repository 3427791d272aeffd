//! Trust API Endpoints
//!
//! Read-only trust lookups; all trust mutation happens through lifecycle
//! events.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::reputation::{ActorId, RiskCoordinator, TrustResult};

/// API state for trust endpoints
#[derive(Clone)]
pub struct TrustApiState {
    pub coordinator: Arc<RiskCoordinator>,
}

#[derive(Debug, Serialize)]
pub struct TrustResponse {
    pub actor: ActorId,
    pub overall_score: f64,
    pub trust_level: &'static str,
    pub completion_rate: f64,
    pub review_authenticity: f64,
    pub response_time_score: f64,
    pub dispute_count: u32,
    pub anomaly_score: f64,
    pub total_transactions: u32,
    pub breakdown: TrustResult,
}

/// GET /trust/:kind/:id - Trust record and scoring breakdown for one actor
pub async fn get_trust(
    State(state): State<TrustApiState>,
    Path((kind, id)): Path<(String, Uuid)>,
) -> Result<Json<TrustResponse>, (StatusCode, String)> {
    let actor = match kind.as_str() {
        "customer" => ActorId::Customer(id),
        "provider" => ActorId::Provider(id),
        other => {
            return Err((
                StatusCode::BAD_REQUEST,
                format!("Unknown actor kind '{other}', expected 'customer' or 'provider'"),
            ))
        }
    };

    let (record, breakdown) = state
        .coordinator
        .trust_summary(actor)
        .await
        .ok_or((StatusCode::NOT_FOUND, format!("No trust record for {kind} {id}")))?;

    Ok(Json(TrustResponse {
        actor: record.actor,
        overall_score: record.overall_score,
        trust_level: breakdown.trust_level.as_str(),
        completion_rate: record.completion_rate,
        review_authenticity: record.review_authenticity,
        response_time_score: record.response_time_score,
        dispute_count: record.dispute_count,
        anomaly_score: record.anomaly_score,
        total_transactions: record.total_transactions,
        breakdown,
    }))
}

/// Create the trust API router
pub fn create_trust_router(state: TrustApiState) -> Router {
    Router::new()
        .route("/{kind}/{id}", get(get_trust))
        .with_state(state)
}
