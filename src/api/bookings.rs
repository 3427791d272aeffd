//! Marketplace API Endpoints
//!
//! Actor registration plus the booking lifecycle. Every lifecycle endpoint
//! routes through the risk coordinator so screening and trust side effects
//! are never skipped.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::booking_error_response;
use crate::fraud::Detection;
use crate::marketplace::{Booking, CustomerRecord, ProviderRecord};
use crate::reputation::{CancelOutcome, NewBooking, RejectOutcome, RiskCoordinator};

/// API state for marketplace endpoints
#[derive(Clone)]
pub struct MarketplaceApiState {
    pub coordinator: Arc<RiskCoordinator>,
}

// Request/response types

#[derive(Debug, Deserialize)]
pub struct CreateCustomerRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateProviderRequest {
    pub name: String,
    pub specialty: String,
    pub hourly_rate: f64,
}

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub customer_id: Uuid,
    pub provider_id: Uuid,
    pub service_description: String,
    pub scheduled_date: DateTime<Utc>,
    pub price: f64,
}

#[derive(Debug, Serialize)]
pub struct CreateBookingResponse {
    pub booking: Booking,
    pub risk_assessment: Detection,
}

#[derive(Debug, Deserialize)]
pub struct ProviderActionRequest {
    pub provider_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct CustomerActionRequest {
    pub customer_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub customer_id: Uuid,
    pub rating: u8,
    pub review: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    pub booking: Booking,
    pub provider_trust_score: f64,
}

// Endpoints

/// POST /customers - Register a customer
pub async fn create_customer(
    State(state): State<MarketplaceApiState>,
    Json(payload): Json<CreateCustomerRequest>,
) -> Result<(StatusCode, Json<CustomerRecord>), (StatusCode, String)> {
    if payload.name.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Name cannot be empty".to_string()));
    }
    let record = state.coordinator.store().create_customer(&payload.name).await;
    Ok((StatusCode::CREATED, Json(record)))
}

/// POST /providers - Register a provider
pub async fn create_provider(
    State(state): State<MarketplaceApiState>,
    Json(payload): Json<CreateProviderRequest>,
) -> Result<(StatusCode, Json<ProviderRecord>), (StatusCode, String)> {
    if payload.name.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Name cannot be empty".to_string()));
    }
    if payload.hourly_rate <= 0.0 {
        return Err((
            StatusCode::BAD_REQUEST,
            "Hourly rate must be positive".to_string(),
        ));
    }
    let record = state
        .coordinator
        .store()
        .create_provider(&payload.name, &payload.specialty, payload.hourly_rate)
        .await;
    Ok((StatusCode::CREATED, Json(record)))
}

/// POST /bookings - Create a booking, screened at creation
pub async fn create_booking(
    State(state): State<MarketplaceApiState>,
    Json(payload): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<CreateBookingResponse>), (StatusCode, String)> {
    if payload.price <= 0.0 {
        return Err((
            StatusCode::BAD_REQUEST,
            "Price must be positive".to_string(),
        ));
    }

    let (booking, risk_assessment) = state
        .coordinator
        .create_booking(NewBooking {
            customer_id: payload.customer_id,
            provider_id: payload.provider_id,
            service_description: payload.service_description,
            scheduled_date: payload.scheduled_date,
            price: payload.price,
        })
        .await
        .map_err(booking_error_response)?;

    Ok((
        StatusCode::CREATED,
        Json(CreateBookingResponse {
            booking,
            risk_assessment,
        }),
    ))
}

/// GET /bookings/:id - Fetch one booking
pub async fn get_booking(
    State(state): State<MarketplaceApiState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, (StatusCode, String)> {
    state
        .coordinator
        .store()
        .get_booking(id)
        .await
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, format!("Booking {id} not found")))
}

/// POST /bookings/:id/accept - Provider accepts
pub async fn accept_booking(
    State(state): State<MarketplaceApiState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProviderActionRequest>,
) -> Result<Json<Booking>, (StatusCode, String)> {
    state
        .coordinator
        .accept_booking(id, payload.provider_id)
        .await
        .map(Json)
        .map_err(booking_error_response)
}

/// POST /bookings/:id/reject - Provider rejects; repeated rejections are
/// flagged and penalized
pub async fn reject_booking(
    State(state): State<MarketplaceApiState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProviderActionRequest>,
) -> Result<Json<RejectOutcome>, (StatusCode, String)> {
    state
        .coordinator
        .reject_booking(id, payload.provider_id)
        .await
        .map(Json)
        .map_err(booking_error_response)
}

/// POST /bookings/:id/complete - Provider completes
pub async fn complete_booking(
    State(state): State<MarketplaceApiState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProviderActionRequest>,
) -> Result<Json<Booking>, (StatusCode, String)> {
    state
        .coordinator
        .complete_booking(id, payload.provider_id)
        .await
        .map(Json)
        .map_err(booking_error_response)
}

/// POST /bookings/:id/cancel - Customer cancels; penalties may apply
pub async fn cancel_booking(
    State(state): State<MarketplaceApiState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CustomerActionRequest>,
) -> Result<Json<CancelOutcome>, (StatusCode, String)> {
    state
        .coordinator
        .cancel_booking(id, payload.customer_id)
        .await
        .map(Json)
        .map_err(booking_error_response)
}

/// POST /bookings/:id/review - Customer reviews a completed booking
pub async fn submit_review(
    State(state): State<MarketplaceApiState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReviewRequest>,
) -> Result<Json<ReviewResponse>, (StatusCode, String)> {
    let (booking, provider_trust_score) = state
        .coordinator
        .submit_review(id, payload.customer_id, payload.rating, payload.review)
        .await
        .map_err(booking_error_response)?;

    Ok(Json(ReviewResponse {
        booking,
        provider_trust_score,
    }))
}

/// Create the marketplace API router
pub fn create_marketplace_router(state: MarketplaceApiState) -> Router {
    Router::new()
        .route("/customers", post(create_customer))
        .route("/providers", post(create_provider))
        .route("/bookings", post(create_booking))
        .route("/bookings/{id}", get(get_booking))
        .route("/bookings/{id}/accept", post(accept_booking))
        .route("/bookings/{id}/reject", post(reject_booking))
        .route("/bookings/{id}/complete", post(complete_booking))
        .route("/bookings/{id}/cancel", post(cancel_booking))
        .route("/bookings/{id}/review", post(submit_review))
        .with_state(state)
}
