//! HTTP API routers, one per domain.

mod bookings;
mod federated;
mod fraud;
mod trust;

pub use bookings::{create_marketplace_router, MarketplaceApiState};
pub use federated::{create_federated_router, FederatedApiState};
pub use fraud::{create_fraud_router, FraudApiState};
pub use trust::{create_trust_router, TrustApiState};

use axum::http::StatusCode;

use crate::marketplace::BookingError;

/// Map a booking failure onto an HTTP status.
pub(crate) fn booking_error_response(err: BookingError) -> (StatusCode, String) {
    let status = match &err {
        BookingError::BookingNotFound { .. }
        | BookingError::CustomerNotFound { .. }
        | BookingError::ProviderNotFound { .. } => StatusCode::NOT_FOUND,
        BookingError::NotAssignedProvider { .. } | BookingError::NotBookingCustomer { .. } => {
            StatusCode::FORBIDDEN
        }
        BookingError::InvalidTransition { .. }
        | BookingError::NotReviewable { .. }
        | BookingError::AlreadyReviewed { .. } => StatusCode::CONFLICT,
        BookingError::InvalidRating { .. } => StatusCode::BAD_REQUEST,
    };
    (status, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_status_mapping() {
        let id = Uuid::new_v4();
        assert_eq!(
            booking_error_response(BookingError::BookingNotFound { id }).0,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            booking_error_response(BookingError::NotAssignedProvider { id }).0,
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            booking_error_response(BookingError::AlreadyReviewed { id }).0,
            StatusCode::CONFLICT
        );
        assert_eq!(
            booking_error_response(BookingError::InvalidRating { got: 9 }).0,
            StatusCode::BAD_REQUEST
        );
    }
}
