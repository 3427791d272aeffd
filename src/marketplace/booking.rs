//! Booking records and the lifecycle state machine
//!
//! Legal transitions: pending -> accepted -> completed, and
//! {pending, accepted} -> cancelled. Everything else is a typed conflict
//! identifying the booking's actual current status.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Accepted,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Accepted => "accepted",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    /// Whether the lifecycle permits moving from `self` to `to`.
    pub fn can_transition_to(&self, to: BookingStatus) -> bool {
        matches!(
            (self, to),
            (BookingStatus::Pending, BookingStatus::Accepted)
                | (BookingStatus::Accepted, BookingStatus::Completed)
                | (BookingStatus::Pending, BookingStatus::Cancelled)
                | (BookingStatus::Accepted, BookingStatus::Cancelled)
        )
    }
}

/// Which party terminated a cancelled booking. Provider rejections and
/// customer cancellations both end in `Cancelled`; this records whose
/// history the termination belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CancelledBy {
    Customer,
    Provider,
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed failures for booking operations. Validation and conflict failures
/// never mutate state.
#[derive(Debug, Error)]
pub enum BookingError {
    #[error("booking {id} not found")]
    BookingNotFound { id: Uuid },

    #[error("customer {id} not found")]
    CustomerNotFound { id: Uuid },

    #[error("provider {id} not found")]
    ProviderNotFound { id: Uuid },

    #[error("booking {id} is not assigned to this provider")]
    NotAssignedProvider { id: Uuid },

    #[error("booking {id} does not belong to this customer")]
    NotBookingCustomer { id: Uuid },

    #[error("booking {id} cannot move from {current} to {requested}")]
    InvalidTransition {
        id: Uuid,
        current: BookingStatus,
        requested: BookingStatus,
    },

    #[error("booking {id} must be completed before review (currently {current})")]
    NotReviewable { id: Uuid, current: BookingStatus },

    #[error("booking {id} has already been reviewed")]
    AlreadyReviewed { id: Uuid },

    #[error("rating must be between 1 and 5, got {got}")]
    InvalidRating { got: u8 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub provider_id: Uuid,
    pub service_description: String,
    pub scheduled_date: DateTime<Utc>,
    pub status: BookingStatus,
    pub price: f64,
    pub rating: Option<u8>,
    pub review: Option<String>,
    pub cancelled_by: Option<CancelledBy>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Booking {
    pub fn new(
        customer_id: Uuid,
        provider_id: Uuid,
        service_description: String,
        scheduled_date: DateTime<Utc>,
        price: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            customer_id,
            provider_id,
            service_description,
            scheduled_date,
            status: BookingStatus::Pending,
            price,
            rating: None,
            review: None,
            cancelled_by: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Apply a lifecycle transition, stamping `completed_at` on completion.
    pub fn transition(&mut self, to: BookingStatus) -> Result<(), BookingError> {
        if !self.status.can_transition_to(to) {
            return Err(BookingError::InvalidTransition {
                id: self.id,
                current: self.status,
                requested: to,
            });
        }
        self.status = to;
        if to == BookingStatus::Completed {
            self.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    /// Cancel the booking, recording which party terminated it.
    pub fn cancel(&mut self, by: CancelledBy) -> Result<(), BookingError> {
        self.transition(BookingStatus::Cancelled)?;
        self.cancelled_by = Some(by);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_booking() -> Booking {
        Booking::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "Leak repair".to_string(),
            Utc::now() + chrono::Duration::days(2),
            120.0,
        )
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut booking = test_booking();
        assert_eq!(booking.status, BookingStatus::Pending);

        booking.transition(BookingStatus::Accepted).unwrap();
        booking.transition(BookingStatus::Completed).unwrap();
        assert!(booking.completed_at.is_some());
    }

    #[test]
    fn test_cancellation_from_pending_and_accepted() {
        let mut pending = test_booking();
        pending.cancel(CancelledBy::Customer).unwrap();
        assert_eq!(pending.cancelled_by, Some(CancelledBy::Customer));

        let mut accepted = test_booking();
        accepted.transition(BookingStatus::Accepted).unwrap();
        accepted.cancel(CancelledBy::Provider).unwrap();
        assert_eq!(accepted.cancelled_by, Some(CancelledBy::Provider));
    }

    #[test]
    fn test_completed_cannot_be_cancelled() {
        let mut booking = test_booking();
        booking.transition(BookingStatus::Accepted).unwrap();
        booking.transition(BookingStatus::Completed).unwrap();

        let err = booking.transition(BookingStatus::Cancelled).unwrap_err();
        match err {
            BookingError::InvalidTransition { current, requested, .. } => {
                assert_eq!(current, BookingStatus::Completed);
                assert_eq!(requested, BookingStatus::Cancelled);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_completion_requires_acceptance() {
        let mut booking = test_booking();
        let err = booking.transition(BookingStatus::Completed).unwrap_err();
        assert!(matches!(err, BookingError::InvalidTransition { .. }));
        assert_eq!(booking.status, BookingStatus::Pending);
    }
}
