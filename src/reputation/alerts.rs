//! Fraud Alerts
//!
//! An alert is raised when a detection crosses the persistence threshold or
//! when the coordinator observes an abusive lifecycle pattern directly
//! (e.g. a provider repeatedly rejecting assigned bookings). Alerts are
//! immutable once created except for the pending -> resolved transition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::fraud::FraudType;

/// Categories of persisted alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    PriceManipulation,
    FakeBooking,
    RushBookingScam,
    SuspiciousPattern,
    ExcessiveRejections,
}

impl AlertType {
    /// Map a detector outcome to a persistable alert category. `None` and
    /// degraded `Error` outcomes never produce alerts.
    pub fn from_detection(fraud_type: FraudType) -> Option<Self> {
        match fraud_type {
            FraudType::PriceManipulation => Some(AlertType::PriceManipulation),
            FraudType::FakeBooking => Some(AlertType::FakeBooking),
            FraudType::RushBookingScam => Some(AlertType::RushBookingScam),
            FraudType::SuspiciousPattern => Some(AlertType::SuspiciousPattern),
            FraudType::None | FraudType::Error => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Pending,
    Resolved,
}

/// A recorded fraud alert, referencing the triggering customer, provider
/// and/or booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FraudAlert {
    pub id: Uuid,
    pub customer_id: Option<Uuid>,
    pub provider_id: Option<Uuid>,
    pub booking_id: Option<Uuid>,
    pub alert_type: AlertType,

    /// Risk score at flag time, in [0, 100].
    pub risk_score: f64,

    pub description: String,
    pub status: AlertStatus,
    pub flagged_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl FraudAlert {
    pub fn new(
        customer_id: Option<Uuid>,
        provider_id: Option<Uuid>,
        booking_id: Option<Uuid>,
        alert_type: AlertType,
        risk_score: f64,
        description: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            customer_id,
            provider_id,
            booking_id,
            alert_type,
            risk_score: risk_score.clamp(0.0, 100.0),
            description,
            status: AlertStatus::Pending,
            flagged_at: Utc::now(),
            resolved_at: None,
        }
    }

    /// Alert raised when a provider's rejection count reaches two or more.
    /// `prior_rejections` counts rejections before the triggering one; risk
    /// grows with each further rejection, capped at 100.
    pub fn excessive_rejections(
        provider_id: Uuid,
        booking_id: Uuid,
        prior_rejections: u32,
    ) -> Self {
        let risk_score = 70.0 + (f64::from(prior_rejections) * 10.0).min(30.0);
        Self::new(
            None,
            Some(provider_id),
            Some(booking_id),
            AlertType::ExcessiveRejections,
            risk_score,
            format!(
                "Provider has rejected {} bookings. Suspicious rejection pattern detected.",
                prior_rejections + 1
            ),
        )
    }

    pub fn is_pending(&self) -> bool {
        self.status == AlertStatus::Pending
    }

    /// Pending -> resolved; resolving twice is a no-op.
    pub fn resolve(&mut self) {
        if self.status == AlertStatus::Pending {
            self.status = AlertStatus::Resolved;
            self.resolved_at = Some(Utc::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excessive_rejections_risk_growth() {
        let provider = Uuid::new_v4();
        let booking = Uuid::new_v4();

        // One prior rejection means this is the second overall.
        let second = FraudAlert::excessive_rejections(provider, booking, 1);
        assert_eq!(second.risk_score, 80.0);
        assert!(second.description.contains("rejected 2 bookings"));

        // Risk contribution saturates at +30.
        let tenth = FraudAlert::excessive_rejections(provider, booking, 9);
        assert_eq!(tenth.risk_score, 100.0);
    }

    #[test]
    fn test_resolve_transition() {
        let mut alert = FraudAlert::new(
            Some(Uuid::new_v4()),
            None,
            None,
            AlertType::FakeBooking,
            65.0,
            "test".to_string(),
        );
        assert!(alert.is_pending());

        alert.resolve();
        assert_eq!(alert.status, AlertStatus::Resolved);
        let resolved_at = alert.resolved_at;
        assert!(resolved_at.is_some());

        alert.resolve();
        assert_eq!(alert.resolved_at, resolved_at);
    }

    #[test]
    fn test_detection_mapping_excludes_non_flaggable() {
        assert!(AlertType::from_detection(FraudType::None).is_none());
        assert!(AlertType::from_detection(FraudType::Error).is_none());
        assert_eq!(
            AlertType::from_detection(FraudType::PriceManipulation),
            Some(AlertType::PriceManipulation)
        );
    }
}
