//! Risk Coordinator
//!
//! Ties booking lifecycle events to the trust scorer and fraud detector:
//! every creation is screened, abusive rejection and cancellation patterns
//! feed back into trust records, and reviews refresh the provider's
//! authenticity signal. All trust mutations flow through this module.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::fraud::{BookingFeatures, Detection, FraudDetector};
use crate::marketplace::{Booking, BookingError, BookingStatus, CancelledBy, MarketStore};
use crate::reputation::alerts::{AlertType, FraudAlert};
use crate::reputation::trust::{ActorId, TrustRecord, TrustResult, TrustScorer};

/// Anomaly-score bump applied when a party walks away from an accepted
/// booking or a provider shows a rejection pattern.
const ANOMALY_BUMP: f64 = 15.0;

/// Flat score deduction for repeat cancellers.
const REPEAT_CANCEL_DEDUCTION: f64 = 2.0;

/// Request to create a booking.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub customer_id: Uuid,
    pub provider_id: Uuid,
    pub service_description: String,
    pub scheduled_date: DateTime<Utc>,
    pub price: f64,
}

/// Outcome of a provider rejecting an assigned booking.
#[derive(Debug, Clone, Serialize)]
pub struct RejectOutcome {
    pub booking: Booking,
    /// Whether the rejection pattern crossed into an alert.
    pub fraud_flagged: bool,
    /// Lifetime rejections including this one.
    pub total_rejections: u32,
    /// Provider's recomputed score, present only when a penalty applied.
    pub new_overall_score: Option<f64>,
}

/// Outcome of a customer cancelling their booking.
#[derive(Debug, Clone, Serialize)]
pub struct CancelOutcome {
    pub booking: Booking,
    /// True when the booking was already accepted and the anomaly/dispute
    /// penalty applied.
    pub penalty_applied: bool,
    /// True when the repeat-cancellation deduction applied.
    pub credit_reduced: bool,
    pub previous_cancellations: u64,
    pub new_overall_score: f64,
}

/// Orchestrates booking events against the store, scorer and detector.
#[derive(Clone)]
pub struct RiskCoordinator {
    store: Arc<MarketStore>,
    scorer: TrustScorer,
    detector: Arc<RwLock<FraudDetector>>,
    /// Detections above this risk are persisted as alerts.
    alert_risk_threshold: f64,
}

impl RiskCoordinator {
    pub fn new(
        store: Arc<MarketStore>,
        detector: Arc<RwLock<FraudDetector>>,
        alert_risk_threshold: f64,
    ) -> Self {
        Self {
            store,
            scorer: TrustScorer::new(),
            detector,
            alert_risk_threshold,
        }
    }

    pub fn store(&self) -> &Arc<MarketStore> {
        &self.store
    }

    pub fn detector(&self) -> &Arc<RwLock<FraudDetector>> {
        &self.detector
    }

    /// Create a booking and screen it in the same call. The feature vector
    /// is built from the parties' real booking history and live market price
    /// statistics, so detection sharpens as the marketplace accumulates data.
    pub async fn create_booking(
        &self,
        request: NewBooking,
    ) -> Result<(Booking, Detection), BookingError> {
        if self.store.get_customer(request.customer_id).await.is_none() {
            return Err(BookingError::CustomerNotFound {
                id: request.customer_id,
            });
        }
        if self.store.get_provider(request.provider_id).await.is_none() {
            return Err(BookingError::ProviderNotFound {
                id: request.provider_id,
            });
        }

        let features = self
            .booking_features(
                request.customer_id,
                request.provider_id,
                request.price,
                request.scheduled_date,
            )
            .await;

        let booking = Booking::new(
            request.customer_id,
            request.provider_id,
            request.service_description,
            request.scheduled_date,
            request.price,
        );
        self.store.insert_booking(booking.clone()).await;

        let detection = self.detector.read().await.detect(&features);
        if detection.is_fraud && detection.risk_score > self.alert_risk_threshold {
            if let Some(alert_type) = AlertType::from_detection(detection.fraud_type) {
                warn!(
                    booking_id = %booking.id,
                    risk_score = detection.risk_score,
                    fraud_type = ?detection.fraud_type,
                    "booking flagged at creation"
                );
                self.store
                    .insert_alert(FraudAlert::new(
                        Some(booking.customer_id),
                        Some(booking.provider_id),
                        Some(booking.id),
                        alert_type,
                        detection.risk_score,
                        detection.description.clone(),
                    ))
                    .await;
            }
        }

        info!(
            booking_id = %booking.id,
            customer_id = %booking.customer_id,
            provider_id = %booking.provider_id,
            risk_score = detection.risk_score,
            "booking created"
        );
        Ok((booking, detection))
    }

    /// Provider accepts a pending booking assigned to them.
    pub async fn accept_booking(
        &self,
        booking_id: Uuid,
        provider_id: Uuid,
    ) -> Result<Booking, BookingError> {
        self.assert_assigned_provider(booking_id, provider_id).await?;
        let (_, booking) = self
            .store
            .transition_booking(booking_id, BookingStatus::Accepted)
            .await?;
        info!(booking_id = %booking.id, "booking accepted");
        Ok(booking)
    }

    /// Provider rejects a pending booking. A single rejection is free; from
    /// the second onwards the provider is flagged and their trust record
    /// takes the anomaly and dispute penalty.
    pub async fn reject_booking(
        &self,
        booking_id: Uuid,
        provider_id: Uuid,
    ) -> Result<RejectOutcome, BookingError> {
        self.assert_assigned_provider(booking_id, provider_id).await?;

        let prior_rejections = self
            .store
            .provider_stats(provider_id)
            .await
            .cancelled_bookings;
        let (_, booking) = self
            .store
            .cancel_booking(booking_id, CancelledBy::Provider)
            .await?;

        let mut new_overall_score = None;
        let fraud_flagged = prior_rejections >= 1;
        if fraud_flagged {
            let alert = FraudAlert::excessive_rejections(
                provider_id,
                booking_id,
                prior_rejections as u32,
            );
            warn!(
                provider_id = %provider_id,
                total_rejections = prior_rejections + 1,
                risk_score = alert.risk_score,
                "excessive rejection pattern"
            );
            self.store.insert_alert(alert).await;

            let score = self
                .penalize(ActorId::Provider(provider_id), ANOMALY_BUMP, 1)
                .await;
            new_overall_score = Some(score);
        }

        Ok(RejectOutcome {
            booking,
            fraud_flagged,
            total_rejections: (prior_rejections + 1) as u32,
            new_overall_score,
        })
    }

    /// Provider completes an accepted booking. Their completion rate moves,
    /// so the trust score is refreshed.
    pub async fn complete_booking(
        &self,
        booking_id: Uuid,
        provider_id: Uuid,
    ) -> Result<Booking, BookingError> {
        self.assert_assigned_provider(booking_id, provider_id).await?;
        let (_, booking) = self
            .store
            .transition_booking(booking_id, BookingStatus::Completed)
            .await?;

        self.recompute(ActorId::Provider(provider_id)).await;
        self.recompute(ActorId::Customer(booking.customer_id)).await;
        info!(booking_id = %booking.id, "booking completed");
        Ok(booking)
    }

    /// Customer cancels their booking. Walking away from an accepted booking
    /// costs the anomaly and dispute penalty; repeat cancellers additionally
    /// lose a flat deduction on top of whatever the recomputation produced.
    /// Both penalties stack on the same call.
    pub async fn cancel_booking(
        &self,
        booking_id: Uuid,
        customer_id: Uuid,
    ) -> Result<CancelOutcome, BookingError> {
        let booking = self
            .store
            .get_booking(booking_id)
            .await
            .ok_or(BookingError::BookingNotFound { id: booking_id })?;
        if booking.customer_id != customer_id {
            return Err(BookingError::NotBookingCustomer { id: booking_id });
        }

        let (previous, booking) = self
            .store
            .cancel_booking(booking_id, CancelledBy::Customer)
            .await?;

        let actor = ActorId::Customer(customer_id);
        let penalty_applied = previous == BookingStatus::Accepted;
        let mut overall = if penalty_applied {
            self.penalize(actor, ANOMALY_BUMP, 1).await
        } else {
            self.recompute(actor).await
        };

        let cancellations = self
            .store
            .customer_stats(customer_id)
            .await
            .cancelled_bookings;
        let credit_reduced = cancellations > 1;
        if credit_reduced {
            let mut record = self.store.get_or_create_trust(actor).await;
            record.overall_score = (record.overall_score - REPEAT_CANCEL_DEDUCTION).max(0.0);
            record.updated_at = Utc::now();
            overall = record.overall_score;
            self.store.save_trust(record).await;
        }

        info!(
            booking_id = %booking.id,
            customer_id = %customer_id,
            penalty_applied,
            credit_reduced,
            "booking cancelled"
        );
        Ok(CancelOutcome {
            booking,
            penalty_applied,
            credit_reduced,
            previous_cancellations: cancellations.saturating_sub(1),
            new_overall_score: overall,
        })
    }

    /// Customer reviews a completed booking. The provider's authenticity
    /// estimate is refreshed over all their rated completed bookings and
    /// their transaction count advances.
    pub async fn submit_review(
        &self,
        booking_id: Uuid,
        customer_id: Uuid,
        rating: u8,
        review: Option<String>,
    ) -> Result<(Booking, f64), BookingError> {
        let booking = self
            .store
            .get_booking(booking_id)
            .await
            .ok_or(BookingError::BookingNotFound { id: booking_id })?;
        if booking.customer_id != customer_id {
            return Err(BookingError::NotBookingCustomer { id: booking_id });
        }

        let booking = self.store.record_review(booking_id, rating, review).await?;

        let provider = ActorId::Provider(booking.provider_id);
        let reviews = self.store.provider_reviews(booking.provider_id).await;
        let authenticity = self.scorer.estimate_review_authenticity(&reviews);

        let mut record = self.store.get_or_create_trust(provider).await;
        record.review_authenticity = authenticity;
        record.total_transactions += 1;
        self.store.save_trust(record).await;
        let overall = self.recompute(provider).await;

        info!(
            booking_id = %booking.id,
            provider_id = %booking.provider_id,
            rating,
            review_authenticity = authenticity,
            "review recorded"
        );
        Ok((booking, overall))
    }

    /// Trust record plus a fresh scoring breakdown for one actor.
    pub async fn trust_summary(&self, actor: ActorId) -> Option<(TrustRecord, TrustResult)> {
        let record = self.store.get_trust(actor).await?;
        let result = self.scorer.calculate_trust_score(&record.metrics());
        Some((record, result))
    }

    /// Feature vector for a prospective booking, from real history.
    async fn booking_features(
        &self,
        customer_id: Uuid,
        provider_id: Uuid,
        price: f64,
        scheduled_date: DateTime<Utc>,
    ) -> BookingFeatures {
        let customer = self.store.customer_stats(customer_id).await;
        let provider = self.store.provider_stats(provider_id).await;

        let time_to_booking_hours = ((scheduled_date - Utc::now()).num_minutes() as f64
            / 60.0)
            .max(0.0);
        let price_deviation_from_avg = match self.store.market_price_stats().await {
            Some((mean, std)) => (price - mean).abs() / std,
            None => 0.0,
        };

        BookingFeatures {
            price,
            customer_total_bookings: customer.total_bookings as u32,
            provider_total_bookings: provider.total_bookings as u32,
            customer_cancellation_rate: customer.cancellation_rate(),
            provider_cancellation_rate: provider.cancellation_rate(),
            time_to_booking_hours,
            price_deviation_from_avg,
        }
    }

    async fn assert_assigned_provider(
        &self,
        booking_id: Uuid,
        provider_id: Uuid,
    ) -> Result<(), BookingError> {
        let booking = self
            .store
            .get_booking(booking_id)
            .await
            .ok_or(BookingError::BookingNotFound { id: booking_id })?;
        if booking.provider_id != provider_id {
            return Err(BookingError::NotAssignedProvider { id: booking_id });
        }
        Ok(())
    }

    /// Bump the actor's anomaly score and dispute count, then recompute.
    async fn penalize(&self, actor: ActorId, anomaly_bump: f64, disputes: u32) -> f64 {
        let mut record = self.store.get_or_create_trust(actor).await;
        record.anomaly_score = (record.anomaly_score + anomaly_bump).min(100.0);
        record.dispute_count += disputes;
        self.store.save_trust(record).await;
        self.recompute(actor).await
    }

    /// Refresh the actor's completion rate from the store and recompute
    /// their composite score.
    async fn recompute(&self, actor: ActorId) -> f64 {
        let stats = match actor {
            ActorId::Customer(id) => self.store.customer_stats(id).await,
            ActorId::Provider(id) => self.store.provider_stats(id).await,
        };

        let mut record = self.store.get_or_create_trust(actor).await;
        record.completion_rate = self
            .scorer
            .completion_rate(stats.total_bookings, stats.completed_bookings)
            * 100.0;
        let result = self.scorer.calculate_trust_score(&record.metrics());
        record.overall_score = result.overall_score;
        record.updated_at = Utc::now();
        let overall = record.overall_score;
        self.store.save_trust(record).await;
        overall
    }
}
