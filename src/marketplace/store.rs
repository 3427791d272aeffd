//! In-memory marketplace store
//!
//! Stand-in for the external transactional store at its interface boundary:
//! actor records, bookings, per-actor trust rows, fraud alerts and versioned
//! global-model snapshots, each behind its own lock. Booking transitions and
//! review writes are checked and applied under the bookings write lock so
//! concurrent lifecycle calls cannot interleave around the state machine.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::marketplace::{Booking, BookingError, BookingStatus, CancelledBy};
use crate::reputation::{ActorId, FraudAlert, ReviewSample, TrustRecord};

#[derive(Debug, Clone, Serialize)]
pub struct CustomerRecord {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderRecord {
    pub id: Uuid,
    pub name: String,
    pub specialty: String,
    pub hourly_rate: f64,
    pub created_at: DateTime<Utc>,
}

/// Persisted snapshot of an aggregated global model. At most one snapshot
/// is active at a time.
#[derive(Debug, Clone, Serialize)]
pub struct GlobalModelRecord {
    pub version: u64,
    pub weights: Vec<f64>,
    pub updates_aggregated: usize,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
}

/// Historical booking aggregates for one actor.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActorStats {
    pub total_bookings: u64,
    pub completed_bookings: u64,
    pub cancelled_bookings: u64,
}

impl ActorStats {
    pub fn cancellation_rate(&self) -> f64 {
        if self.total_bookings == 0 {
            return 0.0;
        }
        self.cancelled_bookings as f64 / self.total_bookings as f64
    }
}

#[derive(Debug, Default)]
pub struct MarketStore {
    customers: RwLock<HashMap<Uuid, CustomerRecord>>,
    providers: RwLock<HashMap<Uuid, ProviderRecord>>,
    bookings: RwLock<HashMap<Uuid, Booking>>,
    trust: RwLock<HashMap<ActorId, TrustRecord>>,
    alerts: RwLock<HashMap<Uuid, FraudAlert>>,
    global_models: RwLock<Vec<GlobalModelRecord>>,
}

impl MarketStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Actors

    /// Register a customer, seeding their trust row.
    pub async fn create_customer(&self, name: &str) -> CustomerRecord {
        let record = CustomerRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        self.customers
            .write()
            .await
            .insert(record.id, record.clone());
        self.trust
            .write()
            .await
            .insert(ActorId::Customer(record.id), TrustRecord::new(ActorId::Customer(record.id)));
        record
    }

    /// Register a provider, seeding their trust row.
    pub async fn create_provider(
        &self,
        name: &str,
        specialty: &str,
        hourly_rate: f64,
    ) -> ProviderRecord {
        let record = ProviderRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
            specialty: specialty.to_string(),
            hourly_rate,
            created_at: Utc::now(),
        };
        self.providers
            .write()
            .await
            .insert(record.id, record.clone());
        self.trust
            .write()
            .await
            .insert(ActorId::Provider(record.id), TrustRecord::new(ActorId::Provider(record.id)));
        record
    }

    pub async fn get_customer(&self, id: Uuid) -> Option<CustomerRecord> {
        self.customers.read().await.get(&id).cloned()
    }

    pub async fn get_provider(&self, id: Uuid) -> Option<ProviderRecord> {
        self.providers.read().await.get(&id).cloned()
    }

    // Bookings

    pub async fn insert_booking(&self, booking: Booking) {
        self.bookings.write().await.insert(booking.id, booking);
    }

    pub async fn get_booking(&self, id: Uuid) -> Option<Booking> {
        self.bookings.read().await.get(&id).cloned()
    }

    /// Apply a lifecycle transition under the write lock; returns the
    /// pre-transition status together with the updated booking.
    pub async fn transition_booking(
        &self,
        id: Uuid,
        to: BookingStatus,
    ) -> Result<(BookingStatus, Booking), BookingError> {
        let mut bookings = self.bookings.write().await;
        let booking = bookings
            .get_mut(&id)
            .ok_or(BookingError::BookingNotFound { id })?;
        let previous = booking.status;
        booking.transition(to)?;
        Ok((previous, booking.clone()))
    }

    /// Cancel a booking, attributing the termination to one party. Returns
    /// the pre-cancellation status together with the updated booking.
    pub async fn cancel_booking(
        &self,
        id: Uuid,
        by: CancelledBy,
    ) -> Result<(BookingStatus, Booking), BookingError> {
        let mut bookings = self.bookings.write().await;
        let booking = bookings
            .get_mut(&id)
            .ok_or(BookingError::BookingNotFound { id })?;
        let previous = booking.status;
        booking.cancel(by)?;
        Ok((previous, booking.clone()))
    }

    /// Attach a review to a completed, not-yet-reviewed booking.
    pub async fn record_review(
        &self,
        id: Uuid,
        rating: u8,
        review: Option<String>,
    ) -> Result<Booking, BookingError> {
        if !(1..=5).contains(&rating) {
            return Err(BookingError::InvalidRating { got: rating });
        }

        let mut bookings = self.bookings.write().await;
        let booking = bookings
            .get_mut(&id)
            .ok_or(BookingError::BookingNotFound { id })?;

        if booking.status != BookingStatus::Completed {
            return Err(BookingError::NotReviewable {
                id,
                current: booking.status,
            });
        }
        if booking.rating.is_some() {
            return Err(BookingError::AlreadyReviewed { id });
        }

        booking.rating = Some(rating);
        booking.review = review;
        Ok(booking.clone())
    }

    /// Lifetime booking counts for a customer. Only customer-initiated
    /// cancellations count against them; a provider rejection ends in the
    /// same `Cancelled` status but belongs to the provider's history.
    pub async fn customer_stats(&self, customer_id: Uuid) -> ActorStats {
        let bookings = self.bookings.read().await;
        let mut stats = ActorStats::default();
        for booking in bookings.values() {
            if booking.customer_id == customer_id {
                stats.total_bookings += 1;
                match booking.status {
                    BookingStatus::Completed => stats.completed_bookings += 1,
                    BookingStatus::Cancelled
                        if booking.cancelled_by == Some(CancelledBy::Customer) =>
                    {
                        stats.cancelled_bookings += 1
                    }
                    _ => {}
                }
            }
        }
        stats
    }

    /// Lifetime booking counts for a provider.
    pub async fn provider_stats(&self, provider_id: Uuid) -> ActorStats {
        let bookings = self.bookings.read().await;
        let mut stats = ActorStats::default();
        for booking in bookings.values() {
            if booking.provider_id == provider_id {
                stats.total_bookings += 1;
                match booking.status {
                    BookingStatus::Completed => stats.completed_bookings += 1,
                    BookingStatus::Cancelled => stats.cancelled_bookings += 1,
                    _ => {}
                }
            }
        }
        stats
    }

    /// Market-wide price mean and standard deviation. `None` until at least
    /// two priced bookings exist or while all prices are identical.
    pub async fn market_price_stats(&self) -> Option<(f64, f64)> {
        let bookings = self.bookings.read().await;
        let prices: Vec<f64> = bookings
            .values()
            .map(|b| b.price)
            .filter(|p| *p > 0.0)
            .collect();
        if prices.len() < 2 {
            return None;
        }

        let n = prices.len() as f64;
        let mean = prices.iter().sum::<f64>() / n;
        let variance = prices.iter().map(|p| (p - mean) * (p - mean)).sum::<f64>() / n;
        let std = variance.sqrt();
        if std < 1e-9 {
            return None;
        }
        Some((mean, std))
    }

    /// All rated reviews across a provider's completed bookings.
    pub async fn provider_reviews(&self, provider_id: Uuid) -> Vec<ReviewSample> {
        let bookings = self.bookings.read().await;
        bookings
            .values()
            .filter(|b| {
                b.provider_id == provider_id && b.status == BookingStatus::Completed
            })
            .filter_map(|b| {
                b.rating.map(|rating| ReviewSample {
                    rating,
                    text: b.review.clone().unwrap_or_default(),
                })
            })
            .collect()
    }

    // Trust

    pub async fn get_or_create_trust(&self, actor: ActorId) -> TrustRecord {
        let mut trust = self.trust.write().await;
        trust
            .entry(actor)
            .or_insert_with(|| TrustRecord::new(actor))
            .clone()
    }

    pub async fn get_trust(&self, actor: ActorId) -> Option<TrustRecord> {
        self.trust.read().await.get(&actor).cloned()
    }

    pub async fn save_trust(&self, record: TrustRecord) {
        self.trust.write().await.insert(record.actor, record);
    }

    // Fraud alerts

    pub async fn insert_alert(&self, alert: FraudAlert) {
        self.alerts.write().await.insert(alert.id, alert);
    }

    /// Pending alerts, most recent first.
    pub async fn pending_alerts(&self) -> Vec<FraudAlert> {
        let alerts = self.alerts.read().await;
        let mut pending: Vec<FraudAlert> = alerts
            .values()
            .filter(|a| a.is_pending())
            .cloned()
            .collect();
        pending.sort_by(|a, b| b.flagged_at.cmp(&a.flagged_at));
        pending
    }

    pub async fn resolve_alert(&self, id: Uuid) -> Option<FraudAlert> {
        let mut alerts = self.alerts.write().await;
        let alert = alerts.get_mut(&id)?;
        alert.resolve();
        Some(alert.clone())
    }

    // Global model snapshots

    /// Persist a new global-model snapshot and make it the single active one.
    pub async fn insert_global_model(
        &self,
        version: u64,
        weights: Vec<f64>,
        updates_aggregated: usize,
    ) -> GlobalModelRecord {
        let mut models = self.global_models.write().await;
        for model in models.iter_mut() {
            model.is_active = false;
        }
        let record = GlobalModelRecord {
            version,
            weights,
            updates_aggregated,
            created_at: Utc::now(),
            is_active: true,
        };
        models.push(record.clone());
        record
    }

    pub async fn active_global_model(&self) -> Option<GlobalModelRecord> {
        self.global_models
            .read()
            .await
            .iter()
            .find(|m| m.is_active)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store_with_booking() -> (MarketStore, Booking) {
        let store = MarketStore::new();
        let customer = store.create_customer("Asha").await;
        let provider = store.create_provider("Dev", "General Plumbing", 55.0).await;
        let booking = Booking::new(
            customer.id,
            provider.id,
            "Drain cleaning".to_string(),
            Utc::now() + chrono::Duration::days(1),
            90.0,
        );
        store.insert_booking(booking.clone()).await;
        (store, booking)
    }

    #[tokio::test]
    async fn test_actor_registration_seeds_trust() {
        let store = MarketStore::new();
        let customer = store.create_customer("Asha").await;

        let trust = store.get_trust(ActorId::Customer(customer.id)).await.unwrap();
        assert_eq!(trust.overall_score, 50.0);
        assert_eq!(trust.dispute_count, 0);
    }

    #[tokio::test]
    async fn test_transition_reports_previous_status() {
        let (store, booking) = store_with_booking().await;

        let (previous, updated) = store
            .transition_booking(booking.id, BookingStatus::Accepted)
            .await
            .unwrap();
        assert_eq!(previous, BookingStatus::Pending);
        assert_eq!(updated.status, BookingStatus::Accepted);
    }

    #[tokio::test]
    async fn test_review_requires_completed_booking() {
        let (store, booking) = store_with_booking().await;

        let err = store
            .record_review(booking.id, 5, None)
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::NotReviewable { .. }));
    }

    #[tokio::test]
    async fn test_double_review_rejected() {
        let (store, booking) = store_with_booking().await;
        store
            .transition_booking(booking.id, BookingStatus::Accepted)
            .await
            .unwrap();
        store
            .transition_booking(booking.id, BookingStatus::Completed)
            .await
            .unwrap();

        store
            .record_review(booking.id, 4, Some("Quick and tidy work".to_string()))
            .await
            .unwrap();
        let err = store.record_review(booking.id, 5, None).await.unwrap_err();
        assert!(matches!(err, BookingError::AlreadyReviewed { .. }));
    }

    #[tokio::test]
    async fn test_rating_range_validated() {
        let (store, booking) = store_with_booking().await;
        for bad in [0u8, 6] {
            let err = store.record_review(booking.id, bad, None).await.unwrap_err();
            assert!(matches!(err, BookingError::InvalidRating { .. }));
        }
    }

    #[tokio::test]
    async fn test_cancellation_rate_aggregates() {
        let (store, booking) = store_with_booking().await;
        store
            .cancel_booking(booking.id, CancelledBy::Customer)
            .await
            .unwrap();

        let stats = store.customer_stats(booking.customer_id).await;
        assert_eq!(stats.total_bookings, 1);
        assert_eq!(stats.cancelled_bookings, 1);
        assert_eq!(stats.cancellation_rate(), 1.0);
    }

    #[tokio::test]
    async fn test_provider_rejection_not_counted_against_customer() {
        let (store, booking) = store_with_booking().await;
        store
            .cancel_booking(booking.id, CancelledBy::Provider)
            .await
            .unwrap();

        let customer = store.customer_stats(booking.customer_id).await;
        assert_eq!(customer.total_bookings, 1);
        assert_eq!(customer.cancelled_bookings, 0);
        assert_eq!(customer.cancellation_rate(), 0.0);

        // The termination still lands in the provider's history.
        let provider = store.provider_stats(booking.provider_id).await;
        assert_eq!(provider.cancelled_bookings, 1);
    }

    #[tokio::test]
    async fn test_single_active_global_model() {
        let store = MarketStore::new();
        store.insert_global_model(2, vec![0.1], 3).await;
        store.insert_global_model(3, vec![0.2], 4).await;

        let active = store.active_global_model().await.unwrap();
        assert_eq!(active.version, 3);
    }
}
