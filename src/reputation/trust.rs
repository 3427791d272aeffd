//! Trust Scoring
//!
//! A composite trust score is derived from behavioral metrics on every
//! relevant lifecycle event. The score is a weighted linear combination of
//! positive signals (completion rate, review authenticity, responsiveness)
//! minus capped penalties (disputes, anomaly history), clamped to [0, 100].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Scoring weights. Penalty weights are applied subtractively.
const COMPLETION_WEIGHT: f64 = 0.30;
const REVIEW_WEIGHT: f64 = 0.25;
const RESPONSE_TIME_WEIGHT: f64 = 0.20;
const DISPUTE_WEIGHT: f64 = 0.15;
const ANOMALY_WEIGHT: f64 = 0.10;

/// Each dispute costs 10 points, capped at 50.
const DISPUTE_POINTS: f64 = 10.0;
const DISPUTE_PENALTY_CAP: f64 = 50.0;

/// Anomaly score passes through directly, capped at 30.
const ANOMALY_PENALTY_CAP: f64 = 30.0;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// A trust-scored actor: trust rows belong to exactly one of a customer or
/// a provider (the mutually exclusive foreign-key pair in the store).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ActorId {
    Customer(Uuid),
    Provider(Uuid),
}

/// Metrics snapshot consumed by the scorer. Recomputed per event, never
/// persisted as-is (the accumulators live on [`TrustRecord`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustMetrics {
    /// Fraction of bookings completed, in [0, 1].
    pub completion_rate: f64,

    /// Estimated review authenticity, in [0, 100].
    pub review_authenticity: f64,

    /// Responsiveness score, in [0, 100].
    pub response_time_score: f64,

    /// Lifetime dispute count (monotonically non-decreasing).
    pub dispute_count: u32,

    /// Accumulated anomaly score, in [0, 100].
    pub anomaly_score: f64,
}

impl Default for TrustMetrics {
    fn default() -> Self {
        Self {
            completion_rate: 0.0,
            review_authenticity: 50.0,
            response_time_score: 50.0,
            dispute_count: 0,
            anomaly_score: 0.0,
        }
    }
}

/// Categorical trust band. Band lower bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrustLevel {
    Excellent,
    Good,
    Fair,
    Poor,
    VeryLow,
}

impl TrustLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            TrustLevel::Excellent
        } else if score >= 60.0 {
            TrustLevel::Good
        } else if score >= 40.0 {
            TrustLevel::Fair
        } else if score >= 20.0 {
            TrustLevel::Poor
        } else {
            TrustLevel::VeryLow
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrustLevel::Excellent => "Excellent",
            TrustLevel::Good => "Good",
            TrustLevel::Fair => "Fair",
            TrustLevel::Poor => "Poor",
            TrustLevel::VeryLow => "Very Low",
        }
    }
}

/// Scoring breakdown returned by [`TrustScorer::calculate_trust_score`].
/// Derived and ephemeral; only `overall_score` is persisted back onto the
/// actor's trust record.
#[derive(Debug, Clone, Serialize)]
pub struct TrustResult {
    pub overall_score: f64,
    pub completion_score: f64,
    pub review_authenticity: f64,
    pub response_time_score: f64,
    pub dispute_penalty: f64,
    pub anomaly_penalty: f64,
    pub trust_level: TrustLevel,
}

/// A single rated review used for authenticity estimation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewSample {
    pub rating: u8,
    pub text: String,
}

/// Pure trust scorer. Holds no mutable state; safe to share by value.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrustScorer;

impl TrustScorer {
    pub fn new() -> Self {
        Self
    }

    /// Compute the composite trust score for a metrics snapshot.
    ///
    /// Side-effect free. All inputs are defensively defaulted by the caller;
    /// the result is clamped to [0, 100] after every recomputation.
    pub fn calculate_trust_score(&self, metrics: &TrustMetrics) -> TrustResult {
        let completion_score = metrics.completion_rate * 100.0;
        let dispute_penalty = (f64::from(metrics.dispute_count) * DISPUTE_POINTS)
            .min(DISPUTE_PENALTY_CAP);
        let anomaly_penalty = metrics.anomaly_score.min(ANOMALY_PENALTY_CAP);

        let overall = completion_score * COMPLETION_WEIGHT
            + metrics.review_authenticity * REVIEW_WEIGHT
            + metrics.response_time_score * RESPONSE_TIME_WEIGHT
            - dispute_penalty * DISPUTE_WEIGHT
            - anomaly_penalty * ANOMALY_WEIGHT;
        let overall = overall.clamp(0.0, 100.0);

        TrustResult {
            overall_score: round2(overall),
            completion_score: round2(completion_score),
            review_authenticity: round2(metrics.review_authenticity),
            response_time_score: round2(metrics.response_time_score),
            dispute_penalty: round2(dispute_penalty),
            anomaly_penalty: round2(anomaly_penalty),
            trust_level: TrustLevel::from_score(overall),
        }
    }

    /// Completion rate as a fraction; 0.0 when the actor has no bookings.
    pub fn completion_rate(&self, total_bookings: u64, completed_bookings: u64) -> f64 {
        if total_bookings == 0 {
            return 0.0;
        }
        completed_bookings as f64 / total_bookings as f64
    }

    /// Heuristic review-authenticity estimate in [0, 100].
    ///
    /// Starts at a neutral 50 and rewards signals of organic feedback:
    /// a plausible mean rating with real variance (implausibly uniform
    /// five-star walls earn nothing), substantive review text, and volume.
    pub fn estimate_review_authenticity(&self, reviews: &[ReviewSample]) -> f64 {
        if reviews.is_empty() {
            return 50.0;
        }

        let n = reviews.len() as f64;
        let mean_rating = reviews.iter().map(|r| f64::from(r.rating)).sum::<f64>() / n;
        let variance = reviews
            .iter()
            .map(|r| {
                let d = f64::from(r.rating) - mean_rating;
                d * d
            })
            .sum::<f64>()
            / n;
        let mean_length = reviews
            .iter()
            .map(|r| r.text.chars().count() as f64)
            .sum::<f64>()
            / n;

        let mut authenticity: f64 = 50.0;

        if (2.0..=4.5).contains(&mean_rating) && variance > 0.1 {
            authenticity += 20.0;
        }
        if mean_length > 20.0 {
            authenticity += 15.0;
        }
        if reviews.len() > 5 {
            authenticity += 15.0;
        }

        authenticity.min(100.0)
    }

    /// Step-function responsiveness score. `None` means the signal is
    /// unavailable and scores a neutral 50.
    pub fn response_time_score(&self, avg_response_hours: Option<f64>) -> f64 {
        let Some(hours) = avg_response_hours else {
            return 50.0;
        };

        if hours <= 1.0 {
            100.0
        } else if hours <= 6.0 {
            80.0
        } else if hours <= 24.0 {
            60.0
        } else if hours <= 48.0 {
            40.0
        } else {
            20.0
        }
    }
}

/// Persisted trust state for one actor. Mutated only by the coordinator in
/// response to lifecycle events; never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustRecord {
    pub actor: ActorId,

    /// Last computed composite score, in [0, 100].
    pub overall_score: f64,

    /// Completion rate stored as a percentage, in [0, 100].
    pub completion_rate: f64,

    pub review_authenticity: f64,
    pub response_time_score: f64,
    pub dispute_count: u32,
    pub anomaly_score: f64,
    pub total_transactions: u32,
    pub updated_at: DateTime<Utc>,
}

impl TrustRecord {
    pub fn new(actor: ActorId) -> Self {
        Self {
            actor,
            overall_score: 50.0,
            completion_rate: 0.0,
            review_authenticity: 50.0,
            response_time_score: 50.0,
            dispute_count: 0,
            anomaly_score: 0.0,
            total_transactions: 0,
            updated_at: Utc::now(),
        }
    }

    /// Metrics snapshot for the scorer. The stored completion rate is a
    /// percentage; the scorer expects a fraction.
    pub fn metrics(&self) -> TrustMetrics {
        TrustMetrics {
            completion_rate: self.completion_rate / 100.0,
            review_authenticity: self.review_authenticity,
            response_time_score: self.response_time_score,
            dispute_count: self.dispute_count,
            anomaly_score: self.anomaly_score,
        }
    }
}
