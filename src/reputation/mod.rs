//! Reputation subsystem: trust scoring, fraud alerts and the lifecycle
//! coordinator that keeps them in sync with marketplace events.

mod alerts;
mod coordinator;
mod trust;

pub use alerts::{AlertStatus, AlertType, FraudAlert};
pub use coordinator::{CancelOutcome, NewBooking, RejectOutcome, RiskCoordinator};
pub use trust::{
    ActorId, ReviewSample, TrustLevel, TrustMetrics, TrustRecord, TrustResult, TrustScorer,
};
