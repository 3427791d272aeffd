//! Marketguard
//!
//! Risk and reputation subsystem for a services marketplace: composite trust
//! scoring, rule-based and anomaly-model fraud detection on booking events,
//! and a federated-learning simulation for collaborative model improvement.
//!
//! ## Module Structure
//!
//! ```text
//! src/
//! ├── lib.rs         - Crate root with re-exports
//! ├── main.rs        - Server entrypoint
//! ├── config.rs      - Configuration management
//! ├── reputation/    - Trust scoring & lifecycle coordination
//! │   ├── trust.rs       - Composite trust scorer & records
//! │   ├── alerts.rs      - Fraud alert records
//! │   └── coordinator.rs - Booking-event risk coordinator
//! ├── fraud/         - Fraud detection engine
//! │   ├── features.rs - Booking feature vectors
//! │   ├── forest.rs   - Isolation forest & standardizer
//! │   └── detector.rs - Rule-based / trained detector
//! ├── federated/     - Federated learning simulation
//! │   └── orchestrator.rs - FedAvg round orchestration
//! ├── marketplace/   - Bookings, actors and the in-memory store
//! │   ├── booking.rs - Booking lifecycle state machine
//! │   └── store.rs   - Shared in-memory tables
//! └── api/           - HTTP API endpoints
//!     ├── bookings.rs  - Actors & booking lifecycle
//!     ├── trust.rs     - Trust lookups
//!     ├── fraud.rs     - Detection, training, alerts
//!     └── federated.rs - Update submission & aggregation
//! ```

pub mod api;
pub mod config;
pub mod federated;
pub mod fraud;
pub mod marketplace;
pub mod reputation;

// Re-export main types for convenience
pub use config::AppConfig;

pub use fraud::{
    BookingFeatures, Detection, FraudDetector, FraudError, FraudType, IsolationForest,
    MetricsReport, ModelMetrics, Standardizer, FEATURE_DIM, MIN_TRAINING_SAMPLES,
};

pub use federated::{
    AggregationOutcome, FederatedError, FederatedOrchestrator, GlobalModelSnapshot,
    LocalTrainingResult, LocalUpdate, OrchestratorStats, MIN_UPDATES_FOR_AGGREGATION,
};

pub use marketplace::{
    ActorStats, Booking, BookingError, BookingStatus, CancelledBy, CustomerRecord,
    GlobalModelRecord, MarketStore, ProviderRecord,
};

pub use reputation::{
    ActorId, AlertStatus, AlertType, CancelOutcome, FraudAlert, NewBooking, RejectOutcome,
    ReviewSample, RiskCoordinator, TrustLevel, TrustMetrics, TrustRecord, TrustResult,
    TrustScorer,
};

// Re-export API types
pub use api::{
    create_federated_router, create_fraud_router, create_marketplace_router,
    create_trust_router, FederatedApiState, FraudApiState, MarketplaceApiState, TrustApiState,
};
