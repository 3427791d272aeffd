//! Federated learning simulation (FedAvg).
//!
//! Independent of the per-event risk pipeline: driven by its own
//! submit/aggregate cycle against a shared global model.

mod orchestrator;

pub use orchestrator::{
    AggregationOutcome, FederatedError, FederatedOrchestrator, GlobalModelSnapshot,
    LocalTrainingResult, LocalUpdate, OrchestratorStats, MIN_UPDATES_FOR_AGGREGATION,
};
