//! Federated Aggregation Orchestrator
//!
//! Simulates round-based federated learning: clients submit locally trained
//! weight vectors tagged with their sample counts, and once enough updates
//! have buffered an administrator triggers FedAvg aggregation. Weighting by
//! sample count lets clients with more local data proportionally influence
//! the global model; the round threshold keeps a single client from
//! dominating it.
//!
//! All shared state lives behind one lock: submissions append under a write
//! guard, and aggregation reads, clears and bumps the version under the same
//! guard, so an update either lands wholly in the current round or wholly in
//! the next — never split, never counted twice.

use chrono::{DateTime, Utc};
use rand::distributions::Distribution;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Updates required before a round may aggregate.
pub const MIN_UPDATES_FOR_AGGREGATION: usize = 3;

/// Magnitude of the initial random weight draw.
const INIT_SCALE: f64 = 0.01;

/// Magnitude of the stand-in stochastic gradient used by the client-side
/// training simulation.
const NOISE_GRADIENT_SCALE: f64 = 0.1;

/// One client's buffered model update. Lives in the pending buffer until
/// aggregated or discarded.
#[derive(Debug, Clone, Serialize)]
pub struct LocalUpdate {
    pub client_id: String,
    pub weights: Vec<f64>,
    pub num_samples: u64,
    /// Global model version at submission time.
    pub model_version: u64,
    pub submitted_at: DateTime<Utc>,
}

/// Snapshot of the global model for clients.
#[derive(Debug, Clone, Serialize)]
pub struct GlobalModelSnapshot {
    pub version: u64,
    pub weights: Vec<f64>,
    pub timestamp: DateTime<Utc>,
    pub pending_updates: usize,
}

/// Result of a successful aggregation round.
#[derive(Debug, Clone, Serialize)]
pub struct AggregationOutcome {
    pub new_version: u64,
    pub updates_aggregated: usize,
    pub total_samples: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrchestratorStats {
    pub global_model_version: u64,
    pub pending_updates: usize,
    pub min_updates_needed: usize,
    pub can_aggregate: bool,
}

/// Output of the client-side training simulation.
#[derive(Debug, Clone, Serialize)]
pub struct LocalTrainingResult {
    pub local_weights: Vec<f64>,
    pub num_samples: u64,
    pub training_loss: f64,
}

/// Typed submission and aggregation failures. No variant mutates
/// orchestrator state.
#[derive(Debug, Error)]
pub enum FederatedError {
    #[error("need at least {need} updates to aggregate, have {have}")]
    InsufficientUpdates { have: usize, need: usize },

    #[error("total sample count across pending updates is zero")]
    ZeroTotalSamples,

    #[error("update has {got} weights, global model expects {expected}")]
    WeightDimensionMismatch { got: usize, expected: usize },
}

#[derive(Debug)]
struct ModelState {
    version: u64,
    weights: Option<Vec<f64>>,
    pending: Vec<LocalUpdate>,
}

#[derive(Debug)]
pub struct FederatedOrchestrator {
    /// Dimensionality used when the model is first touched uninitialized.
    default_dim: usize,
    state: RwLock<ModelState>,
}

impl FederatedOrchestrator {
    pub fn new(default_dim: usize) -> Self {
        Self {
            default_dim,
            state: RwLock::new(ModelState {
                version: 1,
                weights: None,
                pending: Vec::new(),
            }),
        }
    }

    /// (Re)seed the global weights with a fresh small-magnitude random draw.
    /// Every call produces a new draw; callers needing stability must cache
    /// the returned vector.
    pub async fn initialize_global_model(&self, dim: usize) -> Vec<f64> {
        let weights = random_weights(dim, INIT_SCALE);
        let mut state = self.state.write().await;
        state.weights = Some(weights.clone());
        info!(dim, version = state.version, "global model initialized");
        weights
    }

    /// Buffer a client update tagged with the current global version.
    /// Multiple updates from the same client are all retained and counted.
    /// The weight vector must match the global model's dimensionality;
    /// mismatched updates are rejected without touching the buffer.
    pub async fn receive_local_update(
        &self,
        client_id: &str,
        weights: Vec<f64>,
        num_samples: u64,
    ) -> Result<usize, FederatedError> {
        let mut state = self.state.write().await;

        let expected = state
            .weights
            .as_ref()
            .map(|w| w.len())
            .unwrap_or(self.default_dim);
        if weights.len() != expected {
            return Err(FederatedError::WeightDimensionMismatch {
                got: weights.len(),
                expected,
            });
        }

        let update = LocalUpdate {
            client_id: client_id.to_string(),
            weights,
            num_samples,
            model_version: state.version,
            submitted_at: Utc::now(),
        };
        state.pending.push(update);

        debug!(
            client_id = %client_id,
            num_samples,
            pending = state.pending.len(),
            "buffered local update"
        );
        Ok(state.pending.len())
    }

    /// FedAvg over the pending buffer: each update contributes
    /// `num_samples / total_samples` of its weight vector. On success the
    /// buffer is cleared and the version bumped by exactly one, atomically.
    pub async fn aggregate_updates(&self) -> Result<AggregationOutcome, FederatedError> {
        let mut state = self.state.write().await;

        if state.pending.len() < MIN_UPDATES_FOR_AGGREGATION {
            return Err(FederatedError::InsufficientUpdates {
                have: state.pending.len(),
                need: MIN_UPDATES_FOR_AGGREGATION,
            });
        }

        let total_samples: u64 = state.pending.iter().map(|u| u.num_samples).sum();
        if total_samples == 0 {
            return Err(FederatedError::ZeroTotalSamples);
        }

        let dim = state
            .weights
            .as_ref()
            .map(|w| w.len())
            .unwrap_or_else(|| state.pending[0].weights.len());

        // Submission already checks dimensions, but a re-seed between
        // buffering and aggregation can still change the model shape.
        for update in &state.pending {
            if update.weights.len() != dim {
                return Err(FederatedError::WeightDimensionMismatch {
                    got: update.weights.len(),
                    expected: dim,
                });
            }
        }

        let mut new_weights = vec![0.0; dim];
        for update in &state.pending {
            let share = update.num_samples as f64 / total_samples as f64;
            for (acc, w) in new_weights.iter_mut().zip(&update.weights) {
                *acc += share * w;
            }
        }

        let updates_aggregated = state.pending.len();
        state.weights = Some(new_weights);
        state.version += 1;
        state.pending.clear();

        info!(
            new_version = state.version,
            updates_aggregated, total_samples, "aggregated federated updates"
        );
        Ok(AggregationOutcome {
            new_version: state.version,
            updates_aggregated,
            total_samples,
        })
    }

    /// Current model snapshot, lazily initializing the weights if the model
    /// was never explicitly seeded.
    pub async fn get_global_model(&self) -> GlobalModelSnapshot {
        let mut state = self.state.write().await;
        if state.weights.is_none() {
            state.weights = Some(random_weights(self.default_dim, INIT_SCALE));
        }

        GlobalModelSnapshot {
            version: state.version,
            weights: state.weights.clone().unwrap_or_default(),
            timestamp: Utc::now(),
            pending_updates: state.pending.len(),
        }
    }

    /// Simulate client-side training: copy the global weights and apply
    /// `epochs` noise-gradient steps. This models a client update without
    /// real data-dependent loss; it is explicitly a simulation.
    pub async fn simulate_local_training(
        &self,
        num_samples: u64,
        epochs: u32,
        learning_rate: f64,
    ) -> LocalTrainingResult {
        let mut local_weights = {
            let mut state = self.state.write().await;
            if state.weights.is_none() {
                state.weights = Some(random_weights(self.default_dim, INIT_SCALE));
            }
            state.weights.clone().unwrap_or_default()
        };

        let mut rng = rand::thread_rng();
        for _ in 0..epochs {
            for w in &mut local_weights {
                let draw: f64 = StandardNormal.sample(&mut rng);
                *w -= learning_rate * draw * NOISE_GRADIENT_SCALE;
            }
        }

        LocalTrainingResult {
            local_weights,
            num_samples,
            training_loss: rng.gen_range(0.1..0.5),
        }
    }

    pub async fn get_stats(&self) -> OrchestratorStats {
        let state = self.state.read().await;
        OrchestratorStats {
            global_model_version: state.version,
            pending_updates: state.pending.len(),
            min_updates_needed: MIN_UPDATES_FOR_AGGREGATION,
            can_aggregate: state.pending.len() >= MIN_UPDATES_FOR_AGGREGATION,
        }
    }
}

fn random_weights(dim: usize, scale: f64) -> Vec<f64> {
    let mut rng = rand::thread_rng();
    (0..dim)
        .map(|_| {
            let draw: f64 = StandardNormal.sample(&mut rng);
            draw * scale
        })
        .collect()
}
