//! Fraud Detection Engine
//!
//! Screens booking feature vectors for anomalous patterns. Detection is
//! never fatal to the caller: every failure path inside the scorer degrades
//! to a safe no-fraud result.

mod detector;
mod features;
mod forest;

pub use detector::{
    Detection, FraudDetector, FraudType, MetricsReport, ModelMetrics, MIN_TRAINING_SAMPLES,
};
pub use features::{BookingFeatures, FEATURE_DIM};
pub use forest::{IsolationForest, Standardizer};

use thiserror::Error;

/// Failures from training, scoring and model persistence. Validation
/// failures never mutate detector state.
#[derive(Debug, Error)]
pub enum FraudError {
    #[error("training requires at least {need} samples, got {got}")]
    InsufficientSamples { got: usize, need: usize },

    #[error("feature vector has {got} dimensions, expected {expected}")]
    DimensionMismatch { got: usize, expected: usize },

    #[error("model serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("model artifact I/O failed: {0}")]
    Io(#[from] std::io::Error),
}
