//! Anomaly scoring model
//!
//! A standardizer plus an isolation forest: anomalous points sit in sparse
//! regions of feature space and are isolated by fewer random splits, so a
//! short average path length across the ensemble means a high anomaly score.
//! Both structures are serializable so a fitted model can be persisted and
//! reloaded as a side channel.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::FraudError;

/// Euler-Mascheroni constant, used in the average-path-length normalizer.
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Per-tree subsample ceiling.
const MAX_SUBSAMPLE: usize = 256;

/// Zero-mean, unit-variance feature standardizer. Parameters are fixed at
/// fit time and applied unchanged to every subsequent input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Standardizer {
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl Standardizer {
    pub fn fit(data: &[Vec<f64>]) -> Result<Self, FraudError> {
        let dim = check_uniform_dims(data)?;
        let n = data.len() as f64;

        let mut means = vec![0.0; dim];
        for row in data {
            for (mean, value) in means.iter_mut().zip(row) {
                *mean += value;
            }
        }
        for mean in &mut means {
            *mean /= n;
        }

        let mut stds = vec![0.0; dim];
        for row in data {
            for ((std, value), mean) in stds.iter_mut().zip(row).zip(&means) {
                let d = value - mean;
                *std += d * d;
            }
        }
        for std in &mut stds {
            *std = (*std / n).sqrt();
            // Constant features pass through unscaled.
            if *std < 1e-12 {
                *std = 1.0;
            }
        }

        Ok(Self { means, stds })
    }

    pub fn transform(&self, x: &[f64]) -> Result<Vec<f64>, FraudError> {
        if x.len() != self.means.len() {
            return Err(FraudError::DimensionMismatch {
                got: x.len(),
                expected: self.means.len(),
            });
        }
        Ok(x.iter()
            .zip(&self.means)
            .zip(&self.stds)
            .map(|((value, mean), std)| (value - mean) / std)
            .collect())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum IsoNode {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<IsoNode>,
        right: Box<IsoNode>,
    },
}

/// Isolation forest fitted on standardized features.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationForest {
    trees: Vec<IsoNode>,
    dim: usize,
    subsample: usize,
    /// Anomaly-score cutoff for the binary outlier flag, fixed at fit time
    /// from the contamination quantile of the training scores.
    score_threshold: f64,
}

impl IsolationForest {
    /// Fit `n_trees` isolation trees and derive the outlier threshold so
    /// that roughly `contamination` of the training data is flagged.
    pub fn fit<R: Rng>(
        data: &[Vec<f64>],
        n_trees: usize,
        contamination: f64,
        rng: &mut R,
    ) -> Result<Self, FraudError> {
        let dim = check_uniform_dims(data)?;
        let subsample = data.len().min(MAX_SUBSAMPLE);
        let max_depth = (subsample as f64).log2().ceil().max(1.0) as usize;

        let mut indices: Vec<usize> = (0..data.len()).collect();
        let mut trees = Vec::with_capacity(n_trees);
        for _ in 0..n_trees {
            indices.shuffle(rng);
            let sample = &indices[..subsample];
            trees.push(build_tree(data, sample, 0, max_depth, rng));
        }

        let mut forest = Self {
            trees,
            dim,
            subsample,
            score_threshold: f64::MAX,
        };

        // Contamination quantile over the training scores.
        let mut scores: Vec<f64> = data
            .iter()
            .map(|row| forest.raw_score(row))
            .collect();
        scores.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
        let flagged = ((contamination * data.len() as f64).floor() as usize).max(1);
        forest.score_threshold = scores[flagged.min(scores.len()) - 1];

        Ok(forest)
    }

    /// Continuous anomaly score in (0, 1]; higher means more anomalous.
    pub fn anomaly_score(&self, x: &[f64]) -> Result<f64, FraudError> {
        if x.len() != self.dim {
            return Err(FraudError::DimensionMismatch {
                got: x.len(),
                expected: self.dim,
            });
        }
        Ok(self.raw_score(x))
    }

    /// Binary outlier flag against the fit-time threshold.
    pub fn is_outlier(&self, x: &[f64]) -> Result<bool, FraudError> {
        Ok(self.anomaly_score(x)? >= self.score_threshold)
    }

    fn raw_score(&self, x: &[f64]) -> f64 {
        let mean_path: f64 = self
            .trees
            .iter()
            .map(|tree| path_length(tree, x, 0.0))
            .sum::<f64>()
            / self.trees.len() as f64;
        2f64.powf(-mean_path / average_path_length(self.subsample))
    }
}

fn check_uniform_dims(data: &[Vec<f64>]) -> Result<usize, FraudError> {
    let Some(first) = data.first() else {
        return Err(FraudError::InsufficientSamples { got: 0, need: 1 });
    };
    let dim = first.len();
    for row in data {
        if row.len() != dim {
            return Err(FraudError::DimensionMismatch {
                got: row.len(),
                expected: dim,
            });
        }
    }
    Ok(dim)
}

fn build_tree<R: Rng>(
    data: &[Vec<f64>],
    sample: &[usize],
    depth: usize,
    max_depth: usize,
    rng: &mut R,
) -> IsoNode {
    if sample.len() <= 1 || depth >= max_depth {
        return IsoNode::Leaf { size: sample.len() };
    }

    let dim = data[sample[0]].len();
    let mut features: Vec<usize> = (0..dim).collect();
    features.shuffle(rng);

    // First feature with any spread in this sample; all-constant samples
    // cannot be split further.
    for &feature in &features {
        let (min, max) = sample.iter().fold((f64::MAX, f64::MIN), |(lo, hi), &i| {
            let v = data[i][feature];
            (lo.min(v), hi.max(v))
        });
        if max <= min {
            continue;
        }

        let threshold = rng.gen_range(min..max);
        let (left, right): (Vec<usize>, Vec<usize>) = sample
            .iter()
            .partition(|&&i| data[i][feature] < threshold);

        return IsoNode::Split {
            feature,
            threshold,
            left: Box::new(build_tree(data, &left, depth + 1, max_depth, rng)),
            right: Box::new(build_tree(data, &right, depth + 1, max_depth, rng)),
        };
    }

    IsoNode::Leaf { size: sample.len() }
}

fn path_length(node: &IsoNode, x: &[f64], depth: f64) -> f64 {
    match node {
        IsoNode::Leaf { size } => depth + average_path_length(*size),
        IsoNode::Split {
            feature,
            threshold,
            left,
            right,
        } => {
            if x[*feature] < *threshold {
                path_length(left, x, depth + 1.0)
            } else {
                path_length(right, x, depth + 1.0)
            }
        }
    }
}

/// Expected path length of an unsuccessful BST search over `n` points,
/// the standard isolation-forest normalizer.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn clustered_data() -> Vec<Vec<f64>> {
        // Tight cluster near the origin plus one far outlier.
        let mut data: Vec<Vec<f64>> = (0..60)
            .map(|i| {
                let jitter = (i % 7) as f64 * 0.01;
                vec![jitter, 1.0 - jitter, jitter * 2.0]
            })
            .collect();
        data.push(vec![25.0, -25.0, 30.0]);
        data
    }

    #[test]
    fn test_standardizer_zero_mean() {
        let data = vec![vec![1.0, 10.0], vec![3.0, 30.0], vec![5.0, 50.0]];
        let scaler = Standardizer::fit(&data).unwrap();

        let transformed = scaler.transform(&[3.0, 30.0]).unwrap();
        assert!(transformed[0].abs() < 1e-9);
        assert!(transformed[1].abs() < 1e-9);
    }

    #[test]
    fn test_standardizer_rejects_wrong_dim() {
        let data = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        let scaler = Standardizer::fit(&data).unwrap();
        assert!(matches!(
            scaler.transform(&[1.0]),
            Err(FraudError::DimensionMismatch { got: 1, expected: 2 })
        ));
    }

    #[test]
    fn test_outlier_scores_higher_than_inliers() {
        let data = clustered_data();
        let mut rng = StdRng::seed_from_u64(42);
        let forest = IsolationForest::fit(&data, 100, 0.1, &mut rng).unwrap();

        let inlier_score = forest.anomaly_score(&data[0]).unwrap();
        let outlier_score = forest.anomaly_score(data.last().unwrap()).unwrap();

        assert!(outlier_score > inlier_score);
        assert!(outlier_score > 0.0 && outlier_score <= 1.0);
        assert!(forest.is_outlier(data.last().unwrap()).unwrap());
    }

    #[test]
    fn test_forest_round_trips_through_json() {
        let data = clustered_data();
        let mut rng = StdRng::seed_from_u64(42);
        let forest = IsolationForest::fit(&data, 25, 0.1, &mut rng).unwrap();

        let json = serde_json::to_string(&forest).unwrap();
        let restored: IsolationForest = serde_json::from_str(&json).unwrap();

        let point = data.last().unwrap();
        assert_eq!(
            forest.anomaly_score(point).unwrap(),
            restored.anomaly_score(point).unwrap()
        );
    }
}
