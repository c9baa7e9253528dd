//! Proximity-based sample weighting and dataset filtering
//!
//! Samples close to the original input dominate the surrogate fit; distant
//! perturbations contribute little or are dropped entirely.

use ndarray::Array1;
use tracing::trace;

use crate::lime::encoding::EncodedSample;
use crate::model::Feature;

/// Exponential-kernel sample weights against the all-original reference.
///
/// Every encoded column expresses similarity to the original input, so the
/// unperturbed original is the all-ones vector: rows identical to it get
/// weight 1, distant perturbations decay toward 0.
pub fn sample_weights(
    no_of_features: usize,
    training_set: &[EncodedSample],
    kernel_width: f64,
) -> Vec<f64> {
    let reference = Array1::from_elem(no_of_features, 1.0);
    training_set
        .iter()
        .map(|sample| {
            let distance = (&reference - &sample.vector)
                .mapv(|d| d * d)
                .sum()
                .sqrt();
            (-(distance * distance) / (kernel_width * kernel_width)).exp()
        })
        .collect()
}

/// Min-max scale a weight vector to [0, 1]. A no-op when all weights are
/// equal, and idempotent: scaling an already scaled vector changes nothing.
pub fn normalize_weights(weights: &mut [f64]) {
    let max = weights.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = weights.iter().copied().fold(f64::INFINITY, f64::min);
    if max != min {
        for weight in weights.iter_mut() {
            *weight = (*weight - min) / (max - min);
        }
    }
}

/// Down-weights the post-fit contribution of features whose encoded column
/// is overwhelmingly one value. A feature that almost never (or almost
/// always) activates across the neighborhood can pick up a large fitted
/// weight from a handful of rows; its multiplier is shrunk in proportion to
/// how rare the minority activation is.
#[derive(Debug, Clone)]
pub struct SparseFeatureBalanceFilter {
    sparsity_threshold: f64,
}

impl Default for SparseFeatureBalanceFilter {
    fn default() -> Self {
        Self {
            sparsity_threshold: 0.1,
        }
    }
}

impl SparseFeatureBalanceFilter {
    pub fn new(sparsity_threshold: f64) -> Self {
        Self { sparsity_threshold }
    }

    /// Scale `feature_weights` in place, one multiplier per target feature
    pub fn apply(
        &self,
        feature_weights: &mut [f64],
        features: &[Feature],
        training_set: &[EncodedSample],
    ) {
        if training_set.is_empty() {
            return;
        }
        let rows = training_set.len() as f64;
        for (j, feature_weight) in feature_weights.iter_mut().enumerate() {
            let active = training_set
                .iter()
                .filter(|sample| sample.vector[j] != 0.0)
                .count() as f64;
            let fraction = active / rows;
            let minority = fraction.min(1.0 - fraction);
            if minority < self.sparsity_threshold {
                *feature_weight *= minority / self.sparsity_threshold;
                if let Some(feature) = features.get(j) {
                    trace!(
                        "sparse balance penalty on '{}' (minority fraction {})",
                        feature.name,
                        minority
                    );
                }
            }
        }
    }
}

/// Drops rows whose sample weight falls below a proximity threshold, but
/// never reduces the retained row count below a configured minimum; when the
/// threshold would cut too deep, the highest-weighted rows are kept instead.
#[derive(Debug, Clone)]
pub struct ProximityFilter {
    threshold: f64,
    dataset_minimum: usize,
}

impl ProximityFilter {
    pub fn new(threshold: f64, dataset_minimum: usize) -> Self {
        Self {
            threshold,
            dataset_minimum,
        }
    }

    /// Filter the training set and its weights in place, preserving row
    /// order
    pub fn apply(&self, training_set: &mut Vec<EncodedSample>, sample_weights: &mut Vec<f64>) {
        let rows = training_set.len();
        if rows == 0 {
            return;
        }
        let mut keep: Vec<usize> = (0..rows)
            .filter(|&i| sample_weights[i] >= self.threshold)
            .collect();

        if keep.len() < self.dataset_minimum.min(rows) {
            let mut by_weight: Vec<usize> = (0..rows).collect();
            by_weight.sort_by(|&a, &b| {
                sample_weights[b]
                    .partial_cmp(&sample_weights[a])
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            keep = by_weight
                .into_iter()
                .take(self.dataset_minimum.min(rows))
                .collect();
            keep.sort_unstable();
        }

        *training_set = keep.iter().map(|&i| training_set[i].clone()).collect();
        *sample_weights = keep.iter().map(|&i| sample_weights[i]).collect();
    }
}
