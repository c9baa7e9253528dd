//! Configuration for LIME explanations

use serde::{Deserialize, Serialize};

use crate::model::{DataDistribution, PerturbationContext};

/// Parameters of the deterministic numeric encoding scheme
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodingParams {
    /// Width of the Gaussian similarity kernel used to cluster scaled
    /// numeric values around the original value
    pub numeric_cluster_filter_width: f64,
    /// Minimum Gaussian similarity for a numeric value to be encoded as
    /// belonging to the original value's cluster
    pub numeric_cluster_threshold: f64,
}

impl Default for EncodingParams {
    fn default() -> Self {
        Self {
            numeric_cluster_filter_width: 0.07,
            numeric_cluster_threshold: 0.07,
        }
    }
}

impl EncodingParams {
    pub fn new(numeric_cluster_filter_width: f64, numeric_cluster_threshold: f64) -> Self {
        Self {
            numeric_cluster_filter_width,
            numeric_cluster_threshold,
        }
    }
}

/// Configuration for one explanation call.
///
/// Value type: the explainer clones its template config at call start and
/// clones again along the retry chain, so concurrent calls never share
/// mutable state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimeConfig {
    /// Number of synthetic samples per attempt; 0 derives 2^|features|
    pub no_of_samples: usize,
    /// Adaptive retry budget on non-separable datasets
    pub no_of_retries: usize,
    /// Target feature count for feature selection
    pub no_of_features: usize,
    /// Whether to reduce the feature set before the final fit
    pub feature_selection: bool,
    /// Base width of the proximity kernel, scaled by sqrt(|features|)
    pub proximity_kernel_width: f64,
    /// Whether to drop samples too distant from the original input
    pub proximity_filter: bool,
    /// Minimum sample weight retained by the proximity filter
    pub proximity_threshold: f64,
    /// Row-count floor enforced by the proximity filter
    pub proximity_filtered_dataset_minimum: usize,
    /// Whether to penalize features with highly imbalanced encoded columns
    pub penalize_balance_sparse: bool,
    /// Whether to min-max scale fitted weights to [0, 1]
    pub normalize_weights: bool,
    /// Majority-class ratio above which a dataset is considered
    /// non-separable
    pub separable_dataset_ratio: f64,
    /// Whether retry attempts grow the perturbation size and sample count
    pub adapt_dataset_variance: bool,
    /// Perturbation randomness and size parameters
    pub perturbation_context: PerturbationContext,
    /// Numeric encoding parameters
    pub encoding_params: EncodingParams,
    /// Optional empirical feature distributions to sample perturbations from
    pub data_distribution: DataDistribution,
    /// Whether to bias sampling toward high-score numeric feature zones
    pub high_score_feature_zones: bool,
    /// Cap on the number of bootstrap inputs used to derive distributions
    /// and high-score zones
    pub bootstrap_inputs: usize,
}

impl Default for LimeConfig {
    fn default() -> Self {
        Self {
            no_of_samples: 300,
            no_of_retries: 3,
            no_of_features: 6,
            feature_selection: true,
            proximity_kernel_width: 0.5,
            proximity_filter: true,
            proximity_threshold: 0.83,
            proximity_filtered_dataset_minimum: 10,
            penalize_balance_sparse: true,
            normalize_weights: false,
            separable_dataset_ratio: 0.99,
            adapt_dataset_variance: true,
            perturbation_context: PerturbationContext::default(),
            encoding_params: EncodingParams::default(),
            data_distribution: DataDistribution::empty(),
            high_score_feature_zones: true,
            bootstrap_inputs: 50,
        }
    }
}

impl LimeConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of synthetic samples per attempt
    pub fn with_samples(mut self, no_of_samples: usize) -> Self {
        self.no_of_samples = no_of_samples;
        self
    }

    /// Set the retry budget
    pub fn with_retries(mut self, no_of_retries: usize) -> Self {
        self.no_of_retries = no_of_retries;
        self
    }

    /// Set the target feature count for selection
    pub fn with_features(mut self, no_of_features: usize) -> Self {
        self.no_of_features = no_of_features;
        self
    }

    /// Enable or disable feature selection
    pub fn with_feature_selection(mut self, feature_selection: bool) -> Self {
        self.feature_selection = feature_selection;
        self
    }

    /// Set the base proximity kernel width
    pub fn with_proximity_kernel_width(mut self, width: f64) -> Self {
        self.proximity_kernel_width = width;
        self
    }

    /// Enable or disable the proximity filter
    pub fn with_proximity_filter(mut self, proximity_filter: bool) -> Self {
        self.proximity_filter = proximity_filter;
        self
    }

    /// Set the proximity filter weight threshold
    pub fn with_proximity_threshold(mut self, threshold: f64) -> Self {
        self.proximity_threshold = threshold;
        self
    }

    /// Set the proximity filter row-count floor
    pub fn with_proximity_filtered_dataset_minimum(mut self, minimum: usize) -> Self {
        self.proximity_filtered_dataset_minimum = minimum;
        self
    }

    /// Enable or disable the sparse balance penalty
    pub fn with_penalize_balance_sparse(mut self, penalize: bool) -> Self {
        self.penalize_balance_sparse = penalize;
        self
    }

    /// Enable or disable weight normalization
    pub fn with_normalize_weights(mut self, normalize: bool) -> Self {
        self.normalize_weights = normalize;
        self
    }

    /// Set the separable-dataset ratio threshold
    pub fn with_separable_dataset_ratio(mut self, ratio: f64) -> Self {
        self.separable_dataset_ratio = ratio;
        self
    }

    /// Enable or disable retry-time dataset variance adaptation
    pub fn with_adapt_dataset_variance(mut self, adapt: bool) -> Self {
        self.adapt_dataset_variance = adapt;
        self
    }

    /// Set the perturbation context
    pub fn with_perturbation_context(mut self, context: PerturbationContext) -> Self {
        self.perturbation_context = context;
        self
    }

    /// Set the numeric encoding parameters
    pub fn with_encoding_params(mut self, params: EncodingParams) -> Self {
        self.encoding_params = params;
        self
    }

    /// Supply empirical feature distributions
    pub fn with_data_distribution(mut self, distribution: DataDistribution) -> Self {
        self.data_distribution = distribution;
        self
    }

    /// Enable or disable high-score feature zone biasing
    pub fn with_high_score_feature_zones(mut self, enabled: bool) -> Self {
        self.high_score_feature_zones = enabled;
        self
    }

    /// Set the bootstrap input cap
    pub fn with_bootstrap_inputs(mut self, bootstrap_inputs: usize) -> Self {
        self.bootstrap_inputs = bootstrap_inputs;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_copies_do_not_mutate_original() {
        let base = LimeConfig::default();
        let derived = base.clone().with_samples(64).with_retries(0);
        assert_eq!(base.no_of_samples, 300);
        assert_eq!(base.no_of_retries, 3);
        assert_eq!(derived.no_of_samples, 64);
        assert_eq!(derived.no_of_retries, 0);
    }

    #[test]
    fn test_default_encoding_params() {
        let params = EncodingParams::default();
        assert_eq!(params.numeric_cluster_filter_width, 0.07);
        assert_eq!(params.numeric_cluster_threshold, 0.07);
    }
}
