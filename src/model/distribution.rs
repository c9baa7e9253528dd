//! Empirical data distributions driving perturbation sampling

use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// Empirical distribution of one numeric feature, as a bag of observed
/// samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureDistribution {
    feature_name: String,
    samples: Vec<f64>,
}

impl FeatureDistribution {
    pub fn new(feature_name: impl Into<String>, samples: Vec<f64>) -> Self {
        Self {
            feature_name: feature_name.into(),
            samples,
        }
    }

    pub fn feature_name(&self) -> &str {
        &self.feature_name
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Draw one value uniformly from the observed samples
    pub fn sample(&self, rng: &mut StdRng) -> f64 {
        self.samples[rng.gen_range(0..self.samples.len())]
    }

    pub fn mean(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    pub fn std_deviation(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        let variance = self
            .samples
            .iter()
            .map(|v| (v - mean).powi(2))
            .sum::<f64>()
            / self.samples.len() as f64;
        variance.sqrt()
    }
}

/// Per-feature empirical distributions supplied by an external collaborator.
/// May be empty, in which case perturbation falls back to default noise
/// models.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataDistribution {
    feature_distributions: Vec<FeatureDistribution>,
}

impl DataDistribution {
    pub fn new(feature_distributions: Vec<FeatureDistribution>) -> Self {
        Self {
            feature_distributions,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.feature_distributions.is_empty()
    }

    pub fn feature_distributions(&self) -> &[FeatureDistribution] {
        &self.feature_distributions
    }

    /// Distribution for a feature name, if one was supplied
    pub fn for_feature(&self, name: &str) -> Option<&FeatureDistribution> {
        self.feature_distributions
            .iter()
            .find(|fd| fd.feature_name == name)
    }
}

/// Sub-ranges of a numeric feature's empirical range that historically yield
/// more decisive predictions. Purely advisory: perturbation sampling is
/// biased toward these zones when present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighScoreNumericFeatureZones {
    points: Vec<f64>,
    tolerance: f64,
}

impl HighScoreNumericFeatureZones {
    pub fn new(points: Vec<f64>, tolerance: f64) -> Self {
        Self { points, tolerance }
    }

    /// Whether `value` falls within `tolerance` of any zone point
    pub fn accepts(&self, value: f64) -> bool {
        self.points.iter().any(|p| (value - p).abs() <= self.tolerance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_feature_distribution_sampling_stays_in_samples() {
        let dist = FeatureDistribution::new("age", vec![20.0, 30.0, 40.0]);
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..50 {
            let v = dist.sample(&mut rng);
            assert!(dist.samples().contains(&v));
        }
    }

    #[test]
    fn test_feature_distribution_stats() {
        let dist = FeatureDistribution::new("x", vec![1.0, 2.0, 3.0, 4.0]);
        assert_relative_eq!(dist.mean(), 2.5);
        assert_relative_eq!(dist.std_deviation(), (1.25f64).sqrt());
    }

    #[test]
    fn test_zones_accept_within_tolerance() {
        let zones = HighScoreNumericFeatureZones::new(vec![1.0, 10.0], 0.5);
        assert!(zones.accepts(1.4));
        assert!(zones.accepts(9.6));
        assert!(!zones.accepts(5.0));
    }

    #[test]
    fn test_empty_data_distribution() {
        let dist = DataDistribution::empty();
        assert!(dist.is_empty());
        assert!(dist.for_feature("age").is_none());
    }
}
