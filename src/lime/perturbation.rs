//! Synthetic neighborhood generation around the input being explained
//!
//! Each synthetic sample perturbs a small subset of features: numeric values
//! get Gaussian noise (or a draw from an empirical distribution when one is
//! supplied), booleans are resampled uniformly, and text/categorical tokens
//! are dropped. Unperturbed features keep the original value and feature
//! order is always preserved.

use std::collections::HashMap;

use rand::prelude::*;
use rand_distr::StandardNormal;
use tracing::debug;

use crate::error::Result;
use crate::lime::config::LimeConfig;
use crate::model::{
    DataDistribution, Feature, FeatureDistribution, HighScoreNumericFeatureZones,
    PerturbationContext, PredictionInput, Type, Value,
};
use crate::predictor::PredictionProvider;

/// Bounded rejection sampling when biasing draws toward high-score zones
const MAX_ZONE_ATTEMPTS: usize = 10;

/// Generate the synthetic neighborhood: exactly `config.no_of_samples`
/// perturbed copies of `features`.
///
/// When the configuration carries a non-empty data distribution, per-feature
/// empirical distributions are bootstrapped from it (optionally biased
/// toward high-score numeric feature zones probed through the predictor)
/// and perturbation resamples from those instead of the default noise
/// models.
pub async fn perturbed_inputs(
    features: &[Feature],
    config: &LimeConfig,
    predictor: &dyn PredictionProvider,
    rng: &mut StdRng,
) -> Result<Vec<PredictionInput>> {
    let size = config.no_of_samples;

    let feature_distributions = if config.data_distribution.is_empty() {
        HashMap::new()
    } else {
        let zones = if config.high_score_feature_zones {
            high_score_feature_zones(
                &config.data_distribution,
                predictor,
                features,
                config.bootstrap_inputs,
                rng,
            )
            .await?
        } else {
            HashMap::new()
        };
        bootstrap_feature_distributions(
            &config.data_distribution,
            size.min(config.bootstrap_inputs).max(1),
            &zones,
            rng,
        )
    };

    let mut perturbed = Vec::with_capacity(size);
    for _ in 0..size {
        let new_features = perturb_features(
            features,
            &config.perturbation_context,
            &feature_distributions,
            rng,
        );
        perturbed.push(PredictionInput::new(new_features));
    }
    Ok(perturbed)
}

/// Perturb one copy of `features`: a subset of
/// `context.no_of_perturbations` distinct features is resampled, everything
/// else keeps the original value.
pub fn perturb_features(
    features: &[Feature],
    context: &PerturbationContext,
    feature_distributions: &HashMap<String, FeatureDistribution>,
    rng: &mut StdRng,
) -> Vec<Feature> {
    let mut perturbed = features.to_vec();
    if perturbed.is_empty() {
        return perturbed;
    }
    let subset_size = context.no_of_perturbations.min(perturbed.len());
    let chosen = rand::seq::index::sample(rng, perturbed.len(), subset_size);
    for idx in chosen {
        let feature = &mut perturbed[idx];
        feature.value = perturbed_value(feature, feature_distributions, rng);
    }
    perturbed
}

fn perturbed_value(
    feature: &Feature,
    feature_distributions: &HashMap<String, FeatureDistribution>,
    rng: &mut StdRng,
) -> Value {
    if feature.feature_type == Type::Number {
        if let Some(distribution) = feature_distributions.get(&feature.name) {
            if !distribution.samples().is_empty() {
                return Value::Number(distribution.sample(rng));
            }
        }
    }
    match feature.feature_type {
        Type::Number => {
            let noise: f64 = rng.sample(StandardNormal);
            Value::Number(feature.value.as_number() + noise)
        }
        Type::Boolean => Value::Boolean(rng.gen_bool(0.5)),
        Type::Categorical => Value::Categorical(String::new()),
        Type::Text => Value::Text(String::new()),
        // composite features are linearized away upstream
        Type::Composite | Type::Undefined => feature.value.clone(),
    }
}

/// Resample each supplied empirical distribution with replacement, biased
/// toward high-score zones when available. Draw count is bounded by the
/// bootstrap-input cap.
fn bootstrap_feature_distributions(
    data_distribution: &DataDistribution,
    draws: usize,
    zones: &HashMap<String, HighScoreNumericFeatureZones>,
    rng: &mut StdRng,
) -> HashMap<String, FeatureDistribution> {
    let mut distributions = HashMap::new();
    for distribution in data_distribution.feature_distributions() {
        if distribution.samples().is_empty() {
            continue;
        }
        let zone = zones.get(distribution.feature_name());
        let mut samples = Vec::with_capacity(draws);
        for _ in 0..draws {
            let mut value = distribution.sample(rng);
            if let Some(zone) = zone {
                let mut attempts = 0;
                while !zone.accepts(value) && attempts < MAX_ZONE_ATTEMPTS {
                    value = distribution.sample(rng);
                    attempts += 1;
                }
            }
            samples.push(value);
        }
        distributions.insert(
            distribution.feature_name().to_string(),
            FeatureDistribution::new(distribution.feature_name(), samples),
        );
    }
    distributions
}

/// Probe the predictor over at most `max_inputs` bootstrap inputs drawn from
/// the empirical distributions, and collect, per numeric feature, the
/// sampled values of inputs whose prediction scored above the mean. Those
/// values (with their standard deviation as tolerance) become the zones
/// perturbation sampling is biased toward.
async fn high_score_feature_zones(
    data_distribution: &DataDistribution,
    predictor: &dyn PredictionProvider,
    features: &[Feature],
    max_inputs: usize,
    rng: &mut StdRng,
) -> Result<HashMap<String, HighScoreNumericFeatureZones>> {
    let mut inputs = Vec::with_capacity(max_inputs);
    for _ in 0..max_inputs {
        let sampled: Vec<Feature> = features
            .iter()
            .map(|f| match data_distribution.for_feature(&f.name) {
                Some(distribution)
                    if f.feature_type == Type::Number && !distribution.samples().is_empty() =>
                {
                    Feature::number(f.name.clone(), distribution.sample(rng))
                }
                _ => f.clone(),
            })
            .collect();
        inputs.push(PredictionInput::new(sampled));
    }
    if inputs.is_empty() {
        return Ok(HashMap::new());
    }

    let outputs = predictor.predict(&inputs).await?;
    let scores: Vec<f64> = outputs
        .iter()
        .map(|po| {
            let numeric: Vec<f64> = po
                .outputs
                .iter()
                .map(|o| o.value.as_number().abs())
                .filter(|v| v.is_finite())
                .collect();
            if numeric.is_empty() {
                0.0
            } else {
                numeric.iter().sum::<f64>() / numeric.len() as f64
            }
        })
        .collect();
    let mean_score = scores.iter().sum::<f64>() / scores.len() as f64;

    let mut zones = HashMap::new();
    for (feature_index, feature) in features.iter().enumerate() {
        if feature.feature_type != Type::Number
            || data_distribution.for_feature(&feature.name).is_none()
        {
            continue;
        }
        let high_values: Vec<f64> = inputs
            .iter()
            .zip(&scores)
            .filter(|(_, &score)| score > mean_score)
            .map(|(input, _)| input.features[feature_index].value.as_number())
            .filter(|v| v.is_finite())
            .collect();
        if high_values.len() < 2 {
            continue;
        }
        let tolerance = FeatureDistribution::new(&feature.name, high_values.clone()).std_deviation();
        if tolerance > 0.0 {
            debug!(
                "high score zone for '{}': {} points, tolerance {}",
                feature.name,
                high_values.len(),
                tolerance
            );
            zones.insert(
                feature.name.clone(),
                HighScoreNumericFeatureZones::new(high_values, tolerance),
            );
        }
    }
    Ok(zones)
}
