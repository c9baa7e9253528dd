//! Optional feature-set reduction before the final surrogate fit
//!
//! Two strategies: for wide inputs a single surrogate is fit over all
//! features and the top-weighted ones are kept; for narrow inputs a greedy
//! forward selection grows the set one feature at a time, each step keeping
//! the candidate whose trial fit has minimum loss.

use rand::prelude::*;
use tracing::trace;

use crate::lime::config::LimeConfig;
use crate::lime::encoding::{DatasetEncoder, EncodedSample};
use crate::lime::linear::LinearModel;
use crate::lime::validation::LimeInputs;
use crate::lime::weighting::{sample_weights, ProximityFilter};
use crate::model::{Feature, FeatureImportance, Output, Saliency};

/// Feature count above which ranking by fitted weight replaces forward
/// selection
const FORWARD_SELECTION_CEILING: usize = 6;

/// Reduce `features` to at most `config.no_of_features` entries
pub fn select_features(
    config: &LimeConfig,
    lime_inputs: &LimeInputs,
    features: &[Feature],
    output: &Output,
    rng: &mut StdRng,
) -> Vec<Feature> {
    if features.len() > FORWARD_SELECTION_CEILING {
        top_weighted_features(config, lime_inputs, features, output, rng)
    } else {
        forward_selection(config, lime_inputs, features, output, rng)
    }
}

/// Fit one surrogate over all features and keep the top-weighted ones.
/// Ranking is by signed fitted weight, matching the saliency ranking.
fn top_weighted_features(
    config: &LimeConfig,
    lime_inputs: &LimeInputs,
    features: &[Feature],
    output: &Output,
    rng: &mut StdRng,
) -> Vec<Feature> {
    let (mut training_set, mut weights) = encoded_and_weighted(config, lime_inputs, features, output);
    if config.proximity_filter {
        ProximityFilter::new(
            config.proximity_threshold,
            config.proximity_filtered_dataset_minimum,
        )
        .apply(&mut training_set, &mut weights);
    }

    let mut linear_model = LinearModel::new(features.len(), lime_inputs.classification, rng);
    let loss = linear_model.fit(&training_set, &weights);
    trace!("feature selection loss: {}", loss);

    let importances: Vec<FeatureImportance> = features
        .iter()
        .zip(linear_model.weights())
        .map(|(feature, &weight)| FeatureImportance::new(feature.clone(), weight))
        .collect();
    Saliency::new(output.clone(), importances)
        .top_features(config.no_of_features)
        .into_iter()
        .map(|fi| fi.feature.clone())
        .collect()
}

/// Greedy forward selection: grow the selected set one feature at a time,
/// each step fitting one trial surrogate per remaining candidate and keeping
/// the minimum-loss candidate.
fn forward_selection(
    config: &LimeConfig,
    lime_inputs: &LimeInputs,
    features: &[Feature],
    output: &Output,
    rng: &mut StdRng,
) -> Vec<Feature> {
    let mut candidates: Vec<Feature> = features.to_vec();
    let mut selected: Vec<Feature> = Vec::new();

    while selected.len() < config.no_of_features && !candidates.is_empty() {
        let mut scores: Vec<(usize, f64)> = Vec::with_capacity(candidates.len());
        for (candidate_index, candidate) in candidates.iter().enumerate() {
            let mut trial_features = selected.clone();
            trial_features.push(candidate.clone());

            let (mut training_set, mut weights) =
                encoded_and_weighted(config, lime_inputs, &trial_features, output);
            if config.proximity_filter {
                ProximityFilter::new(
                    config.proximity_threshold,
                    config.proximity_filtered_dataset_minimum,
                )
                .apply(&mut training_set, &mut weights);
            }

            let mut linear_model =
                LinearModel::new(trial_features.len(), lime_inputs.classification, rng);
            let loss = linear_model.fit(&training_set, &weights);
            scores.push((candidate_index, loss));
        }

        scores.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        let (best_index, best_loss) = scores[0];
        trace!(
            "forward selection picked '{}' (loss {})",
            candidates[best_index].name,
            best_loss
        );
        selected.push(candidates.remove(best_index));
    }
    selected
}

fn encoded_and_weighted(
    config: &LimeConfig,
    lime_inputs: &LimeInputs,
    features: &[Feature],
    output: &Output,
) -> (Vec<EncodedSample>, Vec<f64>) {
    let encoder = DatasetEncoder::new(
        &lime_inputs.perturbed_inputs,
        &lime_inputs.perturbed_outputs,
        features,
        output,
        &config.encoding_params,
    );
    let training_set = encoder.encoded_training_set();
    let kernel_width = config.proximity_kernel_width * (features.len() as f64).sqrt();
    let weights = sample_weights(features.len(), &training_set, kernel_width);
    (training_set, weights)
}
