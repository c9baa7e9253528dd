//! LIME: local, model-agnostic explanation of single predictions
//!
//! Approximates an opaque model's behavior around one input by fitting an
//! interpretable linear surrogate to a synthetic neighborhood of that input,
//! then reads the fitted weights back as per-feature saliency scores, one
//! [`Saliency`] per model output.
//!
//! The neighborhood is regenerated with a larger perturbation size and
//! sample count (bounded by a retry budget) whenever the perturbed outputs
//! collapse into a single class, since such a dataset cannot be linearly
//! separated.

pub mod config;
pub mod encoding;
pub mod linear;
pub mod perturbation;
pub mod selection;
pub mod validation;
pub mod weighting;

pub use config::{EncodingParams, LimeConfig};
pub use validation::{ClassBalance, DatasetCheck, LimeInputs};

use std::collections::HashMap;

use rand::prelude::*;
use tracing::debug;

use crate::error::{ExplicarError, Result};
use crate::model::{
    linearize_features, Feature, FeatureImportance, Output, PerturbationContext, Prediction,
    PredictionInput, PredictionOutput, Saliency,
};
use crate::predictor::PredictionProvider;

use encoding::DatasetEncoder;
use linear::LinearModel;
use weighting::{normalize_weights, sample_weights, ProximityFilter, SparseFeatureBalanceFilter};

/// Local explainer implementing the LIME algorithm
///
/// One instance holds a template [`LimeConfig`] and is safely shared across
/// concurrent calls: every call clones the template and owns all of its
/// intermediate state.
#[derive(Debug, Clone, Default)]
pub struct LimeExplainer {
    config: LimeConfig,
}

impl LimeExplainer {
    /// Create an explainer with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an explainer with a custom configuration
    pub fn with_config(config: LimeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LimeConfig {
        &self.config
    }

    /// Explain one prediction: one [`Saliency`] per output, keyed by output
    /// name.
    ///
    /// Fails with [`ExplicarError::InvalidInput`] when the input has no
    /// features, and with [`ExplicarError::DatasetNotSeparable`] once the
    /// retry budget is exhausted on a dataset stuck in a single output
    /// class. Predictor failures propagate as-is.
    pub async fn explain(
        &self,
        prediction: &Prediction,
        model: &dyn PredictionProvider,
    ) -> Result<HashMap<String, Saliency>> {
        if prediction.input.features.is_empty() {
            return Err(ExplicarError::InvalidInput(
                "cannot explain a prediction whose input is empty".to_string(),
            ));
        }
        let linearized = linearize_features(&prediction.input.features);
        if linearized.is_empty() {
            return Err(ExplicarError::InvalidInput(
                "input feature linearization produced no features".to_string(),
            ));
        }
        let actual_outputs = &prediction.output.outputs;

        let mut execution_config = self.config.clone();
        if execution_config.no_of_samples == 0 {
            let derived = 2usize.saturating_pow(linearized.len().min(usize::BITS as usize - 1) as u32);
            debug!("using 2^|features| samples ({})", derived);
            execution_config = execution_config.with_samples(derived);
        }
        let mut rng = execution_config.perturbation_context.rng();

        loop {
            let perturbed_inputs =
                perturbation::perturbed_inputs(&linearized, &execution_config, model, &mut rng)
                    .await?;
            let prediction_outputs = model.predict(&perturbed_inputs).await?;
            check_predictor_contract(&perturbed_inputs, &prediction_outputs, actual_outputs.len())?;

            match gather_lime_inputs(
                &linearized,
                actual_outputs,
                &perturbed_inputs,
                &prediction_outputs,
                &execution_config,
            ) {
                Ok(lime_inputs_list) => {
                    return Ok(self.saliencies(
                        &linearized,
                        actual_outputs,
                        lime_inputs_list,
                        &execution_config,
                        &mut rng,
                    ));
                }
                Err((output, class_balance)) => {
                    if execution_config.no_of_retries == 0 {
                        return Err(ExplicarError::DatasetNotSeparable {
                            output,
                            class_balance,
                        });
                    }
                    execution_config = self.adapted_config(execution_config, linearized.len());
                }
            }
        }
    }

    /// Derive the next attempt's configuration. The retry counter always
    /// decrements; perturbation size and sample count only grow when dataset
    /// variance adaptation is enabled.
    fn adapted_config(&self, execution_config: LimeConfig, feature_count: usize) -> LimeConfig {
        let retries = execution_config.no_of_retries;
        let mut next = execution_config;
        if self.config.adapt_dataset_variance {
            let context = &next.perturbation_context;
            let grown = (context.no_of_perturbations + 1).max(feature_count / retries);
            let next_perturbation_size = grown.min(feature_count.saturating_sub(1));
            let next_context = PerturbationContext {
                seed: context.seed,
                no_of_perturbations: next_perturbation_size,
            };
            let initial_retries = self.config.no_of_retries.max(1);
            let next_samples = next.no_of_samples + next.no_of_samples / initial_retries;
            debug!(
                "dataset not separable, retrying with {} samples and perturbation size {}",
                next_samples, next_perturbation_size
            );
            next = next
                .with_samples(next_samples)
                .with_perturbation_context(next_context);
        }
        next.with_retries(retries - 1)
    }

    fn saliencies(
        &self,
        linearized: &[Feature],
        actual_outputs: &[Output],
        lime_inputs_list: Vec<LimeInputs>,
        execution_config: &LimeConfig,
        rng: &mut StdRng,
    ) -> HashMap<String, Saliency> {
        let mut result = HashMap::new();
        for (lime_inputs, original_output) in lime_inputs_list.iter().zip(actual_outputs) {
            let saliency = self.saliency_for_output(
                linearized,
                lime_inputs,
                original_output,
                execution_config,
                rng,
            );
            debug!("weights set for output '{}'", original_output.name);
            result.insert(original_output.name.clone(), saliency);
        }
        result
    }

    fn saliency_for_output(
        &self,
        linearized: &[Feature],
        lime_inputs: &LimeInputs,
        original_output: &Output,
        execution_config: &LimeConfig,
        rng: &mut StdRng,
    ) -> Saliency {
        let mut target_features: Vec<Feature> = linearized.to_vec();
        if execution_config.feature_selection
            && target_features.len() > execution_config.no_of_features
        {
            target_features = selection::select_features(
                execution_config,
                lime_inputs,
                &target_features,
                original_output,
                rng,
            );
        }

        let encoder = DatasetEncoder::new(
            &lime_inputs.perturbed_inputs,
            &lime_inputs.perturbed_outputs,
            &target_features,
            original_output,
            &execution_config.encoding_params,
        );
        let mut training_set = encoder.encoded_training_set();

        let kernel_width =
            execution_config.proximity_kernel_width * (target_features.len() as f64).sqrt();
        let mut weights = sample_weights(target_features.len(), &training_set, kernel_width);

        let mut feature_weights = vec![1.0; target_features.len()];
        if execution_config.penalize_balance_sparse {
            SparseFeatureBalanceFilter::default().apply(
                &mut feature_weights,
                &target_features,
                &training_set,
            );
        }

        if execution_config.proximity_filter {
            ProximityFilter::new(
                execution_config.proximity_threshold,
                execution_config.proximity_filtered_dataset_minimum,
            )
            .apply(&mut training_set, &mut weights);
        }

        let mut linear_model =
            LinearModel::new(target_features.len(), lime_inputs.classification, rng);
        let loss = linear_model.fit(&training_set, &weights);

        let mut importances = Vec::new();
        if !loss.is_nan() {
            let mut fitted: Vec<f64> = linear_model.weights().to_vec();
            if execution_config.normalize_weights && !fitted.is_empty() {
                normalize_weights(&mut fitted);
            }
            for ((feature, weight), feature_weight) in
                target_features.iter().zip(&fitted).zip(&feature_weights)
            {
                importances.push(FeatureImportance::new(
                    feature.clone(),
                    weight * feature_weight,
                ));
            }
        }
        Saliency::new(original_output.clone(), importances)
    }
}

/// One output per input, and one output slot per original output slot;
/// anything else is a collaborator contract breach.
fn check_predictor_contract(
    inputs: &[PredictionInput],
    outputs: &[PredictionOutput],
    expected_slots: usize,
) -> Result<()> {
    if outputs.len() != inputs.len() {
        return Err(ExplicarError::Predictor(format!(
            "expected {} outputs, got {}",
            inputs.len(),
            outputs.len()
        )));
    }
    if let Some(bad) = outputs.iter().find(|po| po.outputs.len() != expected_slots) {
        return Err(ExplicarError::Predictor(format!(
            "expected {} output slots per sample, got {}",
            expected_slots,
            bad.outputs.len()
        )));
    }
    Ok(())
}

/// Validate every output's dataset, returning either the full list of
/// training bases or the first non-separable output as a retry signal.
fn gather_lime_inputs(
    linearized: &[Feature],
    actual_outputs: &[Output],
    perturbed_inputs: &[PredictionInput],
    prediction_outputs: &[PredictionOutput],
    execution_config: &LimeConfig,
) -> std::result::Result<Vec<LimeInputs>, (Output, ClassBalance)> {
    let mut lime_inputs_list = Vec::with_capacity(actual_outputs.len());
    for (output_index, output) in actual_outputs.iter().enumerate() {
        let check = validation::check_dataset(
            linearized,
            output,
            output_index,
            perturbed_inputs,
            prediction_outputs,
            execution_config.separable_dataset_ratio,
            true,
        );
        match check {
            DatasetCheck::Usable(lime_inputs) => lime_inputs_list.push(lime_inputs),
            DatasetCheck::NotSeparable {
                output,
                class_balance,
            } => return Err((output, class_balance)),
        }
    }
    Ok(lime_inputs_list)
}
