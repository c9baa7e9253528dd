//! Integration tests: end-to-end LIME explanation scenarios

use std::sync::Mutex;

use async_trait::async_trait;

use explicar::lime::{LimeConfig, LimeExplainer};
use explicar::model::{
    DataDistribution, Feature, FeatureDistribution, Output, PerturbationContext, Prediction,
    PredictionInput, PredictionOutput, Type, Value,
};
use explicar::predictor::{FnPredictionProvider, PredictionProvider};
use explicar::{ExplicarError, Result};

/// Predictor returning a constant output for every sample, recording the
/// batch sizes it was asked to score
struct ConstantPredictor {
    value: f64,
    batch_sizes: Mutex<Vec<usize>>,
}

impl ConstantPredictor {
    fn new(value: f64) -> Self {
        Self {
            value,
            batch_sizes: Mutex::new(Vec::new()),
        }
    }

    fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().unwrap().clone()
    }
}

#[async_trait]
impl PredictionProvider for ConstantPredictor {
    async fn predict(&self, inputs: &[PredictionInput]) -> Result<Vec<PredictionOutput>> {
        self.batch_sizes.lock().unwrap().push(inputs.len());
        Ok(inputs
            .iter()
            .map(|_| PredictionOutput::new(vec![Output::number("o", self.value)]))
            .collect())
    }
}

fn sum_classifier() -> FnPredictionProvider<
    impl Fn(&[PredictionInput]) -> Result<Vec<PredictionOutput>> + Send + Sync,
> {
    FnPredictionProvider::new(|inputs: &[PredictionInput]| {
        Ok(inputs
            .iter()
            .map(|input| {
                let sum: f64 = input.features.iter().map(|f| f.value.as_number()).sum();
                let label = if sum > 4.0 { 1.0 } else { 0.0 };
                PredictionOutput::new(vec![Output::number("approved", label)])
            })
            .collect())
    })
}

fn sum_regressor() -> FnPredictionProvider<
    impl Fn(&[PredictionInput]) -> Result<Vec<PredictionOutput>> + Send + Sync,
> {
    FnPredictionProvider::new(|inputs: &[PredictionInput]| {
        Ok(inputs
            .iter()
            .map(|input| {
                let sum: f64 = input.features.iter().map(|f| f.value.as_number()).sum();
                PredictionOutput::new(vec![Output::number("score", sum)])
            })
            .collect())
    })
}

fn numeric_prediction(n: usize, output: Output) -> Prediction {
    let features: Vec<Feature> = (0..n)
        .map(|i| Feature::number(format!("f{}", i), 1.0))
        .collect();
    Prediction::new(
        PredictionInput::new(features),
        PredictionOutput::new(vec![output]),
    )
}

#[tokio::test]
async fn test_binary_classification_four_features() {
    // 4 numeric features, 16 samples, no retries, no filtering or selection:
    // one saliency with exactly 4 importances, scores in [0, 1] under
    // normalization
    let config = LimeConfig::default()
        .with_samples(16)
        .with_retries(0)
        .with_feature_selection(false)
        .with_proximity_filter(false)
        .with_normalize_weights(true)
        .with_perturbation_context(PerturbationContext::seeded(42, 1));
    let explainer = LimeExplainer::with_config(config);
    let prediction = numeric_prediction(4, Output::number("approved", 0.0));
    let model = sum_classifier();

    let saliency_map = explainer.explain(&prediction, &model).await.unwrap();
    assert_eq!(saliency_map.len(), 1);
    let saliency = &saliency_map["approved"];
    assert_eq!(saliency.per_feature_importance.len(), 4);
    for importance in &saliency.per_feature_importance {
        assert!(importance.score >= 0.0 && importance.score <= 1.0);
    }
}

#[tokio::test]
async fn test_empty_input_fails_without_predictor_call() {
    let explainer = LimeExplainer::new();
    let prediction = Prediction::new(
        PredictionInput::new(Vec::new()),
        PredictionOutput::new(vec![Output::number("o", 1.0)]),
    );
    let model = ConstantPredictor::new(1.0);

    let result = explainer.explain(&prediction, &model).await;
    assert!(matches!(result, Err(ExplicarError::InvalidInput(_))));
    assert!(model.batch_sizes().is_empty());
}

#[tokio::test]
async fn test_empty_linearization_fails_without_predictor_call() {
    let explainer = LimeExplainer::new();
    let prediction = Prediction::new(
        PredictionInput::new(vec![Feature::composite("empty", Vec::new())]),
        PredictionOutput::new(vec![Output::number("o", 1.0)]),
    );
    let model = ConstantPredictor::new(1.0);

    let result = explainer.explain(&prediction, &model).await;
    assert!(matches!(result, Err(ExplicarError::InvalidInput(_))));
    assert!(model.batch_sizes().is_empty());
}

#[tokio::test]
async fn test_degenerate_dataset_fails_with_class_balance() {
    let config = LimeConfig::default()
        .with_samples(16)
        .with_retries(0)
        .with_perturbation_context(PerturbationContext::seeded(1, 1));
    let explainer = LimeExplainer::with_config(config);
    let prediction = numeric_prediction(4, Output::number("o", 42.0));
    let model = ConstantPredictor::new(42.0);

    let result = explainer.explain(&prediction, &model).await;
    match result {
        Err(ExplicarError::DatasetNotSeparable {
            output,
            class_balance,
        }) => {
            assert_eq!(output.name, "o");
            assert_eq!(class_balance.len(), 1);
        }
        other => panic!("expected DatasetNotSeparable, got {:?}", other.map(|_| ())),
    }
    assert_eq!(model.batch_sizes(), vec![16]);
}

#[tokio::test]
async fn test_retry_adaptation_grows_sample_count() {
    let config = LimeConfig::default()
        .with_samples(16)
        .with_retries(2)
        .with_adapt_dataset_variance(true)
        .with_perturbation_context(PerturbationContext::seeded(1, 1));
    let explainer = LimeExplainer::with_config(config);
    let prediction = numeric_prediction(4, Output::number("o", 42.0));
    let model = ConstantPredictor::new(42.0);

    let result = explainer.explain(&prediction, &model).await;
    assert!(matches!(
        result,
        Err(ExplicarError::DatasetNotSeparable { .. })
    ));
    // initial attempt plus two adapted retries, sample count growing by
    // current/initial_retries each time
    assert_eq!(model.batch_sizes(), vec![16, 24, 36]);
}

#[tokio::test]
async fn test_retry_without_adaptation_keeps_sample_count() {
    let config = LimeConfig::default()
        .with_samples(16)
        .with_retries(2)
        .with_adapt_dataset_variance(false)
        .with_perturbation_context(PerturbationContext::seeded(1, 1));
    let explainer = LimeExplainer::with_config(config);
    let prediction = numeric_prediction(4, Output::number("o", 42.0));
    let model = ConstantPredictor::new(42.0);

    let result = explainer.explain(&prediction, &model).await;
    assert!(matches!(
        result,
        Err(ExplicarError::DatasetNotSeparable { .. })
    ));
    assert_eq!(model.batch_sizes(), vec![16, 16, 16]);
}

#[tokio::test]
async fn test_sample_count_defaults_to_two_to_the_feature_count() {
    let config = LimeConfig::default()
        .with_samples(0)
        .with_retries(0)
        .with_perturbation_context(PerturbationContext::seeded(9, 1));
    let explainer = LimeExplainer::with_config(config);
    let prediction = numeric_prediction(3, Output::number("o", 42.0));
    // constant output: the explanation fails, but the recorded batch size
    // shows the derived sample count
    let model = ConstantPredictor::new(42.0);

    let _ = explainer.explain(&prediction, &model).await;
    assert_eq!(model.batch_sizes(), vec![8]);
}

#[tokio::test]
async fn test_regression_output_explained() {
    let config = LimeConfig::default()
        .with_samples(64)
        .with_retries(0)
        .with_feature_selection(false)
        .with_proximity_filter(false)
        .with_perturbation_context(PerturbationContext::seeded(5, 1));
    let explainer = LimeExplainer::with_config(config);
    let prediction = numeric_prediction(4, Output::number("score", 4.0));
    let model = sum_regressor();

    let saliency_map = explainer.explain(&prediction, &model).await.unwrap();
    let saliency = &saliency_map["score"];
    assert_eq!(saliency.per_feature_importance.len(), 4);
}

#[tokio::test]
async fn test_one_saliency_per_output() {
    let model = FnPredictionProvider::new(|inputs: &[PredictionInput]| {
        Ok(inputs
            .iter()
            .map(|input| {
                let sum: f64 = input.features.iter().map(|f| f.value.as_number()).sum();
                PredictionOutput::new(vec![
                    Output::number("sum", sum),
                    Output::number("double", 2.0 * sum),
                ])
            })
            .collect())
    });
    let config = LimeConfig::default()
        .with_samples(32)
        .with_retries(0)
        .with_proximity_filter(false)
        .with_perturbation_context(PerturbationContext::seeded(13, 1));
    let explainer = LimeExplainer::with_config(config);
    let features: Vec<Feature> = (0..3)
        .map(|i| Feature::number(format!("f{}", i), 1.0))
        .collect();
    let prediction = Prediction::new(
        PredictionInput::new(features),
        PredictionOutput::new(vec![
            Output::number("sum", 3.0),
            Output::number("double", 6.0),
        ]),
    );

    let saliency_map = explainer.explain(&prediction, &model).await.unwrap();
    assert_eq!(saliency_map.len(), 2);
    assert!(saliency_map.contains_key("sum"));
    assert!(saliency_map.contains_key("double"));
}

#[tokio::test]
async fn test_null_output_value_yields_empty_saliency() {
    let config = LimeConfig::default()
        .with_samples(16)
        .with_retries(0)
        .with_perturbation_context(PerturbationContext::seeded(3, 1));
    let explainer = LimeExplainer::with_config(config);
    let prediction = numeric_prediction(4, Output::new("o", Type::Categorical, Value::Null));
    let model = ConstantPredictor::new(1.0);

    let saliency_map = explainer.explain(&prediction, &model).await.unwrap();
    let saliency = &saliency_map["o"];
    assert!(saliency.per_feature_importance.is_empty());
}

#[tokio::test]
async fn test_seeded_explanations_are_reproducible() {
    let config = LimeConfig::default()
        .with_samples(32)
        .with_retries(0)
        .with_proximity_filter(false)
        .with_perturbation_context(PerturbationContext::seeded(21, 1));
    let prediction = numeric_prediction(4, Output::number("score", 4.0));
    let model = sum_regressor();

    let first = LimeExplainer::with_config(config.clone())
        .explain(&prediction, &model)
        .await
        .unwrap();
    let second = LimeExplainer::with_config(config)
        .explain(&prediction, &model)
        .await
        .unwrap();

    let first_saliency = &first["score"];
    let second_saliency = &second["score"];
    assert_eq!(
        first_saliency.per_feature_importance.len(),
        second_saliency.per_feature_importance.len()
    );
    for (a, b) in first_saliency
        .per_feature_importance
        .iter()
        .zip(&second_saliency.per_feature_importance)
    {
        assert_eq!(a.feature.name, b.feature.name);
        assert_eq!(a.score, b.score);
    }
}

#[tokio::test]
async fn test_feature_selection_caps_importance_count() {
    let config = LimeConfig::default()
        .with_samples(64)
        .with_retries(0)
        .with_feature_selection(true)
        .with_features(6)
        .with_proximity_filter(false)
        .with_perturbation_context(PerturbationContext::seeded(8, 1));
    let explainer = LimeExplainer::with_config(config);
    // 8 linearized features exceed the target of 6
    let prediction = numeric_prediction(8, Output::number("score", 8.0));
    let model = sum_regressor();

    let saliency_map = explainer.explain(&prediction, &model).await.unwrap();
    let saliency = &saliency_map["score"];
    assert_eq!(saliency.per_feature_importance.len(), 6);
}

#[tokio::test]
async fn test_composite_and_text_inputs_are_linearized() {
    // model counts features whose value survived perturbation non-empty
    let model = FnPredictionProvider::new(|inputs: &[PredictionInput]| {
        Ok(inputs
            .iter()
            .map(|input| {
                let present = input
                    .features
                    .iter()
                    .filter(|f| !f.value.as_string().is_empty())
                    .count() as f64;
                PredictionOutput::new(vec![Output::number("present", present)])
            })
            .collect())
    });
    let config = LimeConfig::default()
        .with_samples(32)
        .with_retries(0)
        .with_feature_selection(false)
        .with_proximity_filter(false)
        .with_perturbation_context(PerturbationContext::seeded(19, 1));
    let explainer = LimeExplainer::with_config(config);
    let input = PredictionInput::new(vec![
        Feature::composite(
            "profile",
            vec![Feature::number("age", 30.0), Feature::categorical("job", "nurse")],
        ),
        Feature::text("note", "urgent wire transfer"),
    ]);
    let prediction = Prediction::new(
        PredictionInput::new(input.features.clone()),
        PredictionOutput::new(vec![Output::number("present", 5.0)]),
    );

    let saliency_map = explainer.explain(&prediction, &model).await.unwrap();
    let saliency = &saliency_map["present"];
    // age, job and the three note tokens
    assert_eq!(saliency.per_feature_importance.len(), 5);
    assert!(saliency
        .per_feature_importance
        .iter()
        .any(|fi| fi.feature.name == "note_0"));
}

#[tokio::test]
async fn test_predictor_contract_violation_surfaces_as_predictor_error() {
    let model = FnPredictionProvider::new(|_inputs: &[PredictionInput]| {
        Ok(vec![PredictionOutput::new(vec![Output::number("o", 1.0)])])
    });
    let config = LimeConfig::default()
        .with_samples(16)
        .with_perturbation_context(PerturbationContext::seeded(2, 1));
    let explainer = LimeExplainer::with_config(config);
    let prediction = numeric_prediction(4, Output::number("o", 1.0));

    let result = explainer.explain(&prediction, &model).await;
    assert!(matches!(result, Err(ExplicarError::Predictor(_))));
}

#[tokio::test]
async fn test_predictor_failure_propagates() {
    let model = FnPredictionProvider::new(|_inputs: &[PredictionInput]| {
        Err(ExplicarError::Predictor("model endpoint down".to_string()))
    });
    let explainer = LimeExplainer::with_config(
        LimeConfig::default()
            .with_samples(16)
            .with_perturbation_context(PerturbationContext::seeded(2, 1)),
    );
    let prediction = numeric_prediction(4, Output::number("o", 1.0));

    let result = explainer.explain(&prediction, &model).await;
    match result {
        Err(ExplicarError::Predictor(message)) => assert_eq!(message, "model endpoint down"),
        other => panic!("expected Predictor error, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_data_distribution_drives_perturbation() {
    let distribution = DataDistribution::new(vec![
        FeatureDistribution::new("f0", vec![0.0, 2.0, 4.0, 6.0]),
        FeatureDistribution::new("f1", vec![1.0, 3.0, 5.0]),
    ]);
    let config = LimeConfig::default()
        .with_samples(32)
        .with_retries(0)
        .with_proximity_filter(false)
        .with_data_distribution(distribution)
        .with_bootstrap_inputs(16)
        .with_perturbation_context(PerturbationContext::seeded(23, 1));
    let explainer = LimeExplainer::with_config(config);
    let features = vec![Feature::number("f0", 2.0), Feature::number("f1", 3.0)];
    let prediction = Prediction::new(
        PredictionInput::new(features),
        PredictionOutput::new(vec![Output::number("score", 5.0)]),
    );
    let model = sum_regressor();

    let saliency_map = explainer.explain(&prediction, &model).await.unwrap();
    let saliency = &saliency_map["score"];
    assert_eq!(saliency.per_feature_importance.len(), 2);
}
