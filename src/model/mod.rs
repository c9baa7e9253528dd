//! Prediction data model shared across the explanation pipeline
//!
//! Predictions are ordered sequences of named, typed features going in and
//! named, typed outputs coming out. Feature order is significant and is
//! preserved through perturbation and encoding.

mod distribution;

pub use distribution::{DataDistribution, FeatureDistribution, HighScoreNumericFeatureZones};

use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// Data type of a feature or output value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Type {
    Number,
    Boolean,
    Categorical,
    Text,
    Composite,
    Undefined,
}

/// A feature or output value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Number(f64),
    Boolean(bool),
    Categorical(String),
    Text(String),
    Composite(Vec<Feature>),
    Null,
}

impl Value {
    /// Numeric view of this value. Booleans map to 0/1, strings are parsed,
    /// anything else yields NaN.
    pub fn as_number(&self) -> f64 {
        match self {
            Value::Number(n) => *n,
            Value::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Categorical(s) | Value::Text(s) => s.parse().unwrap_or(f64::NAN),
            Value::Composite(_) | Value::Null => f64::NAN,
        }
    }

    /// String view of this value
    pub fn as_string(&self) -> String {
        match self {
            Value::Number(n) => n.to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Categorical(s) | Value::Text(s) => s.clone(),
            Value::Composite(features) => features
                .iter()
                .map(|f| f.value.as_string())
                .collect::<Vec<_>>()
                .join(" "),
            Value::Null => String::new(),
        }
    }

    /// Whether this value is absent
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// A single named input feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Feature name
    pub name: String,
    /// Feature data type
    pub feature_type: Type,
    /// Feature value
    pub value: Value,
}

impl Feature {
    /// Create a numeric feature
    pub fn number(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            feature_type: Type::Number,
            value: Value::Number(value),
        }
    }

    /// Create a boolean feature
    pub fn boolean(name: impl Into<String>, value: bool) -> Self {
        Self {
            name: name.into(),
            feature_type: Type::Boolean,
            value: Value::Boolean(value),
        }
    }

    /// Create a categorical feature
    pub fn categorical(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            feature_type: Type::Categorical,
            value: Value::Categorical(value.into()),
        }
    }

    /// Create a text feature
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            feature_type: Type::Text,
            value: Value::Text(value.into()),
        }
    }

    /// Create a composite feature wrapping nested features
    pub fn composite(name: impl Into<String>, children: Vec<Feature>) -> Self {
        Self {
            name: name.into(),
            feature_type: Type::Composite,
            value: Value::Composite(children),
        }
    }
}

/// Ordered sequence of features fed to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionInput {
    pub features: Vec<Feature>,
}

impl PredictionInput {
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }
}

/// One model output slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Output {
    /// Output name
    pub name: String,
    /// Output data type
    pub output_type: Type,
    /// Output value
    pub value: Value,
}

impl Output {
    pub fn new(name: impl Into<String>, output_type: Type, value: Value) -> Self {
        Self {
            name: name.into(),
            output_type,
            value,
        }
    }

    /// Create a numeric output
    pub fn number(name: impl Into<String>, value: f64) -> Self {
        Self::new(name, Type::Number, Value::Number(value))
    }
}

/// Ordered sequence of outputs produced by the model for one input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionOutput {
    pub outputs: Vec<Output>,
}

impl PredictionOutput {
    pub fn new(outputs: Vec<Output>) -> Self {
        Self { outputs }
    }
}

/// The instance being explained: an input and the output the model produced
/// for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub input: PredictionInput,
    pub output: PredictionOutput,
}

impl Prediction {
    pub fn new(input: PredictionInput, output: PredictionOutput) -> Self {
        Self { input, output }
    }
}

/// Controls how many features are resampled per synthetic sample and whether
/// runs are reproducible
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerturbationContext {
    /// Random seed; seeded contexts produce deterministic explanations
    pub seed: Option<u64>,
    /// Number of features perturbed per synthetic sample
    pub no_of_perturbations: usize,
}

impl PerturbationContext {
    /// Create an unseeded (nondeterministic) context
    pub fn new(no_of_perturbations: usize) -> Self {
        Self {
            seed: None,
            no_of_perturbations,
        }
    }

    /// Create a seeded (deterministic) context
    pub fn seeded(seed: u64, no_of_perturbations: usize) -> Self {
        Self {
            seed: Some(seed),
            no_of_perturbations,
        }
    }

    /// Build the randomness source for one explanation call. The same rng is
    /// threaded through perturbation and surrogate fitting so seeded runs
    /// are reproducible end to end.
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

impl Default for PerturbationContext {
    fn default() -> Self {
        Self::new(1)
    }
}

/// Contribution of one feature toward one output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    /// The feature being scored
    pub feature: Feature,
    /// Saliency score
    pub score: f64,
}

impl FeatureImportance {
    pub fn new(feature: Feature, score: f64) -> Self {
        Self { feature, score }
    }
}

/// Per-feature importance scores explaining one model output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Saliency {
    /// The output being explained
    pub output: Output,
    /// Ordered feature importances, one per target feature
    pub per_feature_importance: Vec<FeatureImportance>,
}

impl Saliency {
    pub fn new(output: Output, per_feature_importance: Vec<FeatureImportance>) -> Self {
        Self {
            output,
            per_feature_importance,
        }
    }

    /// Top `n` features ranked by score, descending
    pub fn top_features(&self, n: usize) -> Vec<&FeatureImportance> {
        let mut sorted: Vec<&FeatureImportance> = self.per_feature_importance.iter().collect();
        sorted.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        sorted.into_iter().take(n).collect()
    }

    /// Top `n` positively scored features, highest first
    pub fn positive_features(&self, n: usize) -> Vec<&FeatureImportance> {
        self.top_features(self.per_feature_importance.len())
            .into_iter()
            .filter(|fi| fi.score > 0.0)
            .take(n)
            .collect()
    }

    /// Top `n` negatively scored features, lowest first
    pub fn negative_features(&self, n: usize) -> Vec<&FeatureImportance> {
        let mut sorted: Vec<&FeatureImportance> = self
            .per_feature_importance
            .iter()
            .filter(|fi| fi.score < 0.0)
            .collect();
        sorted.sort_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal));
        sorted.into_iter().take(n).collect()
    }
}

/// Flatten nested and composite feature structures into atomic scalar
/// features. Composite features are expanded recursively; multi-token text
/// features are split into one feature per whitespace token so saliency can
/// be attributed word by word.
pub fn linearize_features(features: &[Feature]) -> Vec<Feature> {
    let mut flat = Vec::new();
    for feature in features {
        flatten_into(feature, &mut flat);
    }
    flat
}

fn flatten_into(feature: &Feature, out: &mut Vec<Feature>) {
    match &feature.value {
        Value::Composite(children) => {
            for child in children {
                flatten_into(child, out);
            }
        }
        Value::Text(text) => {
            let tokens: Vec<&str> = text.split_whitespace().collect();
            if tokens.len() > 1 {
                for (i, token) in tokens.iter().enumerate() {
                    out.push(Feature::text(format!("{}_{}", feature.name, i), *token));
                }
            } else {
                out.push(feature.clone());
            }
        }
        _ => out.push(feature.clone()),
    }
}
