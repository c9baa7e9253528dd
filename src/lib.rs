//! explicar - local, model-agnostic explanations for opaque predictive models
//!
//! This crate implements the LIME algorithm (Ribeiro et al., 2016): given one
//! prediction made by an arbitrary model, it estimates a per-feature saliency
//! score toward each output by fitting an interpretable linear surrogate to a
//! synthetic neighborhood of the input.
//!
//! # Modules
//!
//! - [`model`] - prediction data model: features, outputs, saliencies,
//!   empirical data distributions
//! - [`predictor`] - asynchronous contract of the model under explanation
//! - [`lime`] - the explanation pipeline: perturbation, validation,
//!   encoding, weighting, feature selection, surrogate fitting
//!
//! # Example
//!
//! ```no_run
//! use explicar::lime::{LimeConfig, LimeExplainer};
//! use explicar::model::{Feature, Output, Prediction, PredictionInput, PredictionOutput};
//! use explicar::predictor::FnPredictionProvider;
//!
//! # async fn demo() -> explicar::Result<()> {
//! let model = FnPredictionProvider::new(|inputs: &[PredictionInput]| {
//!     Ok(inputs
//!         .iter()
//!         .map(|input| {
//!             let sum: f64 = input.features.iter().map(|f| f.value.as_number()).sum();
//!             PredictionOutput::new(vec![Output::number("approved", (sum > 4.0) as i32 as f64)])
//!         })
//!         .collect())
//! });
//!
//! let input = PredictionInput::new(vec![
//!     Feature::number("age", 1.0),
//!     Feature::number("income", 2.0),
//!     Feature::number("children", 2.0),
//! ]);
//! let output = PredictionOutput::new(vec![Output::number("approved", 1.0)]);
//! let prediction = Prediction::new(input, output);
//!
//! let explainer = LimeExplainer::with_config(LimeConfig::default().with_samples(100));
//! let saliency_map = explainer.explain(&prediction, &model).await?;
//! for importance in saliency_map["approved"].top_features(3) {
//!     println!("{}: {}", importance.feature.name, importance.score);
//! }
//! # Ok(())
//! # }
//! ```

// Core error handling
pub mod error;

// Prediction data model
pub mod model;

// External prediction contract
pub mod predictor;

// The explanation pipeline
pub mod lime;

pub use error::{ExplicarError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{ExplicarError, Result};

    // Data model
    pub use crate::model::{
        DataDistribution, Feature, FeatureDistribution, FeatureImportance, Output,
        PerturbationContext, Prediction, PredictionInput, PredictionOutput, Saliency, Type, Value,
    };

    // Predictor contract
    pub use crate::predictor::{FnPredictionProvider, PredictionProvider};

    // Explainer
    pub use crate::lime::{EncodingParams, LimeConfig, LimeExplainer};
}
