//! Error types for the explicar crate

use thiserror::Error;

use crate::lime::validation::ClassBalance;
use crate::model::Output;

/// Result type alias for explicar operations
pub type Result<T> = std::result::Result<T, ExplicarError>;

/// Main error type for the explicar crate
#[derive(Error, Debug)]
pub enum ExplicarError {
    /// The prediction to explain has no usable input features.
    /// Surfaced immediately, the predictor is never invoked.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The perturbed dataset for one output collapsed into (nearly) a single
    /// class and cannot be linearly separated, even after exhausting the
    /// retry budget.
    #[error("Dataset for output '{}' is not separable: {}", .output.name, .class_balance)]
    DatasetNotSeparable {
        output: Output,
        class_balance: ClassBalance,
    },

    /// The external prediction function failed, or violated its contract
    /// (one output per input, index-aligned).
    #[error("Predictor error: {0}")]
    Predictor(String),
}
