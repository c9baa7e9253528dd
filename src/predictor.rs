//! Asynchronous prediction contract for the opaque model under explanation

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{PredictionInput, PredictionOutput};

/// The opaque model being explained. Implementations may batch or
/// parallelize internally; the only contract is one output per input,
/// index-aligned.
#[async_trait]
pub trait PredictionProvider: Send + Sync {
    /// Run the model on a batch of inputs
    async fn predict(&self, inputs: &[PredictionInput]) -> Result<Vec<PredictionOutput>>;
}

/// Adapter exposing a plain synchronous function as a [`PredictionProvider`]
pub struct FnPredictionProvider<F>
where
    F: Fn(&[PredictionInput]) -> Result<Vec<PredictionOutput>> + Send + Sync,
{
    func: F,
}

impl<F> FnPredictionProvider<F>
where
    F: Fn(&[PredictionInput]) -> Result<Vec<PredictionOutput>> + Send + Sync,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F> PredictionProvider for FnPredictionProvider<F>
where
    F: Fn(&[PredictionInput]) -> Result<Vec<PredictionOutput>> + Send + Sync,
{
    async fn predict(&self, inputs: &[PredictionInput]) -> Result<Vec<PredictionOutput>> {
        (self.func)(inputs)
    }
}
