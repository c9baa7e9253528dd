//! Perceptron-style linear surrogate model
//!
//! Fits a weighted linear model to the encoded perturbation neighborhood.
//! In classifier mode the target is a two-class 0/1 label and predictions
//! are thresholded; in regression mode the continuous target is fit
//! directly. The fitted weight vector is read back as per-feature saliency.

use ndarray::Array1;
use rand::prelude::*;

use crate::lime::encoding::EncodedSample;

const MAX_NO_OF_EPOCHS: usize = 3000;
const INITIAL_LEARNING_RATE: f64 = 0.01;
const DECAY_RATE: f64 = 0.001;
const GOOD_LOSS_THRESHOLD: f64 = 0.01;
const CLASSIFICATION_THRESHOLD: f64 = 0.5;

/// Linear model over encoded samples
#[derive(Debug, Clone)]
pub struct LinearModel {
    weights: Array1<f64>,
    bias: f64,
    classification: bool,
}

impl LinearModel {
    /// Create a model over `size` features. Weights are initialized from
    /// `rng` so seeded explanation runs are reproducible.
    pub fn new(size: usize, classification: bool, rng: &mut StdRng) -> Self {
        let scale = 1.0 / size.max(1) as f64;
        let weights = Array1::from_shape_fn(size, |_| rng.gen_range(-1.0..1.0) * scale);
        Self {
            weights,
            bias: 0.0,
            classification,
        }
    }

    /// Fit the model to weighted training rows, returning the final loss.
    ///
    /// Returns NaN when fitting is degenerate: no rows, mismatched sample
    /// weights, zero total sample weight, or rows whose width differs from
    /// the model size. Callers must treat NaN as "no usable weights".
    pub fn fit(&mut self, training_set: &[EncodedSample], sample_weights: &[f64]) -> f64 {
        if training_set.is_empty() || training_set.len() != sample_weights.len() {
            return f64::NAN;
        }
        if sample_weights.iter().sum::<f64>() == 0.0 {
            return f64::NAN;
        }
        if training_set
            .iter()
            .any(|sample| sample.vector.len() != self.weights.len())
        {
            return f64::NAN;
        }

        let mut loss = f64::NAN;
        for epoch in 0..MAX_NO_OF_EPOCHS {
            let learning_rate = INITIAL_LEARNING_RATE / (1.0 + DECAY_RATE * epoch as f64);
            loss = 0.0;
            for (sample, &sample_weight) in training_set.iter().zip(sample_weights) {
                let prediction = self.predict_one(&sample.vector);
                let diff = sample.label - prediction;
                if diff != 0.0 {
                    loss += diff.abs() * sample_weight;
                    for (weight, &x) in self.weights.iter_mut().zip(sample.vector.iter()) {
                        *weight += learning_rate * diff * x * sample_weight;
                    }
                    self.bias += learning_rate * diff * sample_weight;
                }
            }
            loss /= training_set.len() as f64;
            if !loss.is_finite() {
                return f64::NAN;
            }
            if loss < GOOD_LOSS_THRESHOLD {
                break;
            }
        }
        loss
    }

    fn predict_one(&self, vector: &Array1<f64>) -> f64 {
        let linear_combination = self.weights.dot(vector) + self.bias;
        if self.classification {
            if linear_combination >= CLASSIFICATION_THRESHOLD {
                1.0
            } else {
                0.0
            }
        } else {
            linear_combination
        }
    }

    /// Fitted weight vector, one entry per feature
    pub fn weights(&self) -> &Array1<f64> {
        &self.weights
    }
}
