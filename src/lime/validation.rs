//! Per-output separability validation of the perturbed dataset
//!
//! Before fitting a surrogate, the perturbed outputs for each output slot
//! are checked for class balance: a neighborhood where (nearly) every sample
//! lands in one class cannot be linearly separated, so no meaningful feature
//! weights can be learned from it.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::lime::encoding::output_label;
use crate::model::{Feature, Output, PredictionInput, PredictionOutput};

/// Count of perturbed samples per observed output label value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassBalance {
    counts: Vec<(f64, usize)>,
}

impl ClassBalance {
    /// Group-count labels by exact value
    pub fn from_labels(labels: &[f64]) -> Self {
        let mut counts: Vec<(f64, usize)> = Vec::new();
        for &label in labels {
            match counts.iter_mut().find(|(v, _)| v.to_bits() == label.to_bits()) {
                Some((_, count)) => *count += 1,
                None => counts.push((label, 1)),
            }
        }
        Self { counts }
    }

    /// Number of distinct label values observed
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Size of the largest class
    pub fn max_count(&self) -> usize {
        self.counts.iter().map(|(_, c)| *c).max().unwrap_or(1)
    }

    pub fn counts(&self) -> &[(f64, usize)] {
        &self.counts
    }
}

impl fmt::Display for ClassBalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (value, count)) in self.counts.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", value, count)?;
        }
        write!(f, "}}")
    }
}

/// The validated training basis for one output
#[derive(Debug, Clone, PartialEq)]
pub struct LimeInputs {
    /// True iff exactly two distinct output values were observed
    pub classification: bool,
    /// Linearized target input features
    pub features: Vec<Feature>,
    /// The output being explained
    pub output: Output,
    /// Perturbed inputs backing the training set
    pub perturbed_inputs: Vec<PredictionInput>,
    /// Perturbed output column for this output slot
    pub perturbed_outputs: Vec<Output>,
}

/// Outcome of validating one output's perturbed dataset. Non-separability is
/// a retryable signal consumed by the orchestrator's retry loop, not an
/// error by itself.
#[derive(Debug, Clone)]
pub enum DatasetCheck {
    /// The dataset is usable for surrogate fitting
    Usable(LimeInputs),
    /// The dataset collapsed into (nearly) a single class
    NotSeparable {
        output: Output,
        class_balance: ClassBalance,
    },
}

/// Validate the perturbed dataset for the output at `output_index`.
///
/// Strict mode signals `NotSeparable` unless more than one label was
/// observed and the majority class stays below `separable_dataset_ratio`.
/// Lenient mode always builds a training basis, logging a warning when the
/// dataset is poorly separable. An absent original output value always
/// yields an empty (but usable) basis.
pub fn check_dataset(
    features: &[Feature],
    original_output: &Output,
    output_index: usize,
    perturbed_inputs: &[PredictionInput],
    perturbed_outputs: &[PredictionOutput],
    separable_dataset_ratio: f64,
    strict: bool,
) -> DatasetCheck {
    if original_output.value.is_null() {
        return DatasetCheck::Usable(LimeInputs {
            classification: false,
            features: features.to_vec(),
            output: original_output.clone(),
            perturbed_inputs: Vec::new(),
            perturbed_outputs: Vec::new(),
        });
    }

    let labels: Vec<f64> = perturbed_outputs
        .iter()
        .map(|po| output_label(&po.outputs[output_index], original_output))
        .collect();
    let class_balance = ClassBalance::from_labels(&labels);
    let separation_ratio = class_balance.max_count() as f64 / perturbed_inputs.len() as f64;
    let classification = class_balance.len() == 2;
    debug!(
        "output '{}' class balance {} (separation ratio {})",
        original_output.name, class_balance, separation_ratio
    );

    let separable = class_balance.len() > 1 && separation_ratio < separable_dataset_ratio;
    if !separable && strict {
        return DatasetCheck::NotSeparable {
            output: original_output.clone(),
            class_balance,
        };
    }
    if !separable {
        warn!(
            "using a hardly separable dataset for output '{}' with value '{}' ({})",
            original_output.name,
            original_output.value.as_string(),
            class_balance
        );
    }

    let output_column: Vec<Output> = perturbed_outputs
        .iter()
        .map(|po| po.outputs[output_index].clone())
        .collect();
    DatasetCheck::Usable(LimeInputs {
        classification,
        features: features.to_vec(),
        output: original_output.clone(),
        perturbed_inputs: perturbed_inputs.to_vec(),
        perturbed_outputs: output_column,
    })
}
