//! Numeric encoding of the perturbed dataset
//!
//! Turns a perturbed (input, output) pair set plus a target feature list
//! into numeric training vectors and labels. Every encoded column expresses
//! similarity to the original input, so the unperturbed original maps to an
//! all-ones vector.

use ndarray::Array1;

use crate::lime::config::EncodingParams;
use crate::model::{Feature, Output, PredictionInput, Type, Value};

/// One encoded training row
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedSample {
    /// Numeric feature vector over the target features
    pub vector: Array1<f64>,
    /// Training label
    pub label: f64,
}

impl EncodedSample {
    pub fn new(vector: Array1<f64>, label: f64) -> Self {
        Self { vector, label }
    }
}

/// Label for one perturbed output against the output being explained:
/// numeric passthrough, otherwise a binary match-vs-original (both-null
/// counts as a match).
pub(crate) fn output_label(output: &Output, reference: &Output) -> f64 {
    if output.output_type == Type::Number {
        return output.value.as_number();
    }
    let both_null = output.value.is_null() && reference.value.is_null();
    let equal = !output.value.is_null() && output.value.as_string() == reference.value.as_string();
    if both_null || equal {
        1.0
    } else {
        0.0
    }
}

/// Encodes perturbed inputs and outputs into numeric training rows
pub struct DatasetEncoder<'a> {
    perturbed_inputs: &'a [PredictionInput],
    perturbed_outputs: &'a [Output],
    target_features: &'a [Feature],
    original_output: &'a Output,
    params: &'a EncodingParams,
}

impl<'a> DatasetEncoder<'a> {
    pub fn new(
        perturbed_inputs: &'a [PredictionInput],
        perturbed_outputs: &'a [Output],
        target_features: &'a [Feature],
        original_output: &'a Output,
        params: &'a EncodingParams,
    ) -> Self {
        Self {
            perturbed_inputs,
            perturbed_outputs,
            target_features,
            original_output,
            params,
        }
    }

    /// Encode the dataset. Row order matches the perturbed input order and
    /// every row has exactly one entry per target feature.
    pub fn encoded_training_set(&self) -> Vec<EncodedSample> {
        let rows = self.perturbed_inputs.len();
        let cols = self.target_features.len();
        let mut matrix = vec![vec![0.0; cols]; rows];

        for (j, target) in self.target_features.iter().enumerate() {
            let column = self.encoded_column(target);
            for (row, value) in matrix.iter_mut().zip(column) {
                row[j] = value;
            }
        }

        matrix
            .into_iter()
            .zip(self.perturbed_outputs)
            .map(|(row, output)| {
                EncodedSample::new(
                    Array1::from_vec(row),
                    output_label(output, self.original_output),
                )
            })
            .collect()
    }

    fn encoded_column(&self, target: &Feature) -> Vec<f64> {
        if target.feature_type == Type::Number {
            self.encoded_numeric_column(target)
        } else {
            self.encoded_equality_column(target)
        }
    }

    /// Numeric columns are min-max scaled against the column plus the
    /// original value, then clustered around the original via a Gaussian
    /// similarity kernel.
    fn encoded_numeric_column(&self, target: &Feature) -> Vec<f64> {
        let original = target.value.as_number();
        let values: Vec<f64> = self
            .perturbed_inputs
            .iter()
            .map(|input| self.row_value(input, target).as_number())
            .collect();

        let mut lo = original;
        let mut hi = original;
        for &v in values.iter().filter(|v| v.is_finite()) {
            lo = lo.min(v);
            hi = hi.max(v);
        }

        let width = self.params.numeric_cluster_filter_width;
        let threshold = self.params.numeric_cluster_threshold;
        values
            .into_iter()
            .map(|v| {
                if !v.is_finite() {
                    return 0.0;
                }
                if hi == lo {
                    // the whole column equals the original value
                    return 1.0;
                }
                let scaled = (v - lo) / (hi - lo);
                let scaled_original = (original - lo) / (hi - lo);
                let distance = (scaled - scaled_original).abs();
                let similarity = (-distance * distance / (2.0 * width * width)).exp();
                if similarity >= threshold {
                    1.0
                } else {
                    0.0
                }
            })
            .collect()
    }

    fn encoded_equality_column(&self, target: &Feature) -> Vec<f64> {
        let original = target.value.as_string();
        self.perturbed_inputs
            .iter()
            .map(|input| {
                if self.row_value(input, target).as_string() == original {
                    1.0
                } else {
                    0.0
                }
            })
            .collect()
    }

    /// Value of the target feature within one perturbed input, matched by
    /// name. Perturbation preserves feature order and names, so a miss can
    /// only mean the feature was never perturbed away from the original.
    fn row_value<'b>(&self, input: &'b PredictionInput, target: &'b Feature) -> &'b Value {
        input
            .features
            .iter()
            .find(|f| f.name == target.name)
            .map(|f| &f.value)
            .unwrap_or(&target.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PredictionOutput, Value};

    fn params() -> EncodingParams {
        EncodingParams::default()
    }

    fn outputs_column(perturbed: &[PredictionOutput], index: usize) -> Vec<Output> {
        perturbed.iter().map(|po| po.outputs[index].clone()).collect()
    }

    #[test]
    fn test_encode_row_count_and_width() {
        let target_features = vec![Feature::number("a", 1.0), Feature::categorical("c", "x")];
        let perturbed_inputs = vec![
            PredictionInput::new(vec![Feature::number("a", 1.0), Feature::categorical("c", "x")]),
            PredictionInput::new(vec![Feature::number("a", 9.0), Feature::categorical("c", "y")]),
            PredictionInput::new(vec![Feature::number("a", 1.0), Feature::categorical("c", "y")]),
        ];
        let perturbed = vec![
            PredictionOutput::new(vec![Output::number("o", 1.0)]),
            PredictionOutput::new(vec![Output::number("o", 0.0)]),
            PredictionOutput::new(vec![Output::number("o", 0.5)]),
        ];
        let original_output = Output::number("o", 1.0);
        let output_column = outputs_column(&perturbed, 0);
        let p = params();
        let encoder = DatasetEncoder::new(
            &perturbed_inputs,
            &output_column,
            &target_features,
            &original_output,
            &p,
        );
        let training_set = encoder.encoded_training_set();
        assert_eq!(training_set.len(), 3);
        for sample in &training_set {
            assert_eq!(sample.vector.len(), 2);
        }
        // labels are numeric passthrough, in row order
        assert_eq!(training_set[0].label, 1.0);
        assert_eq!(training_set[1].label, 0.0);
        assert_eq!(training_set[2].label, 0.5);
    }

    #[test]
    fn test_encode_numeric_similarity_to_original() {
        let target_features = vec![Feature::number("a", 1.0)];
        let perturbed_inputs = vec![
            PredictionInput::new(vec![Feature::number("a", 1.0)]),
            PredictionInput::new(vec![Feature::number("a", 100.0)]),
        ];
        let output_column = vec![Output::number("o", 1.0), Output::number("o", 0.0)];
        let original_output = Output::number("o", 1.0);
        let p = params();
        let encoder = DatasetEncoder::new(
            &perturbed_inputs,
            &output_column,
            &target_features,
            &original_output,
            &p,
        );
        let training_set = encoder.encoded_training_set();
        // the unperturbed row encodes to 1, the distant row to 0
        assert_eq!(training_set[0].vector[0], 1.0);
        assert_eq!(training_set[1].vector[0], 0.0);
    }

    #[test]
    fn test_encode_constant_numeric_column_is_all_ones() {
        let target_features = vec![Feature::number("a", 5.0)];
        let perturbed_inputs = vec![
            PredictionInput::new(vec![Feature::number("a", 5.0)]),
            PredictionInput::new(vec![Feature::number("a", 5.0)]),
        ];
        let output_column = vec![Output::number("o", 1.0), Output::number("o", 1.0)];
        let original_output = Output::number("o", 1.0);
        let p = params();
        let encoder = DatasetEncoder::new(
            &perturbed_inputs,
            &output_column,
            &target_features,
            &original_output,
            &p,
        );
        let training_set = encoder.encoded_training_set();
        assert!(training_set.iter().all(|s| s.vector[0] == 1.0));
    }

    #[test]
    fn test_encode_categorical_equality() {
        let target_features = vec![Feature::categorical("color", "red")];
        let perturbed_inputs = vec![
            PredictionInput::new(vec![Feature::categorical("color", "red")]),
            PredictionInput::new(vec![Feature::categorical("color", "blue")]),
        ];
        let output_column = vec![
            Output::new("o", Type::Categorical, Value::Categorical("yes".to_string())),
            Output::new("o", Type::Categorical, Value::Categorical("no".to_string())),
        ];
        let original_output = Output::new("o", Type::Categorical, Value::Categorical("yes".to_string()));
        let p = params();
        let encoder = DatasetEncoder::new(
            &perturbed_inputs,
            &output_column,
            &target_features,
            &original_output,
            &p,
        );
        let training_set = encoder.encoded_training_set();
        assert_eq!(training_set[0].vector[0], 1.0);
        assert_eq!(training_set[1].vector[0], 0.0);
        // non-numeric labels are binary match-vs-original
        assert_eq!(training_set[0].label, 1.0);
        assert_eq!(training_set[1].label, 0.0);
    }

    #[test]
    fn test_output_label_null_handling() {
        let null_output = Output::new("o", Type::Categorical, Value::Null);
        let null_reference = Output::new("o", Type::Categorical, Value::Null);
        assert_eq!(output_label(&null_output, &null_reference), 1.0);

        let present = Output::new("o", Type::Categorical, Value::Categorical("x".to_string()));
        assert_eq!(output_label(&null_output, &present), 0.0);
    }
}
