//! Trained linear model and prediction

use crate::core::{Classifier, FeatureNode, LinearError, Result, SolverType};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A trained linear classifier.
///
/// Weights are stored feature-major: the weight of feature `j` (1-based) for
/// class column `k` is `w[(j - 1) * nr_w + k]`. When `bias >= 0` one extra
/// row holds the bias weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    solver_type: SolverType,
    label: Vec<i32>,
    nr_feature: usize,
    bias: f64,
    w: Vec<f64>,
}

impl Model {
    pub(crate) fn from_parts(
        solver_type: SolverType,
        label: Vec<i32>,
        nr_feature: usize,
        bias: f64,
        w: Vec<f64>,
    ) -> Self {
        Self {
            solver_type,
            label,
            nr_feature,
            bias,
            w,
        }
    }

    pub fn solver_type(&self) -> SolverType {
        self.solver_type
    }

    /// Number of classes
    pub fn nr_class(&self) -> usize {
        self.label.len()
    }

    /// Number of features, not counting the bias feature
    pub fn nr_feature(&self) -> usize {
        self.nr_feature
    }

    /// Class labels in slot order
    pub fn labels(&self) -> &[i32] {
        &self.label
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }

    /// Raw weight matrix, `w_size() * nr_w()` entries
    pub fn feature_weights(&self) -> &[f64] {
        &self.w
    }

    /// Number of weight columns: 1 for a two-class one-vs-rest model
    pub fn nr_w(&self) -> usize {
        nr_w(self.nr_class(), self.solver_type)
    }

    /// Number of weight rows, bias row included
    pub fn w_size(&self) -> usize {
        w_size(self.nr_feature, self.bias)
    }

    /// One decision value per weight column.
    ///
    /// Indices above `nr_feature` are ignored; the bias term comes from the
    /// model, so `x` should not carry a bias node of its own.
    pub fn decision_values(&self, x: &[FeatureNode]) -> Vec<f64> {
        let nr_w = self.nr_w();
        let mut dec = vec![0.0; nr_w];

        for node in x {
            if node.index == 0 || node.index > self.nr_feature {
                continue;
            }
            let row = &self.w[(node.index - 1) * nr_w..node.index * nr_w];
            for (d, wk) in dec.iter_mut().zip(row) {
                *d += wk * node.value;
            }
        }
        if self.bias >= 0.0 {
            let row = &self.w[self.nr_feature * nr_w..(self.nr_feature + 1) * nr_w];
            for (d, wk) in dec.iter_mut().zip(row) {
                *d += wk * self.bias;
            }
        }

        dec
    }

    /// Predicted label together with the decision values
    pub fn predict_values(&self, x: &[FeatureNode]) -> (i32, Vec<f64>) {
        let dec = self.decision_values(x);
        let label = self.label_for(&dec);
        (label, dec)
    }

    /// Predict the label of one instance
    pub fn predict(&self, x: &[FeatureNode]) -> i32 {
        self.predict_values(x).0
    }

    /// Predicted label and per-class probability estimates.
    ///
    /// Only logistic regression models carry calibrated probabilities.
    pub fn predict_probability(&self, x: &[FeatureNode]) -> Result<(i32, Vec<f64>)> {
        if !self.solver_type.supports_probability() {
            return Err(LinearError::ProbabilityNotSupported(self.solver_type));
        }

        let (label, dec) = self.predict_values(x);
        let mut prob: Vec<f64> = dec.iter().map(|&d| 1.0 / (1.0 + (-d).exp())).collect();

        if self.nr_class() == 2 {
            prob.push(1.0 - prob[0]);
        } else {
            let sum: f64 = prob.iter().sum();
            for p in &mut prob {
                *p /= sum;
            }
        }

        Ok((label, prob))
    }

    fn label_for(&self, dec: &[f64]) -> i32 {
        if self.nr_class() == 2 && dec.len() == 1 {
            return if dec[0] > 0.0 { self.label[0] } else { self.label[1] };
        }

        let mut best = 0;
        for (k, &d) in dec.iter().enumerate().skip(1) {
            if d > dec[best] {
                best = k;
            }
        }
        self.label[best]
    }

    /// Write the model in the text format
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        crate::persistence::save_model_file(self, path)
    }

    /// Read a model written by [`Model::save`]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        crate::persistence::load_model_file(path)
    }

    /// Check that the weight matrix matches the header fields
    pub(crate) fn check_shape(&self) -> Result<()> {
        if self.label.is_empty() {
            return Err(LinearError::ModelFormat("model has no classes".to_string()));
        }
        let expected = weight_count(self.nr_feature, self.bias, self.nr_class(), self.solver_type)
            .ok_or_else(|| LinearError::ModelFormat("weight matrix size overflows".to_string()))?;
        if self.w.len() != expected {
            return Err(LinearError::ModelFormat(format!(
                "expected {} weights, found {}",
                expected,
                self.w.len()
            )));
        }
        Ok(())
    }
}

/// Weight columns for a model with `nr_class` classes
pub(crate) fn nr_w(nr_class: usize, solver_type: SolverType) -> usize {
    if nr_class == 2 && !solver_type.is_multiclass() {
        1
    } else {
        nr_class
    }
}

/// Weight rows for a model with `nr_feature` features
pub(crate) fn w_size(nr_feature: usize, bias: f64) -> usize {
    if bias >= 0.0 {
        nr_feature + 1
    } else {
        nr_feature
    }
}

/// Total weights `w_size * nr_w`, or `None` if the header values overflow
pub(crate) fn weight_count(
    nr_feature: usize,
    bias: f64,
    nr_class: usize,
    solver_type: SolverType,
) -> Option<usize> {
    let rows = if bias >= 0.0 {
        nr_feature.checked_add(1)?
    } else {
        nr_feature
    };
    rows.checked_mul(nr_w(nr_class, solver_type))
}

/// Bias compares bitwise; weights compare numerically so that `0.0` and
/// `-0.0` written as `0` still match after a save/load cycle.
impl PartialEq for Model {
    fn eq(&self, other: &Self) -> bool {
        self.solver_type == other.solver_type
            && self.label == other.label
            && self.nr_feature == other.nr_feature
            && self.bias.to_bits() == other.bias.to_bits()
            && self.w.len() == other.w.len()
            && self.w.iter().zip(&other.w).all(|(a, b)| a == b)
    }
}

impl Classifier for Model {
    fn decision_values(&self, x: &[FeatureNode]) -> Vec<f64> {
        Model::decision_values(self, x)
    }

    fn predict(&self, x: &[FeatureNode]) -> i32 {
        Model::predict(self, x)
    }

    fn nr_class(&self) -> usize {
        Model::nr_class(self)
    }

    fn bias(&self) -> f64 {
        self.bias
    }
}
