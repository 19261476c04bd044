//! High-level API for training and applying linear classifiers
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use rlinear::api::LinearClassifier;
//! use rlinear::SolverType;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let model = LinearClassifier::new()
//!     .with_solver(SolverType::L2R_LR)
//!     .with_c(1.0)
//!     .with_bias(1.0)
//!     .train_from_file("train.txt")?;
//!
//! let evaluation = model.evaluate_from_file("test.txt")?;
//! println!("Accuracy: {:.2}%", evaluation.accuracy() * 100.0);
//! model.save("model.txt")?;
//! # Ok(())
//! # }
//! ```

use crate::core::{FeatureNode, Parameter, Problem, Result, SolverType};
use crate::data::read_problem;
use crate::model::Model;
use crate::persistence;
use crate::train::{cross_validation, train_with_rng};
use crate::utils::random::{Random, DEFAULT_SEED};
use std::path::Path;

/// Builder for training parameters
#[derive(Debug, Clone)]
pub struct LinearClassifier {
    solver_type: SolverType,
    c: f64,
    epsilon: Option<f64>,
    class_weights: Vec<(i32, f64)>,
    bias: f64,
    seed: u64,
}

impl LinearClassifier {
    /// Dual L2-loss SVM, `C = 1`, no bias feature, solver-default tolerance
    pub fn new() -> Self {
        Self {
            solver_type: SolverType::L2R_L2LOSS_SVC_DUAL,
            c: 1.0,
            epsilon: None,
            class_weights: Vec::new(),
            bias: -1.0,
            seed: DEFAULT_SEED,
        }
    }

    pub fn with_solver(mut self, solver_type: SolverType) -> Self {
        self.solver_type = solver_type;
        self
    }

    /// Set regularization parameter C
    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    /// Set stopping tolerance
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = Some(epsilon);
        self
    }

    /// Multiply the penalty of class `label` by `weight`
    pub fn with_class_weight(mut self, label: i32, weight: f64) -> Self {
        self.class_weights.push((label, weight));
        self
    }

    /// Append a bias feature with this value when reading data (`< 0` disables)
    pub fn with_bias(mut self, bias: f64) -> Self {
        self.bias = bias;
        self
    }

    /// Seed for solver shuffles and fold assignment
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }

    /// Validated parameter set
    pub fn parameter(&self) -> Result<Parameter> {
        let eps = self
            .epsilon
            .unwrap_or_else(|| self.solver_type.default_eps());
        let (labels, weights): (Vec<i32>, Vec<f64>) = self.class_weights.iter().copied().unzip();
        Parameter::new(self.solver_type, self.c, eps)?.with_weights(&labels, &weights)
    }

    /// Train on an in-memory problem
    pub fn train(&self, problem: &Problem) -> Result<TrainedModel> {
        let param = self.parameter()?;
        let mut rng = Random::new(self.seed);
        let model = train_with_rng(problem, &param, &mut rng)?;
        Ok(TrainedModel { model })
    }

    /// Read a sparse text file and train on it
    pub fn train_from_file<P: AsRef<Path>>(&self, path: P) -> Result<TrainedModel> {
        let problem = read_problem(path, self.bias)?;
        self.train(&problem)
    }

    /// k-fold cross-validation accuracy
    pub fn cross_validate(&self, problem: &Problem, nr_fold: usize) -> Result<Evaluation> {
        let param = self.parameter()?;
        let mut rng = Random::new(self.seed);
        let target = cross_validation(problem, &param, nr_fold, &mut rng)?;
        Ok(Evaluation::from_predictions(problem.labels(), &target))
    }
}

impl Default for LinearClassifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Trained model with a prediction and evaluation interface
#[derive(Debug, Clone)]
pub struct TrainedModel {
    model: Model,
}

impl TrainedModel {
    /// Load a model saved in the text format
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            model: Model::load(path)?,
        })
    }

    /// Load a model exported as JSON
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            model: persistence::load_model_json(path)?,
        })
    }

    /// Predict a single instance
    pub fn predict(&self, x: &[FeatureNode]) -> i32 {
        self.model.predict(x)
    }

    /// Predicted label and class probabilities (logistic regression only)
    pub fn predict_probability(&self, x: &[FeatureNode]) -> Result<(i32, Vec<f64>)> {
        self.model.predict_probability(x)
    }

    /// Predict every instance of a problem
    pub fn predict_problem(&self, problem: &Problem) -> Vec<i32> {
        problem
            .instances()
            .iter()
            .map(|x| self.model.predict(x))
            .collect()
    }

    /// Predict every instance of a sparse text file
    pub fn predict_from_file<P: AsRef<Path>>(&self, path: P) -> Result<Vec<i32>> {
        let problem = read_problem(path, -1.0)?;
        Ok(self.predict_problem(&problem))
    }

    /// Accuracy on a labeled problem
    pub fn evaluate(&self, problem: &Problem) -> Evaluation {
        Evaluation::from_predictions(problem.labels(), &self.predict_problem(problem))
    }

    /// Accuracy on a labeled sparse text file
    pub fn evaluate_from_file<P: AsRef<Path>>(&self, path: P) -> Result<Evaluation> {
        let problem = read_problem(path, -1.0)?;
        Ok(self.evaluate(&problem))
    }

    /// Save in the text format
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.model.save(path)
    }

    /// Save as JSON
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        persistence::save_model_json(&self.model, path)
    }

    /// Get the underlying model
    pub fn inner(&self) -> &Model {
        &self.model
    }

    pub fn into_inner(self) -> Model {
        self.model
    }
}

impl From<Model> for TrainedModel {
    fn from(model: Model) -> Self {
        Self { model }
    }
}

/// Classification accuracy counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub correct: usize,
    pub total: usize,
}

impl Evaluation {
    /// Compare predicted labels against the true ones
    pub fn from_predictions(labels: &[i32], predicted: &[i32]) -> Self {
        let correct = labels
            .iter()
            .zip(predicted)
            .filter(|(actual, pred)| actual == pred)
            .count();
        Self {
            correct,
            total: labels.len(),
        }
    }

    /// `correct / total`, or 0 for an empty set
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }
}

/// Convenience functions for quick operations
pub mod quick {
    use super::*;

    /// Train with default parameters on a sparse text file
    pub fn train_file<P: AsRef<Path>>(path: P) -> Result<TrainedModel> {
        LinearClassifier::new().train_from_file(path)
    }

    /// Train with a custom C on a sparse text file
    pub fn train_file_with_c<P: AsRef<Path>>(path: P, c: f64) -> Result<TrainedModel> {
        LinearClassifier::new().with_c(c).train_from_file(path)
    }

    /// Train on one file and report accuracy on another
    pub fn evaluate_split<P1: AsRef<Path>, P2: AsRef<Path>>(
        train_path: P1,
        test_path: P2,
    ) -> Result<f64> {
        let model = train_file(train_path)?;
        Ok(model.evaluate_from_file(test_path)?.accuracy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LinearError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn separable() -> Problem {
        Problem::new(
            vec![
                vec![FeatureNode::new(1, 2.0)],
                vec![FeatureNode::new(1, 1.5)],
                vec![FeatureNode::new(1, -2.0)],
                vec![FeatureNode::new(1, -1.5)],
            ],
            vec![1, 1, -1, -1],
            -1.0,
        )
        .unwrap()
    }

    #[test]
    fn test_builder_pattern() {
        let classifier = LinearClassifier::new()
            .with_solver(SolverType::L1R_LR)
            .with_c(2.0)
            .with_class_weight(1, 3.0)
            .with_seed(9);
        let param = classifier.parameter().unwrap();
        assert_eq!(param.solver_type(), SolverType::L1R_LR);
        assert_eq!(param.c(), 2.0);
        assert_eq!(param.eps(), 0.01);
        assert_eq!(param.weights().collect::<Vec<_>>(), vec![(1, 3.0)]);
    }

    #[test]
    fn test_invalid_c_is_rejected() {
        let result = LinearClassifier::new().with_c(0.0).train(&separable());
        assert!(matches!(result, Err(LinearError::InvalidParameter(_))));
    }

    #[test]
    fn test_quick_training() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "+1 1:2.0").unwrap();
        writeln!(file, "-1 1:-2.0").unwrap();
        writeln!(file, "+1 1:1.5").unwrap();
        writeln!(file, "-1 1:-1.5").unwrap();
        file.flush().unwrap();

        let model = quick::train_file(file.path()).unwrap();
        assert_eq!(model.predict(&[FeatureNode::new(1, 1.0)]), 1);
        assert_eq!(model.predict(&[FeatureNode::new(1, -1.0)]), -1);

        let accuracy = quick::evaluate_split(file.path(), file.path()).unwrap();
        assert_eq!(accuracy, 1.0);
    }

    #[test]
    fn test_evaluation_counts() {
        let evaluation = Evaluation::from_predictions(&[1, 2, 3, 1], &[1, 2, 1, 1]);
        assert_eq!(evaluation, Evaluation { correct: 3, total: 4 });
        assert_eq!(evaluation.accuracy(), 0.75);
        assert_eq!(Evaluation::from_predictions(&[], &[]).accuracy(), 0.0);
    }

    #[test]
    fn test_cross_validate_is_seeded() {
        let classifier = LinearClassifier::new().with_seed(4);
        let first = classifier.cross_validate(&separable(), 2).unwrap();
        let second = classifier.cross_validate(&separable(), 2).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.total, 4);
    }

    #[test]
    fn test_save_and_load() {
        let model = LinearClassifier::new().train(&separable()).unwrap();
        let file = NamedTempFile::new().unwrap();
        model.save(file.path()).unwrap();

        let loaded = TrainedModel::load(file.path()).unwrap();
        for x in separable().instances() {
            assert_eq!(loaded.predict(x), model.predict(x));
        }
    }
}
