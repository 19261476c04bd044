//! Core traits for linear classification

use crate::core::FeatureNode;

/// Prediction surface of a trained classifier
pub trait Classifier {
    /// Raw decision values, one per weight column
    fn decision_values(&self, x: &[FeatureNode]) -> Vec<f64>;

    /// Predict the class label of a single instance
    fn predict(&self, x: &[FeatureNode]) -> i32;

    /// Predict multiple instances
    fn predict_batch(&self, xs: &[Vec<FeatureNode>]) -> Vec<i32> {
        xs.iter().map(|x| self.predict(x)).collect()
    }

    /// Number of classes seen during training
    fn nr_class(&self) -> usize;

    /// Bias value (`< 0` when the bias feature is disabled)
    fn bias(&self) -> f64;
}
