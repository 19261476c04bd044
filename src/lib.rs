//! Regularized sparse linear classifiers
//!
//! L2- and L1-regularized logistic regression and support vector
//! classification, plus the Crammer-Singer multi-class SVM, trained by
//! trust-region Newton or coordinate descent methods.
//!
//! Based on "LIBLINEAR: A Library for Large Linear Classification" by Fan,
//! Chang, Hsieh, Wang and Lin (JMLR 2008)

pub mod api;
pub mod core;
pub mod data;
pub mod model;
pub mod objective;
pub mod persistence;
pub mod solver;
pub mod train;
pub mod utils;

// Re-export main types for convenience
pub use crate::api::{Evaluation, LinearClassifier, TrainedModel};
pub use crate::core::traits::*;
pub use crate::core::types::*;
pub use crate::core::{LinearError, Result};
pub use crate::data::read_problem;
pub use crate::model::Model;
pub use crate::train::{cross_validation, train, train_with_rng};
pub use crate::utils::random::Random;

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
