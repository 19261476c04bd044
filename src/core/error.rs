//! Error types for linear model training and I/O

use crate::core::SolverType;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LinearError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Unknown solver type: {0}")]
    UnknownSolverType(String),

    #[error("Class label {0} specified in weight is not found")]
    UnknownWeightLabel(i32),

    #[error(
        "Feature nodes must be sorted by index in ascending order: \
         instance {instance} has index {index} after {previous}"
    )]
    UnsortedFeatures {
        instance: usize,
        index: usize,
        previous: usize,
    },

    #[error("Feature index {index} of instance {instance} exceeds the feature count {n}")]
    FeatureIndexOutOfRange {
        instance: usize,
        index: usize,
        n: usize,
    },

    #[error("{message} ({file}:{line})")]
    InvalidInputData {
        file: String,
        line: usize,
        message: String,
    },

    #[error("Invalid model file: {0}")]
    ModelFormat(String),

    #[error("Probability estimates are only supported for logistic regression, not {0}")]
    ProbabilityNotSupported(SolverType),

    #[error("Empty dataset")]
    EmptyDataset,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type Result<T> = std::result::Result<T, LinearError>;
