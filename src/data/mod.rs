//! Training and test data input

pub mod libsvm;

pub use self::libsvm::*;
