//! Objective functions for the trust-region Newton solver

pub mod logistic;
pub mod squared_hinge;
pub mod traits;

pub use self::logistic::*;
pub use self::squared_hinge::*;
pub use self::traits::*;

use crate::core::FeatureNode;
use crate::utils::sparse;

/// `out = X v`
fn xv(x: &[&[FeatureNode]], v: &[f64], out: &mut [f64]) {
    for (out_i, row) in out.iter_mut().zip(x) {
        *out_i = sparse::dot(v, row);
    }
}

/// `out = X^T v`
fn xtv(x: &[&[FeatureNode]], v: &[f64], out: &mut [f64]) {
    out.fill(0.0);
    for (&v_i, row) in v.iter().zip(x) {
        sparse::axpy(v_i, row, out);
    }
}

/// Per-instance cost: `cp` for positive labels, `cn` otherwise
fn instance_costs(y: &[i8], cp: f64, cn: f64) -> Vec<f64> {
    y.iter().map(|&yi| if yi == 1 { cp } else { cn }).collect()
}
