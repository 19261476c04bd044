//! Core type definitions for sparse linear classification

use crate::core::{LinearError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// One `(index, value)` entry of a sparse feature vector.
///
/// Indices are 1-based. Within one instance the nodes must be stored in
/// strictly ascending index order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureNode {
    pub index: usize,
    pub value: f64,
}

impl FeatureNode {
    /// Create a new feature node
    pub fn new(index: usize, value: f64) -> Self {
        Self { index, value }
    }
}

/// Training algorithm selector
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SolverType {
    /// L2-regularized logistic regression (primal, trust-region Newton)
    L2R_LR,
    /// L2-regularized L2-loss support vector classification (dual)
    L2R_L2LOSS_SVC_DUAL,
    /// L2-regularized L2-loss support vector classification (primal)
    L2R_L2LOSS_SVC,
    /// L2-regularized L1-loss support vector classification (dual)
    L2R_L1LOSS_SVC_DUAL,
    /// Multi-class support vector classification by Crammer and Singer
    MCSVM_CS,
    /// L1-regularized L2-loss support vector classification
    L1R_L2LOSS_SVC,
    /// L1-regularized logistic regression
    L1R_LR,
}

impl SolverType {
    /// All solver types in id order
    pub const ALL: [SolverType; 7] = [
        SolverType::L2R_LR,
        SolverType::L2R_L2LOSS_SVC_DUAL,
        SolverType::L2R_L2LOSS_SVC,
        SolverType::L2R_L1LOSS_SVC_DUAL,
        SolverType::MCSVM_CS,
        SolverType::L1R_L2LOSS_SVC,
        SolverType::L1R_LR,
    ];

    /// Name as written in model files
    pub fn name(self) -> &'static str {
        match self {
            SolverType::L2R_LR => "L2R_LR",
            SolverType::L2R_L2LOSS_SVC_DUAL => "L2R_L2LOSS_SVC_DUAL",
            SolverType::L2R_L2LOSS_SVC => "L2R_L2LOSS_SVC",
            SolverType::L2R_L1LOSS_SVC_DUAL => "L2R_L1LOSS_SVC_DUAL",
            SolverType::MCSVM_CS => "MCSVM_CS",
            SolverType::L1R_L2LOSS_SVC => "L1R_L2LOSS_SVC",
            SolverType::L1R_LR => "L1R_LR",
        }
    }

    /// Numeric id used on the command line
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Look up a solver type by its numeric id
    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.get(id as usize).copied()
    }

    /// Conventional stopping tolerance for this solver family
    pub fn default_eps(self) -> f64 {
        match self {
            SolverType::L2R_LR
            | SolverType::L2R_L2LOSS_SVC
            | SolverType::L1R_L2LOSS_SVC
            | SolverType::L1R_LR => 0.01,
            SolverType::L2R_L2LOSS_SVC_DUAL
            | SolverType::L2R_L1LOSS_SVC_DUAL
            | SolverType::MCSVM_CS => 0.1,
        }
    }

    /// Whether a two-class model still keeps one weight column per class
    pub fn is_multiclass(self) -> bool {
        self == SolverType::MCSVM_CS
    }

    /// Whether the model supports probability estimates
    pub fn supports_probability(self) -> bool {
        self == SolverType::L2R_LR
    }
}

impl fmt::Display for SolverType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SolverType {
    type Err = LinearError;

    /// Accepts either the model-file name or the numeric id
    fn from_str(s: &str) -> Result<Self> {
        if let Ok(id) = s.parse::<u8>() {
            return Self::from_id(id).ok_or_else(|| LinearError::UnknownSolverType(s.to_string()));
        }
        Self::ALL
            .iter()
            .copied()
            .find(|solver| solver.name() == s)
            .ok_or_else(|| LinearError::UnknownSolverType(s.to_string()))
    }
}

/// Training parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    solver_type: SolverType,
    c: f64,
    eps: f64,
    weight_label: Vec<i32>,
    weight: Vec<f64>,
}

impl Parameter {
    /// Create a parameter set, rejecting non-positive `C` or `eps`
    pub fn new(solver_type: SolverType, c: f64, eps: f64) -> Result<Self> {
        if !(c > 0.0) {
            return Err(LinearError::InvalidParameter(format!(
                "C must be > 0, got: {c}"
            )));
        }
        if !(eps > 0.0) {
            return Err(LinearError::InvalidParameter(format!(
                "eps must be > 0, got: {eps}"
            )));
        }
        Ok(Self {
            solver_type,
            c,
            eps,
            weight_label: Vec::new(),
            weight: Vec::new(),
        })
    }

    /// Scale the penalty of class `labels[i]` by `weights[i]`.
    ///
    /// Classes not listed keep a multiplier of 1.
    pub fn with_weights(mut self, labels: &[i32], weights: &[f64]) -> Result<Self> {
        if labels.len() != weights.len() {
            return Err(LinearError::InvalidParameter(format!(
                "weight labels and weights must have the same length ({} != {})",
                labels.len(),
                weights.len()
            )));
        }
        self.weight_label = labels.to_vec();
        self.weight = weights.to_vec();
        Ok(self)
    }

    pub fn solver_type(&self) -> SolverType {
        self.solver_type
    }

    pub fn c(&self) -> f64 {
        self.c
    }

    pub fn eps(&self) -> f64 {
        self.eps
    }

    /// Number of per-class weight overrides
    pub fn num_weights(&self) -> usize {
        self.weight.len()
    }

    /// Per-class weight overrides as `(label, weight)` pairs
    pub fn weights(&self) -> impl Iterator<Item = (i32, f64)> + '_ {
        self.weight_label
            .iter()
            .copied()
            .zip(self.weight.iter().copied())
    }
}

/// A labeled sparse training set.
///
/// `n` counts the synthetic bias feature when `bias >= 0`; in that case every
/// instance ends with the node `(n, bias)`.
#[derive(Debug, Clone)]
pub struct Problem {
    n: usize,
    y: Vec<i32>,
    x: Vec<Vec<FeatureNode>>,
    bias: f64,
}

impl Problem {
    /// Build a problem from instances that do not yet carry a bias node.
    ///
    /// The feature count is the largest index seen; if `bias >= 0` the node
    /// `(max_index + 1, bias)` is appended to every instance.
    pub fn new(mut x: Vec<Vec<FeatureNode>>, y: Vec<i32>, bias: f64) -> Result<Self> {
        if x.len() != y.len() {
            return Err(LinearError::InvalidParameter(format!(
                "number of instances ({}) and labels ({}) differ",
                x.len(),
                y.len()
            )));
        }

        let max_index = x
            .iter()
            .flat_map(|row| row.iter().map(|node| node.index))
            .max()
            .unwrap_or(0);

        let n = if bias >= 0.0 {
            let bias_index = max_index + 1;
            for row in &mut x {
                row.push(FeatureNode::new(bias_index, bias));
            }
            bias_index
        } else {
            max_index
        };

        Ok(Self { n, y, x, bias })
    }

    /// Assemble a problem from raw parts without touching the instances.
    ///
    /// Ordering of the feature nodes is checked at training time.
    pub fn from_parts(n: usize, x: Vec<Vec<FeatureNode>>, y: Vec<i32>, bias: f64) -> Result<Self> {
        if x.len() != y.len() {
            return Err(LinearError::InvalidParameter(format!(
                "number of instances ({}) and labels ({}) differ",
                x.len(),
                y.len()
            )));
        }
        Ok(Self { n, y, x, bias })
    }

    /// Read a problem from a sparse text file
    pub fn read_from_file<P: AsRef<Path>>(path: P, bias: f64) -> Result<Self> {
        crate::data::read_problem(path, bias)
    }

    /// Number of instances
    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    /// Number of features, including the bias feature if enabled
    pub fn n_features(&self) -> usize {
        self.n
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }

    pub fn labels(&self) -> &[i32] {
        &self.y
    }

    pub fn instances(&self) -> &[Vec<FeatureNode>] {
        &self.x
    }

    pub fn instance(&self, i: usize) -> &[FeatureNode] {
        &self.x[i]
    }

    /// Borrowed view over all instances
    pub(crate) fn view(&self) -> ProblemView<'_> {
        ProblemView {
            n: self.n,
            bias: self.bias,
            x: self.x.iter().map(Vec::as_slice).collect(),
            y: self.y.clone(),
        }
    }
}

/// Borrowed subset of a [`Problem`]'s rows, used for subproblems.
#[derive(Debug, Clone)]
pub(crate) struct ProblemView<'a> {
    pub n: usize,
    pub bias: f64,
    pub x: Vec<&'a [FeatureNode]>,
    pub y: Vec<i32>,
}

impl ProblemView<'_> {
    pub fn len(&self) -> usize {
        self.y.len()
    }

    /// Check the ascending-index invariant and the index range of every row
    pub fn validate(&self) -> Result<()> {
        if self.y.is_empty() {
            return Err(LinearError::EmptyDataset);
        }
        for (instance, row) in self.x.iter().enumerate() {
            let mut previous = 0;
            for node in row.iter() {
                if node.index <= previous {
                    return Err(LinearError::UnsortedFeatures {
                        instance,
                        index: node.index,
                        previous,
                    });
                }
                if node.index > self.n {
                    return Err(LinearError::FeatureIndexOutOfRange {
                        instance,
                        index: node.index,
                        n: self.n,
                    });
                }
                previous = node.index;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nodes(pairs: &[(usize, f64)]) -> Vec<FeatureNode> {
        pairs.iter().map(|&(i, v)| FeatureNode::new(i, v)).collect()
    }

    #[test]
    fn test_solver_type_names_round_trip() {
        for solver in SolverType::ALL {
            assert_eq!(solver.name().parse::<SolverType>().unwrap(), solver);
            assert_eq!(solver.to_string(), solver.name());
        }
    }

    #[test]
    fn test_solver_type_ids() {
        assert_eq!("0".parse::<SolverType>().unwrap(), SolverType::L2R_LR);
        assert_eq!("1".parse::<SolverType>().unwrap(), SolverType::L2R_L2LOSS_SVC_DUAL);
        assert_eq!("4".parse::<SolverType>().unwrap(), SolverType::MCSVM_CS);
        assert_eq!("6".parse::<SolverType>().unwrap(), SolverType::L1R_LR);
        assert_eq!(SolverType::L1R_L2LOSS_SVC.id(), 5);
        assert!(SolverType::from_id(7).is_none());
    }

    #[test]
    fn test_unknown_solver_type() {
        let result = "L2R_SOMETHING".parse::<SolverType>();
        assert!(matches!(result, Err(LinearError::UnknownSolverType(_))));
        assert!("9".parse::<SolverType>().is_err());
    }

    #[test]
    fn test_parameter_validation() {
        assert!(Parameter::new(SolverType::L2R_LR, 1.0, 0.01).is_ok());
        assert!(Parameter::new(SolverType::L2R_LR, 0.0, 0.01).is_err());
        assert!(Parameter::new(SolverType::L2R_LR, -1.0, 0.01).is_err());
        assert!(Parameter::new(SolverType::L2R_LR, 1.0, 0.0).is_err());
        assert!(Parameter::new(SolverType::L2R_LR, f64::NAN, 0.01).is_err());
    }

    #[test]
    fn test_parameter_weights() {
        let param = Parameter::new(SolverType::L2R_L2LOSS_SVC_DUAL, 2.0, 0.1)
            .unwrap()
            .with_weights(&[1, -1], &[3.0, 0.5])
            .unwrap();
        assert_eq!(param.num_weights(), 2);
        let weights: Vec<_> = param.weights().collect();
        assert_eq!(weights, vec![(1, 3.0), (-1, 0.5)]);

        let mismatch = Parameter::new(SolverType::L2R_LR, 1.0, 0.01)
            .unwrap()
            .with_weights(&[1, 2], &[1.0]);
        assert!(matches!(mismatch, Err(LinearError::InvalidParameter(_))));
    }

    #[test]
    fn test_problem_new_without_bias() {
        let problem = Problem::new(
            vec![nodes(&[(2, 0.1), (3, 0.2)]), nodes(&[(1, 0.4)])],
            vec![1, 2],
            -1.0,
        )
        .unwrap();
        assert_eq!(problem.len(), 2);
        assert_eq!(problem.n_features(), 3);
        assert_eq!(problem.instance(1), nodes(&[(1, 0.4)]).as_slice());
    }

    #[test]
    fn test_problem_new_appends_bias() {
        let problem = Problem::new(
            vec![nodes(&[(2, 0.1), (3, 0.2)]), nodes(&[(1, 0.4)])],
            vec![1, 2],
            1.0,
        )
        .unwrap();
        assert_eq!(problem.n_features(), 4);
        assert_eq!(problem.instance(0).last(), Some(&FeatureNode::new(4, 1.0)));
        assert_eq!(problem.instance(1), nodes(&[(1, 0.4), (4, 1.0)]).as_slice());
    }

    #[test]
    fn test_problem_length_mismatch() {
        let result = Problem::new(vec![nodes(&[(1, 1.0)])], vec![1, 2], -1.0);
        assert!(result.is_err());
    }

    #[test]
    fn test_view_validation() {
        let sorted = Problem::new(vec![nodes(&[(1, 0.2), (2, 0.1)])], vec![1], -1.0).unwrap();
        assert!(sorted.view().validate().is_ok());

        let unsorted = Problem::new(vec![nodes(&[(2, 0.1), (1, 0.2)])], vec![1], -1.0).unwrap();
        assert!(matches!(
            unsorted.view().validate(),
            Err(LinearError::UnsortedFeatures { index: 1, previous: 2, .. })
        ));

        let duplicate = Problem::new(vec![nodes(&[(1, 0.1), (1, 0.2)])], vec![1], -1.0).unwrap();
        assert!(duplicate.view().validate().is_err());

        let out_of_range =
            Problem::from_parts(1, vec![nodes(&[(1, 0.1), (2, 0.2)])], vec![1], -1.0).unwrap();
        assert!(matches!(
            out_of_range.view().validate(),
            Err(LinearError::FeatureIndexOutOfRange { index: 2, n: 1, .. })
        ));

        let empty = Problem::new(Vec::new(), Vec::new(), -1.0).unwrap();
        assert!(matches!(empty.view().validate(), Err(LinearError::EmptyDataset)));
    }
}
