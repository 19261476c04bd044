//! Training orchestrator
//!
//! Groups the instances by class, derives per-class penalties and runs the
//! solver selected by the parameter's [`SolverType`](crate::core::SolverType):
//! once for two classes, once per class (one-vs-rest) for more, or a single
//! joint solve for Crammer-Singer.

pub mod cross_validation;

pub use self::cross_validation::*;

use crate::core::{FeatureNode, LinearError, Parameter, Problem, ProblemView, Result};
use crate::model::Model;
use crate::solver::{BinaryProblem, CrammerSingerSolver, MulticlassProblem, Solver};
use crate::utils::random::Random;
use log::{debug, info};
use std::ops::Range;

/// Initial number of class slots; grows by doubling
const INITIAL_CLASS_CAPACITY: usize = 16;

/// Instances bucketed by class in first-seen label order
#[derive(Debug, Clone, PartialEq)]
pub struct ClassGroups {
    /// Distinct labels in first-seen order
    pub labels: Vec<i32>,
    /// Instances per class slot
    pub count: Vec<usize>,
    /// First permuted position of each class slot
    pub start: Vec<usize>,
    /// Original indices, grouped by slot and stable within a slot
    pub perm: Vec<usize>,
}

impl ClassGroups {
    pub fn nr_class(&self) -> usize {
        self.labels.len()
    }

    /// Permuted positions occupied by class slot `k`
    pub fn range(&self, k: usize) -> Range<usize> {
        self.start[k]..self.start[k] + self.count[k]
    }

    /// Class slot of every permuted position
    fn slots(&self) -> Vec<usize> {
        let mut slots = vec![0; self.perm.len()];
        for k in 0..self.nr_class() {
            slots[self.range(k)].fill(k);
        }
        slots
    }
}

/// Bucket `y` by label with a stable scatter
pub fn group_classes(y: &[i32]) -> ClassGroups {
    let mut labels: Vec<i32> = Vec::with_capacity(INITIAL_CLASS_CAPACITY);
    let mut count: Vec<usize> = Vec::with_capacity(INITIAL_CLASS_CAPACITY);
    let mut data_label = Vec::with_capacity(y.len());

    for &this_label in y {
        let slot = match labels.iter().position(|&label| label == this_label) {
            Some(slot) => {
                count[slot] += 1;
                slot
            }
            None => {
                labels.push(this_label);
                count.push(1);
                labels.len() - 1
            }
        };
        data_label.push(slot);
    }

    let mut start = Vec::with_capacity(labels.len());
    let mut next = 0;
    for &c in &count {
        start.push(next);
        next += c;
    }

    let mut cursor = start.clone();
    let mut perm = vec![0; y.len()];
    for (i, &slot) in data_label.iter().enumerate() {
        perm[cursor[slot]] = i;
        cursor[slot] += 1;
    }

    ClassGroups {
        labels,
        count,
        start,
        perm,
    }
}

/// Base `C` scaled by the per-class weight overrides
pub fn weighted_costs(param: &Parameter, labels: &[i32]) -> Result<Vec<f64>> {
    let mut weighted_c = vec![param.c(); labels.len()];
    for (label, weight) in param.weights() {
        let slot = labels
            .iter()
            .position(|&l| l == label)
            .ok_or(LinearError::UnknownWeightLabel(label))?;
        weighted_c[slot] *= weight;
    }
    Ok(weighted_c)
}

/// Train a model with a freshly seeded default generator
pub fn train(problem: &Problem, param: &Parameter) -> Result<Model> {
    train_with_rng(problem, param, &mut Random::default())
}

/// Train a model, drawing solver shuffles from `rng`
pub fn train_with_rng(problem: &Problem, param: &Parameter, rng: &mut Random) -> Result<Model> {
    train_view(&problem.view(), param, rng)
}

pub(crate) fn train_view(
    prob: &ProblemView<'_>,
    param: &Parameter,
    rng: &mut Random,
) -> Result<Model> {
    prob.validate()?;

    let l = prob.len();
    let n = prob.n;
    let nr_feature = if prob.bias >= 0.0 { n.saturating_sub(1) } else { n };
    let solver_type = param.solver_type();

    let groups = group_classes(&prob.y);
    let nr_class = groups.nr_class();
    let weighted_c = weighted_costs(param, &groups.labels)?;
    info!(
        "training {} on {} instances, {} features, {} classes",
        solver_type, l, n, nr_class
    );
    debug!("class labels {:?}, counts {:?}", groups.labels, groups.count);

    let x: Vec<&[FeatureNode]> = groups.perm.iter().map(|&i| prob.x[i]).collect();

    let w = match Solver::from(solver_type) {
        Solver::CrammerSinger => {
            let y = groups.slots();
            let sub_prob = MulticlassProblem {
                n,
                nr_class,
                x: &x,
                y: &y,
            };
            let mut w = vec![0.0; n * nr_class];
            CrammerSingerSolver::new(param.eps()).solve(&sub_prob, &weighted_c, &mut w, rng);
            w
        }
        Solver::OneVsRest(solver) if nr_class == 2 => {
            let mut y = vec![-1i8; l];
            y[groups.range(0)].fill(1);

            let mut w = vec![0.0; n];
            let sub_prob = BinaryProblem::new(n, &x, &y);
            solver.solve(&sub_prob, &mut w, param.eps(), weighted_c[0], weighted_c[1], rng);
            w
        }
        Solver::OneVsRest(solver) => {
            let mut model_w = vec![0.0; n * nr_class];
            let mut w = vec![0.0; n];
            let mut y = vec![-1i8; l];

            for k in 0..nr_class {
                y.fill(-1);
                y[groups.range(k)].fill(1);
                debug!("one-vs-rest for label {}", groups.labels[k]);

                let sub_prob = BinaryProblem::new(n, &x, &y);
                solver.solve(&sub_prob, &mut w, param.eps(), weighted_c[k], param.c(), rng);

                for (j, &wj) in w.iter().enumerate() {
                    model_w[j * nr_class + k] = wj;
                }
            }
            model_w
        }
    };

    Ok(Model::from_parts(
        solver_type,
        groups.labels,
        nr_feature,
        prob.bias,
        w,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SolverType;

    #[test]
    fn test_group_classes_first_seen_stable() {
        let groups = group_classes(&[3, 1, 3, 2, 1, 3]);
        assert_eq!(groups.labels, vec![3, 1, 2]);
        assert_eq!(groups.count, vec![3, 2, 1]);
        assert_eq!(groups.start, vec![0, 3, 5]);
        assert_eq!(groups.perm, vec![0, 2, 5, 1, 4, 3]);
        assert_eq!(groups.slots(), vec![0, 0, 0, 1, 1, 2]);
    }

    #[test]
    fn test_group_classes_beyond_initial_capacity() {
        let y: Vec<i32> = (0..40).rev().collect();
        let groups = group_classes(&y);
        assert_eq!(groups.nr_class(), 40);
        assert_eq!(groups.labels[0], 39);
        assert_eq!(groups.perm, (0..40).collect::<Vec<_>>());
    }

    #[test]
    fn test_weighted_costs() {
        let param = Parameter::new(SolverType::L2R_LR, 2.0, 0.01)
            .unwrap()
            .with_weights(&[5, 7], &[0.5, 3.0])
            .unwrap();
        let costs = weighted_costs(&param, &[7, 1, 5]).unwrap();
        assert_eq!(costs, vec![6.0, 2.0, 1.0]);

        let unknown = Parameter::new(SolverType::L2R_LR, 1.0, 0.01)
            .unwrap()
            .with_weights(&[9], &[2.0])
            .unwrap();
        assert!(matches!(
            weighted_costs(&unknown, &[1, 2]),
            Err(LinearError::UnknownWeightLabel(9))
        ));
    }

    #[test]
    fn test_train_rejects_unsorted_rows() {
        let problem = Problem::new(
            vec![
                vec![FeatureNode::new(2, 0.1), FeatureNode::new(1, 0.2)],
                vec![FeatureNode::new(1, 0.3)],
            ],
            vec![1, -1],
            -1.0,
        )
        .unwrap();
        let param = Parameter::new(SolverType::L2R_L2LOSS_SVC_DUAL, 1.0, 0.1).unwrap();
        assert!(matches!(
            train(&problem, &param),
            Err(LinearError::UnsortedFeatures { instance: 0, .. })
        ));
    }

    #[test]
    fn test_nr_feature_excludes_bias() {
        let problem = Problem::new(
            vec![vec![FeatureNode::new(1, 1.0)], vec![FeatureNode::new(2, 1.0)]],
            vec![1, -1],
            1.0,
        )
        .unwrap();
        let param = Parameter::new(SolverType::L2R_LR, 1.0, 0.01).unwrap();
        let model = train(&problem, &param).unwrap();
        assert_eq!(model.nr_feature(), 2);
        assert_eq!(model.feature_weights().len(), 3);
    }

    fn one_vs_rest_column(
        x: &[&[FeatureNode]],
        y: &[i8],
        n: usize,
        eps: f64,
        cp: f64,
        cn: f64,
    ) -> Vec<f64> {
        let mut w = vec![0.0; n];
        let prob = BinaryProblem::new(n, x, y);
        crate::solver::BinarySolver::TrustRegion(crate::solver::PrimalLoss::Logistic).solve(
            &prob,
            &mut w,
            eps,
            cp,
            cn,
            &mut Random::default(),
        );
        w
    }

    #[test]
    fn test_one_vs_rest_negative_cost_is_base_c() {
        let rows = vec![
            vec![FeatureNode::new(1, 1.0), FeatureNode::new(2, 0.2)],
            vec![FeatureNode::new(1, 0.8), FeatureNode::new(2, -0.3)],
            vec![FeatureNode::new(1, -0.4), FeatureNode::new(2, 1.0)],
            vec![FeatureNode::new(1, 0.1), FeatureNode::new(2, 0.9)],
            vec![FeatureNode::new(1, -0.9), FeatureNode::new(2, -0.7)],
            vec![FeatureNode::new(1, -0.6), FeatureNode::new(2, -1.1)],
        ];
        let problem = Problem::new(rows, vec![1, 1, 2, 2, 3, 3], -1.0).unwrap();
        let c = 1.5;
        let param = Parameter::new(SolverType::L2R_LR, c, 0.01)
            .unwrap()
            .with_weights(&[2], &[4.0])
            .unwrap();
        let model = train(&problem, &param).unwrap();
        assert_eq!(model.labels(), &[1, 2, 3]);

        let n = problem.n_features();
        let x: Vec<&[FeatureNode]> = problem.instances().iter().map(Vec::as_slice).collect();
        let column = |k: usize| -> Vec<f64> {
            (0..n).map(|j| model.feature_weights()[j * 3 + k]).collect()
        };

        let y1 = [1, 1, -1, -1, -1, -1];
        assert_eq!(column(0), one_vs_rest_column(&x, &y1, n, 0.01, c, c));

        let y2 = [-1, -1, 1, 1, -1, -1];
        let weighted = one_vs_rest_column(&x, &y2, n, 0.01, 4.0 * c, c);
        assert_eq!(column(1), weighted);
        assert_ne!(weighted, one_vs_rest_column(&x, &y2, n, 0.01, c, c));
    }

    #[test]
    fn test_single_class_problem() {
        let problem = Problem::new(
            vec![vec![FeatureNode::new(1, 1.0)], vec![FeatureNode::new(1, 2.0)]],
            vec![4, 4],
            -1.0,
        )
        .unwrap();
        let param = Parameter::new(SolverType::L2R_L2LOSS_SVC_DUAL, 1.0, 0.1).unwrap();
        let model = train(&problem, &param).unwrap();
        assert_eq!(model.nr_class(), 1);
        assert_eq!(model.predict(&[FeatureNode::new(1, -5.0)]), 4);
    }
}
