//! Optimization algorithms for regularized linear classifiers
//!
//! Every binary solver works on a [`BinaryProblem`] whose labels are already
//! mapped to `+1`/`-1`, writes the weight vector in place and reports how the
//! run went. The Crammer-Singer solver handles all classes jointly and is
//! driven separately by the trainer.

pub mod dual_cd;
pub mod l1r_l2_svc;
pub mod l1r_lr;
pub mod mcsvm_cs;
pub mod shrinking;
pub mod transpose;
pub mod tron;

pub use self::dual_cd::*;
pub use self::l1r_l2_svc::*;
pub use self::l1r_lr::*;
pub use self::mcsvm_cs::*;
pub use self::shrinking::*;
pub use self::transpose::*;
pub use self::tron::*;

use crate::core::{FeatureNode, SolverType};
use crate::objective::{LogisticObjective, SquaredHingeObjective};
use crate::utils::random::Random;

/// Rows relabeled to `+1`/`-1` for one binary solve
#[derive(Debug, Clone, Copy)]
pub struct BinaryProblem<'a> {
    /// Number of features (bias feature included)
    pub n: usize,
    pub x: &'a [&'a [FeatureNode]],
    pub y: &'a [i8],
}

impl<'a> BinaryProblem<'a> {
    pub fn new(n: usize, x: &'a [&'a [FeatureNode]], y: &'a [i8]) -> Self {
        debug_assert_eq!(x.len(), y.len());
        Self { n, x, y }
    }

    /// Number of instances
    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    /// Number of `+1` instances
    pub fn positive_count(&self) -> usize {
        self.y.iter().filter(|&&yi| yi == 1).count()
    }
}

/// Outcome of one solver run
#[derive(Debug, Clone, PartialEq)]
pub struct SolveReport {
    /// Outer iterations performed
    pub iterations: usize,
    /// Final objective value (dual objective for the dual solvers)
    pub objective: f64,
    /// `false` when the iteration cap stopped the run
    pub converged: bool,
}

/// Loss term of an L2-regularized primal problem solved by trust-region Newton
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimalLoss {
    Logistic,
    SquaredHinge,
}

/// Algorithms that fit one weight vector per binary subproblem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinarySolver {
    TrustRegion(PrimalLoss),
    DualCoordinateDescent(DualLoss),
    L1SquaredHinge,
    L1Logistic,
}

/// Training algorithm selected by a [`SolverType`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Solver {
    /// One binary solve per class (or a single one for two classes)
    OneVsRest(BinarySolver),
    /// Joint multi-class solve
    CrammerSinger,
}

impl From<SolverType> for Solver {
    fn from(solver_type: SolverType) -> Self {
        match solver_type {
            SolverType::L2R_LR => Solver::OneVsRest(BinarySolver::TrustRegion(PrimalLoss::Logistic)),
            SolverType::L2R_L2LOSS_SVC => {
                Solver::OneVsRest(BinarySolver::TrustRegion(PrimalLoss::SquaredHinge))
            }
            SolverType::L2R_L2LOSS_SVC_DUAL => {
                Solver::OneVsRest(BinarySolver::DualCoordinateDescent(DualLoss::SquaredHinge))
            }
            SolverType::L2R_L1LOSS_SVC_DUAL => {
                Solver::OneVsRest(BinarySolver::DualCoordinateDescent(DualLoss::Hinge))
            }
            SolverType::L1R_L2LOSS_SVC => Solver::OneVsRest(BinarySolver::L1SquaredHinge),
            SolverType::L1R_LR => Solver::OneVsRest(BinarySolver::L1Logistic),
            SolverType::MCSVM_CS => Solver::CrammerSinger,
        }
    }
}

impl BinarySolver {
    /// Whether the stopping tolerance is scaled by the minority-class share
    fn scales_tolerance(self) -> bool {
        !matches!(self, BinarySolver::DualCoordinateDescent(_))
    }

    /// Fit `w` (length `prob.n`) on one binary subproblem.
    ///
    /// `cp` and `cn` are the penalties of the positive and negative instances.
    pub fn solve(
        self,
        prob: &BinaryProblem<'_>,
        w: &mut [f64],
        eps: f64,
        cp: f64,
        cn: f64,
        rng: &mut Random,
    ) -> SolveReport {
        let eps = if self.scales_tolerance() {
            let pos = prob.positive_count();
            let neg = prob.len() - pos;
            eps * pos.min(neg) as f64 / prob.len() as f64
        } else {
            eps
        };

        match self {
            BinarySolver::TrustRegion(PrimalLoss::Logistic) => {
                let mut objective = LogisticObjective::new(prob, cp, cn);
                TrustRegion::new(eps).minimize(&mut objective, w)
            }
            BinarySolver::TrustRegion(PrimalLoss::SquaredHinge) => {
                let mut objective = SquaredHingeObjective::new(prob, cp, cn);
                TrustRegion::new(eps).minimize(&mut objective, w)
            }
            BinarySolver::DualCoordinateDescent(loss) => {
                DualCoordinateDescent::new(loss, eps)
                    .solve(prob, w, cp, cn, rng)
                    .report
            }
            BinarySolver::L1SquaredHinge => {
                let columns = ColumnMajor::from_rows(prob, true);
                L1SquaredHingeSolver::new(eps).solve(&columns, w, cp, cn, rng)
            }
            BinarySolver::L1Logistic => {
                let columns = ColumnMajor::from_rows(prob, false);
                L1LogisticSolver::new(eps).solve(&columns, w, cp, cn, rng)
            }
        }
    }
}
