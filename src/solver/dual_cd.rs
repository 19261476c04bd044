//! Dual coordinate descent for L2-regularized SVMs
//!
//! Solves
//!
//! ```text
//! min_α  0.5 αᵀ Q̄ α - eᵀα    s.t.  0 <= α_i <= U_i
//! Q̄ = Q + D,  Q_ij = y_i y_j x_iᵀ x_j
//! ```
//!
//! with `D_ii = 0, U_i = C_i` for the hinge loss and `D_ii = 1/(2 C_i),
//! U_i = ∞` for the squared hinge loss. The primal weights `w = Σ α_i y_i x_i`
//! are maintained alongside the dual variables.
//!
//! Reference: C.-J. Hsieh et al., "A dual coordinate descent method for
//! large-scale linear SVM", ICML 2008.

use crate::solver::shrinking::{next_lower_threshold, next_upper_threshold, ActiveSet};
use crate::solver::{BinaryProblem, SolveReport};
use crate::utils::random::Random;
use crate::utils::sparse;
use log::{debug, info, warn};

/// Default cap on passes over the data
pub const DUAL_CD_MAX_ITER: usize = 1000;

/// Loss term of the dual SVM problem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DualLoss {
    /// `max(0, 1 - y wᵀx)`
    Hinge,
    /// `max(0, 1 - y wᵀx)²`
    SquaredHinge,
}

/// Dual variables together with the run summary
#[derive(Debug, Clone)]
pub struct DualSolution {
    pub alpha: Vec<f64>,
    pub report: SolveReport,
}

impl DualSolution {
    /// Number of instances with `α_i > 0`
    pub fn support_vector_count(&self) -> usize {
        self.alpha.iter().filter(|&&a| a > 0.0).count()
    }
}

/// Dual coordinate-descent solver
#[derive(Debug, Clone)]
pub struct DualCoordinateDescent {
    loss: DualLoss,
    eps: f64,
    max_iter: usize,
}

impl DualCoordinateDescent {
    pub fn new(loss: DualLoss, eps: f64) -> Self {
        Self {
            loss,
            eps,
            max_iter: DUAL_CD_MAX_ITER,
        }
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// `(D_ii, U_i)` for the negative and the positive class
    fn bounds(&self, cp: f64, cn: f64) -> ([f64; 2], [f64; 2]) {
        match self.loss {
            DualLoss::SquaredHinge => ([0.5 / cn, 0.5 / cp], [f64::INFINITY; 2]),
            DualLoss::Hinge => ([0.0; 2], [cn, cp]),
        }
    }

    /// Run coordinate descent, overwriting `w` with the primal solution
    pub fn solve(
        &self,
        prob: &BinaryProblem<'_>,
        w: &mut [f64],
        cp: f64,
        cn: f64,
        rng: &mut Random,
    ) -> DualSolution {
        let l = prob.len();
        let (diag, upper_bound) = self.bounds(cp, cn);
        let slot = |i: usize| usize::from(prob.y[i] == 1);

        w.fill(0.0);
        let mut alpha = vec![0.0; l];
        let qd: Vec<f64> = (0..l)
            .map(|i| diag[slot(i)] + sparse::norm_squared(prob.x[i]))
            .collect();

        let mut active = ActiveSet::new(l);
        let mut pg_max_old = f64::INFINITY;
        let mut pg_min_old = f64::NEG_INFINITY;

        let mut iter = 0;
        while iter < self.max_iter {
            let mut pg_max_new = f64::NEG_INFINITY;
            let mut pg_min_new = f64::INFINITY;

            active.shuffle(rng);

            let mut s = 0;
            while s < active.active_size() {
                let i = active.get(s);
                let yi = f64::from(prob.y[i]);
                let xi = prob.x[i];
                let k = slot(i);
                let c = upper_bound[k];

                let g = yi * sparse::dot(w, xi) - 1.0 + alpha[i] * diag[k];

                let mut pg = 0.0;
                if alpha[i] == 0.0 {
                    if g > pg_max_old {
                        active.shrink(s);
                        continue;
                    } else if g < 0.0 {
                        pg = g;
                    }
                } else if alpha[i] == c {
                    if g < pg_min_old {
                        active.shrink(s);
                        continue;
                    } else if g > 0.0 {
                        pg = g;
                    }
                } else {
                    pg = g;
                }

                pg_max_new = pg_max_new.max(pg);
                pg_min_new = pg_min_new.min(pg);

                if pg.abs() > 1.0e-12 {
                    let alpha_old = alpha[i];
                    alpha[i] = (alpha[i] - g / qd[i]).max(0.0).min(c);
                    sparse::axpy((alpha[i] - alpha_old) * yi, xi, w);
                }
                s += 1;
            }

            iter += 1;

            if pg_max_new - pg_min_new <= self.eps {
                if active.is_full() {
                    break;
                }
                debug!("unshrinking all {} instances", l);
                active.restore_all();
                pg_max_old = f64::INFINITY;
                pg_min_old = f64::NEG_INFINITY;
                continue;
            }
            pg_max_old = next_upper_threshold(pg_max_new);
            pg_min_old = next_lower_threshold(pg_min_new);
        }

        info!("optimization finished, #iter = {iter}");
        let converged = iter < self.max_iter;
        if !converged {
            warn!("reaching max number of dual coordinate descent iterations; the primal solver may be faster");
        }

        let mut v = sparse::dense_dot(w, w);
        let mut n_sv = 0;
        for i in 0..l {
            v += alpha[i] * (alpha[i] * diag[slot(i)] - 2.0);
            if alpha[i] > 0.0 {
                n_sv += 1;
            }
        }
        let objective = v / 2.0;
        debug!("objective value = {objective}");
        debug!("nSV = {n_sv}");

        for (i, &a) in alpha.iter().enumerate() {
            debug_assert!(a >= 0.0 && a <= upper_bound[slot(i)]);
        }

        DualSolution {
            alpha,
            report: SolveReport {
                iterations: iter,
                objective,
                converged,
            },
        }
    }
}
