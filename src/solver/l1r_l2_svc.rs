//! Coordinate descent for L1-regularized L2-loss SVM
//!
//! Minimizes `‖w‖₁ + Σ C_i max(0, 1 - y_i wᵀx_i)²` one feature at a time,
//! using a one-dimensional Newton direction and an Armijo-type line search.
//!
//! Reference: G.-X. Yuan et al., "A comparison of optimization methods and
//! software for large-scale L1-regularized linear classification", JMLR 11
//! (2010).

use crate::solver::shrinking::ActiveSet;
use crate::solver::transpose::ColumnMajor;
use crate::solver::SolveReport;
use crate::utils::random::Random;
use log::{debug, info, warn};

/// Default cap on passes over the features
pub const L1R_MAX_ITER: usize = 1000;
/// Line-search steps before giving up on a coordinate
pub(crate) const MAX_LINE_SEARCH: usize = 20;
/// Sufficient-decrease constant of the line search
pub(crate) const SIGMA: f64 = 0.01;

/// L1-regularized squared-hinge solver
#[derive(Debug, Clone)]
pub struct L1SquaredHingeSolver {
    eps: f64,
    max_iter: usize,
}

impl L1SquaredHingeSolver {
    pub fn new(eps: f64) -> Self {
        Self {
            eps,
            max_iter: L1R_MAX_ITER,
        }
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Minimize over `w`.
    ///
    /// `prob` must have been built with label-scaled values, so each column
    /// entry holds `y_i x_ij`.
    pub fn solve(
        &self,
        prob: &ColumnMajor,
        w: &mut [f64],
        cp: f64,
        cn: f64,
        rng: &mut Random,
    ) -> SolveReport {
        let l = prob.n_rows();
        let w_size = prob.n_columns();
        let c: Vec<f64> = prob
            .labels()
            .iter()
            .map(|&yi| if yi == 1 { cp } else { cn })
            .collect();

        // b_i = 1 - y_i wᵀx_i
        let mut b = vec![1.0; l];
        w.fill(0.0);
        let xj_sq: Vec<f64> = (0..w_size)
            .map(|j| {
                prob.column(j)
                    .iter()
                    .map(|e| c[e.row] * e.value * e.value)
                    .sum()
            })
            .collect();

        let mut active = ActiveSet::new(w_size);
        let mut gmax_old = f64::INFINITY;
        let mut gmax_init = 0.0;

        let mut iter = 0;
        while iter < self.max_iter {
            let mut gmax_new: f64 = 0.0;
            active.shuffle(rng);

            let mut s = 0;
            while s < active.active_size() {
                let j = active.get(s);
                let column = prob.column(j);

                let mut g_loss = 0.0;
                let mut h = 0.0;
                for e in column {
                    if b[e.row] > 0.0 {
                        let tmp = c[e.row] * e.value;
                        g_loss -= tmp * b[e.row];
                        h += tmp * e.value;
                    }
                }
                g_loss *= 2.0;
                let g = g_loss;
                h = (2.0 * h).max(1e-12);

                let gp = g + 1.0;
                let gn = g - 1.0;
                let violation = if w[j] == 0.0 {
                    if gp < 0.0 {
                        -gp
                    } else if gn > 0.0 {
                        gn
                    } else if gp > gmax_old / l as f64 && gn < -gmax_old / l as f64 {
                        active.shrink(s);
                        continue;
                    } else {
                        0.0
                    }
                } else if w[j] > 0.0 {
                    gp.abs()
                } else {
                    gn.abs()
                };
                gmax_new = gmax_new.max(violation);
                s += 1;

                let mut d = newton_direction(gp, gn, h, w[j]);
                if d.abs() < 1.0e-12 {
                    continue;
                }

                let mut delta = (w[j] + d).abs() - w[j].abs() + g * d;
                let mut d_old = 0.0;
                let mut loss_old = 0.0;
                let mut num_linesearch = 0;
                while num_linesearch < MAX_LINE_SEARCH {
                    let d_diff = d_old - d;
                    let mut cond = (w[j] + d).abs() - w[j].abs() - SIGMA * delta;

                    let appxcond = xj_sq[j] * d * d + g_loss * d + cond;
                    if appxcond <= 0.0 {
                        for e in column {
                            b[e.row] += d_diff * e.value;
                        }
                        break;
                    }

                    let mut loss_new = 0.0;
                    for e in column {
                        if num_linesearch == 0 && b[e.row] > 0.0 {
                            loss_old += c[e.row] * b[e.row] * b[e.row];
                        }
                        let b_new = b[e.row] + d_diff * e.value;
                        b[e.row] = b_new;
                        if b_new > 0.0 {
                            loss_new += c[e.row] * b_new * b_new;
                        }
                    }

                    cond += loss_new - loss_old;
                    if cond <= 0.0 {
                        break;
                    }
                    d_old = d;
                    d *= 0.5;
                    delta *= 0.5;
                    num_linesearch += 1;
                }

                w[j] += d;

                if num_linesearch >= MAX_LINE_SEARCH {
                    debug!("line search failed on feature {j}; recomputing residuals");
                    b.fill(1.0);
                    for (jj, &wj) in w.iter().enumerate() {
                        if wj == 0.0 {
                            continue;
                        }
                        for e in prob.column(jj) {
                            b[e.row] -= wj * e.value;
                        }
                    }
                }
            }

            if iter == 0 {
                gmax_init = gmax_new;
            }
            iter += 1;

            if gmax_new <= self.eps * gmax_init {
                if active.is_full() {
                    break;
                }
                debug!("unshrinking all {w_size} features");
                active.restore_all();
                gmax_old = f64::INFINITY;
                continue;
            }
            gmax_old = gmax_new;
        }

        info!("optimization finished, #iter = {iter}");
        let converged = iter < self.max_iter;
        if !converged {
            warn!("reaching max number of L1-regularized SVM iterations");
        }

        let mut v = 0.0;
        let mut nnz = 0;
        for &wj in w.iter() {
            if wj != 0.0 {
                v += wj.abs();
                nnz += 1;
            }
        }
        for (bi, ci) in b.iter().zip(&c) {
            if *bi > 0.0 {
                v += ci * bi * bi;
            }
        }
        debug!("objective value = {v}");
        debug!("#nonzeros/#features = {nnz}/{w_size}");

        SolveReport {
            iterations: iter,
            objective: v,
            converged,
        }
    }
}

/// Minimizer of the one-dimensional quadratic model plus `|w_j + d|`
pub(crate) fn newton_direction(gp: f64, gn: f64, h: f64, wj: f64) -> f64 {
    if gp <= h * wj {
        -gp / h
    } else if gn >= h * wj {
        -gn / h
    } else {
        -wj
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FeatureNode;
    use crate::solver::BinaryProblem;
    use approx::assert_relative_eq;

    #[test]
    fn test_newton_direction_cases() {
        // move right: Gp <= H w
        assert_relative_eq!(newton_direction(-3.0, -5.0, 2.0, 0.0), 1.5);
        // move left: Gn >= H w
        assert_relative_eq!(newton_direction(5.0, 3.0, 2.0, 0.0), -1.5);
        // snap to zero
        assert_relative_eq!(newton_direction(1.0, -1.0, 2.0, 0.25), -0.25);
    }

    #[test]
    fn test_irrelevant_feature_stays_zero() {
        // feature 1 separates, feature 2 is noise uncorrelated with the label
        let data = vec![
            vec![FeatureNode::new(1, 1.0), FeatureNode::new(2, 0.1)],
            vec![FeatureNode::new(1, 1.0), FeatureNode::new(2, -0.1)],
            vec![FeatureNode::new(1, -1.0), FeatureNode::new(2, 0.1)],
            vec![FeatureNode::new(1, -1.0), FeatureNode::new(2, -0.1)],
        ];
        let x: Vec<&[FeatureNode]> = data.iter().map(Vec::as_slice).collect();
        let y = [1, 1, -1, -1];
        let prob = BinaryProblem::new(2, &x, &y);
        let columns = ColumnMajor::from_rows(&prob, true);

        let mut w = vec![0.0; 2];
        let mut rng = Random::default();
        let report = L1SquaredHingeSolver::new(0.001).solve(&columns, &mut w, 1.0, 1.0, &mut rng);

        assert!(report.converged);
        assert!(w[0] > 0.5);
        assert_eq!(w[1], 0.0);
    }

    #[test]
    fn test_objective_is_reported_at_solution() {
        let data = vec![vec![FeatureNode::new(1, 1.0)], vec![FeatureNode::new(1, -1.0)]];
        let x: Vec<&[FeatureNode]> = data.iter().map(Vec::as_slice).collect();
        let y = [1, -1];
        let prob = BinaryProblem::new(1, &x, &y);
        let columns = ColumnMajor::from_rows(&prob, true);

        let mut w = vec![0.0];
        let mut rng = Random::default();
        let report = L1SquaredHingeSolver::new(1e-6).solve(&columns, &mut w, 1.0, 1.0, &mut rng);

        // |w| + 2 (1 - w)² is minimized at w = 0.75
        assert_relative_eq!(w[0], 0.75, epsilon = 1e-6);
        let expected = 0.75 + 2.0 * 0.25 * 0.25;
        assert_relative_eq!(report.objective, expected, epsilon = 1e-9);
    }
}
