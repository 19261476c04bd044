//! Coordinate descent for L1-regularized logistic regression
//!
//! Minimizes `‖w‖₁ + Σ C_i log(1 + exp(-y_i wᵀx_i))`. The solver keeps
//! `exp(wᵀx_i)` per instance and updates it multiplicatively after each
//! coordinate step.

use crate::solver::l1r_l2_svc::{newton_direction, L1R_MAX_ITER, MAX_LINE_SEARCH, SIGMA};
use crate::solver::shrinking::ActiveSet;
use crate::solver::transpose::ColumnMajor;
use crate::solver::SolveReport;
use crate::utils::random::Random;
use log::{debug, info, warn};

/// L1-regularized logistic regression solver
#[derive(Debug, Clone)]
pub struct L1LogisticSolver {
    eps: f64,
    max_iter: usize,
}

/// Per-feature constants computed once before the sweeps
struct ColumnStats {
    xj_max: Vec<f64>,
    c_sum: Vec<f64>,
    xjneg_sum: Vec<f64>,
    xjpos_sum: Vec<f64>,
    x_min: f64,
}

impl ColumnStats {
    fn new(prob: &ColumnMajor, c: &[f64]) -> Self {
        let w_size = prob.n_columns();
        let mut stats = Self {
            xj_max: vec![0.0; w_size],
            c_sum: vec![0.0; w_size],
            xjneg_sum: vec![0.0; w_size],
            xjpos_sum: vec![0.0; w_size],
            x_min: 0.0,
        };
        let y = prob.labels();
        for j in 0..w_size {
            for e in prob.column(j) {
                stats.x_min = stats.x_min.min(e.value);
                stats.xj_max[j] = stats.xj_max[j].max(e.value);
                stats.c_sum[j] += c[e.row];
                if y[e.row] == -1 {
                    stats.xjneg_sum[j] += c[e.row] * e.value;
                } else {
                    stats.xjpos_sum[j] += c[e.row] * e.value;
                }
            }
        }
        stats
    }
}

impl L1LogisticSolver {
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

    /// Minimize over `w`; `prob` holds the raw (unscaled) feature values
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
        let y = prob.labels();
        let c: Vec<f64> = y.iter().map(|&yi| if yi == 1 { cp } else { cn }).collect();

        w.fill(0.0);
        let mut exp_wtx = vec![1.0; l];
        let mut exp_wtx_new = vec![0.0; l];
        let stats = ColumnStats::new(prob, &c);

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

                let mut sum1 = 0.0;
                let mut sum2 = 0.0;
                let mut h = 0.0;
                for e in column {
                    let exp_i = exp_wtx[e.row];
                    let tmp1 = e.value / (1.0 + exp_i);
                    let tmp2 = c[e.row] * tmp1;
                    let tmp3 = tmp2 * exp_i;
                    sum2 += tmp2;
                    sum1 += tmp3;
                    h += tmp1 * tmp3;
                }

                let g = -sum2 + stats.xjneg_sum[j];
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
                d = d.clamp(-10.0, 10.0);

                let mut delta = (w[j] + d).abs() - w[j].abs() + g * d;
                let mut num_linesearch = 0;
                while num_linesearch < MAX_LINE_SEARCH {
                    let mut cond = (w[j] + d).abs() - w[j].abs() - SIGMA * delta;

                    // upper bounds on the loss change, valid for non-negative data
                    if stats.x_min >= 0.0 {
                        let xj_max = stats.xj_max[j];
                        let c_sum = stats.c_sum[j];
                        let tmp = (d * xj_max).exp();
                        let appxcond1 = (1.0 + sum1 * (tmp - 1.0) / xj_max / c_sum).ln() * c_sum
                            + cond
                            - d * stats.xjpos_sum[j];
                        let appxcond2 = (1.0 + sum2 * (1.0 / tmp - 1.0) / xj_max / c_sum).ln()
                            * c_sum
                            + cond
                            + d * stats.xjneg_sum[j];
                        if appxcond1.min(appxcond2) <= 0.0 {
                            for e in column {
                                exp_wtx[e.row] *= (d * e.value).exp();
                            }
                            break;
                        }
                    }

                    cond += d * stats.xjneg_sum[j];
                    for (k, e) in column.iter().enumerate() {
                        let exp_dx = (d * e.value).exp();
                        exp_wtx_new[k] = exp_wtx[e.row] * exp_dx;
                        cond += c[e.row] * ((1.0 + exp_wtx_new[k]) / (exp_dx + exp_wtx_new[k])).ln();
                    }

                    if cond <= 0.0 {
                        for (k, e) in column.iter().enumerate() {
                            exp_wtx[e.row] = exp_wtx_new[k];
                        }
                        break;
                    }
                    d *= 0.5;
                    delta *= 0.5;
                    num_linesearch += 1;
                }

                w[j] += d;

                if num_linesearch >= MAX_LINE_SEARCH {
                    debug!("line search failed on feature {j}; recomputing exp(wTx)");
                    let mut wtx = vec![0.0; l];
                    for (jj, &wj) in w.iter().enumerate() {
                        if wj == 0.0 {
                            continue;
                        }
                        for e in prob.column(jj) {
                            wtx[e.row] += wj * e.value;
                        }
                    }
                    for (e, v) in exp_wtx.iter_mut().zip(wtx) {
                        *e = v.exp();
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
            warn!("reaching max number of L1-regularized logistic regression iterations");
        }

        let mut v = 0.0;
        let mut nnz = 0;
        for &wj in w.iter() {
            if wj != 0.0 {
                v += wj.abs();
                nnz += 1;
            }
        }
        for ((&yi, &ci), &e) in y.iter().zip(&c).zip(&exp_wtx) {
            if yi == 1 {
                v += ci * (1.0 + 1.0 / e).ln();
            } else {
                v += ci * (1.0 + e).ln();
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FeatureNode;
    use crate::solver::BinaryProblem;
    use approx::assert_relative_eq;

    fn objective(w: f64, c: f64) -> f64 {
        // one positive at x = 1, one negative at x = -1
        w.abs() + 2.0 * c * (1.0 + (-w).exp()).ln()
    }

    #[test]
    fn test_one_dimensional_optimum() {
        let data = vec![vec![FeatureNode::new(1, 1.0)], vec![FeatureNode::new(1, -1.0)]];
        let x: Vec<&[FeatureNode]> = data.iter().map(Vec::as_slice).collect();
        let y = [1, -1];
        let prob = BinaryProblem::new(1, &x, &y);
        let columns = ColumnMajor::from_rows(&prob, false);

        let mut w = vec![0.0];
        let mut rng = Random::default();
        let report = L1LogisticSolver::new(1e-8).solve(&columns, &mut w, 2.0, 2.0, &mut rng);

        // 1 = 2C σ(-w)  =>  w = ln(2C - 1)
        let expected = 3f64.ln();
        assert_relative_eq!(w[0], expected, epsilon = 1e-4);
        assert_relative_eq!(report.objective, objective(w[0], 2.0), epsilon = 1e-9);
    }

    #[test]
    fn test_small_penalty_gives_zero_weights() {
        let data = vec![vec![FeatureNode::new(1, 1.0)], vec![FeatureNode::new(1, -1.0)]];
        let x: Vec<&[FeatureNode]> = data.iter().map(Vec::as_slice).collect();
        let y = [1, -1];
        let prob = BinaryProblem::new(1, &x, &y);
        let columns = ColumnMajor::from_rows(&prob, false);

        // |∂loss/∂w| at 0 is C <= 1, so the L1 term wins
        let mut w = vec![0.0];
        let mut rng = Random::default();
        L1LogisticSolver::new(0.01).solve(&columns, &mut w, 0.5, 0.5, &mut rng);
        assert_eq!(w[0], 0.0);
    }

    #[test]
    fn test_non_negative_data_path() {
        let data = vec![
            vec![FeatureNode::new(1, 2.0)],
            vec![FeatureNode::new(1, 1.5), FeatureNode::new(2, 0.2)],
            vec![FeatureNode::new(2, 1.0)],
            vec![FeatureNode::new(2, 2.0)],
        ];
        let x: Vec<&[FeatureNode]> = data.iter().map(Vec::as_slice).collect();
        let y = [1, 1, -1, -1];
        let prob = BinaryProblem::new(2, &x, &y);
        let columns = ColumnMajor::from_rows(&prob, false);

        let mut w = vec![0.0; 2];
        let mut rng = Random::new(5);
        let report = L1LogisticSolver::new(0.01).solve(&columns, &mut w, 10.0, 10.0, &mut rng);

        assert!(report.converged);
        assert!(w[0] > 0.0);
        assert!(w[1] < 0.0);
    }
}
