//! Crammer-Singer multi-class SVM by sequential dual coordinate descent
//!
//! For each instance `i` the dual variables `α_i ∈ R^k` satisfy
//! `Σ_m α_i^m = 0` and `α_i^m <= C_{y_i} δ(y_i, m)`. One instance at a time,
//! the `k`-dimensional subproblem is solved exactly by sorting. Classes that
//! sit at their bound with a small gradient are shrunk per instance, and an
//! instance with at most one active class leaves the sweep.
//!
//! Reference: S. S. Keerthi et al., "A sequential dual method for large scale
//! multi-class linear SVMs", KDD 2008.

use crate::core::FeatureNode;
use crate::solver::shrinking::ActiveSet;
use crate::solver::SolveReport;
use crate::utils::random::Random;
use crate::utils::sparse;
use log::{debug, info, warn};

/// Default cap on passes over the data
pub const MCSVM_MAX_ITER: usize = 100_000;

/// Training rows with labels mapped to class slots `0..nr_class`
#[derive(Debug, Clone, Copy)]
pub struct MulticlassProblem<'a> {
    pub n: usize,
    pub nr_class: usize,
    pub x: &'a [&'a [FeatureNode]],
    pub y: &'a [usize],
}

/// Crammer-Singer solver
#[derive(Debug, Clone)]
pub struct CrammerSingerSolver {
    eps: f64,
    max_iter: usize,
}

impl CrammerSingerSolver {
    pub fn new(eps: f64) -> Self {
        Self {
            eps,
            max_iter: MCSVM_MAX_ITER,
        }
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Fit `w`, laid out as `w[(feature - 1) * nr_class + class]`.
    ///
    /// `weighted_c[m]` is the penalty of instances in class slot `m`.
    pub fn solve(
        &self,
        prob: &MulticlassProblem<'_>,
        weighted_c: &[f64],
        w: &mut [f64],
        rng: &mut Random,
    ) -> SolveReport {
        let l = prob.y.len();
        let nr_class = prob.nr_class;

        w.fill(0.0);
        let mut alpha = vec![0.0; l * nr_class];
        let mut alpha_new = vec![0.0; nr_class];
        let mut g = vec![0.0; nr_class];
        let mut b = vec![0.0; nr_class];
        let mut changed: Vec<(usize, f64)> = Vec::with_capacity(nr_class);

        // per instance: class order (active prefix first) and position of y_i in it
        let mut alpha_index: Vec<usize> = (0..l).flat_map(|_| 0..nr_class).collect();
        let mut y_index: Vec<usize> = prob.y.to_vec();
        let mut active_size_i = vec![nr_class; l];
        let qd: Vec<f64> = prob.x.iter().map(|xi| sparse::norm_squared(xi)).collect();

        let mut active = ActiveSet::new(l);
        let mut eps_shrink = (10.0 * self.eps).max(1.0);
        let mut start_from_all = true;

        let mut iter = 0;
        while iter < self.max_iter {
            let mut stopping = f64::NEG_INFINITY;
            active.shuffle(rng);

            let mut s = 0;
            while s < active.active_size() {
                let i = active.get(s);
                let ai = qd[i];
                if ai <= 0.0 {
                    s += 1;
                    continue;
                }

                let base = i * nr_class;
                let alpha_i = &mut alpha[base..base + nr_class];
                let alpha_index_i = &mut alpha_index[base..base + nr_class];
                let c_yi = weighted_c[prob.y[i]];

                let size = active_size_i[i];
                g[..size].fill(1.0);
                if y_index[i] < size {
                    g[y_index[i]] = 0.0;
                }
                for node in prob.x[i].iter() {
                    let w_row = &w[(node.index - 1) * nr_class..];
                    for m in 0..size {
                        g[m] += w_row[alpha_index_i[m]] * node.value;
                    }
                }

                let mut min_g = f64::INFINITY;
                let mut max_g = f64::NEG_INFINITY;
                for m in 0..size {
                    if alpha_i[alpha_index_i[m]] < 0.0 && g[m] < min_g {
                        min_g = g[m];
                    }
                    if g[m] > max_g {
                        max_g = g[m];
                    }
                }
                if y_index[i] < size && alpha_i[prob.y[i]] < c_yi && g[y_index[i]] < min_g {
                    min_g = g[y_index[i]];
                }

                let be_shrunk = |m: usize, y_pos: usize, alpha_m: f64, g_m: f64| {
                    let bound = if m == y_pos { c_yi } else { 0.0 };
                    alpha_m == bound && g_m < min_g
                };

                let mut m = 0;
                while m < active_size_i[i] {
                    if be_shrunk(m, y_index[i], alpha_i[alpha_index_i[m]], g[m]) {
                        active_size_i[i] -= 1;
                        while active_size_i[i] > m {
                            let last = active_size_i[i];
                            if !be_shrunk(last, y_index[i], alpha_i[alpha_index_i[last]], g[last]) {
                                alpha_index_i.swap(m, last);
                                g.swap(m, last);
                                if y_index[i] == last {
                                    y_index[i] = m;
                                } else if y_index[i] == m {
                                    y_index[i] = last;
                                }
                                break;
                            }
                            active_size_i[i] -= 1;
                        }
                    }
                    m += 1;
                }

                let size = active_size_i[i];
                if size <= 1 {
                    active.shrink(s);
                    continue;
                }
                s += 1;

                if max_g - min_g <= 1e-12 {
                    continue;
                }
                stopping = stopping.max(max_g - min_g);

                for m in 0..size {
                    b[m] = g[m] - ai * alpha_i[alpha_index_i[m]];
                }
                solve_sub_problem(ai, y_index[i], c_yi, &b[..size], &mut alpha_new[..size]);

                changed.clear();
                for m in 0..size {
                    let d = alpha_new[m] - alpha_i[alpha_index_i[m]];
                    alpha_i[alpha_index_i[m]] = alpha_new[m];
                    if d.abs() >= 1e-12 {
                        changed.push((alpha_index_i[m], d));
                    }
                }
                for node in prob.x[i].iter() {
                    let w_row = &mut w[(node.index - 1) * nr_class..];
                    for &(class, d) in &changed {
                        w_row[class] += d * node.value;
                    }
                }
            }

            iter += 1;

            if stopping < eps_shrink {
                if stopping < self.eps && start_from_all {
                    break;
                }
                debug!("unshrinking all {l} instances");
                active.restore_all();
                active_size_i.fill(nr_class);
                eps_shrink = (eps_shrink / 2.0).max(self.eps);
                start_from_all = true;
            } else {
                start_from_all = false;
            }
        }

        info!("optimization finished, #iter = {iter}");
        let converged = iter < self.max_iter;
        if !converged {
            warn!("reaching max number of Crammer-Singer iterations");
        }

        let mut v = 0.5 * sparse::dense_dot(w, w);
        let mut n_sv = 0;
        for &a in &alpha {
            v += a;
            if a.abs() > 0.0 {
                n_sv += 1;
            }
        }
        for (i, &yi) in prob.y.iter().enumerate() {
            v -= alpha[i * nr_class + yi];
        }
        debug!("objective value = {v}");
        debug!("nSV = {n_sv}");

        SolveReport {
            iterations: iter,
            objective: v,
            converged,
        }
    }
}

/// Exact solution of one instance's subproblem over its active classes.
///
/// `y_pos` is the position of the true class among the active ones (or
/// `>= b.len()` if it was shrunk).
fn solve_sub_problem(ai: f64, y_pos: usize, c_yi: f64, b: &[f64], alpha_new: &mut [f64]) {
    let active = b.len();
    let mut d = b.to_vec();
    if y_pos < active {
        d[y_pos] += ai * c_yi;
    }
    d.sort_by(|a, b| b.total_cmp(a));

    let mut beta = d[0] - ai * c_yi;
    let mut r = 1;
    while r < active && beta < r as f64 * d[r] {
        beta += d[r];
        r += 1;
    }
    beta /= r as f64;

    for (m, (a, &bm)) in alpha_new.iter_mut().zip(b).enumerate() {
        let bound = if m == y_pos { c_yi } else { 0.0 };
        *a = bound.min((beta - bm) / ai);
    }
}
