//! Trust-region Newton method
//!
//! Minimizes a twice-differentiable [`Objective`] starting from `w = 0`. Each
//! outer iteration approximately solves the Newton system with conjugate
//! gradient restricted to a trust region, then grows or shrinks the region
//! according to how well the quadratic model predicted the actual decrease.
//!
//! Reference: C.-J. Lin, R. C. Weng and S. S. Keerthi, "Trust region Newton
//! method for large-scale logistic regression", JMLR 9 (2008).

use crate::objective::Objective;
use crate::solver::SolveReport;
use crate::utils::sparse::{dense_axpy, dense_dot, dense_norm};
use log::{debug, info, warn};

// ratio thresholds for accepting a step and resizing the region
const ETA0: f64 = 1e-4;
const ETA1: f64 = 0.25;
const ETA2: f64 = 0.75;

// region scaling factors
const SIGMA1: f64 = 0.25;
const SIGMA2: f64 = 0.5;
const SIGMA3: f64 = 4.0;

/// Default cap on outer iterations
pub const TRON_MAX_ITER: usize = 1000;

/// Trust-region Newton minimizer
#[derive(Debug, Clone)]
pub struct TrustRegion {
    eps: f64,
    max_iter: usize,
}

impl TrustRegion {
    /// Stop once `‖∇f(w)‖ <= eps · ‖∇f(0)‖`
    pub fn new(eps: f64) -> Self {
        Self {
            eps,
            max_iter: TRON_MAX_ITER,
        }
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Minimize `fun`, overwriting `w` with the solution
    pub fn minimize<F: Objective>(&self, fun: &mut F, w: &mut [f64]) -> SolveReport {
        let n = fun.n_variables();
        let mut s = vec![0.0; n];
        let mut r = vec![0.0; n];
        let mut w_new = vec![0.0; n];
        let mut g = vec![0.0; n];

        w.fill(0.0);
        let mut f = fun.value(w);
        fun.gradient(w, &mut g);
        let mut delta = dense_norm(&g);
        let gnorm1 = delta;
        let mut gnorm = gnorm1;

        let mut iter = 1;
        let mut converged = gnorm <= self.eps * gnorm1;

        while iter <= self.max_iter && !converged {
            let cg_iter = conjugate_gradient(fun, delta, &g, &mut s, &mut r);

            w_new.copy_from_slice(w);
            dense_axpy(1.0, &s, &mut w_new);

            let gs = dense_dot(&g, &s);
            let prered = -0.5 * (gs - dense_dot(&s, &r));
            let fnew = fun.value(&w_new);

            let actred = f - fnew;
            let snorm = dense_norm(&s);
            if iter == 1 {
                delta = delta.min(snorm);
            }

            // step-length estimate from a quadratic fit along s
            let alpha = if fnew - f - gs <= 0.0 {
                SIGMA3
            } else {
                SIGMA1.max(-0.5 * (gs / (fnew - f - gs)))
            };

            if actred < ETA0 * prered {
                delta = (alpha.max(SIGMA1) * snorm).min(SIGMA2 * delta);
            } else if actred < ETA1 * prered {
                delta = (SIGMA1 * delta).max((alpha * snorm).min(SIGMA2 * delta));
            } else if actred < ETA2 * prered {
                delta = (SIGMA1 * delta).max((alpha * snorm).min(SIGMA3 * delta));
            } else {
                delta = delta.max((alpha * snorm).min(SIGMA3 * delta));
            }

            debug!(
                "iter {:2} act {:5.3e} pre {:5.3e} delta {:5.3e} f {:5.3e} |g| {:5.3e} CG {:3}",
                iter, actred, prered, delta, f, gnorm, cg_iter
            );

            if actred > ETA0 * prered {
                iter += 1;
                w.copy_from_slice(&w_new);
                f = fnew;
                fun.gradient(w, &mut g);

                gnorm = dense_norm(&g);
                if gnorm <= self.eps * gnorm1 {
                    converged = true;
                    break;
                }
            }
            if f < -1.0e32 {
                warn!("f < -1.0e+32");
                break;
            }
            if actred.abs() <= 0.0 && prered <= 0.0 {
                warn!("actred and prered <= 0");
                break;
            }
            if actred.abs() <= 1.0e-12 * f.abs() && prered.abs() <= 1.0e-12 * f.abs() {
                warn!("actred and prered too small");
                break;
            }
        }

        let iterations = iter - 1;
        info!("optimization finished, #iter = {iterations}");
        if iter > self.max_iter {
            warn!("reaching max number of trust-region iterations ({})", self.max_iter);
        }

        SolveReport {
            iterations,
            objective: f,
            converged,
        }
    }
}

/// Truncated conjugate gradient for `∇²f s = -g` inside `‖s‖ <= delta`.
///
/// On return `s` holds the step and `r` the residual `-g - ∇²f s`. At most
/// one iteration per variable is performed.
fn conjugate_gradient<F: Objective>(
    fun: &mut F,
    delta: f64,
    g: &[f64],
    s: &mut [f64],
    r: &mut [f64],
) -> usize {
    let n = g.len();
    let mut d = vec![0.0; n];
    let mut hd = vec![0.0; n];

    for i in 0..n {
        s[i] = 0.0;
        r[i] = -g[i];
        d[i] = r[i];
    }
    let cgtol = 0.1 * dense_norm(g);

    let mut cg_iter = 0;
    let mut rtr = dense_dot(r, r);
    while dense_norm(r) > cgtol && cg_iter < n {
        cg_iter += 1;
        fun.hessian_vector(&d, &mut hd);

        let alpha = rtr / dense_dot(&d, &hd);
        dense_axpy(alpha, &d, s);
        if dense_norm(s) > delta {
            debug!("cg reaches trust region boundary");
            dense_axpy(-alpha, &d, s);

            // largest tau with ‖s + tau d‖ = delta
            let std = dense_dot(s, &d);
            let sts = dense_dot(s, s);
            let dtd = dense_dot(&d, &d);
            let dsq = delta * delta;
            let rad = (std * std + dtd * (dsq - sts)).sqrt();
            let tau = if std >= 0.0 {
                (dsq - sts) / (std + rad)
            } else {
                (rad - std) / dtd
            };
            dense_axpy(tau, &d, s);
            dense_axpy(-tau, &hd, r);
            break;
        }
        dense_axpy(-alpha, &hd, r);

        let rnew = dense_dot(r, r);
        let beta = rnew / rtr;
        for (di, &ri) in d.iter_mut().zip(r.iter()) {
            *di = beta * *di + ri;
        }
        rtr = rnew;
    }

    cg_iter
}
