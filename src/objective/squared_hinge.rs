//! L2-regularized squared-hinge (L2-loss) SVM objective

use crate::objective::{instance_costs, xv, Objective};
use crate::solver::BinaryProblem;
use crate::utils::sparse;

/// `f(w) = 0.5 w^T w + sum_i C_i max(0, 1 - y_i w^T x_i)^2`
///
/// Gradient and Hessian-vector products only touch the active set
/// `I = { i : y_i w^T x_i < 1 }`, recomputed on every gradient call.
pub struct SquaredHingeObjective<'a> {
    prob: &'a BinaryProblem<'a>,
    c: Vec<f64>,
    z: Vec<f64>,
    active: Vec<usize>,
    coef: Vec<f64>,
}

impl<'a> SquaredHingeObjective<'a> {
    /// Create the objective with costs `cp` for positives and `cn` for negatives
    pub fn new(prob: &'a BinaryProblem<'a>, cp: f64, cn: f64) -> Self {
        let l = prob.len();
        Self {
            prob,
            c: instance_costs(prob.y, cp, cn),
            z: vec![0.0; l],
            active: Vec::with_capacity(l),
            coef: Vec::with_capacity(l),
        }
    }

    /// Size of the active set from the last gradient call
    pub fn active_size(&self) -> usize {
        self.active.len()
    }

    /// `out = X_I^T v` over the active rows
    fn sub_xtv(&self, v: &[f64], out: &mut [f64]) {
        out.fill(0.0);
        for (&i, &v_i) in self.active.iter().zip(v) {
            sparse::axpy(v_i, self.prob.x[i], out);
        }
    }
}

impl Objective for SquaredHingeObjective<'_> {
    fn value(&mut self, w: &[f64]) -> f64 {
        xv(self.prob.x, w, &mut self.z);

        let mut f = 0.0;
        for ((zi, &yi), &ci) in self.z.iter_mut().zip(self.prob.y).zip(&self.c) {
            *zi *= f64::from(yi);
            let d = 1.0 - *zi;
            if d > 0.0 {
                f += ci * d * d;
            }
        }
        f *= 2.0;
        f += w.iter().map(|wi| wi * wi).sum::<f64>();
        f / 2.0
    }

    fn gradient(&mut self, w: &[f64], g: &mut [f64]) {
        self.active.clear();
        self.coef.clear();
        for i in 0..self.prob.len() {
            if self.z[i] < 1.0 {
                self.coef
                    .push(self.c[i] * f64::from(self.prob.y[i]) * (self.z[i] - 1.0));
                self.active.push(i);
            }
        }
        self.sub_xtv(&self.coef, g);

        for (gi, wi) in g.iter_mut().zip(w) {
            *gi = wi + 2.0 * *gi;
        }
    }

    fn hessian_vector(&mut self, s: &[f64], hs: &mut [f64]) {
        let wa: Vec<f64> = self
            .active
            .iter()
            .map(|&i| self.c[i] * sparse::dot(s, self.prob.x[i]))
            .collect();
        self.sub_xtv(&wa, hs);

        for (hi, si) in hs.iter_mut().zip(s) {
            *hi = si + 2.0 * *hi;
        }
    }

    fn n_variables(&self) -> usize {
        self.prob.n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FeatureNode;
    use crate::objective::test_support::numeric_gradient;
    use approx::assert_relative_eq;

    fn rows() -> Vec<Vec<FeatureNode>> {
        vec![
            vec![FeatureNode::new(1, 2.0)],
            vec![FeatureNode::new(1, -0.5), FeatureNode::new(2, 1.0)],
            vec![FeatureNode::new(2, -1.5)],
        ]
    }

    #[test]
    fn test_value_at_origin() {
        let data = rows();
        let x: Vec<&[FeatureNode]> = data.iter().map(Vec::as_slice).collect();
        let y = [1, 1, -1];
        let prob = BinaryProblem::new(2, &x, &y);
        let mut f = SquaredHingeObjective::new(&prob, 2.0, 3.0);

        // all margins violated by exactly 1
        assert_relative_eq!(f.value(&[0.0, 0.0]), 2.0 + 2.0 + 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_active_set_excludes_satisfied_margins() {
        let data = rows();
        let x: Vec<&[FeatureNode]> = data.iter().map(Vec::as_slice).collect();
        let y = [1, 1, -1];
        let prob = BinaryProblem::new(2, &x, &y);
        let mut f = SquaredHingeObjective::new(&prob, 1.0, 1.0);

        // row 0: margin 2*1 = 2 >= 1, rows 1 and 2 stay active
        let w = [1.0, 0.0];
        f.value(&w);
        let mut g = vec![0.0; 2];
        f.gradient(&w, &mut g);
        assert_eq!(f.active_size(), 2);
    }

    #[test]
    fn test_gradient_matches_finite_differences() {
        let data = rows();
        let x: Vec<&[FeatureNode]> = data.iter().map(Vec::as_slice).collect();
        let y = [1, 1, -1];
        let prob = BinaryProblem::new(2, &x, &y);
        let mut f = SquaredHingeObjective::new(&prob, 1.0, 0.5);

        let w = [0.2, 0.1];
        let numeric = numeric_gradient(&mut f, &w);
        f.value(&w);
        let mut g = vec![0.0; 2];
        f.gradient(&w, &mut g);

        for (a, b) in g.iter().zip(&numeric) {
            assert_relative_eq!(a, b, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_hessian_vector_on_active_rows() {
        let data = vec![vec![FeatureNode::new(1, 1.0)]];
        let x: Vec<&[FeatureNode]> = data.iter().map(Vec::as_slice).collect();
        let y = [1];
        let prob = BinaryProblem::new(1, &x, &y);
        let mut f = SquaredHingeObjective::new(&prob, 4.0, 1.0);

        let w = [0.0];
        f.value(&w);
        let mut g = vec![0.0];
        f.gradient(&w, &mut g);

        let mut hs = vec![0.0];
        f.hessian_vector(&[1.0], &mut hs);
        // s + 2 * C * x x^T s
        assert_relative_eq!(hs[0], 1.0 + 2.0 * 4.0, epsilon = 1e-12);
    }
}
