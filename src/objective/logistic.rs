//! L2-regularized logistic regression objective

use crate::objective::{instance_costs, xtv, xv, Objective};
use crate::solver::BinaryProblem;

/// `f(w) = 0.5 w^T w + sum_i C_i log(1 + exp(-y_i w^T x_i))`
pub struct LogisticObjective<'a> {
    prob: &'a BinaryProblem<'a>,
    c: Vec<f64>,
    z: Vec<f64>,
    d: Vec<f64>,
    scratch: Vec<f64>,
}

impl<'a> LogisticObjective<'a> {
    /// Create the objective with costs `cp` for positives and `cn` for negatives
    pub fn new(prob: &'a BinaryProblem<'a>, cp: f64, cn: f64) -> Self {
        let l = prob.len();
        Self {
            prob,
            c: instance_costs(prob.y, cp, cn),
            z: vec![0.0; l],
            d: vec![0.0; l],
            scratch: vec![0.0; l],
        }
    }
}

impl Objective for LogisticObjective<'_> {
    fn value(&mut self, w: &[f64]) -> f64 {
        xv(self.prob.x, w, &mut self.z);

        let mut f = 0.0;
        for ((&yi, &zi), &ci) in self.prob.y.iter().zip(&self.z).zip(&self.c) {
            let yz = f64::from(yi) * zi;
            // two branches keep exp() from overflowing
            if yz >= 0.0 {
                f += ci * (1.0 + (-yz).exp()).ln();
            } else {
                f += ci * (-yz + (1.0 + yz.exp()).ln());
            }
        }
        f *= 2.0;
        f += w.iter().map(|wi| wi * wi).sum::<f64>();
        f / 2.0
    }

    fn gradient(&mut self, w: &[f64], g: &mut [f64]) {
        for i in 0..self.prob.len() {
            let yi = f64::from(self.prob.y[i]);
            let sigma = 1.0 / (1.0 + (-yi * self.z[i]).exp());
            self.d[i] = sigma * (1.0 - sigma);
            self.z[i] = self.c[i] * (sigma - 1.0) * yi;
        }
        xtv(self.prob.x, &self.z, g);

        for (gi, wi) in g.iter_mut().zip(w) {
            *gi += wi;
        }
    }

    fn hessian_vector(&mut self, s: &[f64], hs: &mut [f64]) {
        xv(self.prob.x, s, &mut self.scratch);
        for ((wa, ci), di) in self.scratch.iter_mut().zip(&self.c).zip(&self.d) {
            *wa *= ci * di;
        }
        xtv(self.prob.x, &self.scratch, hs);

        for (hi, si) in hs.iter_mut().zip(s) {
            *hi += si;
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
            vec![FeatureNode::new(1, 1.0), FeatureNode::new(2, 0.5)],
            vec![FeatureNode::new(1, -1.0)],
            vec![FeatureNode::new(2, 2.0)],
        ]
    }

    #[test]
    fn test_value_at_origin() {
        let data = rows();
        let x: Vec<&[FeatureNode]> = data.iter().map(Vec::as_slice).collect();
        let y = [1, -1, 1];
        let prob = BinaryProblem::new(2, &x, &y);
        let mut f = LogisticObjective::new(&prob, 1.0, 2.0);

        // every margin is zero: sum_i C_i ln 2
        let expected = (1.0 + 2.0 + 1.0) * 2f64.ln();
        assert_relative_eq!(f.value(&[0.0, 0.0]), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_value_is_stable_for_large_margins() {
        let data = vec![vec![FeatureNode::new(1, 1.0)]];
        let x: Vec<&[FeatureNode]> = data.iter().map(Vec::as_slice).collect();
        let y = [-1];
        let prob = BinaryProblem::new(1, &x, &y);
        let mut f = LogisticObjective::new(&prob, 1.0, 1.0);

        let value = f.value(&[1000.0]);
        assert!(value.is_finite());
        assert_relative_eq!(value, 0.5 * 1000.0 * 1000.0 + 1000.0, max_relative = 1e-12);
    }

    #[test]
    fn test_gradient_matches_finite_differences() {
        let data = rows();
        let x: Vec<&[FeatureNode]> = data.iter().map(Vec::as_slice).collect();
        let y = [1, -1, 1];
        let prob = BinaryProblem::new(2, &x, &y);
        let mut f = LogisticObjective::new(&prob, 1.5, 0.5);

        let w = [0.3, -0.7];
        let numeric = numeric_gradient(&mut f, &w);
        f.value(&w);
        let mut g = vec![0.0; 2];
        f.gradient(&w, &mut g);

        for (a, b) in g.iter().zip(&numeric) {
            assert_relative_eq!(a, b, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_hessian_vector_is_symmetric_positive() {
        let data = rows();
        let x: Vec<&[FeatureNode]> = data.iter().map(Vec::as_slice).collect();
        let y = [1, -1, 1];
        let prob = BinaryProblem::new(2, &x, &y);
        let mut f = LogisticObjective::new(&prob, 1.0, 1.0);

        let w = [0.1, 0.2];
        let mut g = vec![0.0; 2];
        f.value(&w);
        f.gradient(&w, &mut g);

        let s = [1.0, -2.0];
        let mut hs = vec![0.0; 2];
        f.hessian_vector(&s, &mut hs);
        let curvature: f64 = s.iter().zip(&hs).map(|(a, b)| a * b).sum();
        // identity part alone contributes s^T s
        assert!(curvature >= 5.0);
    }
}
