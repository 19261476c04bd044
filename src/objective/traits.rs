//! Objective function trait definition

/// Twice-differentiable objective minimized by the trust-region solver.
///
/// Calls come in a fixed order: `value(w)` caches `X w`, `gradient(w)` reuses
/// that cache and prepares the curvature terms consumed by
/// `hessian_vector`. The Hessian itself is never formed.
pub trait Objective {
    /// Objective value at `w`
    fn value(&mut self, w: &[f64]) -> f64;

    /// Gradient at the `w` last passed to [`Objective::value`]
    fn gradient(&mut self, w: &[f64], g: &mut [f64]);

    /// Hessian-vector product `H s` at the point of the last gradient call
    fn hessian_vector(&mut self, s: &[f64], hs: &mut [f64]);

    /// Number of optimization variables
    fn n_variables(&self) -> usize;
}
