//! Utility functions shared by the solvers

/// Seeded pseudo-random source
pub mod random {
    use rand::{Rng, SeedableRng};
    use rand_xoshiro::Xoshiro256PlusPlus;

    /// Seed used by [`Random::default`]
    pub const DEFAULT_SEED: u64 = 0;

    /// Random generator threaded through training and cross-validation.
    ///
    /// Two generators built from the same seed produce the same draws, so a
    /// training run is replayed exactly by resetting (or recreating) it.
    #[derive(Debug, Clone)]
    pub struct Random {
        seed: u64,
        rng: Xoshiro256PlusPlus,
    }

    impl Random {
        /// Create a generator from a seed
        pub fn new(seed: u64) -> Self {
            Self {
                seed,
                rng: Xoshiro256PlusPlus::seed_from_u64(seed),
            }
        }

        /// Seed this generator was built from
        pub fn seed(&self) -> u64 {
            self.seed
        }

        /// Restart the sequence from the construction seed
        pub fn reset(&mut self) {
            self.rng = Xoshiro256PlusPlus::seed_from_u64(self.seed);
        }

        /// Uniform index in `0..bound`
        ///
        /// # Panics
        /// Panics if `bound == 0`
        pub fn next_index(&mut self, bound: usize) -> usize {
            self.rng.gen_range(0..bound)
        }

        /// Fisher-Yates shuffle of the first `len` entries of `index`
        pub fn shuffle_prefix(&mut self, index: &mut [usize], len: usize) {
            for i in 0..len {
                let j = i + self.next_index(len - i);
                index.swap(i, j);
            }
        }
    }

    impl Default for Random {
        fn default() -> Self {
            Self::new(DEFAULT_SEED)
        }
    }
}

/// Kernels over sparse rows and dense weight vectors
pub mod sparse {
    use crate::core::FeatureNode;

    /// `w^T x` for a sparse row with 1-based indices
    pub fn dot(w: &[f64], x: &[FeatureNode]) -> f64 {
        let mut sum = 0.0;
        for node in x {
            sum += w[node.index - 1] * node.value;
        }
        sum
    }

    /// `w += a * x`
    pub fn axpy(a: f64, x: &[FeatureNode], w: &mut [f64]) {
        for node in x {
            w[node.index - 1] += a * node.value;
        }
    }

    /// `x^T x`
    pub fn norm_squared(x: &[FeatureNode]) -> f64 {
        x.iter().map(|node| node.value * node.value).sum()
    }

    /// Dense dot product
    pub fn dense_dot(a: &[f64], b: &[f64]) -> f64 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    /// Dense Euclidean norm
    pub fn dense_norm(a: &[f64]) -> f64 {
        dense_dot(a, a).sqrt()
    }

    /// Dense `y += a * x`
    pub fn dense_axpy(a: f64, x: &[f64], y: &mut [f64]) {
        for (yi, xi) in y.iter_mut().zip(x) {
            *yi += a * xi;
        }
    }
}
