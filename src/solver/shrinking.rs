//! Active-set bookkeeping for the coordinate-descent solvers
//!
//! Coordinates that sit at a bound and are not expected to move are
//! temporarily removed from the sweep. They live in the tail of the index
//! array, past `active_size`, until the solver restores the full set.

use crate::utils::random::Random;

/// Permutation of `0..len` whose prefix is the active set
#[derive(Debug, Clone)]
pub struct ActiveSet {
    index: Vec<usize>,
    active_size: usize,
}

impl ActiveSet {
    /// Every coordinate active, in natural order
    pub fn new(len: usize) -> Self {
        Self {
            index: (0..len).collect(),
            active_size: len,
        }
    }

    /// Total number of coordinates
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Number of coordinates still in the sweep
    pub fn active_size(&self) -> usize {
        self.active_size
    }

    /// Whether no coordinate is currently shrunk
    pub fn is_full(&self) -> bool {
        self.active_size == self.index.len()
    }

    /// Coordinate at sweep position `s`
    pub fn get(&self, s: usize) -> usize {
        self.index[s]
    }

    /// Active coordinates in sweep order
    pub fn active(&self) -> &[usize] {
        &self.index[..self.active_size]
    }

    /// Random reorder of the active prefix
    pub fn shuffle(&mut self, rng: &mut Random) {
        rng.shuffle_prefix(&mut self.index, self.active_size);
    }

    /// Remove the coordinate at sweep position `s`.
    ///
    /// The last active coordinate takes its place, so the caller must visit
    /// position `s` again instead of advancing.
    pub fn shrink(&mut self, s: usize) {
        self.active_size -= 1;
        self.index.swap(s, self.active_size);
    }

    /// Put every coordinate back into the sweep
    pub fn restore_all(&mut self) {
        self.active_size = self.index.len();
    }
}

/// Shrinking threshold for the next sweep: a non-positive maximum disables
/// shrinking at the upper side
pub(crate) fn next_upper_threshold(max_violation: f64) -> f64 {
    if max_violation <= 0.0 {
        f64::INFINITY
    } else {
        max_violation
    }
}

/// Mirror of [`next_upper_threshold`] for the lower side
pub(crate) fn next_lower_threshold(min_violation: f64) -> f64 {
    if min_violation >= 0.0 {
        f64::NEG_INFINITY
    } else {
        min_violation
    }
}
