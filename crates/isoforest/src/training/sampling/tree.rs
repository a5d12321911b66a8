//! Array-backed sum tree for weighted draws.
//!
//! Leaves hold item weights, every internal slot holds the sum of its two
//! children. Slot 1 is the root, slot `i` has children `2i` and `2i + 1`,
//! and item `k` lives at slot `n_leaves + k`. Padding leaves hold zero.

/// Weighted sampling tree over a fixed number of items.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct WeightedSamplingTree {
    sums: Vec<f64>,
    n_leaves: usize,
    len: usize,
}

impl WeightedSamplingTree {
    /// Build a tree over `weights`. Non-positive and non-finite weights
    /// are stored as zero.
    pub fn new(weights: &[f64]) -> Self {
        let mut tree = Self::default();
        tree.rebuild(weights.iter().copied());
        tree
    }

    /// Rebuild in place, reusing the allocation.
    pub fn rebuild(&mut self, weights: impl ExactSizeIterator<Item = f64>) {
        self.len = weights.len();
        self.n_leaves = self.len.max(1).next_power_of_two();
        self.sums.clear();
        self.sums.resize(2 * self.n_leaves, 0.0);
        for (k, w) in weights.enumerate() {
            self.sums[self.n_leaves + k] = sanitize(w);
        }
        for slot in (1..self.n_leaves).rev() {
            self.sums[slot] = self.sums[2 * slot] + self.sums[2 * slot + 1];
        }
    }

    /// Copy another tree's state without reallocating when possible.
    pub fn copy_from(&mut self, other: &Self) {
        self.sums.clone_from(&other.sums);
        self.n_leaves = other.n_leaves;
        self.len = other.len;
    }

    /// Sum of all weights.
    #[inline]
    pub fn total(&self) -> f64 {
        self.sums.get(1).copied().unwrap_or(0.0)
    }

    #[inline]
    pub fn weight(&self, item: usize) -> f64 {
        self.sums[self.n_leaves + item]
    }

    /// Set the weight of `item` and refresh its ancestors.
    pub fn update(&mut self, item: usize, weight: f64) {
        debug_assert!(item < self.len);
        let mut slot = self.n_leaves + item;
        self.sums[slot] = sanitize(weight);
        slot /= 2;
        while slot >= 1 {
            self.sums[slot] = self.sums[2 * slot] + self.sums[2 * slot + 1];
            slot /= 2;
        }
    }

    /// Remove `item` from further draws.
    #[inline]
    pub fn remove(&mut self, item: usize) {
        self.update(item, 0.0);
    }

    /// Item whose cumulative weight interval contains `u * total`.
    ///
    /// `u` must lie in `[0, 1)`. Returns `None` when nothing has weight.
    pub fn draw(&self, u: f64) -> Option<usize> {
        let total = self.total();
        if !(total > 0.0) {
            return None;
        }
        let mut target = u * total;
        let mut slot = 1;
        while slot < self.n_leaves {
            let left = self.sums[2 * slot];
            // Rounding can leave `target` past the last positive leaf.
            if target < left || self.sums[2 * slot + 1] <= 0.0 {
                slot *= 2;
            } else {
                target -= left;
                slot = 2 * slot + 1;
            }
        }
        let item = slot - self.n_leaves;
        debug_assert!(item < self.len && self.sums[slot] > 0.0);
        Some(item)
    }
}

#[inline]
fn sanitize(weight: f64) -> f64 {
    if weight.is_finite() && weight > 0.0 { weight } else { 0.0 }
}
