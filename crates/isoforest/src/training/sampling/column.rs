//! Column sampling within a tree.
//!
//! A [`ColumnSampler`] holds the columns still eligible at the current node.
//! Split search draws candidates from it and excludes those that turn out
//! constant; the grower marks the exclusion stack before a node and restores
//! it afterwards so exclusions never leak into sibling subtrees.
//!
//! Two modes:
//! - **uniform**: a swap-permutation of active columns, O(1) draw and exclude
//! - **weighted**: a [`WeightedSamplingTree`] over per-column weights,
//!   O(log n) draw and exclude

use fixedbitset::FixedBitSet;
use rand::prelude::*;

use super::tree::WeightedSamplingTree;

#[derive(Debug, Clone, Default)]
enum Mode {
    #[default]
    Uniform,
    Weighted,
}

/// Eligible columns of the tree being grown.
#[derive(Debug, Clone, Default)]
pub(crate) struct ColumnSampler {
    mode: Mode,
    n_cols: usize,

    // Uniform mode: `cols[..n_active]` are active, `pos[c]` is the slot of `c`.
    cols: Vec<usize>,
    pos: Vec<usize>,
    n_active: usize,

    // Weighted mode: zero weight = not eligible.
    tree: WeightedSamplingTree,
    n_positive: usize,

    /// Excluded columns with the weight they had, most recent last.
    excluded: Vec<(usize, f64)>,
    chosen: FixedBitSet,
    weight_buf: Vec<f64>,
}

impl ColumnSampler {
    /// Start a tree: columns `0..n_cols`, uniformly or by `weights`, then
    /// keep only `ncols_per_tree` of them.
    pub fn reset_tree<R: Rng>(
        &mut self,
        n_cols: usize,
        weights: Option<&[f64]>,
        ncols_per_tree: usize,
        rng: &mut R,
    ) {
        match weights {
            None => self.reset_uniform(n_cols),
            Some(w) => self.reset_weighted(w),
        }
        if ncols_per_tree < n_cols {
            self.keep_random(ncols_per_tree, rng);
        }
    }

    fn reset_uniform(&mut self, n_cols: usize) {
        self.mode = Mode::Uniform;
        self.n_cols = n_cols;
        self.cols.clear();
        self.cols.extend(0..n_cols);
        self.pos.clear();
        self.pos.extend(0..n_cols);
        self.n_active = n_cols;
        self.excluded.clear();
    }

    fn reset_weighted(&mut self, weights: &[f64]) {
        self.mode = Mode::Weighted;
        self.n_cols = weights.len();
        self.tree.rebuild(weights.iter().copied());
        self.n_positive = (0..self.n_cols).filter(|&c| self.tree.weight(c) > 0.0).count();
        self.excluded.clear();
    }

    /// Restrict the active set to `m` columns drawn from it.
    fn keep_random<R: Rng>(&mut self, m: usize, rng: &mut R) {
        match self.mode {
            Mode::Uniform => {
                let m = m.min(self.n_active);
                for i in 0..m {
                    let j = rng.gen_range(i..self.n_active);
                    self.swap_slots(i, j);
                }
                self.n_active = m;
            }
            Mode::Weighted => {
                self.chosen.clear();
                self.chosen.grow(self.n_cols);
                let mark = self.mark();
                for _ in 0..m {
                    let Some(col) = self.draw(rng) else { break };
                    self.chosen.insert(col);
                    self.exclude(col);
                }
                self.restore_to(mark);
                for col in 0..self.n_cols {
                    if !self.chosen.contains(col) && self.tree.weight(col) > 0.0 {
                        self.tree.remove(col);
                        self.n_positive -= 1;
                    }
                }
            }
        }
    }

    /// Replace the sampling weights of the active columns. Inactive
    /// columns stay out.
    pub fn reweight(&mut self, weights: &[f64]) {
        debug_assert_eq!(weights.len(), self.n_cols);
        let mut buf = std::mem::take(&mut self.weight_buf);
        buf.clear();
        buf.extend((0..self.n_cols).map(|c| if self.is_active(c) { weights[c] } else { 0.0 }));
        self.reset_weighted(&buf);
        self.weight_buf = buf;
    }

    #[inline]
    pub fn is_active(&self, col: usize) -> bool {
        match self.mode {
            Mode::Uniform => self.pos[col] < self.n_active,
            Mode::Weighted => self.tree.weight(col) > 0.0,
        }
    }

    /// Active columns in ascending order.
    pub fn active(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.n_cols).filter(|&c| self.is_active(c))
    }

    /// Number of columns that can still be drawn.
    #[inline]
    pub fn n_available(&self) -> usize {
        match self.mode {
            Mode::Uniform => self.n_active,
            Mode::Weighted => self.n_positive,
        }
    }

    /// Draw an active column. Does not remove it.
    pub fn draw<R: Rng>(&self, rng: &mut R) -> Option<usize> {
        match self.mode {
            Mode::Uniform => {
                (self.n_active > 0).then(|| self.cols[rng.gen_range(0..self.n_active)])
            }
            Mode::Weighted => self.tree.draw(rng.r#gen()),
        }
    }

    /// Remove `col` until the next [`restore_to`](Self::restore_to) past
    /// this point. Inactive columns are ignored.
    pub fn exclude(&mut self, col: usize) {
        if !self.is_active(col) {
            return;
        }
        match self.mode {
            Mode::Uniform => {
                let last = self.n_active - 1;
                self.swap_slots(self.pos[col], last);
                self.n_active = last;
                self.excluded.push((col, 1.0));
            }
            Mode::Weighted => {
                let w = self.tree.weight(col);
                self.tree.remove(col);
                self.n_positive -= 1;
                self.excluded.push((col, w));
            }
        }
    }

    /// Current depth of the exclusion stack.
    #[inline]
    pub fn mark(&self) -> usize {
        self.excluded.len()
    }

    /// Re-admit every column excluded after `mark`.
    pub fn restore_to(&mut self, mark: usize) {
        while self.excluded.len() > mark {
            let Some((col, w)) = self.excluded.pop() else { break };
            match self.mode {
                Mode::Uniform => {
                    debug_assert_eq!(self.cols[self.n_active], col);
                    self.n_active += 1;
                }
                Mode::Weighted => {
                    self.tree.update(col, w);
                    self.n_positive += 1;
                }
            }
        }
    }

    #[inline]
    fn swap_slots(&mut self, i: usize, j: usize) {
        self.cols.swap(i, j);
        self.pos[self.cols[i]] = i;
        self.pos[self.cols[j]] = j;
    }
}
