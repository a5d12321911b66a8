//! Per-tree row sampling.

use fixedbitset::FixedBitSet;
use rand::prelude::*;

use super::tree::WeightedSamplingTree;
use crate::training::BuildError;

/// Reusable per-worker buffers for [`RowSampler::sample`].
#[derive(Debug, Default)]
pub(crate) struct RowSampleScratch {
    /// Every row index, shuffled in place for uniform draws.
    pub ix_all: Vec<usize>,
    /// Private copy of the shared weight tree, drained by draws.
    pub tree: WeightedSamplingTree,
    /// Set at positions whose row equals the previous position's row.
    /// Only filled when drawing with replacement.
    pub is_repeated: FixedBitSet,
}

/// Draws the rows of each tree.
///
/// The weight tree is built once per fit and shared read-only; each draw
/// without replacement works on a private copy.
#[derive(Debug, Clone)]
pub(crate) struct RowSampler {
    n_rows: usize,
    sample_size: usize,
    with_replacement: bool,
    weights: Option<WeightedSamplingTree>,
}

impl RowSampler {
    pub fn new(
        n_rows: usize,
        sample_size: usize,
        with_replacement: bool,
        sample_probs: Option<&[f64]>,
    ) -> Self {
        Self {
            n_rows,
            sample_size,
            with_replacement,
            weights: sample_probs.map(WeightedSamplingTree::new),
        }
    }

    #[inline]
    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    /// Fill `out` with this tree's rows, sorted ascending.
    ///
    /// # Errors
    ///
    /// [`BuildError::DegenerateSampleWeights`] if the weights run out before
    /// `sample_size` rows are drawn.
    pub fn sample<R: Rng>(
        &self,
        rng: &mut R,
        scratch: &mut RowSampleScratch,
        out: &mut Vec<usize>,
    ) -> Result<(), BuildError> {
        out.clear();
        let n = self.n_rows;
        let s = self.sample_size;

        match (&self.weights, self.with_replacement) {
            (_, false) if s >= n => out.extend(0..n),
            (None, false) => {
                // Partial Fisher-Yates: the first `s` slots become the sample.
                scratch.ix_all.clear();
                scratch.ix_all.extend(0..n);
                for i in 0..s {
                    let j = rng.gen_range(i..n);
                    scratch.ix_all.swap(i, j);
                }
                out.extend_from_slice(&scratch.ix_all[..s]);
            }
            (None, true) => out.extend((0..s).map(|_| rng.gen_range(0..n))),
            (Some(tree), true) => {
                for _ in 0..s {
                    let row = tree
                        .draw(rng.r#gen())
                        .ok_or(BuildError::DegenerateSampleWeights)?;
                    out.push(row);
                }
            }
            (Some(tree), false) => {
                scratch.tree.copy_from(tree);
                for _ in 0..s {
                    let row = scratch
                        .tree
                        .draw(rng.r#gen())
                        .ok_or(BuildError::DegenerateSampleWeights)?;
                    scratch.tree.remove(row);
                    out.push(row);
                }
            }
        }

        out.sort_unstable();

        scratch.is_repeated.clear();
        if self.with_replacement {
            scratch.is_repeated.grow(out.len());
            for pos in 1..out.len() {
                if out[pos] == out[pos - 1] {
                    scratch.is_repeated.insert(pos);
                }
            }
        }
        Ok(())
    }
}
