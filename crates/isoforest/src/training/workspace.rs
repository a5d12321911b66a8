//! Per-worker scratch state.
//!
//! A [`WorkerScratch`] is created once per worker and reused for every tree
//! that worker builds. Buffers only grow. Side outputs (depths, distances,
//! imputation candidates) accumulate across those trees and are reduced by
//! the trainer once all workers are done.

use std::collections::HashMap;

use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

use super::impute::{ImputeAccumulator, NodeImputeStats};
use super::sampling::{ColumnSampler, RowSampleScratch};
use super::split::{CategoricalScratch, RunningMoments};
use crate::repr::HyperplaneTerm;

/// Samples smaller than `n_rows / SPARSE_WEIGHT_RATIO` keep per-row
/// weights in a map instead of a dense array.
pub(crate) const SPARSE_WEIGHT_RATIO: usize = 50;

// =============================================================================
// Row weights
// =============================================================================

/// Per-row multiplier for the rows of the current tree.
#[derive(Debug, Clone, Default)]
pub(crate) enum RowWeightStore {
    /// Every row weighs one.
    #[default]
    Uniform,
    Dense(Vec<f64>),
    Sparse(HashMap<usize, f64>),
}

impl RowWeightStore {
    /// Switch to a dense or sparse store holding `value(row)` for each row.
    pub fn fill(
        &mut self,
        n_rows: usize,
        rows: &[usize],
        value: impl Fn(usize) -> f64,
    ) {
        if rows.len() < n_rows / SPARSE_WEIGHT_RATIO {
            let mut map = match std::mem::take(self) {
                RowWeightStore::Sparse(mut map) => {
                    map.clear();
                    map
                }
                _ => HashMap::with_capacity(rows.len()),
            };
            map.extend(rows.iter().map(|&r| (r, value(r))));
            *self = RowWeightStore::Sparse(map);
        } else {
            let mut dense = match std::mem::take(self) {
                RowWeightStore::Dense(dense) => dense,
                _ => Vec::new(),
            };
            dense.clear();
            dense.resize(n_rows, 0.0);
            for &r in rows {
                dense[r] = value(r);
            }
            *self = RowWeightStore::Dense(dense);
        }
    }

    #[inline]
    pub fn get(&self, row: usize) -> f64 {
        match self {
            RowWeightStore::Uniform => 1.0,
            RowWeightStore::Dense(dense) => dense[row],
            RowWeightStore::Sparse(map) => map.get(&row).copied().unwrap_or(1.0),
        }
    }

    #[inline]
    pub fn set(&mut self, row: usize, weight: f64) {
        match self {
            RowWeightStore::Uniform => debug_assert!(false, "uniform weights are read-only"),
            RowWeightStore::Dense(dense) => dense[row] = weight,
            RowWeightStore::Sparse(map) => {
                map.insert(row, weight);
            }
        }
    }

    #[inline]
    pub fn is_uniform(&self) -> bool {
        matches!(self, RowWeightStore::Uniform)
    }
}

/// Weights of the rows of the current tree.
///
/// - `density`: normalized sample weights when they are not sampling
///   probabilities
/// - `fraction`: share of a row that reached the current node; below one
///   only for rows divided at a missing value
#[derive(Debug, Clone, Default)]
pub(crate) struct RowWeights {
    pub density: RowWeightStore,
    pub fraction: RowWeightStore,
}

impl RowWeights {
    /// Weight used in gains, leaf weights and imputation.
    #[inline]
    pub fn weight(&self, row: usize) -> f64 {
        self.density.get(row) * self.fraction.get(row)
    }

    /// Share of the row at the current node.
    #[inline]
    pub fn fraction(&self, row: usize) -> f64 {
        self.fraction.get(row)
    }

    #[inline]
    pub fn is_uniform(&self) -> bool {
        self.density.is_uniform() && self.fraction.is_uniform()
    }
}

// =============================================================================
// Routing
// =============================================================================

/// Branch taken by one row at a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Route {
    Left,
    Right,
    Missing,
}

// =============================================================================
// WorkerScratch
// =============================================================================

/// Everything one worker mutates while building trees.
#[derive(Debug)]
pub(crate) struct WorkerScratch {
    /// Re-seeded at the start of every tree.
    pub rng: Xoshiro256PlusPlus,
    /// Rows of the current tree. Each node owns a contiguous range.
    pub ix_arr: Vec<usize>,
    pub rows: RowSampleScratch,
    pub columns: ColumnSampler,
    pub weights: RowWeights,

    // Split search.
    pub pairs: Vec<(f64, f64)>,
    pub suffix: Vec<RunningMoments>,
    pub cat_counts: Vec<f64>,
    pub categorical: CategoricalScratch,
    pub routes: Vec<Route>,
    pub values: Vec<f64>,
    pub aux: Vec<f64>,
    pub comb: Vec<f64>,
    pub quantile_ix: Vec<usize>,
    pub col_buf: Vec<usize>,

    // Hyperplane candidates: terms built so far, columns found constant,
    // and the per-category coefficients of the current subset term.
    pub hp_terms: Vec<HyperplaneTerm>,
    pub hp_constant: Vec<usize>,
    pub hp_coefs: Vec<f64>,

    /// `(row, fraction)` of rows divided at ancestors, restored on unwind.
    pub na_saved: Vec<(usize, f64)>,

    // Imputer.
    pub impute_stack: Vec<NodeImputeStats>,
    pub impute_depth: usize,

    // Side outputs, summed over this worker's trees.
    pub row_depths: Vec<f64>,
    /// Times each row was drawn, the denominator of its average depth.
    pub row_hits: Vec<u32>,
    pub distances: Vec<f64>,
    pub imputations: Option<ImputeAccumulator>,
}

impl WorkerScratch {
    /// Scratch for a fit over `n_rows` rows.
    ///
    /// `n_pairs` is the length of the distance accumulator (zero when
    /// distances are not requested).
    pub fn new(
        n_rows: usize,
        depths: bool,
        n_pairs: usize,
        imputations: Option<ImputeAccumulator>,
    ) -> Self {
        Self {
            rng: Xoshiro256PlusPlus::seed_from_u64(0),
            ix_arr: Vec::new(),
            rows: RowSampleScratch::default(),
            columns: ColumnSampler::default(),
            weights: RowWeights::default(),
            pairs: Vec::new(),
            suffix: Vec::new(),
            cat_counts: Vec::new(),
            categorical: CategoricalScratch::default(),
            routes: Vec::new(),
            values: Vec::new(),
            aux: Vec::new(),
            comb: Vec::new(),
            quantile_ix: Vec::new(),
            col_buf: Vec::new(),
            hp_terms: Vec::new(),
            hp_constant: Vec::new(),
            hp_coefs: Vec::new(),
            na_saved: Vec::new(),
            impute_stack: Vec::new(),
            impute_depth: 0,
            row_depths: if depths { vec![0.0; n_rows] } else { Vec::new() },
            row_hits: if depths { vec![0; n_rows] } else { Vec::new() },
            distances: vec![0.0; n_pairs],
            imputations,
        }
    }

    /// Start a tree with a fresh random stream.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    }
}
