//! Recursive tree growth.
//!
//! [`TreeGrower`] owns everything the two tree kinds share: row sampling,
//! per-row weights, column eligibility, the recursion over contiguous row
//! ranges, three-way partitioning, missing-value division, leaf creation
//! and the side outputs. What a split *is* comes from a [`SplitModel`]:
//!
//! - [`SingleVariableModel`]: one column, a threshold or a category set
//! - [`HyperplaneModel`]: a random linear combination of several columns
//!
//! # Node recursion
//!
//! Each node owns `ix_arr[st..end]`. After a split the range is reordered
//! into `[left | missing | right]`. Under `MissingAction::Divide` the
//! missing block is grown on both sides: first as the tail of the left
//! child with its fractions scaled by the left share, then as the head of
//! the right child with the right share. Fractions are restored on unwind.

mod hyperplane;
mod single;

pub(crate) use hyperplane::HyperplaneModel;
pub(crate) use single::SingleVariableModel;

use rand::prelude::*;

use super::distance::add_pairwise;
use super::impute::{MissingCells, NodeImputeStats, collapse_path, vote_weight};
use super::sampling::RowSampler;
use super::stats::{categorical_kurtosis, kurtosis, kurtosis_weight};
use super::workspace::{Route, WorkerScratch};
use super::BuildError;
use crate::data::{ColumnRef, DatasetView};
use crate::model::{
    CategoricalParams, HyperplaneParams, ImputeParams, SplitParams, SplitPolicy,
};
use crate::repr::{
    ImputeNode, LeafNode, MissingAction, Node, NodeId, Tree, expected_avg_depth,
    expected_separation_depth,
};

// =============================================================================
// Fit context
// =============================================================================

/// Parameters resolved against the dataset for one fit.
#[derive(Debug, Clone)]
pub(crate) struct GrowParams {
    /// Tree `t` is grown from seed `seed + t`.
    pub seed: u64,
    pub max_depth: usize,
    pub ntry: usize,
    pub ndim: usize,
    pub split: SplitParams,
    pub hyperplane: HyperplaneParams,
    pub categorical: CategoricalParams,
    pub missing_action: MissingAction,
    /// Present when an imputer is built.
    pub impute: Option<ImputeParams>,
    pub depths: bool,
    pub distances: bool,
    pub impute_at_fit: bool,
    /// Kurtosis weighting, after the rule that disables it.
    pub weigh_by_kurtosis: bool,
    /// Sample columns by the dataset's column weights.
    pub use_column_weights: bool,
    pub ncols_per_tree: usize,
    /// Sample weights are density weights rather than probabilities.
    pub density_weights: bool,
}

/// Read-only state shared by every worker during a fit.
#[derive(Debug)]
pub(crate) struct FitContext<'a> {
    pub data: DatasetView<'a>,
    pub params: GrowParams,
    pub sampler: RowSampler,
    /// Missing cells of the training data, for fit-time imputation.
    pub missing: Option<MissingCells>,
    pub cat_offsets: Vec<usize>,
}

// =============================================================================
// SplitModel
// =============================================================================

/// What differs between the single-variable and hyperplane models.
pub(crate) trait SplitModel: Sync {
    type Split: Send;
    type Candidate;

    /// Draw the next candidate at the current node, or `None` when no
    /// eligible column remains.
    fn choose_candidate(&self, ws: &mut WorkerScratch) -> Option<Self::Candidate>;

    /// Evaluate a candidate over `ix_arr[st..end]`.
    ///
    /// Returns `Ok(None)` when the candidate cannot separate the rows; any
    /// column found constant is excluded for the rest of the subtree.
    fn evaluate_split(
        &self,
        ws: &mut WorkerScratch,
        st: usize,
        end: usize,
        candidate: Self::Candidate,
        policy: SplitPolicy,
    ) -> Result<Option<(Self::Split, f64)>, BuildError>;

    /// Branch of `row`.
    fn route(&self, split: &Self::Split, row: usize) -> Route;

    /// Finish a chosen split once the branch weights are known.
    fn materialize_node(
        &self,
        ws: &mut WorkerScratch,
        split: Self::Split,
        weight_left: f64,
        weight_right: f64,
    ) -> Self::Split;
}

// =============================================================================
// TreeGrower
// =============================================================================

/// Grows one tree per call into a caller-provided slot.
pub(crate) struct TreeGrower<'a, 'd, M> {
    model: M,
    ctx: &'a FitContext<'d>,
}

impl<'a, 'd, M: SplitModel> TreeGrower<'a, 'd, M> {
    pub fn new(model: M, ctx: &'a FitContext<'d>) -> Self {
        Self { model, ctx }
    }

    #[inline]
    pub fn ctx(&self) -> &'a FitContext<'d> {
        self.ctx
    }

    /// Grow tree `tree_idx` into `tree`, and its impute nodes into
    /// `impute_nodes` when an imputer is built.
    pub fn grow_tree(
        &self,
        ws: &mut WorkerScratch,
        tree_idx: usize,
        tree: &mut Tree<M::Split>,
        mut impute_nodes: Option<&mut Vec<ImputeNode>>,
    ) -> Result<(), BuildError> {
        let ctx = self.ctx;
        ws.reseed(ctx.params.seed.wrapping_add(tree_idx as u64));
        ctx.sampler.sample(&mut ws.rng, &mut ws.rows, &mut ws.ix_arr)?;
        self.init_row_weights(ws)?;
        self.init_columns(ws);

        tree.clear();
        ws.na_saved.clear();
        ws.impute_depth = 0;
        if let Some(nodes) = impute_nodes.as_deref_mut() {
            nodes.clear();
        }

        if ctx.params.depths {
            for &row in &ws.ix_arr {
                ws.row_hits[row] += 1;
            }
        }

        let n = ws.ix_arr.len();
        self.grow_node(ws, tree, impute_nodes, 0, n, 0)?;
        tree.shrink_to_fit();
        Ok(())
    }

    fn init_row_weights(&self, ws: &mut WorkerScratch) -> Result<(), BuildError> {
        let ctx = self.ctx;
        let n_rows = ctx.data.n_rows();

        ws.weights.density = Default::default();
        if ctx.params.density_weights
            && let Some(w) = ctx.data.sample_weights()
        {
            // Rescale so the sampled rows' weights sum to the sample size.
            let total: f64 = ws.ix_arr.iter().map(|&r| w[r]).sum();
            if !(total > 0.0) {
                return Err(BuildError::DegenerateSampleWeights);
            }
            let scale = ws.ix_arr.len() as f64 / total;
            ws.weights.density.fill(n_rows, &ws.ix_arr, |r| w[r] * scale);
        }

        ws.weights.fraction = Default::default();
        if ctx.params.missing_action == MissingAction::Divide {
            ws.weights.fraction.fill(n_rows, &ws.ix_arr, |_| 1.0);
        }
        Ok(())
    }

    fn init_columns(&self, ws: &mut WorkerScratch) {
        let ctx = self.ctx;
        let n_cols = ctx.data.n_cols();
        let ncols_per_tree = ctx.params.ncols_per_tree;

        match ctx.data.column_weights() {
            Some(w) if ctx.params.use_column_weights => {
                ws.aux.clear();
                ws.aux.extend(w.iter().copied());
                ws.columns
                    .reset_tree(n_cols, Some(&ws.aux[..]), ncols_per_tree, &mut ws.rng);
            }
            _ => ws.columns.reset_tree(n_cols, None, ncols_per_tree, &mut ws.rng),
        }

        if ctx.params.weigh_by_kurtosis {
            self.reweight_by_kurtosis(ws);
        }
    }

    /// Replace column weights by the kurtosis of each active column over
    /// the tree's sample. Repeated draws count once.
    fn reweight_by_kurtosis(&self, ws: &mut WorkerScratch) {
        let data = &self.ctx.data;
        ws.col_buf.clear();
        ws.col_buf.extend(ws.columns.active());
        ws.aux.clear();
        ws.aux.resize(data.n_cols(), 0.0);

        for k in 0..ws.col_buf.len() {
            let col = ws.col_buf[k];
            let kurt = match data.column(col) {
                ColumnRef::Numeric(c) => {
                    ws.values.clear();
                    ws.comb.clear();
                    for (pos, &row) in ws.ix_arr.iter().enumerate() {
                        let x = data.numeric_value(row, c);
                        if ws.rows.is_repeated.contains(pos) || crate::data::is_missing(x) {
                            continue;
                        }
                        ws.values.push(x);
                        ws.comb.push(ws.weights.density.get(row));
                    }
                    let weights = (!ws.weights.density.is_uniform()).then_some(&ws.comb[..]);
                    kurtosis(&ws.values, weights)
                }
                ColumnRef::Categorical(c) => {
                    ws.cat_counts.clear();
                    ws.cat_counts.resize(data.n_categories(c), 0.0);
                    for (pos, &row) in ws.ix_arr.iter().enumerate() {
                        let code = data.category(row, c);
                        if ws.rows.is_repeated.contains(pos) || code < 0 {
                            continue;
                        }
                        ws.cat_counts[code as usize] += ws.weights.density.get(row);
                    }
                    categorical_kurtosis(&ws.cat_counts, &mut ws.rng, &mut ws.values)
                }
            };
            ws.aux[col] = kurtosis_weight(kurt);
        }
        ws.columns.reweight(&ws.aux);
    }

    // -------------------------------------------------------------------------
    // Recursion
    // -------------------------------------------------------------------------

    fn grow_node(
        &self,
        ws: &mut WorkerScratch,
        tree: &mut Tree<M::Split>,
        mut impute_nodes: Option<&mut Vec<ImputeNode>>,
        st: usize,
        end: usize,
        depth: usize,
    ) -> Result<NodeId, BuildError> {
        let id = tree.reserve_node();
        let col_mark = ws.columns.mark();
        if self.ctx.params.impute.is_some() {
            self.push_impute_stats(ws, st, end);
        }

        let split = if end - st <= 1 || depth >= self.ctx.params.max_depth {
            None
        } else {
            self.find_split(ws, st, end)?
        };

        match split {
            None => self.make_leaf(ws, tree, impute_nodes, id, st, end, depth),
            Some(split) => {
                let node = self.split_node(ws, tree, impute_nodes.as_deref_mut(), split, st, end, depth)?;
                tree.set_node(id, node);
            }
        }

        ws.columns.restore_to(col_mark);
        if self.ctx.params.impute.is_some() {
            ws.impute_depth -= 1;
        }
        Ok(id)
    }

    /// Draw a policy, evaluate up to `ntry` candidates under it and keep the
    /// best. `None` makes the node terminal.
    fn find_split(
        &self,
        ws: &mut WorkerScratch,
        st: usize,
        end: usize,
    ) -> Result<Option<M::Split>, BuildError> {
        let split_params = &self.ctx.params.split;
        let policy = split_params.policy_for(ws.rng.r#gen());
        let tries = if policy.uses_gain() { self.ctx.params.ntry } else { 1 };
        // Bounds redraws of candidates that cannot separate the rows.
        let max_attempts = tries + self.ctx.data.n_cols();

        let mut best: Option<(M::Split, f64)> = None;
        let mut done = 0;
        let mut attempts = 0;
        while done < tries && attempts < max_attempts {
            attempts += 1;
            let Some(candidate) = self.model.choose_candidate(ws) else {
                break;
            };
            if let Some((split, gain)) = self.model.evaluate_split(ws, st, end, candidate, policy)? {
                done += 1;
                if best.as_ref().is_none_or(|(_, g)| gain > *g) {
                    best = Some((split, gain));
                }
            }
        }

        Ok(match best {
            Some((_, gain)) if policy.uses_gain() && gain < split_params.min_gain => None,
            Some((split, _)) => Some(split),
            None => None,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn split_node(
        &self,
        ws: &mut WorkerScratch,
        tree: &mut Tree<M::Split>,
        mut impute_nodes: Option<&mut Vec<ImputeNode>>,
        split: M::Split,
        st: usize,
        end: usize,
        depth: usize,
    ) -> Result<Node<M::Split>, BuildError> {
        let params = &self.ctx.params;

        ws.routes.clear();
        let (mut weight_left, mut weight_right) = (0.0, 0.0);
        for p in st..end {
            let row = ws.ix_arr[p];
            let route = self.model.route(&split, row);
            match route {
                Route::Left => weight_left += ws.weights.weight(row),
                Route::Right => weight_right += ws.weights.weight(row),
                Route::Missing => {}
            }
            ws.routes.push(route);
        }

        if params.missing_action != MissingAction::Divide {
            let heavier = if weight_left >= weight_right {
                Route::Left
            } else {
                Route::Right
            };
            for route in ws.routes.iter_mut().filter(|r| **r == Route::Missing) {
                *route = heavier;
            }
        }
        let (n_left, n_missing) = partition3(&mut ws.ix_arr[st..end], &mut ws.routes);

        if params.distances {
            let n = self.ctx.data.n_rows();
            add_pairwise(&mut ws.distances, &ws.ix_arr[st..end], n, 1.0, |r| {
                ws.weights.fraction(r)
            });
        }

        let split = self.model.materialize_node(ws, split, weight_left, weight_right);
        let mid = st + n_left;
        let depth = depth + 1;

        let (left, right) = if n_missing == 0 {
            let left = self.grow_node(ws, tree, impute_nodes.as_deref_mut(), st, mid, depth)?;
            let right = self.grow_node(ws, tree, impute_nodes, mid, end, depth)?;
            (left, right)
        } else {
            let pct_left = branch_share(weight_left, weight_right);
            let mark = ws.na_saved.len();
            for p in mid..mid + n_missing {
                let row = ws.ix_arr[p];
                ws.na_saved.push((row, ws.weights.fraction(row)));
            }
            self.scale_divided(ws, mark, pct_left);
            let left =
                self.grow_node(ws, tree, impute_nodes.as_deref_mut(), st, mid + n_missing, depth)?;

            let regrouped = self.regroup_missing(ws, &split, st, mid + n_missing);
            debug_assert_eq!(regrouped, mid);
            self.scale_divided(ws, mark, 1.0 - pct_left);
            let right = self.grow_node(ws, tree, impute_nodes, mid, end, depth)?;

            self.scale_divided(ws, mark, 1.0);
            ws.na_saved.truncate(mark);
            (left, right)
        };

        Ok(Node::Internal { split, left, right })
    }

    /// Set the fraction of every row saved after `mark` to `saved · share`.
    fn scale_divided(&self, ws: &mut WorkerScratch, mark: usize, share: f64) {
        for k in mark..ws.na_saved.len() {
            let (row, saved) = ws.na_saved[k];
            ws.weights.fraction.set(row, saved * share);
        }
    }

    /// Move rows missing under `split` to the end of `ix_arr[st..end]`.
    /// Returns where they start.
    fn regroup_missing(&self, ws: &mut WorkerScratch, split: &M::Split, st: usize, end: usize) -> usize {
        let mut write = st;
        for p in st..end {
            if self.model.route(split, ws.ix_arr[p]) != Route::Missing {
                ws.ix_arr.swap(write, p);
                write += 1;
            }
        }
        write
    }

    #[allow(clippy::too_many_arguments)]
    fn make_leaf(
        &self,
        ws: &mut WorkerScratch,
        tree: &mut Tree<M::Split>,
        impute_nodes: Option<&mut Vec<ImputeNode>>,
        id: NodeId,
        st: usize,
        end: usize,
        depth: usize,
    ) {
        let ctx = self.ctx;
        let params = &ctx.params;
        let n_rows = end - st;
        let weight: f64 = ws.ix_arr[st..end].iter().map(|&r| ws.weights.weight(r)).sum();
        let remainder = expected_avg_depth(weight);
        tree.set_node(
            id,
            Node::Leaf(LeafNode {
                n_rows,
                weight,
                remainder,
                depth: depth as u32,
            }),
        );

        if params.depths {
            let score = depth as f64 + remainder;
            for &row in &ws.ix_arr[st..end] {
                ws.row_depths[row] += ws.weights.fraction(row) * score;
            }
        }

        if params.distances && n_rows > 1 {
            let n = ctx.data.n_rows();
            let sep = expected_separation_depth(n_rows);
            add_pairwise(&mut ws.distances, &ws.ix_arr[st..end], n, sep, |r| {
                ws.weights.fraction(r)
            });
        }

        if let Some(impute) = &params.impute {
            let node = collapse_path(
                &ws.impute_stack[..ws.impute_depth],
                id,
                impute.min_imp_obs as f64,
                &ctx.cat_offsets,
            );
            if params.impute_at_fit
                && let (Some(missing), Some(acc)) = (&ctx.missing, ws.imputations.as_mut())
            {
                for &row in &ws.ix_arr[st..end] {
                    if missing.has_missing(row) {
                        let w = vote_weight(impute, depth as u32, weight, ws.weights.fraction(row));
                        acc.add_row(missing, row, &node, w);
                    }
                }
            }
            if let Some(nodes) = impute_nodes {
                nodes.push(node);
            }
        }
    }

    fn push_impute_stats(&self, ws: &mut WorkerScratch, st: usize, end: usize) {
        if ws.impute_stack.len() <= ws.impute_depth {
            ws.impute_stack.push(NodeImputeStats::default());
        }
        ws.impute_stack[ws.impute_depth].compute(
            &self.ctx.data,
            &ws.ix_arr[st..end],
            &ws.weights,
            &self.ctx.cat_offsets,
        );
        ws.impute_depth += 1;
    }
}

/// Share of the non-missing weight sent left.
#[inline]
pub(crate) fn branch_share(weight_left: f64, weight_right: f64) -> f64 {
    let total = weight_left + weight_right;
    if total > 0.0 { weight_left / total } else { 0.5 }
}

/// Reorder `ix` (and `routes` alongside) into `[left | missing | right]`.
/// Returns the sizes of the left and missing blocks.
fn partition3(ix: &mut [usize], routes: &mut [Route]) -> (usize, usize) {
    let (mut lo, mut mid, mut hi) = (0, 0, ix.len());
    while mid < hi {
        match routes[mid] {
            Route::Left => {
                ix.swap(lo, mid);
                routes.swap(lo, mid);
                lo += 1;
                mid += 1;
            }
            Route::Missing => mid += 1,
            Route::Right => {
                hi -= 1;
                ix.swap(mid, hi);
                routes.swap(mid, hi);
            }
        }
    }
    (lo, mid - lo)
}
