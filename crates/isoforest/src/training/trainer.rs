//! Isolation forest trainer.
//!
//! Fans tree construction out over a rayon pool, reduces the side outputs and
//! assembles the [`Forest`] and [`Imputer`]. Use [`IsoForestTrainer::fit`] for
//! a new forest and [`IsoForestTrainer::add_tree`] to grow an existing one.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use ndarray::Array1;

use super::cancel::CancellationToken;
use super::distance::{finalize_distances, n_pairs};
use super::grower::{
    FitContext, GrowParams, HyperplaneModel, SingleVariableModel, SplitModel, TreeGrower,
};
use super::impute::{
    ImputeAccumulator, ImputedValues, MissingCells, category_offsets, column_fallbacks,
};
use super::logger::TrainingLogger;
use super::sampling::RowSampler;
use super::workspace::WorkerScratch;
use super::{BuildError, FitError};
use crate::data::{DatasetMut, DatasetView};
use crate::model::{ConfigError, InterruptBehavior, IsoForestConfig};
use crate::repr::{
    Forest, ForestKind, ForestMeta, ForestTrees, ImputeNode, Imputer, Tree, expected_avg_depth,
    expected_separation_depth,
};
use crate::utils::run_with_threads;

// =============================================================================
// FitOutput
// =============================================================================

/// How a fit ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitStatus {
    Completed,
    /// Cancelled between trees. The forest holds the trees finished so far
    /// and no side outputs are reported.
    Interrupted,
}

/// Everything a fit produces.
#[derive(Debug)]
pub struct FitOutput {
    pub status: FitStatus,
    pub forest: Forest,
    /// Present when `build_imputer` is set.
    pub imputer: Option<Imputer>,
    /// Triangular pairwise distances (see [`tri_index`](super::tri_index)).
    pub distances: Option<Vec<f64>>,
    /// Average isolation depth, or its standardized score, per row.
    pub depths: Option<Array1<f64>>,
    /// Values imputed for the training data's missing cells.
    pub imputed: Option<ImputedValues>,
}

impl FitOutput {
    #[inline]
    pub fn is_interrupted(&self) -> bool {
        self.status == FitStatus::Interrupted
    }
}

// =============================================================================
// Worker state
// =============================================================================

/// Per-worker accumulator of the parallel fold.
struct WorkerState<S> {
    scratch: WorkerScratch,
    trees: Vec<(usize, Tree<S>, Option<Vec<ImputeNode>>)>,
}

/// Side outputs summed over workers.
struct Reduced {
    row_depths: Vec<f64>,
    row_hits: Vec<u32>,
    distances: Vec<f64>,
    imputations: Option<ImputeAccumulator>,
}

/// Trees of one kind with their impute nodes, in tree order.
struct Built<S> {
    trees: Vec<Tree<S>>,
    impute_nodes: Vec<Vec<ImputeNode>>,
    reduced: Reduced,
    interrupted: bool,
}

/// What the context is prepared for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Purpose {
    Fit,
    /// Growing one more tree: no side outputs, imputer nodes only when an
    /// imputer is passed.
    Append { with_imputer: bool },
}

// =============================================================================
// IsoForestTrainer
// =============================================================================

/// Builds isolation forests.
///
/// # Example
///
/// ```
/// use isoforest::data::DatasetView;
/// use isoforest::model::IsoForestConfig;
/// use isoforest::training::IsoForestTrainer;
/// use ndarray::Array2;
///
/// // Feature-major: 2 columns, 64 rows.
/// let x = Array2::from_shape_fn((2, 64), |(c, r)| ((r * 7 + c * 3) % 13) as f64);
/// let data = DatasetView::from_dense(x.view()).unwrap();
///
/// let config = IsoForestConfig::builder().n_trees(10).build().unwrap();
/// let output = IsoForestTrainer::new(config).fit(&data).unwrap();
/// assert_eq!(output.forest.n_trees(), 10);
/// ```
#[derive(Debug, Clone)]
pub struct IsoForestTrainer {
    config: IsoForestConfig,
    logger: TrainingLogger,
}

impl IsoForestTrainer {
    pub fn new(config: IsoForestConfig) -> Self {
        let logger = TrainingLogger::new(config.verbosity);
        Self { config, logger }
    }

    #[inline]
    pub fn config(&self) -> &IsoForestConfig {
        &self.config
    }

    /// Kind of forest this configuration builds.
    #[inline]
    pub fn forest_kind(&self) -> ForestKind {
        if self.config.split.is_extended() {
            ForestKind::Hyperplane
        } else {
            ForestKind::SingleVariable
        }
    }

    /// Fit a forest.
    ///
    /// # Errors
    ///
    /// Configuration conflicts with the data are reported before any tree
    /// is built. A failing tree aborts the fit after in-flight trees finish.
    pub fn fit(&self, data: &DatasetView<'_>) -> Result<FitOutput, FitError> {
        self.fit_with_cancellation(data, &CancellationToken::new())
    }

    /// Fit a forest, polling `cancel` before each tree.
    pub fn fit_with_cancellation(
        &self,
        data: &DatasetView<'_>,
        cancel: &CancellationToken,
    ) -> Result<FitOutput, FitError> {
        let ctx = self.context(data, Purpose::Fit)?;
        let n_trees = self.config.n_trees;
        let kind = self.forest_kind();
        self.logger
            .start_training(kind, n_trees, ctx.sampler.sample_size(), self.config.thread_count());

        let meta = self.forest_meta(&ctx);
        let mut forest = Forest::new(kind, meta);
        let mut imputer = ctx.params.impute.as_ref().map(|_| {
            let (means, modes) = column_fallbacks(data);
            Imputer::new(means, modes)
        });

        let (impute_nodes, reduced, interrupted) = match forest.trees_mut() {
            ForestTrees::SingleVariable(trees) => {
                let built = self.build_trees(SingleVariableModel::new(&ctx), &ctx, cancel)?;
                *trees = built.trees;
                (built.impute_nodes, built.reduced, built.interrupted)
            }
            ForestTrees::Hyperplane(trees) => {
                let built = self.build_trees(HyperplaneModel::new(&ctx), &ctx, cancel)?;
                *trees = built.trees;
                (built.impute_nodes, built.reduced, built.interrupted)
            }
        };
        if let Some(imputer) = imputer.as_mut() {
            for nodes in impute_nodes {
                imputer.push_tree(nodes);
            }
        }

        if interrupted {
            self.logger.interrupted(forest.n_trees(), n_trees);
            if self.config.interrupt_behavior == InterruptBehavior::Error {
                return Err(FitError::Interrupted);
            }
            return Ok(FitOutput {
                status: FitStatus::Interrupted,
                forest,
                imputer,
                distances: None,
                depths: None,
                imputed: None,
            });
        }

        let output = self.finish_outputs(&ctx, forest, imputer, reduced);
        self.logger.finish_training(output.forest.n_trees());
        Ok(output)
    }

    /// Fit a forest and write the imputed values back into `data`.
    ///
    /// Requires `impute_at_fit`.
    pub fn fit_in_place(
        &self,
        data: &mut DatasetMut<'_>,
        cancel: &CancellationToken,
    ) -> Result<FitOutput, FitError> {
        if !self.config.output.impute_at_fit {
            return Err(ConfigError::InPlaceWithoutImputeAtFit.into());
        }
        let output = {
            let view = data.view()?;
            self.fit_with_cancellation(&view, cancel)?
        };
        if let Some(imputed) = &output.imputed {
            imputed.apply(data);
        }
        Ok(output)
    }

    /// Append one tree to `forest`, and its impute nodes to `imputer`.
    ///
    /// The tree is grown with seed `seed + next_tree_idx` from the forest's
    /// metadata, which then advances. On failure the forest and imputer are
    /// left exactly as they were. Callers must not
    /// share `forest` with another thread during the call.
    pub fn add_tree(
        &self,
        data: &DatasetView<'_>,
        forest: &mut Forest,
        imputer: Option<&mut Imputer>,
    ) -> Result<(), FitError> {
        let kind = self.forest_kind();
        if forest.kind() != kind {
            return Err(ConfigError::ForestKindMismatch {
                forest: forest.kind(),
                config: kind,
            }
            .into());
        }
        let meta = forest.meta();
        let expected = (meta.n_numeric, meta.n_categorical);
        let got = (data.n_numeric(), data.n_categorical());
        if expected != got {
            return Err(ConfigError::ForestColumnsMismatch { expected, got }.into());
        }
        if let Some(imputer) = imputer.as_deref()
            && imputer.n_trees() != forest.n_trees()
        {
            return Err(ConfigError::ImputerTreeCountMismatch {
                imputer: imputer.n_trees(),
                forest: forest.n_trees(),
            }
            .into());
        }

        let ctx = self.context(
            data,
            Purpose::Append {
                with_imputer: imputer.is_some(),
            },
        )?;
        let tree_idx = forest.n_trees();
        let seed_idx = forest.meta().next_tree_idx;
        let penalize_range = ctx.params.split.penalize_range;
        let n_nodes = match forest.trees_mut() {
            ForestTrees::SingleVariable(trees) => {
                self.append_with(SingleVariableModel::new(&ctx), &ctx, seed_idx, trees, imputer)?;
                trees[tree_idx].n_nodes()
            }
            ForestTrees::Hyperplane(trees) => {
                self.append_with(HyperplaneModel::new(&ctx), &ctx, seed_idx, trees, imputer)?;
                trees[tree_idx].n_nodes()
            }
        };
        let meta = forest.meta_mut();
        meta.has_range_penalty |= penalize_range;
        meta.next_tree_idx = seed_idx + 1;
        self.logger.tree_built(tree_idx, n_nodes);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Preparation
    // -------------------------------------------------------------------------

    /// Check the configuration against the data and resolve every parameter.
    fn context<'a>(&self, data: &DatasetView<'a>, purpose: Purpose) -> Result<FitContext<'a>, ConfigError> {
        let config = &self.config;
        config.validate()?;

        let n_rows = data.n_rows();
        let n_cols = data.n_cols();
        let sampling = &config.sampling;
        let sample_size = sampling.sample_size.unwrap_or(n_rows);
        if !sampling.with_replacement && sample_size > n_rows {
            return Err(ConfigError::SampleSizeTooLarge { sample_size, n_rows });
        }
        let full_sample = !sampling.with_replacement && sample_size == n_rows;

        let fitting = purpose == Purpose::Fit;
        let output = &config.output;
        let depths = fitting && output.depths;
        let distances = fitting && output.distances;
        let impute_at_fit = fitting && output.impute_at_fit;
        if fitting && output.needs_full_sample() && !full_sample {
            let output = if distances { "distances" } else { "impute_at_fit" };
            return Err(ConfigError::OutputNeedsFullSample { output });
        }
        if distances && data.sample_weights().is_some() {
            return Err(ConfigError::DistancesWithSampleWeights);
        }

        let split = &config.split;
        if data.column_weights().is_some() && split.weigh_by_kurtosis {
            return Err(ConfigError::ColumnWeightsWithKurtosis);
        }

        let sample_probs = match data.sample_weights() {
            Some(w) if sampling.weights_as_sample_prob && !full_sample => {
                let available = w.iter().filter(|&&x| x > 0.0).count();
                let needed = if sampling.with_replacement { 1 } else { sample_size };
                if available < needed {
                    return Err(ConfigError::NotEnoughPositiveWeights { needed, available });
                }
                Some(w.to_vec())
            }
            _ => None,
        };
        let density_weights = data.sample_weights().is_some() && !sampling.weights_as_sample_prob;

        let extended = split.is_extended();
        let avoid_col_weights = (!extended && split.prob_pick_pooled_gain + split.prob_pick_avg_gain >= 1.0)
            || (extended && split.ndim >= n_cols);
        let ntry = if extended { split.ntry } else { split.ntry.min(n_cols) };

        let impute = match purpose {
            Purpose::Fit => config.impute.build_imputer,
            Purpose::Append { with_imputer } => with_imputer,
        }
        .then(|| config.impute.clone());

        let params = GrowParams {
            seed: config.seed,
            max_depth: split.max_depth.resolve(sample_size),
            ntry,
            ndim: split.ndim.min(n_cols),
            split: split.clone(),
            hyperplane: config.hyperplane.clone(),
            categorical: config.categorical.clone(),
            missing_action: config.missing_action,
            impute,
            depths,
            distances,
            impute_at_fit,
            weigh_by_kurtosis: split.weigh_by_kurtosis && !avoid_col_weights,
            use_column_weights: data.column_weights().is_some() && !avoid_col_weights,
            ncols_per_tree: sampling.ncols_per_tree.unwrap_or(n_cols).min(n_cols),
            density_weights,
        };

        Ok(FitContext {
            data: *data,
            sampler: RowSampler::new(
                n_rows,
                sample_size,
                sampling.with_replacement,
                sample_probs.as_deref(),
            ),
            missing: impute_at_fit.then(|| MissingCells::scan(data)),
            cat_offsets: category_offsets(data),
            params,
        })
    }

    fn forest_meta(&self, ctx: &FitContext<'_>) -> ForestMeta {
        let sample_size = ctx.sampler.sample_size();
        ForestMeta {
            exp_avg_depth: expected_avg_depth(sample_size as f64),
            exp_avg_sep: expected_separation_depth(sample_size),
            sample_size,
            orig_sample_size: ctx.data.n_rows(),
            has_range_penalty: ctx.params.split.penalize_range,
            missing_action: ctx.params.missing_action,
            categorical_split: ctx.params.categorical.split_type,
            new_category_action: ctx.params.categorical.new_category_action,
            n_numeric: ctx.data.n_numeric(),
            n_categorical: ctx.data.n_categorical(),
            next_tree_idx: self.config.n_trees,
        }
    }

    fn new_scratch(ctx: &FitContext<'_>) -> WorkerScratch {
        let params = &ctx.params;
        let n_rows = ctx.data.n_rows();
        let n_dist = if params.distances { n_pairs(n_rows) } else { 0 };
        let imputations = ctx
            .missing
            .as_ref()
            .filter(|_| params.impute_at_fit)
            .map(ImputeAccumulator::new);
        WorkerScratch::new(n_rows, params.depths, n_dist, imputations)
    }

    // -------------------------------------------------------------------------
    // Tree construction
    // -------------------------------------------------------------------------

    fn build_trees<M: SplitModel>(
        &self,
        model: M,
        ctx: &FitContext<'_>,
        cancel: &CancellationToken,
    ) -> Result<Built<M::Split>, FitError> {
        let grower = TreeGrower::new(model, ctx);
        let n_trees = self.config.n_trees;
        let with_imputer = ctx.params.impute.is_some();
        let stop = AtomicBool::new(false);
        let interrupted = AtomicBool::new(false);
        let first_error: Mutex<Option<(usize, BuildError)>> = Mutex::new(None);
        let logger = self.logger;

        let states = run_with_threads(self.config.thread_count(), |parallelism| {
            parallelism.maybe_par_workers(
                n_trees,
                || WorkerState {
                    scratch: Self::new_scratch(ctx),
                    trees: Vec::new(),
                },
                |state, tree_idx| {
                    if stop.load(Ordering::Relaxed) {
                        return;
                    }
                    if cancel.is_cancelled() {
                        interrupted.store(true, Ordering::Relaxed);
                        stop.store(true, Ordering::Relaxed);
                        return;
                    }

                    let mut tree = Tree::default();
                    let mut nodes = with_imputer.then(Vec::new);
                    match grower.grow_tree(&mut state.scratch, tree_idx, &mut tree, nodes.as_mut()) {
                        Ok(()) => {
                            logger.tree_built(tree_idx, tree.n_nodes());
                            state.trees.push((tree_idx, tree, nodes));
                        }
                        Err(error) => {
                            logger.tree_failed(tree_idx, &error);
                            stop.store(true, Ordering::Relaxed);
                            // Lowest tree index wins so the reported error
                            // does not depend on scheduling.
                            if let Ok(mut slot) = first_error.lock()
                                && slot.as_ref().is_none_or(|(idx, _)| tree_idx < *idx)
                            {
                                *slot = Some((tree_idx, error));
                            }
                        }
                    }
                },
            )
        })?;

        let recorded = match first_error.into_inner() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some((tree, source)) = recorded {
            return Err(FitError::TreeBuild { tree, source });
        }

        let mut reduced: Option<Reduced> = None;
        let mut all_trees = Vec::with_capacity(n_trees);
        for state in states {
            all_trees.extend(state.trees);
            let scratch = state.scratch;
            match reduced.as_mut() {
                None => {
                    reduced = Some(Reduced {
                        row_depths: scratch.row_depths,
                        row_hits: scratch.row_hits,
                        distances: scratch.distances,
                        imputations: scratch.imputations,
                    })
                }
                Some(acc) => {
                    add_assign(&mut acc.row_depths, &scratch.row_depths);
                    for (a, b) in acc.row_hits.iter_mut().zip(&scratch.row_hits) {
                        *a += b;
                    }
                    add_assign(&mut acc.distances, &scratch.distances);
                    if let (Some(a), Some(b)) = (acc.imputations.as_mut(), scratch.imputations.as_ref()) {
                        a.merge(b);
                    }
                }
            }
        }
        let reduced = match reduced {
            Some(reduced) => reduced,
            None => {
                let scratch = Self::new_scratch(ctx);
                Reduced {
                    row_depths: scratch.row_depths,
                    row_hits: scratch.row_hits,
                    distances: scratch.distances,
                    imputations: scratch.imputations,
                }
            }
        };

        all_trees.sort_unstable_by_key(|(idx, _, _)| *idx);
        let mut trees = Vec::with_capacity(all_trees.len());
        let mut impute_nodes = Vec::with_capacity(if with_imputer { all_trees.len() } else { 0 });
        for (_, tree, nodes) in all_trees {
            trees.push(tree);
            if let Some(nodes) = nodes {
                impute_nodes.push(nodes);
            }
        }

        Ok(Built {
            trees,
            impute_nodes,
            reduced,
            interrupted: interrupted.into_inner(),
        })
    }

    /// Grow one tree, seeded by `seed_idx`, directly into a new slot of
    /// `trees`, rolling back both `trees` and `imputer` on failure.
    fn append_with<M: SplitModel>(
        &self,
        model: M,
        ctx: &FitContext<'_>,
        seed_idx: usize,
        trees: &mut Vec<Tree<M::Split>>,
        mut imputer: Option<&mut Imputer>,
    ) -> Result<(), FitError> {
        let tree_idx = trees.len();
        let grower = TreeGrower::new(model, ctx);
        let mut scratch = Self::new_scratch(ctx);

        trees.push(Tree::default());
        if let Some(imputer) = imputer.as_deref_mut() {
            imputer.push_tree(Vec::new());
        }

        let nodes = imputer.as_deref_mut().map(|imp| imp.tree_mut(tree_idx));
        let result = grower.grow_tree(&mut scratch, seed_idx, &mut trees[tree_idx], nodes);

        if let Err(source) = result {
            self.logger.tree_failed(tree_idx, &source);
            trees.truncate(tree_idx);
            if let Some(imputer) = imputer {
                imputer.truncate(tree_idx);
            }
            return Err(FitError::TreeBuild {
                tree: tree_idx,
                source,
            });
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Reduction
    // -------------------------------------------------------------------------

    fn finish_outputs(
        &self,
        ctx: &FitContext<'_>,
        forest: Forest,
        imputer: Option<Imputer>,
        reduced: Reduced,
    ) -> FitOutput {
        let params = &ctx.params;
        let output = &self.config.output;
        let meta = forest.meta();

        let depths = params.depths.then(|| {
            let exp_avg_depth = meta.exp_avg_depth;
            Array1::from_iter(reduced.row_depths.iter().zip(&reduced.row_hits).map(|(&sum, &hits)| {
                let avg = if hits > 0 { sum / hits as f64 } else { f64::NAN };
                if output.standardize_depth {
                    (-avg / exp_avg_depth).exp2()
                } else {
                    avg
                }
            }))
        });

        let distances = params.distances.then(|| {
            let mut dist = reduced.distances;
            finalize_distances(&mut dist, forest.n_trees(), output.standardize_dist, meta.exp_avg_sep);
            dist
        });

        let imputed = match (&ctx.missing, &reduced.imputations, &imputer) {
            (Some(missing), Some(acc), Some(imputer)) => Some(acc.finish(missing, &ctx.data, imputer)),
            _ => None,
        };

        self.logger.outputs_reduced(
            depths.is_some(),
            distances.is_some(),
            imputed.as_ref().map_or(0, ImputedValues::len),
        );

        FitOutput {
            status: FitStatus::Completed,
            forest,
            imputer,
            distances,
            depths,
            imputed,
        }
    }
}

#[inline]
fn add_assign(acc: &mut [f64], other: &[f64]) {
    for (a, b) in acc.iter_mut().zip(other) {
        *a += b;
    }
}

// =============================================================================
// Tests
// =============================================================================
