//! Nested parameter groups for forest configuration.
//!
//! These structs are composed by [`IsoForestConfig`](super::IsoForestConfig).
//! Parameters are grouped by concern:
//! - [`SamplingParams`]: rows and columns drawn per tree
//! - [`SplitParams`]: split selection and tree depth
//! - [`HyperplaneParams`]: coefficients of the extended model
//! - [`CategoricalParams`]: categorical split shape and unseen categories
//! - [`ImputeParams`]: imputer construction
//! - [`OutputParams`]: side outputs computed during fitting
//!
//! Each group has defaults and a `validate` method.

use crate::repr::{CategoricalSplit, NewCategoryAction};

// =============================================================================
// SamplingParams
// =============================================================================

/// Row and column sampling per tree.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingParams {
    /// Rows drawn per tree. `None` uses every row.
    pub sample_size: Option<usize>,
    /// Draw rows with replacement.
    pub with_replacement: bool,
    /// Treat sample weights as sampling probabilities. When `false` they
    /// are density weights used in gain, kurtosis and leaf weights.
    pub weights_as_sample_prob: bool,
    /// Columns eligible per tree. `None` uses every column.
    pub ncols_per_tree: Option<usize>,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            sample_size: None,
            with_replacement: false,
            weights_as_sample_prob: true,
            ncols_per_tree: None,
        }
    }
}

impl SamplingParams {
    pub fn validate(&self) -> Result<(), ParamValidationError> {
        if self.sample_size == Some(0) {
            return Err(ParamValidationError::InvalidSampleSize);
        }
        if self.ncols_per_tree == Some(0) {
            return Err(ParamValidationError::InvalidNcolsPerTree);
        }
        Ok(())
    }
}

// =============================================================================
// SplitParams
// =============================================================================

/// Maximum tree depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DepthLimit {
    /// `ceil(log2(sample_size))`.
    #[default]
    Auto,
    /// A fixed depth.
    Fixed(usize),
    /// Grow until rows are isolated (`sample_size - 1`).
    Unlimited,
}

impl DepthLimit {
    /// Concrete depth for a given sample size.
    pub fn resolve(self, sample_size: usize) -> usize {
        match self {
            DepthLimit::Auto => log2_ceil(sample_size),
            DepthLimit::Fixed(depth) => depth,
            DepthLimit::Unlimited => sample_size.saturating_sub(1),
        }
    }
}

#[inline]
fn log2_ceil(n: usize) -> usize {
    if n <= 1 {
        0
    } else {
        (usize::BITS - (n - 1).leading_zeros()) as usize
    }
}

/// How a node chooses its split point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitPolicy {
    /// Uniformly random threshold / category assignment.
    Random,
    /// Maximize the size-weighted dispersion reduction.
    PooledGain,
    /// Maximize the unweighted average dispersion reduction.
    AveragedGain,
}

impl SplitPolicy {
    #[inline]
    pub fn uses_gain(self) -> bool {
        !matches!(self, SplitPolicy::Random)
    }
}

/// Split selection parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitParams {
    /// Columns per split. 1 = single-variable model, more = hyperplane model.
    pub ndim: usize,
    /// Candidates evaluated per node under a gain policy.
    pub ntry: usize,
    /// Probability of the pooled-gain policy at a node.
    pub prob_pick_pooled_gain: f64,
    /// Probability of the averaged-gain policy at a node.
    pub prob_pick_avg_gain: f64,
    /// Splits with a smaller standardized gain make the node terminal.
    pub min_gain: f64,
    pub max_depth: DepthLimit,
    /// Record value ranges at split nodes for the scoring-time penalty.
    pub penalize_range: bool,
    /// Sample columns by kurtosis.
    pub weigh_by_kurtosis: bool,
    /// Enumerate every categorical bipartition under pooled gain.
    pub all_perm: bool,
}

impl Default for SplitParams {
    fn default() -> Self {
        Self {
            ndim: 1,
            ntry: 1,
            prob_pick_pooled_gain: 0.0,
            prob_pick_avg_gain: 0.0,
            min_gain: 0.0,
            max_depth: DepthLimit::Auto,
            penalize_range: false,
            weigh_by_kurtosis: false,
            all_perm: false,
        }
    }
}

impl SplitParams {
    /// Single-column splits with uniformly random thresholds.
    pub fn random() -> Self {
        Self::default()
    }

    /// Hyperplane splits over `ndim` columns.
    pub fn extended(ndim: usize) -> Self {
        Self {
            ndim,
            ..Default::default()
        }
    }

    #[inline]
    pub fn is_extended(&self) -> bool {
        self.ndim > 1
    }

    /// Map a uniform draw in `[0, 1)` to a split policy.
    #[inline]
    pub fn policy_for(&self, u: f64) -> SplitPolicy {
        if u < self.prob_pick_pooled_gain {
            SplitPolicy::PooledGain
        } else if u < self.prob_pick_pooled_gain + self.prob_pick_avg_gain {
            SplitPolicy::AveragedGain
        } else {
            SplitPolicy::Random
        }
    }

    /// Whether any gain policy can be drawn.
    #[inline]
    pub fn uses_gain(&self) -> bool {
        self.prob_pick_pooled_gain > 0.0 || self.prob_pick_avg_gain > 0.0
    }

    pub fn validate(&self) -> Result<(), ParamValidationError> {
        if self.ndim == 0 {
            return Err(ParamValidationError::InvalidNdim);
        }
        if self.ntry == 0 {
            return Err(ParamValidationError::InvalidNtry);
        }
        for (field, value) in [
            ("prob_pick_pooled_gain", self.prob_pick_pooled_gain),
            ("prob_pick_avg_gain", self.prob_pick_avg_gain),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ParamValidationError::InvalidProbability { field, value });
            }
        }
        let total = self.prob_pick_pooled_gain + self.prob_pick_avg_gain;
        if total > 1.0 + 1e-12 {
            return Err(ParamValidationError::ProbabilitySumAboveOne(total));
        }
        if !self.min_gain.is_finite() || self.min_gain < 0.0 {
            return Err(ParamValidationError::InvalidMinGain(self.min_gain));
        }
        if self.max_depth == DepthLimit::Fixed(0) {
            return Err(ParamValidationError::InvalidMaxDepth);
        }
        Ok(())
    }
}

// =============================================================================
// HyperplaneParams
// =============================================================================

/// Distribution of hyperplane coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoefType {
    /// Standard normal.
    #[default]
    Normal,
    /// Uniform on `[-1, 1)`.
    Uniform,
}

/// Extended-model coefficient parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct HyperplaneParams {
    pub coef_type: CoefType,
    /// Center and scale numeric columns by the node's mean and deviation.
    pub standardize_data: bool,
    /// Assign sorted category coefficients by category frequency.
    pub coef_by_prop: bool,
}

impl Default for HyperplaneParams {
    fn default() -> Self {
        Self {
            coef_type: CoefType::Normal,
            standardize_data: true,
            coef_by_prop: false,
        }
    }
}

// =============================================================================
// CategoricalParams
// =============================================================================

/// Categorical split parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoricalParams {
    pub split_type: CategoricalSplit,
    pub new_category_action: NewCategoryAction,
}

// =============================================================================
// ImputeParams
// =============================================================================

/// How node depth weighs an imputation candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImputeDepthWeighting {
    /// Deeper nodes weigh more.
    #[default]
    Higher,
    /// Shallower nodes weigh more.
    Lower,
    Same,
}

impl ImputeDepthWeighting {
    #[inline]
    pub fn factor(self, depth: u32) -> f64 {
        match self {
            ImputeDepthWeighting::Higher => depth as f64 + 1.0,
            ImputeDepthWeighting::Lower => 1.0 / (depth as f64 + 1.0),
            ImputeDepthWeighting::Same => 1.0,
        }
    }
}

/// How node population weighs an imputation candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImputeRowWeighting {
    /// Smaller nodes weigh more.
    #[default]
    Inverse,
    /// Larger nodes weigh more.
    Prop,
    Flat,
}

impl ImputeRowWeighting {
    #[inline]
    pub fn factor(self, node_weight: f64) -> f64 {
        match self {
            ImputeRowWeighting::Inverse => 1.0 / node_weight.max(f64::MIN_POSITIVE),
            ImputeRowWeighting::Prop => node_weight,
            ImputeRowWeighting::Flat => 1.0,
        }
    }
}

/// Imputer construction parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ImputeParams {
    /// Build an [`Imputer`](crate::repr::Imputer) alongside the forest.
    pub build_imputer: bool,
    /// Observation weight a node needs before its values are used.
    pub min_imp_obs: usize,
    pub depth_weighting: ImputeDepthWeighting,
    pub row_weighting: ImputeRowWeighting,
}

impl Default for ImputeParams {
    fn default() -> Self {
        Self {
            build_imputer: false,
            min_imp_obs: 3,
            depth_weighting: ImputeDepthWeighting::Higher,
            row_weighting: ImputeRowWeighting::Inverse,
        }
    }
}

impl ImputeParams {
    pub fn validate(&self) -> Result<(), ParamValidationError> {
        if self.min_imp_obs == 0 {
            return Err(ParamValidationError::InvalidMinImpObs);
        }
        Ok(())
    }
}

// =============================================================================
// OutputParams
// =============================================================================

/// Side outputs computed while fitting.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputParams {
    /// Average isolation depth per training row.
    pub depths: bool,
    /// Triangular pairwise separation-depth matrix.
    pub distances: bool,
    /// Impute missing training values (requires the imputer).
    pub impute_at_fit: bool,
    /// Report depths as `2^(-depth / expected_depth)`.
    pub standardize_depth: bool,
    /// Report distances as `2^(-distance / expected_separation)`.
    pub standardize_dist: bool,
}

impl Default for OutputParams {
    fn default() -> Self {
        Self {
            depths: false,
            distances: false,
            impute_at_fit: false,
            standardize_depth: true,
            standardize_dist: true,
        }
    }
}

impl OutputParams {
    /// Whether any output needs every row in every tree.
    ///
    /// Depths do not: a row outside a tree's sample adds nothing for that tree.
    #[inline]
    pub fn needs_full_sample(&self) -> bool {
        self.distances || self.impute_at_fit
    }
}

// =============================================================================
// Interruption
// =============================================================================

/// What a cancelled fit returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterruptBehavior {
    /// `Ok` with an interrupted status.
    #[default]
    ReturnStatus,
    /// `Err(FitError::Interrupted)`.
    Error,
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Parameter validation error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParamValidationError {
    #[error("sample_size must be > 0")]
    InvalidSampleSize,

    #[error("ncols_per_tree must be > 0")]
    InvalidNcolsPerTree,

    #[error("ndim must be >= 1")]
    InvalidNdim,

    #[error("ntry must be >= 1")]
    InvalidNtry,

    /// Probabilities must lie in [0, 1].
    #[error("{field} must be in [0, 1], got {value}")]
    InvalidProbability { field: &'static str, value: f64 },

    #[error("split probabilities must sum to at most 1, got {0}")]
    ProbabilitySumAboveOne(f64),

    #[error("min_gain must be finite and >= 0, got {0}")]
    InvalidMinGain(f64),

    #[error("max_depth must be > 0")]
    InvalidMaxDepth,

    #[error("min_imp_obs must be > 0")]
    InvalidMinImpObs,
}

// =============================================================================
// Tests
// =============================================================================
