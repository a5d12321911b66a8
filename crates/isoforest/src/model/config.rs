//! High-level forest configuration with builder pattern.
//!
//! [`IsoForestConfig`] composes the nested parameter groups of
//! [`params`](super::params) and uses the `bon` crate for builder generation
//! with validation.
//!
//! # Example
//!
//! ```
//! use isoforest::model::{IsoForestConfig, SamplingParams, SplitParams};
//!
//! // All defaults: single-variable trees with random splits
//! let config = IsoForestConfig::builder().build().unwrap();
//!
//! // Extended model with three columns per split and gain-based splits
//! let config = IsoForestConfig::builder()
//!     .n_trees(200)
//!     .split(SplitParams {
//!         ndim: 3,
//!         prob_pick_pooled_gain: 0.5,
//!         ..SplitParams::default()
//!     })
//!     .sampling(SamplingParams { sample_size: Some(256), ..Default::default() })
//!     .build()
//!     .unwrap();
//! ```

use std::num::NonZeroUsize;

use bon::Builder;

use super::{
    CategoricalParams, HyperplaneParams, ImputeParams, InterruptBehavior, OutputParams,
    ParamValidationError, SamplingParams, SplitParams,
};
use crate::repr::MissingAction;
use crate::training::Verbosity;

// =============================================================================
// ConfigError
// =============================================================================

/// Errors detected before any tree is built.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("n_trees must be at least 1")]
    InvalidNTrees,

    #[error(transparent)]
    Param(#[from] ParamValidationError),

    #[error("missing_action Divide is only available with ndim = 1")]
    DivideWithHyperplane,

    #[error("impute_at_fit requires build_imputer")]
    ImputeAtFitWithoutImputer,

    #[error("in-place fitting requires impute_at_fit")]
    InPlaceWithoutImputeAtFit,

    #[error("sample_size {sample_size} exceeds the {n_rows} rows available without replacement")]
    SampleSizeTooLarge { sample_size: usize, n_rows: usize },

    #[error("{output} requires every row in every tree (no sub-sampling, no replacement)")]
    OutputNeedsFullSample { output: &'static str },

    #[error("distances cannot be combined with sample weights")]
    DistancesWithSampleWeights,

    #[error("column weights cannot be combined with kurtosis weighting")]
    ColumnWeightsWithKurtosis,

    #[error("sample weights have {available} positive entries, {needed} rows requested")]
    NotEnoughPositiveWeights { needed: usize, available: usize },

    #[error("forest is {forest:?} but the configuration builds {config:?} trees")]
    ForestKindMismatch {
        forest: crate::repr::ForestKind,
        config: crate::repr::ForestKind,
    },

    #[error("forest was fitted on {expected:?} numeric and categorical columns, data has {got:?}")]
    ForestColumnsMismatch { expected: (usize, usize), got: (usize, usize) },

    #[error("imputer has {imputer} trees but the forest has {forest}")]
    ImputerTreeCountMismatch { imputer: usize, forest: usize },
}

// =============================================================================
// IsoForestConfig
// =============================================================================

/// High-level configuration for isolation forest construction.
///
/// # Structure
///
/// - **Ensemble**: `n_trees`, `seed`
/// - **Sampling**: rows and columns per tree via [`SamplingParams`]
/// - **Split**: split policy and depth via [`SplitParams`]
/// - **Hyperplane**: coefficients of the extended model via [`HyperplaneParams`]
/// - **Categorical**: via [`CategoricalParams`]
/// - **Missing values**: `missing_action`, imputer via [`ImputeParams`]
/// - **Outputs**: depths, distances and fit-time imputation via [`OutputParams`]
/// - **Resources**: threading, interruption and logging
#[derive(Debug, Clone, Builder)]
#[builder(
    derive(Clone, Debug),
    finish_fn(vis = "", name = __build_internal)
)]
pub struct IsoForestConfig {
    // === Ensemble ===
    /// Number of trees. Default: 100.
    #[builder(default = 100)]
    pub n_trees: usize,

    // === Nested parameter groups ===
    #[builder(default)]
    pub sampling: SamplingParams,

    #[builder(default)]
    pub split: SplitParams,

    #[builder(default)]
    pub hyperplane: HyperplaneParams,

    #[builder(default)]
    pub categorical: CategoricalParams,

    // === Missing values ===
    /// Routing of missing values. Default: `Impute`.
    #[builder(default)]
    pub missing_action: MissingAction,

    #[builder(default)]
    pub impute: ImputeParams,

    // === Outputs ===
    #[builder(default)]
    pub output: OutputParams,

    // === Resource control ===
    /// Number of threads. `None` uses all available cores.
    pub n_threads: Option<NonZeroUsize>,

    /// What a cancelled fit returns. Default: `ReturnStatus`.
    #[builder(default)]
    pub interrupt_behavior: InterruptBehavior,

    // === Reproducibility ===
    /// Base random seed; tree `t` uses `seed + t`. Default: 42.
    #[builder(default = 42)]
    pub seed: u64,

    // === Logging ===
    /// Verbosity level. Default: `Silent`.
    #[builder(default)]
    pub verbosity: Verbosity,
}

/// Custom finishing function that validates the config.
impl<S: iso_forest_config_builder::IsComplete> IsoForestConfigBuilder<S> {
    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any parameter is invalid or two parameters
    /// conflict.
    pub fn build(self) -> Result<IsoForestConfig, ConfigError> {
        let config = self.__build_internal();
        config.validate()?;
        Ok(config)
    }
}

impl IsoForestConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_trees == 0 {
            return Err(ConfigError::InvalidNTrees);
        }

        self.sampling.validate()?;
        self.split.validate()?;
        self.impute.validate()?;

        if self.missing_action == MissingAction::Divide && self.split.is_extended() {
            return Err(ConfigError::DivideWithHyperplane);
        }
        if self.output.impute_at_fit && !self.impute.build_imputer {
            return Err(ConfigError::ImputeAtFitWithoutImputer);
        }

        Ok(())
    }

    /// Thread count for [`run_with_threads`](crate::run_with_threads): 0 = auto.
    #[inline]
    pub fn thread_count(&self) -> usize {
        self.n_threads.map_or(0, NonZeroUsize::get)
    }
}

impl Default for IsoForestConfig {
    fn default() -> Self {
        Self::builder().build().expect("default config is valid")
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = IsoForestConfig::builder().build().unwrap();
        assert_eq!(config.n_trees, 100);
        assert_eq!(config.seed, 42);
        assert_eq!(config.split.ndim, 1);
        assert_eq!(config.thread_count(), 0);
    }

    #[test]
    fn test_invalid_n_trees_zero() {
        let result = IsoForestConfig::builder().n_trees(0).build();
        assert!(matches!(result, Err(ConfigError::InvalidNTrees)));
    }

    #[test]
    fn test_extended_model_with_zero_dimensions() {
        let result = IsoForestConfig::builder().split(SplitParams::extended(0)).build();
        assert_eq!(result.unwrap_err(), ConfigError::Param(ParamValidationError::InvalidNdim));
    }

    #[test]
    fn test_negative_probability() {
        let result = IsoForestConfig::builder()
            .split(SplitParams {
                prob_pick_pooled_gain: -0.5,
                ..Default::default()
            })
            .build();
        assert!(matches!(
            result,
            Err(ConfigError::Param(ParamValidationError::InvalidProbability { .. }))
        ));
    }

    #[test]
    fn test_divide_with_hyperplane() {
        let result = IsoForestConfig::builder()
            .split(SplitParams::extended(2))
            .missing_action(MissingAction::Divide)
            .build();
        assert_eq!(result.unwrap_err(), ConfigError::DivideWithHyperplane);
    }

    #[test]
    fn test_impute_at_fit_needs_imputer() {
        let result = IsoForestConfig::builder()
            .output(OutputParams {
                impute_at_fit: true,
                ..Default::default()
            })
            .build();
        assert_eq!(result.unwrap_err(), ConfigError::ImputeAtFitWithoutImputer);
    }

    #[test]
    fn test_threads_customization() {
        let config = IsoForestConfig::builder()
            .n_threads(NonZeroUsize::new(4).unwrap())
            .build()
            .unwrap();
        assert_eq!(config.thread_count(), 4);
    }
}
