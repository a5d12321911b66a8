//! Fit errors.

use crate::data::DatasetError;
use crate::model::ConfigError;

/// Failure while building one tree.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BuildError {
    #[error("category code {code} in categorical column {column} exceeds its {n_categories} categories")]
    CategoryOutOfRange {
        column: usize,
        code: i32,
        n_categories: usize,
    },

    #[error("sample weights leave no row to draw")]
    DegenerateSampleWeights,

    #[error("hyperplane combination produced a non-finite value")]
    NonFiniteCombination,
}

/// Errors returned by [`IsoForestTrainer`](super::IsoForestTrainer).
#[derive(Debug, thiserror::Error)]
pub enum FitError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error("failed to build tree {tree}")]
    TreeBuild {
        tree: usize,
        #[source]
        source: BuildError,
    },

    #[error("failed to create thread pool")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("fit was interrupted")]
    Interrupted,
}
