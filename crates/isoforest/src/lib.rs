//! isoforest: isolation forest construction for Rust.
//!
//! Builds ensembles of randomized partition trees whose average isolation
//! depth scores how anomalous each row is. Two tree kinds are supported:
//! single-variable isolation trees and extended trees that split on random
//! hyperplanes. Data may be dense or sparse, numeric or categorical,
//! weighted, and contain missing values.
//!
//! # Key Types
//!
//! - [`DatasetView`] - Borrowed training data
//! - [`IsoForestConfig`] - Configuration builder
//! - [`IsoForestTrainer`] - Fits a [`Forest`] (and optionally an [`Imputer`])
//!
//! # Training
//!
//! Use `IsoForestConfig::builder()` to configure, then
//! `IsoForestTrainer::new(config).fit(&data)`. Besides the forest, a fit can
//! report per-row depths, pairwise separation distances and imputed values
//! for the training data's missing cells. See the [`training`] module.

// Re-export approx traits for users who want to compare outputs
pub use approx;

pub mod data;
pub mod model;
pub mod repr;
pub mod testing;
pub mod training;
pub mod utils;

// =============================================================================
// Convenience Re-exports
// =============================================================================

// Configuration types (most users want these)
pub use model::{ConfigError, IsoForestConfig};

// Fitted artifacts
pub use repr::{Forest, ForestKind, Imputer};

// Training entry points
pub use training::{CancellationToken, FitError, FitOutput, FitStatus, IsoForestTrainer};

// Data types (for preparing training data)
pub use data::{CategoricalColumns, CscView, DatasetError, DatasetMut, DatasetView, NumericColumns};

// Shared utilities
pub use utils::{Parallelism, run_with_threads};
