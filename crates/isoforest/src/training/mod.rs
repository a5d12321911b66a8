//! Forest construction.
//!
//! ## Entry point
//!
//! - [`IsoForestTrainer`]: fits a forest, or appends one tree to an existing one
//! - [`FitOutput`], [`FitStatus`]: the forest plus optional side outputs
//! - [`CancellationToken`]: cooperative interruption between trees
//!
//! ## Building blocks
//!
//! - `sampling`: per-tree rows (uniform or weighted through a sum tree) and
//!   eligible columns (uniform, weighted, kurtosis-weighted)
//! - `split`: threshold and category-assignment search under the random,
//!   pooled-gain and averaged-gain policies
//! - `grower`: the recursive partitioner, generic over the single-variable
//!   and hyperplane split models
//! - `workspace`: per-worker scratch reused across trees
//!
//! ## Side outputs
//!
//! - per-row average depths
//! - pairwise separation depths ([`tmat_to_dense`], [`tri_index`])
//! - fit-time imputation of missing cells ([`ImputedValues`])

mod cancel;
mod distance;
mod error;
mod grower;
mod impute;
mod logger;
mod sampling;
mod split;
mod stats;
mod trainer;
mod workspace;

pub use cancel::CancellationToken;
pub use distance::{n_pairs, tmat_to_dense, tri_index};
pub use error::{BuildError, FitError};
pub use impute::{ImputedCell, ImputedValue, ImputedValues};
pub use logger::{TrainingLogger, Verbosity};
pub use trainer::{FitOutput, FitStatus, IsoForestTrainer};
