//! Training progress logging.
//!
//! Events go through `tracing`; the host application installs whatever
//! subscriber it wants. [`Verbosity`] filters what the trainer emits.

use tracing::{debug, info, warn};

use crate::repr::ForestKind;

/// Verbosity level for training output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    /// No output.
    #[default]
    Silent,
    /// Interruptions and failures.
    Warning,
    /// Start and end of each fit.
    Info,
    /// Per-tree progress.
    Debug,
}

/// Logger passed through a fit.
#[derive(Debug, Clone, Copy)]
pub struct TrainingLogger {
    verbosity: Verbosity,
}

impl TrainingLogger {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    #[inline]
    fn enabled(&self, level: Verbosity) -> bool {
        self.verbosity >= level
    }

    pub fn start_training(&self, kind: ForestKind, n_trees: usize, sample_size: usize, n_threads: usize) {
        if self.enabled(Verbosity::Info) {
            info!(?kind, n_trees, sample_size, n_threads, "fitting isolation forest");
        }
    }

    pub fn tree_built(&self, tree: usize, n_nodes: usize) {
        if self.enabled(Verbosity::Debug) {
            debug!(tree, n_nodes, "tree built");
        }
    }

    pub fn tree_failed(&self, tree: usize, error: &dyn std::error::Error) {
        if self.enabled(Verbosity::Warning) {
            warn!(tree, %error, "tree build failed");
        }
    }

    pub fn interrupted(&self, completed: usize, requested: usize) {
        if self.enabled(Verbosity::Warning) {
            warn!(completed, requested, "fit interrupted");
        }
    }

    pub fn outputs_reduced(&self, depths: bool, distances: bool, imputed_cells: usize) {
        if self.enabled(Verbosity::Info) {
            info!(depths, distances, imputed_cells, "side outputs reduced");
        }
    }

    pub fn finish_training(&self, n_trees: usize) {
        if self.enabled(Verbosity::Info) {
            info!(n_trees, "fit finished");
        }
    }
}
