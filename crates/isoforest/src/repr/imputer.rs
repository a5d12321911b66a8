//! Missing-value imputer paired with a forest.

use super::NodeId;

/// Representative values at one terminal node.
///
/// Columns whose own observations at the node fall below the configured
/// minimum inherit the nearest ancestor's values; columns without any
/// eligible ancestor carry weight zero.
#[derive(Debug, Clone, PartialEq)]
pub struct ImputeNode {
    /// Terminal node of the paired tree.
    pub tree_node: NodeId,
    /// Weighted mean per numeric column.
    pub num_fill: Box<[f64]>,
    /// Observation weight backing each `num_fill`.
    pub num_weight: Box<[f64]>,
    /// Weighted mode per categorical column (`-1` when none).
    pub cat_fill: Box<[i32]>,
    /// Observation weight backing each `cat_fill`.
    pub cat_weight: Box<[f64]>,
}

/// Per-tree impute nodes, aligned one-to-one with each tree's leaves, plus
/// dataset-level fallbacks.
#[derive(Debug, Clone, PartialEq)]
pub struct Imputer {
    col_means: Vec<f64>,
    col_modes: Vec<i32>,
    trees: Vec<Vec<ImputeNode>>,
}

impl Imputer {
    /// Create an imputer with dataset-level column means and modes.
    pub fn new(col_means: Vec<f64>, col_modes: Vec<i32>) -> Self {
        Self {
            col_means,
            col_modes,
            trees: Vec::new(),
        }
    }

    #[inline]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Impute nodes of one tree, in the order of its leaves.
    #[inline]
    pub fn tree(&self, idx: usize) -> &[ImputeNode] {
        &self.trees[idx]
    }

    /// Mean of each numeric column over the training data.
    #[inline]
    pub fn col_means(&self) -> &[f64] {
        &self.col_means
    }

    /// Mode of each categorical column over the training data.
    #[inline]
    pub fn col_modes(&self) -> &[i32] {
        &self.col_modes
    }

    pub(crate) fn push_tree(&mut self, nodes: Vec<ImputeNode>) {
        self.trees.push(nodes);
    }

    pub(crate) fn tree_mut(&mut self, idx: usize) -> &mut Vec<ImputeNode> {
        &mut self.trees[idx]
    }

    pub(crate) fn truncate(&mut self, n_trees: usize) {
        self.trees.truncate(n_trees);
    }
}
