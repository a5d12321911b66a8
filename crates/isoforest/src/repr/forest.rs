//! Fitted forest: trees of one kind plus forest-level constants.

use super::tree::TreeValidationError;
use super::{CategoricalSplit, HyperplaneTree, IsoTree, MissingAction, NewCategoryAction};

/// Which split model a forest uses. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForestKind {
    SingleVariable,
    Hyperplane,
}

/// Trees of a forest, all of the same kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ForestTrees {
    SingleVariable(Vec<IsoTree>),
    Hyperplane(Vec<HyperplaneTree>),
}

impl ForestTrees {
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            ForestTrees::SingleVariable(trees) => trees.len(),
            ForestTrees::Hyperplane(trees) => trees.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        match self {
            ForestTrees::SingleVariable(trees) => trees.truncate(len),
            ForestTrees::Hyperplane(trees) => trees.truncate(len),
        }
    }
}

/// Constants the scoring path needs alongside the trees.
#[derive(Debug, Clone, PartialEq)]
pub struct ForestMeta {
    /// Expected isolation depth for `sample_size` rows.
    pub exp_avg_depth: f64,
    /// Expected separation depth for `sample_size` rows.
    pub exp_avg_sep: f64,
    /// Rows drawn per tree.
    pub sample_size: usize,
    /// Rows in the training data.
    pub orig_sample_size: usize,
    /// Whether any tree recorded range-penalty bounds.
    pub has_range_penalty: bool,
    pub missing_action: MissingAction,
    pub categorical_split: CategoricalSplit,
    pub new_category_action: NewCategoryAction,
    pub n_numeric: usize,
    pub n_categorical: usize,
    /// Seed offset of the next appended tree. Trees are seeded with
    /// `seed + index`, and an interrupted fit may keep a non-contiguous set
    /// of indices, so this is not always the tree count.
    pub next_tree_idx: usize,
}

/// Structural validation errors for [`Forest`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ForestValidationError {
    #[error("tree {tree_idx} is invalid: {error}")]
    InvalidTree {
        tree_idx: usize,
        error: TreeValidationError,
    },
}

/// Forest of isolation trees.
///
/// Exclusively owns its trees. An [`Imputer`](super::Imputer) built with
/// the forest has one entry per tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Forest {
    trees: ForestTrees,
    meta: ForestMeta,
}

impl Forest {
    /// Create an empty forest of the given kind.
    pub fn new(kind: ForestKind, meta: ForestMeta) -> Self {
        let trees = match kind {
            ForestKind::SingleVariable => ForestTrees::SingleVariable(Vec::new()),
            ForestKind::Hyperplane => ForestTrees::Hyperplane(Vec::new()),
        };
        Self { trees, meta }
    }

    #[inline]
    pub fn kind(&self) -> ForestKind {
        match self.trees {
            ForestTrees::SingleVariable(_) => ForestKind::SingleVariable,
            ForestTrees::Hyperplane(_) => ForestKind::Hyperplane,
        }
    }

    #[inline]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    #[inline]
    pub fn meta(&self) -> &ForestMeta {
        &self.meta
    }

    #[inline]
    pub fn trees(&self) -> &ForestTrees {
        &self.trees
    }

    /// Trees of a single-variable forest.
    pub fn iso_trees(&self) -> Option<&[IsoTree]> {
        match &self.trees {
            ForestTrees::SingleVariable(trees) => Some(trees),
            ForestTrees::Hyperplane(_) => None,
        }
    }

    /// Trees of a hyperplane forest.
    pub fn hyperplane_trees(&self) -> Option<&[HyperplaneTree]> {
        match &self.trees {
            ForestTrees::Hyperplane(trees) => Some(trees),
            ForestTrees::SingleVariable(_) => None,
        }
    }

    pub(crate) fn trees_mut(&mut self) -> &mut ForestTrees {
        &mut self.trees
    }

    pub(crate) fn meta_mut(&mut self) -> &mut ForestMeta {
        &mut self.meta
    }

    pub(crate) fn truncate(&mut self, n_trees: usize) {
        self.trees.truncate(n_trees);
    }

    /// Validate every tree.
    pub fn validate(&self) -> Result<(), ForestValidationError> {
        let invalid = |tree_idx, error| ForestValidationError::InvalidTree { tree_idx, error };
        match &self.trees {
            ForestTrees::SingleVariable(trees) => {
                for (i, tree) in trees.iter().enumerate() {
                    tree.validate().map_err(|e| invalid(i, e))?;
                }
            }
            ForestTrees::Hyperplane(trees) => {
                for (i, tree) in trees.iter().enumerate() {
                    tree.validate_structure().map_err(|e| invalid(i, e))?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> ForestMeta {
        ForestMeta {
            exp_avg_depth: 1.0,
            exp_avg_sep: 1.0,
            sample_size: 2,
            orig_sample_size: 2,
            has_range_penalty: false,
            missing_action: MissingAction::Impute,
            categorical_split: CategoricalSplit::SubSet,
            new_category_action: NewCategoryAction::Weighted,
            n_numeric: 1,
            n_categorical: 0,
            next_tree_idx: 0,
        }
    }

    #[test]
    fn kind_is_fixed_at_creation() {
        let forest = Forest::new(ForestKind::Hyperplane, meta());
        assert_eq!(forest.kind(), ForestKind::Hyperplane);
        assert!(forest.iso_trees().is_none());
        assert_eq!(forest.hyperplane_trees().map(<[_]>::len), Some(0));
    }

    #[test]
    fn validate_reports_empty_tree() {
        let mut forest = Forest::new(ForestKind::SingleVariable, meta());
        if let ForestTrees::SingleVariable(trees) = forest.trees_mut() {
            trees.push(IsoTree::default());
        }
        assert!(matches!(
            forest.validate(),
            Err(ForestValidationError::InvalidTree { tree_idx: 0, .. })
        ));
        forest.truncate(0);
        assert!(forest.validate().is_ok());
    }
}
