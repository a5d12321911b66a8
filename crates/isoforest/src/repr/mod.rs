//! Fitted artifacts: trees, forests and imputers.

/// Node identifier: index into a tree's node vector.
pub type NodeId = u32;

pub mod depth;
pub mod forest;
pub mod hyperplane;
pub mod imputer;
pub mod tree;
pub mod types;

pub use depth::{expected_avg_depth, expected_separation_depth};
pub use forest::{Forest, ForestKind, ForestMeta, ForestTrees, ForestValidationError};
pub use hyperplane::{HyperplaneSplit, HyperplaneTerm, HyperplaneTree};
pub use imputer::{ImputeNode, Imputer};
pub use tree::{
    CategoryBranch, IsoTree, LeafNode, Node, SplitCondition, Tree, TreeValidationError, VarSplit,
};
pub use types::{CategoricalSplit, MissingAction, NewCategoryAction};
