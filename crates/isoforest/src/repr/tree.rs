//! Isolation tree storage.
//!
//! Trees are flat node vectors in pre-order: a node's slot is reserved before
//! its children are grown, so the root is always node 0. The same container
//! holds both tree kinds, parameterized by the split payload:
//!
//! - [`IsoTree`] = `Tree<VarSplit>`: one column per split
//! - [`HyperplaneTree`](super::HyperplaneTree) = `Tree<HyperplaneSplit>`

use crate::data::ColumnRef;

use super::NodeId;

// =============================================================================
// Leaves
// =============================================================================

/// A terminal node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeafNode {
    /// Number of sample rows that ended here (rows sent down both
    /// branches are counted in each).
    pub n_rows: usize,
    /// Total weight of those rows.
    pub weight: f64,
    /// Expected remaining isolation depth for `weight` rows.
    pub remainder: f64,
    /// Depth of this node (root = 0).
    pub depth: u32,
}

// =============================================================================
// Single-variable splits
// =============================================================================

/// Branch assignment of one category in a subset split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryBranch {
    Left,
    Right,
    /// Not present at the node during fitting.
    Unseen,
}

/// Split condition on a single column.
#[derive(Debug, Clone, PartialEq)]
pub enum SplitCondition {
    /// Numeric: `x <= threshold` goes left.
    Threshold(f64),
    /// Categorical: per-category branch, indexed by code.
    Subset(Box<[CategoryBranch]>),
    /// Categorical: this category goes left, all others right.
    Single(i32),
}

/// Split payload of the single-variable model.
#[derive(Debug, Clone, PartialEq)]
pub struct VarSplit {
    pub column: ColumnRef,
    pub condition: SplitCondition,
    /// Fraction of the node's (weighted, non-missing) rows sent left.
    pub pct_left: f64,
    /// Allowed value range for the range penalty, if recorded.
    pub range: Option<[f64; 2]>,
}

impl VarSplit {
    #[inline]
    pub fn pct_right(&self) -> f64 {
        1.0 - self.pct_left
    }
}

// =============================================================================
// Tree
// =============================================================================

/// A tree node.
#[derive(Debug, Clone, PartialEq)]
pub enum Node<S> {
    Internal { split: S, left: NodeId, right: NodeId },
    Leaf(LeafNode),
}

impl<S> Node<S> {
    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    #[inline]
    pub fn as_leaf(&self) -> Option<&LeafNode> {
        match self {
            Node::Leaf(leaf) => Some(leaf),
            Node::Internal { .. } => None,
        }
    }
}

/// Structural validation errors for [`Tree`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TreeValidationError {
    #[error("tree has no nodes")]
    Empty,
    #[error("node {node} points to child {child} which is not after it")]
    ChildOutOfRange { node: NodeId, child: NodeId },
    #[error("node {node} has branch fraction {value} outside [0, 1]")]
    BranchFraction { node: NodeId, value: f64 },
}

/// Flat pre-order tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree<S> {
    nodes: Vec<Node<S>>,
}

/// Tree of the single-variable model.
pub type IsoTree = Tree<VarSplit>;

impl<S> Default for Tree<S> {
    fn default() -> Self {
        Self { nodes: Vec::new() }
    }
}

impl<S> Tree<S> {
    /// Empty tree with room for `capacity` nodes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &Node<S> {
        &self.nodes[id as usize]
    }

    #[inline]
    pub fn nodes(&self) -> &[Node<S>] {
        &self.nodes
    }

    /// Terminal nodes in pre-order, with their ids.
    pub fn leaves(&self) -> impl Iterator<Item = (NodeId, &LeafNode)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(id, node)| node.as_leaf().map(|leaf| (id as NodeId, leaf)))
    }

    pub fn n_leaves(&self) -> usize {
        self.leaves().count()
    }

    /// Sum of residual row counts over every leaf under `id`.
    pub fn subtree_rows(&self, id: NodeId) -> usize {
        match self.node(id) {
            Node::Leaf(leaf) => leaf.n_rows,
            Node::Internal { left, right, .. } => self.subtree_rows(*left) + self.subtree_rows(*right),
        }
    }

    /// Reserve a slot that will be overwritten once its children are grown.
    pub(crate) fn reserve_node(&mut self) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(Node::Leaf(LeafNode {
            n_rows: 0,
            weight: 0.0,
            remainder: 0.0,
            depth: 0,
        }));
        id
    }

    pub(crate) fn set_node(&mut self, id: NodeId, node: Node<S>) {
        self.nodes[id as usize] = node;
    }

    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
    }

    pub(crate) fn shrink_to_fit(&mut self) {
        self.nodes.shrink_to_fit();
    }

    /// Check child ordering. Children are always stored after their parent.
    pub fn validate_structure(&self) -> Result<(), TreeValidationError> {
        if self.nodes.is_empty() {
            return Err(TreeValidationError::Empty);
        }
        let n = self.nodes.len() as NodeId;
        for (id, node) in self.nodes.iter().enumerate() {
            let id = id as NodeId;
            if let Node::Internal { left, right, .. } = node {
                for &child in [left, right] {
                    if child <= id || child >= n {
                        return Err(TreeValidationError::ChildOutOfRange { node: id, child });
                    }
                }
            }
        }
        Ok(())
    }
}

impl IsoTree {
    /// Structural checks plus branch fractions within `[0, 1]`.
    pub fn validate(&self) -> Result<(), TreeValidationError> {
        self.validate_structure()?;
        for (id, node) in self.nodes.iter().enumerate() {
            if let Node::Internal { split, .. } = node
                && !(0.0..=1.0).contains(&split.pct_left)
            {
                return Err(TreeValidationError::BranchFraction {
                    node: id as NodeId,
                    value: split.pct_left,
                });
            }
        }
        Ok(())
    }
}
