//! Forest construction integration tests.
//!
//! Focused on behavior and invariants of fitted forests and side outputs.

mod categorical;
mod determinism;
mod extended;
mod incremental;
mod missing;
mod outputs;
mod scenarios;

use isoforest::repr::{IsoTree, Node, VarSplit};

/// Internal splits of a single-variable tree.
pub fn splits(tree: &IsoTree) -> impl Iterator<Item = &VarSplit> {
    tree.nodes().iter().filter_map(|node| match node {
        Node::Internal { split, .. } => Some(split),
        Node::Leaf(_) => None,
    })
}
