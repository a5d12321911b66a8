//! Policy enums recorded on fitted forests.

/// How missing values are routed at split nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingAction {
    /// Send the row down both branches, weighted by the branch fractions.
    /// Single-variable model only.
    Divide,
    /// Send the row to the heavier branch (single-variable model), or
    /// substitute the node's representative value (hyperplane model).
    #[default]
    Impute,
    /// Missing values are not expected. Routing them is unspecified.
    Fail,
}

/// Shape of categorical splits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoricalSplit {
    /// Each category is assigned to one side of the split.
    #[default]
    SubSet,
    /// One category goes left, every other category goes right.
    SingleCategory,
}

/// How categories never seen at a node are handled at scoring time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NewCategoryAction {
    /// Route down both branches weighted by the branch fractions.
    #[default]
    Weighted,
    /// Send to the branch that received fewer rows. Resolved at fit time.
    Smallest,
    /// Send to a randomly drawn branch. Resolved at fit time.
    Random,
}
