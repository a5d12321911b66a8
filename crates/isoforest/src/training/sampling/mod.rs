//! Row and column sampling.
//!
//! - [`RowSampler`]: the rows of each tree, uniform or weighted, with or
//!   without replacement
//! - [`ColumnSampler`]: the columns eligible at each node
//! - [`WeightedSamplingTree`]: the sum tree behind both weighted modes

mod column;
mod row;
mod tree;

pub(crate) use column::ColumnSampler;
pub(crate) use row::{RowSampleScratch, RowSampler};
