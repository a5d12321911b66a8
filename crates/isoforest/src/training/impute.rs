//! Imputer construction and fit-time imputation.
//!
//! While a tree grows, every node on the current path keeps
//! [`NodeImputeStats`] on a stack. At a leaf the stack is collapsed into an
//! [`ImputeNode`]: each column takes the statistics of the deepest node
//! with enough observations.
//!
//! Fit-time imputation scans the training data once for missing cells
//! ([`MissingCells`]), lets every leaf vote for the cells of its rows
//! ([`ImputeAccumulator`]), and resolves the votes into [`ImputedValues`].

use std::ops::Range;

use super::workspace::RowWeights;
use crate::data::{ColumnRef, DatasetMut, DatasetView, NumericColumns, is_missing};
use crate::model::ImputeParams;
use crate::repr::{ImputeNode, Imputer, NodeId};

/// Start of each categorical column's block in flat per-category buffers,
/// plus the total length.
pub(crate) fn category_offsets(data: &DatasetView<'_>) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(data.n_categorical() + 1);
    let mut acc = 0;
    offsets.push(0);
    for col in 0..data.n_categorical() {
        acc += data.n_categories(col);
        offsets.push(acc);
    }
    offsets
}

// =============================================================================
// Dataset-level fallbacks
// =============================================================================

/// Mean of every numeric column and mode of every categorical column,
/// ignoring missing values.
///
/// Columns without observations get `NaN` / `-1`.
pub(crate) fn column_fallbacks(data: &DatasetView<'_>) -> (Vec<f64>, Vec<i32>) {
    let n_rows = data.n_rows();

    let means = (0..data.n_numeric())
        .map(|col| {
            let (sum, count) = match data.numeric() {
                NumericColumns::Sparse(csc) => {
                    let ptr = csc.col_ptr();
                    let stored = &csc.values()[ptr[col]..ptr[col + 1]];
                    let n_missing = stored.iter().filter(|&&x| is_missing(x)).count();
                    let sum: f64 = stored.iter().filter(|&&x| !is_missing(x)).sum();
                    (sum, n_rows - n_missing)
                }
                _ => (0..n_rows)
                    .map(|row| data.numeric_value(row, col))
                    .filter(|&x| !is_missing(x))
                    .fold((0.0, 0usize), |(s, n), x| (s + x, n + 1)),
            };
            if count == 0 { f64::NAN } else { sum / count as f64 }
        })
        .collect();

    let mut counts = Vec::new();
    let modes = (0..data.n_categorical())
        .map(|col| {
            counts.clear();
            counts.resize(data.n_categories(col), 0usize);
            for row in 0..n_rows {
                let code = data.category(row, col);
                if code >= 0 {
                    counts[code as usize] += 1;
                }
            }
            argmax(counts.iter().map(|&c| c as f64)).map_or(-1, |k| k as i32)
        })
        .collect();

    (means, modes)
}

/// Index of the largest positive value; ties go to the lowest index.
fn argmax(values: impl Iterator<Item = f64>) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (k, v) in values.enumerate() {
        if v > 0.0 && best.is_none_or(|(_, b)| v > b) {
            best = Some((k, v));
        }
    }
    best.map(|(k, _)| k)
}

// =============================================================================
// Per-node statistics
// =============================================================================

/// Weighted sums of one node's observed values.
#[derive(Debug, Clone, Default)]
pub(crate) struct NodeImputeStats {
    num_sum: Vec<f64>,
    num_weight: Vec<f64>,
    /// Flat per-category weights, laid out by [`category_offsets`].
    cat_weight: Vec<f64>,
}

impl NodeImputeStats {
    /// Recompute over `rows`.
    pub fn compute(
        &mut self,
        data: &DatasetView<'_>,
        rows: &[usize],
        weights: &RowWeights,
        cat_offsets: &[usize],
    ) {
        let n_num = data.n_numeric();
        self.num_sum.clear();
        self.num_sum.resize(n_num, 0.0);
        self.num_weight.clear();
        self.num_weight.resize(n_num, 0.0);
        self.cat_weight.clear();
        self.cat_weight.resize(cat_offsets.last().copied().unwrap_or(0), 0.0);

        for &row in rows {
            let w = weights.weight(row);
            for col in 0..n_num {
                let x = data.numeric_value(row, col);
                if !is_missing(x) {
                    self.num_sum[col] += w * x;
                    self.num_weight[col] += w;
                }
            }
            for col in 0..data.n_categorical() {
                let code = data.category(row, col);
                if code >= 0 {
                    self.cat_weight[cat_offsets[col] + code as usize] += w;
                }
            }
        }
    }
}

/// Collapse the statistics of a root-to-leaf path into an impute node.
///
/// Each column uses the deepest node whose observation weight reaches
/// `min_obs`.
pub(crate) fn collapse_path(
    path: &[NodeImputeStats],
    tree_node: NodeId,
    min_obs: f64,
    cat_offsets: &[usize],
) -> ImputeNode {
    let n_num = path.first().map_or(0, |s| s.num_sum.len());
    let n_cat = cat_offsets.len().saturating_sub(1);

    let mut num_fill = vec![f64::NAN; n_num];
    let mut num_weight = vec![0.0; n_num];
    for col in 0..n_num {
        if let Some(stats) = path.iter().rev().find(|s| s.num_weight[col] >= min_obs) {
            num_fill[col] = stats.num_sum[col] / stats.num_weight[col];
            num_weight[col] = stats.num_weight[col];
        }
    }

    let mut cat_fill = vec![-1; n_cat];
    let mut cat_weight = vec![0.0; n_cat];
    for col in 0..n_cat {
        let block = cat_offsets[col]..cat_offsets[col + 1];
        let found = path.iter().rev().find_map(|s| {
            let counts = &s.cat_weight[block.clone()];
            let total: f64 = counts.iter().sum();
            (total >= min_obs).then_some((counts, total))
        });
        if let Some((counts, total)) = found
            && let Some(mode) = argmax(counts.iter().copied())
        {
            cat_fill[col] = mode as i32;
            cat_weight[col] = total;
        }
    }

    ImputeNode {
        tree_node,
        num_fill: num_fill.into_boxed_slice(),
        num_weight: num_weight.into_boxed_slice(),
        cat_fill: cat_fill.into_boxed_slice(),
        cat_weight: cat_weight.into_boxed_slice(),
    }
}

// =============================================================================
// Missing cells
// =============================================================================

/// Missing cells of the training data, grouped by row.
#[derive(Debug, Clone)]
pub(crate) struct MissingCells {
    row_ptr: Vec<usize>,
    columns: Vec<ColumnRef>,
    /// Start of each categorical cell's vote block (unused for numeric cells).
    cat_offset: Vec<usize>,
    n_cat_slots: usize,
}

impl MissingCells {
    pub fn scan(data: &DatasetView<'_>) -> Self {
        let n_rows = data.n_rows();
        let mut cells: Vec<(usize, ColumnRef)> = Vec::new();

        match data.numeric() {
            NumericColumns::Sparse(csc) => {
                // Implicit entries are zeros, only stored values can be missing.
                let ptr = csc.col_ptr();
                for col in 0..csc.n_cols() {
                    for idx in ptr[col]..ptr[col + 1] {
                        if is_missing(csc.values()[idx]) {
                            cells.push((csc.row_indices()[idx], ColumnRef::Numeric(col)));
                        }
                    }
                }
            }
            _ => {
                for col in 0..data.n_numeric() {
                    for row in 0..n_rows {
                        if is_missing(data.numeric_value(row, col)) {
                            cells.push((row, ColumnRef::Numeric(col)));
                        }
                    }
                }
            }
        }
        for col in 0..data.n_categorical() {
            for row in 0..n_rows {
                if data.category(row, col) < 0 {
                    cells.push((row, ColumnRef::Categorical(col)));
                }
            }
        }
        cells.sort_by_key(|&(row, column)| (row, data.global_index(column)));

        let mut row_ptr = vec![0; n_rows + 1];
        for &(row, _) in &cells {
            row_ptr[row + 1] += 1;
        }
        for row in 0..n_rows {
            row_ptr[row + 1] += row_ptr[row];
        }

        let mut cat_offset = Vec::with_capacity(cells.len());
        let mut n_cat_slots = 0;
        for &(_, column) in &cells {
            cat_offset.push(n_cat_slots);
            if let ColumnRef::Categorical(col) = column {
                n_cat_slots += data.n_categories(col);
            }
        }

        Self {
            row_ptr,
            columns: cells.into_iter().map(|(_, column)| column).collect(),
            cat_offset,
            n_cat_slots,
        }
    }

    #[inline]
    pub fn n_cells(&self) -> usize {
        self.columns.len()
    }

    /// Cell indices of `row`.
    #[inline]
    pub fn cells(&self, row: usize) -> Range<usize> {
        self.row_ptr[row]..self.row_ptr[row + 1]
    }

    #[inline]
    pub fn has_missing(&self, row: usize) -> bool {
        self.row_ptr[row + 1] > self.row_ptr[row]
    }
}

// =============================================================================
// Votes
// =============================================================================

/// Weighted votes for every missing cell.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ImputeAccumulator {
    num_sum: Vec<f64>,
    num_weight: Vec<f64>,
    cat_weight: Vec<f64>,
}

impl ImputeAccumulator {
    pub fn new(cells: &MissingCells) -> Self {
        Self {
            num_sum: vec![0.0; cells.n_cells()],
            num_weight: vec![0.0; cells.n_cells()],
            cat_weight: vec![0.0; cells.n_cat_slots],
        }
    }

    /// Vote for the missing cells of `row` with the values of `node`.
    pub fn add_row(&mut self, cells: &MissingCells, row: usize, node: &ImputeNode, weight: f64) {
        for cell in cells.cells(row) {
            match cells.columns[cell] {
                ColumnRef::Numeric(col) => {
                    if node.num_weight[col] > 0.0 {
                        self.num_sum[cell] += weight * node.num_fill[col];
                        self.num_weight[cell] += weight;
                    }
                }
                ColumnRef::Categorical(col) => {
                    let code = node.cat_fill[col];
                    if node.cat_weight[col] > 0.0 && code >= 0 {
                        self.cat_weight[cells.cat_offset[cell] + code as usize] += weight;
                    }
                }
            }
        }
    }

    pub fn merge(&mut self, other: &Self) {
        for (a, b) in self.num_sum.iter_mut().zip(&other.num_sum) {
            *a += b;
        }
        for (a, b) in self.num_weight.iter_mut().zip(&other.num_weight) {
            *a += b;
        }
        for (a, b) in self.cat_weight.iter_mut().zip(&other.cat_weight) {
            *a += b;
        }
    }

    /// Resolve votes: weighted mean for numeric cells, weighted mode for
    /// categorical cells, the imputer's column fallback for cells nobody
    /// voted for.
    pub fn finish(&self, cells: &MissingCells, data: &DatasetView<'_>, imputer: &Imputer) -> ImputedValues {
        let mut out = Vec::with_capacity(cells.n_cells());
        for row in 0..cells.row_ptr.len() - 1 {
            for cell in cells.cells(row) {
                let column = cells.columns[cell];
                let value = match column {
                    ColumnRef::Numeric(col) => {
                        let x = if self.num_weight[cell] > 0.0 {
                            self.num_sum[cell] / self.num_weight[cell]
                        } else {
                            imputer.col_means()[col]
                        };
                        if is_missing(x) {
                            continue;
                        }
                        ImputedValue::Numeric(x)
                    }
                    ColumnRef::Categorical(col) => {
                        let start = cells.cat_offset[cell];
                        let votes = &self.cat_weight[start..start + data.n_categories(col)];
                        let code = argmax(votes.iter().copied())
                            .map_or(imputer.col_modes()[col], |k| k as i32);
                        if code < 0 {
                            continue;
                        }
                        ImputedValue::Category(code)
                    }
                };
                out.push(ImputedCell { row, column, value });
            }
        }
        ImputedValues { cells: out }
    }
}

/// Weight of one row's vote at a leaf.
#[inline]
pub(crate) fn vote_weight(params: &ImputeParams, depth: u32, leaf_weight: f64, fraction: f64) -> f64 {
    params.depth_weighting.factor(depth) * params.row_weighting.factor(leaf_weight) * fraction
}

// =============================================================================
// Public result
// =============================================================================

/// Value imputed for one cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ImputedValue {
    Numeric(f64),
    Category(i32),
}

/// One imputed cell of the training data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImputedCell {
    pub row: usize,
    pub column: ColumnRef,
    pub value: ImputedValue,
}

/// Imputations for the missing cells of the training data, ordered by row
/// then column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImputedValues {
    cells: Vec<ImputedCell>,
}

impl ImputedValues {
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    pub fn cells(&self) -> &[ImputedCell] {
        &self.cells
    }

    /// Write the imputed values into `data`. Returns the number of cells
    /// written; sparse cells that are not stored are skipped.
    pub fn apply(&self, data: &mut DatasetMut<'_>) -> usize {
        self.cells
            .iter()
            .filter(|cell| match (cell.column, cell.value) {
                (ColumnRef::Numeric(col), ImputedValue::Numeric(x)) => data.set_numeric(cell.row, col, x),
                (ColumnRef::Categorical(col), ImputedValue::Category(code)) => {
                    data.set_category(cell.row, col, code)
                }
                _ => false,
            })
            .count()
    }
}
