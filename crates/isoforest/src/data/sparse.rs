//! Compressed-sparse-column numeric storage.

use super::DatasetError;

/// Borrowed compressed-sparse-column matrix.
///
/// Column `c` owns entries `col_ptr[c]..col_ptr[c + 1]` of `values` and
/// `row_indices`. Row indices are strictly increasing within a column.
/// Entries not stored are zeros.
#[derive(Clone, Copy, Debug)]
pub struct CscView<'a> {
    values: &'a [f64],
    row_indices: &'a [usize],
    col_ptr: &'a [usize],
    n_rows: usize,
}

impl<'a> CscView<'a> {
    /// Create a validated CSC view.
    ///
    /// # Errors
    ///
    /// Fails when `values` and `row_indices` differ in length, the column
    /// pointers are not a non-decreasing sequence ending at the entry count,
    /// or row indices are unsorted or out of range.
    pub fn new(
        values: &'a [f64],
        row_indices: &'a [usize],
        col_ptr: &'a [usize],
        n_rows: usize,
    ) -> Result<Self, DatasetError> {
        if row_indices.len() != values.len() {
            return Err(DatasetError::ShapeMismatch {
                field: "row_indices",
                expected: values.len(),
                got: row_indices.len(),
            });
        }
        if col_ptr.is_empty() || col_ptr[0] != 0 {
            return Err(DatasetError::MalformedColumnPointers { column: 0 });
        }
        for column in 0..col_ptr.len() - 1 {
            let (start, end) = (col_ptr[column], col_ptr[column + 1]);
            if end < start || end > values.len() {
                return Err(DatasetError::MalformedColumnPointers { column });
            }
            let rows = &row_indices[start..end];
            if rows.windows(2).any(|w| w[0] >= w[1]) {
                return Err(DatasetError::UnsortedSparseIndices { column });
            }
            if let Some(&row) = rows.last()
                && row >= n_rows
            {
                return Err(DatasetError::SparseIndexOutOfBounds { column, row, n_rows });
            }
        }
        if col_ptr[col_ptr.len() - 1] != values.len() {
            return Err(DatasetError::MalformedColumnPointers {
                column: col_ptr.len() - 1,
            });
        }

        Ok(Self {
            values,
            row_indices,
            col_ptr,
            n_rows,
        })
    }

    /// Number of columns.
    #[inline]
    pub fn n_cols(&self) -> usize {
        self.col_ptr.len() - 1
    }

    /// Number of rows.
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Stored values.
    #[inline]
    pub fn values(&self) -> &'a [f64] {
        self.values
    }

    /// Row index of each stored value.
    #[inline]
    pub fn row_indices(&self) -> &'a [usize] {
        self.row_indices
    }

    /// Column pointers (`n_cols + 1` entries).
    #[inline]
    pub fn col_ptr(&self) -> &'a [usize] {
        self.col_ptr
    }

    /// Position of `(row, col)` in the stored arrays, if stored.
    #[inline]
    pub fn position(&self, row: usize, col: usize) -> Option<usize> {
        let start = self.col_ptr[col];
        let end = self.col_ptr[col + 1];
        self.row_indices[start..end]
            .binary_search(&row)
            .ok()
            .map(|offset| start + offset)
    }

    /// Value at `(row, col)`; zero when not stored.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.position(row, col).map_or(0.0, |pos| self.values[pos])
    }
}
