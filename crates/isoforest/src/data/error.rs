/// Errors raised while assembling a dataset view.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DatasetError {
    /// A component's length does not match the dataset's row or column count.
    #[error("{field}: expected {expected} entries, got {got}")]
    ShapeMismatch {
        field: &'static str,
        expected: usize,
        got: usize,
    },

    /// The dataset has no numeric and no categorical columns.
    #[error("dataset has no columns")]
    EmptyFeatures,

    /// The dataset has no rows.
    #[error("dataset has no rows")]
    EmptyRows,

    /// Column pointer array is not non-decreasing or does not end at nnz.
    #[error("sparse column pointers are malformed at column {column}")]
    MalformedColumnPointers { column: usize },

    /// Row indices within a sparse column are not strictly increasing.
    #[error("sparse row indices of column {column} are not strictly increasing")]
    UnsortedSparseIndices { column: usize },

    /// A sparse row index is beyond the row count.
    #[error("sparse row index {row} in column {column} is out of bounds for {n_rows} rows")]
    SparseIndexOutOfBounds {
        column: usize,
        row: usize,
        n_rows: usize,
    },

    /// A categorical code is at or above its column's declared category count.
    #[error("category {code} in column {column} exceeds the declared count {n_categories}")]
    CategoryOutOfRange {
        column: usize,
        code: i32,
        n_categories: usize,
    },

    /// Weights must be finite and non-negative.
    #[error("{field} must be finite and non-negative, found {value} at position {index}")]
    InvalidWeight {
        field: &'static str,
        index: usize,
        value: f64,
    },
}
