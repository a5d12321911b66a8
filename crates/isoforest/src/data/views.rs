//! Read-only dataset views.

use ndarray::{ArrayView1, ArrayView2};

use super::{CscView, DatasetError, is_missing};

// =============================================================================
// ColumnRef
// =============================================================================

/// A column addressed by kind and position within that kind.
///
/// The global column index space puts numeric columns first:
/// global `c < n_numeric` is `Numeric(c)`, anything above is
/// `Categorical(c - n_numeric)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColumnRef {
    Numeric(usize),
    Categorical(usize),
}

impl ColumnRef {
    /// Whether this is a numeric column.
    #[inline]
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnRef::Numeric(_))
    }
}

// =============================================================================
// NumericColumns
// =============================================================================

/// Numeric part of a dataset.
#[derive(Clone, Copy, Debug, Default)]
pub enum NumericColumns<'a> {
    /// No numeric columns.
    #[default]
    None,
    /// Feature-major dense storage: shape `[n_columns, n_rows]`.
    Dense(ArrayView2<'a, f64>),
    /// Compressed-by-column sparse storage.
    Sparse(CscView<'a>),
}

impl NumericColumns<'_> {
    /// Number of numeric columns.
    #[inline]
    pub fn n_cols(&self) -> usize {
        match self {
            NumericColumns::None => 0,
            NumericColumns::Dense(x) => x.nrows(),
            NumericColumns::Sparse(x) => x.n_cols(),
        }
    }

    fn n_rows(&self) -> Option<usize> {
        match self {
            NumericColumns::None => None,
            NumericColumns::Dense(x) => Some(x.ncols()),
            NumericColumns::Sparse(x) => Some(x.n_rows()),
        }
    }

    /// Value at `(row, col)`. Implicit sparse entries read as zero.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        match self {
            NumericColumns::None => f64::NAN,
            NumericColumns::Dense(x) => x[[col, row]],
            NumericColumns::Sparse(x) => x.get(row, col),
        }
    }
}

// =============================================================================
// CategoricalColumns
// =============================================================================

/// Categorical part of a dataset.
///
/// Codes are stored feature-major, shape `[n_columns, n_rows]`. Code `k` of
/// column `c` must satisfy `k < n_categories[c]`; negative codes are missing.
#[derive(Clone, Copy, Debug)]
pub struct CategoricalColumns<'a> {
    codes: ArrayView2<'a, i32>,
    n_categories: &'a [usize],
}

impl<'a> CategoricalColumns<'a> {
    /// Create a validated categorical block.
    ///
    /// # Errors
    ///
    /// Fails when the category count list does not match the column count
    /// or a code is out of its column's range.
    pub fn new(codes: ArrayView2<'a, i32>, n_categories: &'a [usize]) -> Result<Self, DatasetError> {
        if n_categories.len() != codes.nrows() {
            return Err(DatasetError::ShapeMismatch {
                field: "n_categories",
                expected: codes.nrows(),
                got: n_categories.len(),
            });
        }
        for (column, (col_codes, &ncat)) in codes.outer_iter().zip(n_categories).enumerate() {
            if let Some(&code) = col_codes.iter().find(|&&code| code >= 0 && code as usize >= ncat) {
                return Err(DatasetError::CategoryOutOfRange {
                    column,
                    code,
                    n_categories: ncat,
                });
            }
        }
        Ok(Self { codes, n_categories })
    }

    /// Number of categorical columns.
    #[inline]
    pub fn n_cols(&self) -> usize {
        self.codes.nrows()
    }

    /// Code at `(row, col)`; negative when missing.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> i32 {
        self.codes[[col, row]]
    }

    /// Declared category count of a column.
    #[inline]
    pub fn n_categories(&self, col: usize) -> usize {
        self.n_categories[col]
    }

    /// Declared category counts of every column.
    #[inline]
    pub fn category_counts(&self) -> &'a [usize] {
        self.n_categories
    }
}

// =============================================================================
// DatasetView
// =============================================================================

/// Immutable view over training data.
///
/// # Example
///
/// ```
/// use isoforest::data::DatasetView;
/// use ndarray::array;
///
/// // Two numeric columns, three rows (feature-major).
/// let x = array![[1.0, 2.0, 3.0], [0.5, f64::NAN, 0.1]];
/// let view = DatasetView::from_dense(x.view()).unwrap();
/// assert_eq!(view.n_rows(), 3);
/// assert_eq!(view.n_cols(), 2);
/// assert!(view.is_missing(1, isoforest::data::ColumnRef::Numeric(1)));
/// ```
#[derive(Clone, Copy, Debug)]
pub struct DatasetView<'a> {
    numeric: NumericColumns<'a>,
    categorical: Option<CategoricalColumns<'a>>,
    sample_weights: Option<ArrayView1<'a, f64>>,
    column_weights: Option<ArrayView1<'a, f64>>,
    n_rows: usize,
}

impl<'a> DatasetView<'a> {
    /// Combine numeric and categorical blocks into a view.
    ///
    /// # Errors
    ///
    /// Fails when there are no columns or rows, or when the blocks disagree
    /// on the row count.
    pub fn new(
        numeric: NumericColumns<'a>,
        categorical: Option<CategoricalColumns<'a>>,
    ) -> Result<Self, DatasetError> {
        let cat_rows = categorical.map(|c| c.codes.ncols());
        let n_rows = match (numeric.n_rows(), cat_rows) {
            (Some(a), Some(b)) if a != b => {
                return Err(DatasetError::ShapeMismatch {
                    field: "categorical rows",
                    expected: a,
                    got: b,
                });
            }
            (Some(a), _) => a,
            (None, Some(b)) => b,
            (None, None) => return Err(DatasetError::EmptyFeatures),
        };
        let n_cols = numeric.n_cols() + categorical.map_or(0, |c| c.n_cols());
        if n_cols == 0 {
            return Err(DatasetError::EmptyFeatures);
        }
        if n_rows == 0 {
            return Err(DatasetError::EmptyRows);
        }

        Ok(Self {
            numeric,
            categorical,
            sample_weights: None,
            column_weights: None,
            n_rows,
        })
    }

    /// Dense numeric data, shape `[n_columns, n_rows]`.
    pub fn from_dense(data: ArrayView2<'a, f64>) -> Result<Self, DatasetError> {
        Self::new(NumericColumns::Dense(data), None)
    }

    /// Sparse numeric data.
    pub fn from_sparse(data: CscView<'a>) -> Result<Self, DatasetError> {
        Self::new(NumericColumns::Sparse(data), None)
    }

    /// Attach per-row sample weights.
    ///
    /// # Errors
    ///
    /// Fails on a length mismatch or a negative / non-finite weight.
    pub fn with_sample_weights(mut self, weights: ArrayView1<'a, f64>) -> Result<Self, DatasetError> {
        check_weights("sample_weights", weights, self.n_rows)?;
        self.sample_weights = Some(weights);
        Ok(self)
    }

    /// Attach per-column sampling weights (numeric columns first).
    ///
    /// # Errors
    ///
    /// Fails on a length mismatch or a negative / non-finite weight.
    pub fn with_column_weights(mut self, weights: ArrayView1<'a, f64>) -> Result<Self, DatasetError> {
        check_weights("column_weights", weights, self.n_cols())?;
        self.column_weights = Some(weights);
        Ok(self)
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    #[inline]
    pub fn n_numeric(&self) -> usize {
        self.numeric.n_cols()
    }

    #[inline]
    pub fn n_categorical(&self) -> usize {
        self.categorical.map_or(0, |c| c.n_cols())
    }

    /// Total column count.
    #[inline]
    pub fn n_cols(&self) -> usize {
        self.n_numeric() + self.n_categorical()
    }

    #[inline]
    pub fn numeric(&self) -> &NumericColumns<'a> {
        &self.numeric
    }

    #[inline]
    pub fn categorical(&self) -> Option<&CategoricalColumns<'a>> {
        self.categorical.as_ref()
    }

    #[inline]
    pub fn sample_weights(&self) -> Option<ArrayView1<'a, f64>> {
        self.sample_weights
    }

    #[inline]
    pub fn column_weights(&self) -> Option<ArrayView1<'a, f64>> {
        self.column_weights
    }

    /// Resolve a global column index.
    #[inline]
    pub fn column(&self, global: usize) -> ColumnRef {
        let n_num = self.n_numeric();
        if global < n_num {
            ColumnRef::Numeric(global)
        } else {
            ColumnRef::Categorical(global - n_num)
        }
    }

    /// Global index of a column reference.
    #[inline]
    pub fn global_index(&self, column: ColumnRef) -> usize {
        match column {
            ColumnRef::Numeric(c) => c,
            ColumnRef::Categorical(c) => self.n_numeric() + c,
        }
    }

    /// Numeric value at `(row, col)`; non-finite means missing.
    #[inline]
    pub fn numeric_value(&self, row: usize, col: usize) -> f64 {
        self.numeric.get(row, col)
    }

    /// Category code at `(row, col)`; negative means missing.
    #[inline]
    pub fn category(&self, row: usize, col: usize) -> i32 {
        match &self.categorical {
            Some(c) => c.get(row, col),
            None => -1,
        }
    }

    /// Declared category count of a categorical column.
    #[inline]
    pub fn n_categories(&self, col: usize) -> usize {
        self.categorical.map_or(0, |c| c.n_categories(col))
    }

    /// Largest declared category count.
    pub fn max_categories(&self) -> usize {
        self.categorical
            .map_or(0, |c| c.category_counts().iter().copied().max().unwrap_or(0))
    }

    /// Whether `(row, column)` is missing.
    #[inline]
    pub fn is_missing(&self, row: usize, column: ColumnRef) -> bool {
        match column {
            ColumnRef::Numeric(c) => is_missing(self.numeric_value(row, c)),
            ColumnRef::Categorical(c) => self.category(row, c) < 0,
        }
    }
}

fn check_weights(field: &'static str, weights: ArrayView1<'_, f64>, expected: usize) -> Result<(), DatasetError> {
    if weights.len() != expected {
        return Err(DatasetError::ShapeMismatch {
            field,
            expected,
            got: weights.len(),
        });
    }
    if let Some((index, &value)) = weights
        .iter()
        .enumerate()
        .find(|(_, w)| !w.is_finite() || **w < 0.0)
    {
        return Err(DatasetError::InvalidWeight { field, index, value });
    }
    Ok(())
}
