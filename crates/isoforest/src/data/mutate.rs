//! Mutable dataset access for writing imputed values back.

use ndarray::{ArrayView1, ArrayViewMut2};

use super::{CategoricalColumns, CscView, DatasetError, DatasetView, NumericColumns};

/// Mutable numeric storage.
///
/// For sparse data only the stored values are writable; the sparsity
/// structure is borrowed immutably.
#[derive(Debug, Default)]
pub enum NumericColumnsMut<'a> {
    #[default]
    None,
    /// Feature-major dense storage: shape `[n_columns, n_rows]`.
    Dense(ArrayViewMut2<'a, f64>),
    /// CSC storage with writable values.
    Sparse {
        values: &'a mut [f64],
        row_indices: &'a [usize],
        col_ptr: &'a [usize],
        n_rows: usize,
    },
}

/// Mutable counterpart of [`DatasetView`].
///
/// Fitting reads it through [`DatasetMut::view`]; imputation writes through
/// [`DatasetMut::set_numeric`] and [`DatasetMut::set_category`].
#[derive(Debug)]
pub struct DatasetMut<'a> {
    numeric: NumericColumnsMut<'a>,
    categorical: Option<(ArrayViewMut2<'a, i32>, &'a [usize])>,
    sample_weights: Option<ArrayView1<'a, f64>>,
    column_weights: Option<ArrayView1<'a, f64>>,
}

impl<'a> DatasetMut<'a> {
    /// Create from mutable numeric and categorical blocks.
    ///
    /// # Errors
    ///
    /// Fails if the resulting read-only view would be invalid.
    pub fn new(
        numeric: NumericColumnsMut<'a>,
        categorical: Option<(ArrayViewMut2<'a, i32>, &'a [usize])>,
    ) -> Result<Self, DatasetError> {
        let this = Self {
            numeric,
            categorical,
            sample_weights: None,
            column_weights: None,
        };
        this.view()?;
        Ok(this)
    }

    /// Dense numeric data, shape `[n_columns, n_rows]`.
    pub fn from_dense(data: ArrayViewMut2<'a, f64>) -> Result<Self, DatasetError> {
        Self::new(NumericColumnsMut::Dense(data), None)
    }

    /// Attach per-row sample weights.
    pub fn with_sample_weights(mut self, weights: ArrayView1<'a, f64>) -> Result<Self, DatasetError> {
        self.view()?.with_sample_weights(weights.reborrow())?;
        self.sample_weights = Some(weights);
        Ok(self)
    }

    /// Attach per-column sampling weights.
    pub fn with_column_weights(mut self, weights: ArrayView1<'a, f64>) -> Result<Self, DatasetError> {
        self.view()?.with_column_weights(weights.reborrow())?;
        self.column_weights = Some(weights);
        Ok(self)
    }

    /// Read-only view borrowing this dataset.
    pub fn view(&self) -> Result<DatasetView<'_>, DatasetError> {
        let numeric = match &self.numeric {
            NumericColumnsMut::None => NumericColumns::None,
            NumericColumnsMut::Dense(x) => NumericColumns::Dense(x.view()),
            NumericColumnsMut::Sparse {
                values,
                row_indices,
                col_ptr,
                n_rows,
            } => NumericColumns::Sparse(CscView::new(values, row_indices, col_ptr, *n_rows)?),
        };
        let categorical = match &self.categorical {
            Some((codes, ncat)) => Some(CategoricalColumns::new(codes.view(), ncat)?),
            None => None,
        };

        let mut view = DatasetView::new(numeric, categorical)?;
        if let Some(w) = self.sample_weights {
            view = view.with_sample_weights(w.reborrow())?;
        }
        if let Some(w) = self.column_weights {
            view = view.with_column_weights(w.reborrow())?;
        }
        Ok(view)
    }

    /// Overwrite a numeric cell. For sparse data the cell must be stored;
    /// returns `false` when it is not.
    pub fn set_numeric(&mut self, row: usize, col: usize, value: f64) -> bool {
        match &mut self.numeric {
            NumericColumnsMut::None => false,
            NumericColumnsMut::Dense(x) => {
                x[[col, row]] = value;
                true
            }
            NumericColumnsMut::Sparse {
                values,
                row_indices,
                col_ptr,
                ..
            } => {
                let (start, end) = (col_ptr[col], col_ptr[col + 1]);
                match row_indices[start..end].binary_search(&row) {
                    Ok(offset) => {
                        values[start + offset] = value;
                        true
                    }
                    Err(_) => false,
                }
            }
        }
    }

    /// Overwrite a categorical cell.
    pub fn set_category(&mut self, row: usize, col: usize, code: i32) -> bool {
        match &mut self.categorical {
            Some((codes, _)) => {
                codes[[col, row]] = code;
                true
            }
            None => false,
        }
    }
}
