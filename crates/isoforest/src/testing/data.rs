//! Deterministic synthetic datasets.
//!
//! Matrices are feature-major, `[n_columns, n_rows]`, ready for
//! [`DatasetView::from_dense`](crate::data::DatasetView::from_dense).

use ndarray::Array2;
use rand::prelude::*;

/// Uniform dense features in `[min, max)`.
pub fn random_dense_f64(rows: usize, cols: usize, seed: u64, min: f64, max: f64) -> Array2<f64> {
    assert!(max >= min);
    let mut rng = StdRng::seed_from_u64(seed);
    let width = max - min;
    Array2::from_shape_simple_fn((cols, rows), || min + rng.r#gen::<f64>() * width)
}

/// Set roughly `fraction` of the cells to NaN.
pub fn inject_missing(x: &mut Array2<f64>, fraction: f64, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    for value in x.iter_mut() {
        if rng.r#gen::<f64>() < fraction {
            *value = f64::NAN;
        }
    }
}

/// Random category codes; column `c` draws from `0..n_categories[c]`, and
/// roughly `missing` of the cells are `-1`.
pub fn random_categorical(rows: usize, n_categories: &[usize], seed: u64, missing: f64) -> Array2<i32> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array2::from_shape_fn((n_categories.len(), rows), |(c, _)| {
        if rng.r#gen::<f64>() < missing {
            -1
        } else {
            rng.gen_range(0..n_categories[c]) as i32
        }
    })
}

/// Inliers uniform in `[-1, 1)` followed by `n_outliers` rows far outside.
///
/// Returns the matrix and the indices of the outlier rows.
pub fn with_outliers(inliers: usize, n_outliers: usize, cols: usize, seed: u64) -> (Array2<f64>, Vec<usize>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let rows = inliers + n_outliers;
    let x = Array2::from_shape_fn((cols, rows), |(_, r)| {
        if r < inliers {
            rng.gen_range(-1.0..1.0)
        } else {
            let sign = if rng.r#gen::<bool>() { 1.0 } else { -1.0 };
            sign * rng.gen_range(6.0..8.0)
        }
    });
    (x, (inliers..rows).collect())
}

/// Compressed-by-column sparse matrix with roughly `density` stored entries.
///
/// Returns `(values, row_indices, col_ptr)`.
pub fn random_csc(rows: usize, cols: usize, density: f64, seed: u64) -> (Vec<f64>, Vec<usize>, Vec<usize>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut values = Vec::new();
    let mut row_indices = Vec::new();
    let mut col_ptr = Vec::with_capacity(cols + 1);
    col_ptr.push(0);
    for _ in 0..cols {
        for r in 0..rows {
            if rng.r#gen::<f64>() < density {
                values.push(rng.gen_range(0.5..2.0));
                row_indices.push(r);
            }
        }
        col_ptr.push(values.len());
    }
    (values, row_indices, col_ptr)
}
