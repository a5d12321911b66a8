//! Pairwise separation depths.
//!
//! Distances are kept as the strict upper triangle of an `n × n` matrix,
//! row by row: pair `(i, j)` with `i < j` lives at
//!
//! ```text
//! p(i, j) = i·(2n - i - 1)/2 + j - i - 1
//! ```
//!
//! Each tree adds, for every pair of sample rows, the depth of the node
//! that separates them; pairs that share a leaf of `m` rows add that leaf's
//! depth plus the expected separation depth of `m` rows.

use ndarray::Array2;

/// Length of the triangular array for `n` rows.
#[inline]
pub fn n_pairs(n: usize) -> usize {
    n * n.saturating_sub(1) / 2
}

/// Position of pair `(i, j)`, `i != j`, in the triangular array.
#[inline]
pub fn tri_index(i: usize, j: usize, n: usize) -> usize {
    let (i, j) = if i < j { (i, j) } else { (j, i) };
    debug_assert!(j < n && i != j);
    i * (2 * n - i - 1) / 2 + j - i - 1
}

/// Add `amount · w_i · w_j` to every pair of distinct rows in `rows`.
///
/// Repeated rows (sampling with replacement) do not pair with themselves.
pub(crate) fn add_pairwise(
    dist: &mut [f64],
    rows: &[usize],
    n: usize,
    amount: f64,
    weight: impl Fn(usize) -> f64,
) {
    for (a, &i) in rows.iter().enumerate() {
        let w_i = weight(i);
        for &j in &rows[a + 1..] {
            if i != j {
                dist[tri_index(i, j, n)] += amount * w_i * weight(j);
            }
        }
    }
}

/// Turn summed separation depths into averages, or into standardized
/// distances `2^(-d / exp_avg_sep)`.
pub(crate) fn finalize_distances(dist: &mut [f64], n_trees: usize, standardize: bool, exp_avg_sep: f64) {
    let n_trees = n_trees as f64;
    if standardize {
        let divisor = n_trees * exp_avg_sep;
        for d in dist.iter_mut() {
            *d = (-*d / divisor).exp2();
        }
    } else {
        for d in dist.iter_mut() {
            *d /= n_trees;
        }
    }
}

/// Reflect a triangular distance array into a dense symmetric matrix with
/// `diag` on the diagonal.
///
/// # Panics
///
/// Panics if `tmat.len()` is not `n·(n-1)/2`.
///
/// # Example
///
/// ```
/// use isoforest::training::tmat_to_dense;
///
/// let dense = tmat_to_dense(&[1.0, 2.0, 3.0], 3, 0.0);
/// assert_eq!(dense[[0, 2]], 2.0);
/// assert_eq!(dense[[2, 1]], 3.0);
/// assert_eq!(dense[[1, 1]], 0.0);
/// ```
pub fn tmat_to_dense(tmat: &[f64], n: usize, diag: f64) -> Array2<f64> {
    assert_eq!(tmat.len(), n_pairs(n), "triangular array length does not match n");
    let mut dense = Array2::from_elem((n, n), diag);
    for i in 0..n {
        for j in i + 1..n {
            let d = tmat[tri_index(i, j, n)];
            dense[[i, j]] = d;
            dense[[j, i]] = d;
        }
    }
    dense
}
