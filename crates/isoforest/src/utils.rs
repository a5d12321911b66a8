//! Common utilities used across the crate.
//!
//! This module provides the parallelism switch, thread pool setup and a
//! weighted quantile helper used for hyperplane fill values.

use std::sync::atomic::{AtomicUsize, Ordering};

// =============================================================================
// Statistical Utilities
// =============================================================================

/// Compute the weighted quantile of a slice using a step function.
///
/// No interpolation: returns the value at the point where the cumulative
/// weight first reaches `alpha * total_weight`.
///
/// # Arguments
/// * `values` - The values to compute the quantile over
/// * `weights` - Optional weights for each value (None = uniform weights)
/// * `alpha` - The quantile level in (0, 1)
/// * `scratch` - Mutable scratch space for sorting indices (will be resized if needed)
///
/// # Returns
/// The weighted quantile value. Returns `f64::NAN` if values is empty.
#[inline]
pub fn weighted_quantile(
    values: &[f64],
    weights: Option<&[f64]>,
    alpha: f64,
    scratch: &mut Vec<usize>,
) -> f64 {
    let n = values.len();
    if n == 0 {
        return f64::NAN;
    }
    if n == 1 {
        return values[0];
    }

    scratch.clear();
    scratch.extend(0..n);
    scratch.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let total_weight: f64 = match weights {
        Some(w) => w.iter().sum(),
        None => n as f64,
    };
    let threshold = total_weight * alpha;

    let mut cumulative = 0.0;
    for &idx in scratch.iter() {
        cumulative += weights.map_or(1.0, |ws| ws[idx]);
        if cumulative >= threshold {
            return values[idx];
        }
    }

    values[scratch[n - 1]]
}

// =============================================================================
// Parallelism Configuration
// =============================================================================

/// Whether parallel execution is allowed.
///
/// When `Parallel`, components may use `rayon` parallel iterators; when
/// `Sequential` they must iterate on the calling thread. The thread pool
/// itself is set up by [`run_with_threads`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Parallelism {
    Sequential,
    Parallel,
}

impl Parallelism {
    /// Create from thread count semantics.
    ///
    /// - 0 = auto (parallel if rayon pool has multiple threads, sequential otherwise)
    /// - 1 = sequential
    /// - >1 = parallel
    #[inline]
    pub fn from_threads(n_threads: usize) -> Self {
        if n_threads == 1 || (n_threads == 0 && rayon::current_num_threads() == 1) {
            Parallelism::Sequential
        } else {
            Parallelism::Parallel
        }
    }

    /// Returns `true` if parallel execution is allowed.
    #[inline]
    pub fn is_parallel(self) -> bool {
        matches!(self, Parallelism::Parallel)
    }

    /// Process items `0..n_items` with one state per worker thread.
    ///
    /// In parallel mode every thread of the current rayon pool pulls item
    /// indices from a shared counter until none are left. A thread creates
    /// its state with `init` on its first item, so there are never more
    /// states than threads. In sequential mode a single state receives every
    /// item in order. The states are returned unmerged.
    pub fn maybe_par_workers<S, INIT, F>(self, n_items: usize, init: INIT, work: F) -> Vec<S>
    where
        S: Send,
        INIT: Fn() -> S + Sync,
        F: Fn(&mut S, usize) + Sync,
    {
        if n_items == 0 {
            return Vec::new();
        }
        if !self.is_parallel() {
            let mut state = init();
            for i in 0..n_items {
                work(&mut state, i);
            }
            return vec![state];
        }

        let next = AtomicUsize::new(0);
        rayon::broadcast(|_| {
            let mut state: Option<S> = None;
            loop {
                let i = next.fetch_add(1, Ordering::Relaxed);
                if i >= n_items {
                    break;
                }
                work(state.get_or_insert_with(&init), i);
            }
            state
        })
        .into_iter()
        .flatten()
        .collect()
    }
}

// =============================================================================
// Thread Pool Setup
// =============================================================================

/// Run a closure with the appropriate thread pool.
///
/// Thread count semantics:
/// - `0` = auto (use all available cores)
/// - `1` = sequential (no thread pool)
/// - `n > 1` = use exactly `n` threads
///
/// # Errors
///
/// Returns the rayon error if the dedicated pool cannot be created.
///
/// # Example
///
/// ```
/// use isoforest::run_with_threads;
///
/// let sum = run_with_threads(2, |_par| (1..=10).sum::<u32>()).unwrap();
/// assert_eq!(sum, 55);
/// ```
#[inline]
pub fn run_with_threads<T: Send>(
    n_threads: usize,
    f: impl FnOnce(Parallelism) -> T + Send,
) -> Result<T, rayon::ThreadPoolBuildError> {
    match Parallelism::from_threads(n_threads) {
        Parallelism::Sequential => Ok(f(Parallelism::Sequential)),
        Parallelism::Parallel => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(n_threads)
                .build()?;
            Ok(pool.install(|| f(Parallelism::Parallel)))
        }
    }
}
