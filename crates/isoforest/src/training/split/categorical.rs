//! Category assignment search over a categorical sample.
//!
//! Input is the weighted count of every category at the node, indexed by
//! code. Categories with zero count are absent: they get
//! [`CategoryBranch::Unseen`] in subset splits and are never chosen as the
//! single category.

use rand::prelude::*;

use crate::model::SplitPolicy;
use crate::repr::{CategoryBranch, NewCategoryAction};
use crate::training::stats::{c_ln_c, categorical_dispersion, entropy};

/// Largest number of present categories for exhaustive enumeration.
pub(crate) const MAX_ALL_PERM: usize = 20;

/// Which categories go left.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CategoricalChoice {
    Subset(Box<[CategoryBranch]>),
    Single(i32),
}

/// Best assignment found for one column.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CategoricalCut {
    pub choice: CategoricalChoice,
    pub gain: f64,
    /// Assignments whose gain was computed.
    pub n_evaluated: usize,
}

/// Reusable buffers.
#[derive(Debug, Default)]
pub(crate) struct CategoricalScratch {
    present: Vec<usize>,
    on_left: Vec<bool>,
}

// =============================================================================
// Gain
// =============================================================================

/// Sufficient statistics of a set of categories.
#[derive(Debug, Clone, Copy, Default)]
struct Agg {
    w: f64,
    sum_c_ln_c: f64,
    sum_sq: f64,
}

impl Agg {
    #[inline]
    fn add(&mut self, count: f64) {
        self.w += count;
        self.sum_c_ln_c += c_ln_c(count);
        self.sum_sq += count * count;
    }

    #[inline]
    fn minus(self, other: Agg) -> Agg {
        Agg {
            w: self.w - other.w,
            sum_c_ln_c: self.sum_c_ln_c - other.sum_c_ln_c,
            sum_sq: self.sum_sq - other.sum_sq,
        }
    }
}

/// Entropy gain under the pooled policy, uniform-mapping dispersion gain
/// under the averaged policy.
fn category_gain(policy: SplitPolicy, total: Agg, left: Agg) -> f64 {
    let right = total.minus(left);
    match policy {
        SplitPolicy::PooledGain => {
            let h = entropy(total.w, total.sum_c_ln_c);
            let h_l = entropy(left.w, left.sum_c_ln_c);
            let h_r = entropy(right.w, right.sum_c_ln_c);
            1.0 - (left.w * h_l + right.w * h_r) / (total.w * h)
        }
        SplitPolicy::AveragedGain => {
            let d = categorical_dispersion(total.w, total.sum_sq);
            let d_l = categorical_dispersion(left.w, left.sum_sq);
            let d_r = categorical_dispersion(right.w, right.sum_sq);
            (d - (d_l + d_r) / 2.0) / d
        }
        SplitPolicy::Random => 0.0,
    }
}

fn collect_present(counts: &[f64], present: &mut Vec<usize>) {
    present.clear();
    present.extend((0..counts.len()).filter(|&k| counts[k] > 0.0));
}

fn subset_from(counts: &[f64], present: &[usize], on_left: &[bool]) -> Box<[CategoryBranch]> {
    let mut branches = vec![CategoryBranch::Unseen; counts.len()];
    for (&k, &left) in present.iter().zip(on_left) {
        branches[k] = if left {
            CategoryBranch::Left
        } else {
            CategoryBranch::Right
        };
    }
    branches.into_boxed_slice()
}

// =============================================================================
// Subset splits
// =============================================================================

/// Split the present categories into two non-empty groups.
///
/// - `Random`: each category picks a side at random
/// - `PooledGain` with `all_perm` and at most [`MAX_ALL_PERM`] categories:
///   every one of the `2^(k-1) - 1` bipartitions
/// - gain policies otherwise: prefixes of the categories sorted by
///   decreasing count. `AveragedGain` always uses this order.
///
/// Returns `None` with fewer than two present categories.
pub(crate) fn subset_cut<R: Rng>(
    counts: &[f64],
    policy: SplitPolicy,
    all_perm: bool,
    rng: &mut R,
    scratch: &mut CategoricalScratch,
) -> Option<CategoricalCut> {
    let CategoricalScratch { present, on_left } = scratch;
    collect_present(counts, present);
    let k = present.len();
    if k < 2 {
        return None;
    }
    on_left.clear();

    if !policy.uses_gain() {
        on_left.extend((0..k).map(|_| rng.r#gen::<bool>()));
        if on_left.iter().all(|&l| l == on_left[0]) {
            let flip = rng.gen_range(0..k);
            on_left[flip] = !on_left[flip];
        }
        return Some(CategoricalCut {
            choice: CategoricalChoice::Subset(subset_from(counts, present, on_left)),
            gain: 0.0,
            n_evaluated: 1,
        });
    }

    let mut total = Agg::default();
    for &c in present.iter() {
        total.add(counts[c]);
    }

    if policy == SplitPolicy::PooledGain && all_perm && k <= MAX_ALL_PERM {
        // The last present category stays right, so each bipartition is
        // enumerated once.
        let n_masks = 1u32 << (k - 1);
        let mut best: Option<(u32, f64)> = None;
        for mask in 1..n_masks {
            let mut left = Agg::default();
            for (j, &c) in present[..k - 1].iter().enumerate() {
                if mask & (1 << j) != 0 {
                    left.add(counts[c]);
                }
            }
            let gain = category_gain(policy, total, left);
            if best.is_none_or(|(_, g)| gain > g) {
                best = Some((mask, gain));
            }
        }
        let (mask, gain) = best?;
        on_left.extend((0..k).map(|j| j < k - 1 && mask & (1 << j) != 0));
        return Some(CategoricalCut {
            choice: CategoricalChoice::Subset(subset_from(counts, present, on_left)),
            gain,
            n_evaluated: (n_masks - 1) as usize,
        });
    }

    present.sort_by(|&a, &b| counts[b].total_cmp(&counts[a]).then(a.cmp(&b)));
    let mut left = Agg::default();
    let mut best: Option<(usize, f64)> = None;
    for (i, &c) in present[..k - 1].iter().enumerate() {
        left.add(counts[c]);
        let gain = category_gain(policy, total, left);
        if best.is_none_or(|(_, g)| gain > g) {
            best = Some((i + 1, gain));
        }
    }
    let (n_left, gain) = best?;
    on_left.extend((0..k).map(|j| j < n_left));
    Some(CategoricalCut {
        choice: CategoricalChoice::Subset(subset_from(counts, present, on_left)),
        gain,
        n_evaluated: k - 1,
    })
}

/// Fix the branch of categories absent at the node.
///
/// `Weighted` keeps them [`Unseen`](CategoryBranch::Unseen) for the
/// scoring path; `Smallest` sends them to the lighter branch; `Random`
/// draws a branch per category.
pub(crate) fn resolve_unseen<R: Rng>(
    branches: &mut [CategoryBranch],
    action: NewCategoryAction,
    weight_left: f64,
    weight_right: f64,
    rng: &mut R,
) {
    let smallest = if weight_left < weight_right {
        CategoryBranch::Left
    } else {
        CategoryBranch::Right
    };
    for branch in branches.iter_mut().filter(|b| **b == CategoryBranch::Unseen) {
        match action {
            NewCategoryAction::Weighted => {}
            NewCategoryAction::Smallest => *branch = smallest,
            NewCategoryAction::Random => {
                *branch = if rng.r#gen::<bool>() {
                    CategoryBranch::Left
                } else {
                    CategoryBranch::Right
                };
            }
        }
    }
}

// =============================================================================
// Single-category splits
// =============================================================================

/// One present category goes left, the rest right.
///
/// `Random` picks the category uniformly; gain policies evaluate each.
pub(crate) fn single_cut<R: Rng>(
    counts: &[f64],
    policy: SplitPolicy,
    rng: &mut R,
    scratch: &mut CategoricalScratch,
) -> Option<CategoricalCut> {
    let present = &mut scratch.present;
    collect_present(counts, present);
    let k = present.len();
    if k < 2 {
        return None;
    }

    if !policy.uses_gain() {
        let code = present[rng.gen_range(0..k)];
        return Some(CategoricalCut {
            choice: CategoricalChoice::Single(code as i32),
            gain: 0.0,
            n_evaluated: 1,
        });
    }

    let mut total = Agg::default();
    for &c in present.iter() {
        total.add(counts[c]);
    }
    let mut best: Option<(usize, f64)> = None;
    for &c in present.iter() {
        let mut left = Agg::default();
        left.add(counts[c]);
        let gain = category_gain(policy, total, left);
        if best.is_none_or(|(_, g)| gain > g) {
            best = Some((c, gain));
        }
    }
    let (code, gain) = best?;
    Some(CategoricalCut {
        choice: CategoricalChoice::Single(code as i32),
        gain,
        n_evaluated: k,
    })
}
