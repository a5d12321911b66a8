//! Threshold search over a numeric sample.

use rand::prelude::*;

use super::moments::{RunningMoments, suffix_moments};
use crate::model::SplitPolicy;

/// A threshold and the gain it achieves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct NumericCut {
    /// `x <= threshold` goes left.
    pub threshold: f64,
    pub gain: f64,
}

/// Sort `(value, weight)` pairs by value.
#[inline]
pub(crate) fn sort_pairs(pairs: &mut [(f64, f64)]) {
    pairs.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));
}

/// Standardized dispersion gain of a split.
///
/// ```text
/// pooled:   1 - (W_l·sd_l + W_r·sd_r) / (W·sd)
/// averaged: (sd - (sd_l + sd_r) / 2) / sd
/// ```
#[inline]
pub(crate) fn dispersion_gain(
    policy: SplitPolicy,
    total: (f64, f64),
    left: (f64, f64),
    right: (f64, f64),
) -> f64 {
    let (w, sd) = total;
    let (w_l, sd_l) = left;
    let (w_r, sd_r) = right;
    match policy {
        SplitPolicy::PooledGain => 1.0 - (w_l * sd_l + w_r * sd_r) / (w * sd),
        SplitPolicy::AveragedGain => (sd - (sd_l + sd_r) / 2.0) / sd,
        SplitPolicy::Random => 0.0,
    }
}

/// Best gain threshold over sorted, non-missing `(value, weight)` pairs.
///
/// Candidate thresholds are midpoints between adjacent distinct values,
/// evaluated in one sweep against backward running moments. Returns `None`
/// when the sample has no spread.
pub(crate) fn best_gain_cut(
    pairs: &[(f64, f64)],
    policy: SplitPolicy,
    suffix: &mut Vec<RunningMoments>,
) -> Option<NumericCut> {
    debug_assert!(policy.uses_gain());
    if pairs.len() < 2 {
        return None;
    }
    suffix_moments(pairs, suffix);
    let total = suffix[0];
    let sd = total.sd();
    if !(sd > 0.0) {
        return None;
    }

    let mut prefix = RunningMoments::default();
    let mut best: Option<NumericCut> = None;
    for i in 0..pairs.len() - 1 {
        let (x, w) = pairs[i];
        prefix.push(x, w);
        let next = pairs[i + 1].0;
        if next <= x {
            continue;
        }
        let right = suffix[i + 1];
        if !(prefix.weight() > 0.0 && right.weight() > 0.0) {
            continue;
        }
        let gain = dispersion_gain(
            policy,
            (total.weight(), sd),
            (prefix.weight(), prefix.sd()),
            (right.weight(), right.sd()),
        );
        if best.is_none_or(|b| gain > b.gain) {
            best = Some(NumericCut {
                threshold: midpoint(x, next),
                gain,
            });
        }
    }
    best
}

/// Midpoint that keeps `lo` left and `hi` right.
#[inline]
fn midpoint(lo: f64, hi: f64) -> f64 {
    let mid = lo + (hi - lo) / 2.0;
    if mid < hi && mid.is_finite() { mid } else { lo }
}

/// Uniform threshold in `[min, max)`; `None` when `max <= min`.
#[inline]
pub(crate) fn random_threshold<R: Rng>(min: f64, max: f64, rng: &mut R) -> Option<f64> {
    if !(max > min) {
        return None;
    }
    let threshold = min + rng.r#gen::<f64>() * (max - min);
    Some(if threshold < max { threshold } else { min })
}

/// Range recorded for the scoring-time penalty: the observed range
/// widened by half its length on each side.
#[inline]
pub(crate) fn penalty_range(min: f64, max: f64) -> [f64; 2] {
    let half = (max - min) / 2.0;
    [min - half, max + half]
}
