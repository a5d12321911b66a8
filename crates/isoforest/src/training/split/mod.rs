//! Split evaluation primitives.
//!
//! Given the values of one candidate at a node, these functions find where
//! to cut:
//!
//! - [`numeric`]: thresholds over sorted `(value, weight)` pairs, either
//!   drawn uniformly or chosen by standardized dispersion gain
//! - [`categorical`]: category subsets or single categories, random or by
//!   entropy / dispersion gain
//! - [`moments`]: the running moments behind the numeric gain sweep
//!
//! Candidate selection and routing live in the grower.

pub(crate) mod categorical;
pub(crate) mod moments;
pub(crate) mod numeric;

pub(crate) use categorical::{
    CategoricalChoice, CategoricalScratch, resolve_unseen, single_cut, subset_cut,
};
pub(crate) use moments::RunningMoments;
pub(crate) use numeric::{best_gain_cut, penalty_range, random_threshold, sort_pairs};
