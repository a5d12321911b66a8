//! Hyperplane splits: a random linear combination of `ndim` columns.
//!
//! Each node draws its columns without replacement from those still
//! eligible, builds one [`HyperplaneTerm`] per column and thresholds the
//! combined value with the same policies as a numeric column. Missing
//! values never reach the recursion: every term carries a fill value.

use rand::prelude::*;
use rand_distr::StandardNormal;

use super::{FitContext, SplitModel};
use crate::data::{ColumnRef, is_missing};
use crate::model::{CoefType, SplitPolicy};
use crate::repr::{CategoricalSplit, HyperplaneSplit, HyperplaneTerm, MissingAction, NewCategoryAction};
use crate::training::BuildError;
use crate::training::split::{best_gain_cut, penalty_range, random_threshold, sort_pairs};
use crate::training::stats::mean_sd;
use crate::training::workspace::{Route, WorkerScratch};
use crate::utils::weighted_quantile;

/// Split model of extended isolation trees.
pub(crate) struct HyperplaneModel<'a, 'd> {
    ctx: &'a FitContext<'d>,
}

impl<'a, 'd> HyperplaneModel<'a, 'd> {
    pub fn new(ctx: &'a FitContext<'d>) -> Self {
        Self { ctx }
    }

    fn draw_coef<R: Rng>(&self, rng: &mut R) -> f64 {
        match self.ctx.params.hyperplane.coef_type {
            CoefType::Normal => rng.sample(StandardNormal),
            CoefType::Uniform => rng.gen_range(-1.0..1.0),
        }
    }

    /// Term for one column, or `None` when the column is constant at the node.
    fn make_term(&self, ws: &mut WorkerScratch, st: usize, end: usize, global: usize) -> Option<HyperplaneTerm> {
        match self.ctx.data.column(global) {
            ColumnRef::Numeric(col) => self.numeric_term(ws, st, end, col),
            ColumnRef::Categorical(col) => self.categorical_term(ws, st, end, col),
        }
    }

    fn numeric_term(&self, ws: &mut WorkerScratch, st: usize, end: usize, col: usize) -> Option<HyperplaneTerm> {
        let data = &self.ctx.data;
        ws.values.clear();
        ws.aux.clear();
        let (mut min, mut max) = (f64::INFINITY, f64::NEG_INFINITY);
        for &row in &ws.ix_arr[st..end] {
            let x = data.numeric_value(row, col);
            if is_missing(x) {
                continue;
            }
            min = min.min(x);
            max = max.max(x);
            ws.values.push(x);
            ws.aux.push(ws.weights.weight(row));
        }
        if !(max > min) {
            return None;
        }

        let weights = (!ws.weights.is_uniform()).then_some(&ws.aux[..]);
        let (center, sd) = mean_sd(&ws.values, weights);
        if !(sd > 0.0) {
            return None;
        }
        let mut coef = self.draw_coef(&mut ws.rng);
        if self.ctx.params.hyperplane.standardize_data {
            coef /= sd;
        }
        let fill = match self.ctx.params.missing_action {
            MissingAction::Fail => center,
            _ => weighted_quantile(&ws.values, weights, 0.5, &mut ws.quantile_ix),
        };
        Some(HyperplaneTerm::Numeric {
            column: col,
            coef,
            center,
            fill,
        })
    }

    fn categorical_term(&self, ws: &mut WorkerScratch, st: usize, end: usize, col: usize) -> Option<HyperplaneTerm> {
        let data = &self.ctx.data;
        let n_categories = data.n_categories(col);
        ws.cat_counts.clear();
        ws.cat_counts.resize(n_categories, 0.0);
        for &row in &ws.ix_arr[st..end] {
            let code = data.category(row, col);
            if let Some(slot) = usize::try_from(code).ok().and_then(|c| ws.cat_counts.get_mut(c)) {
                *slot += ws.weights.weight(row);
            }
        }
        ws.col_buf.clear();
        ws.col_buf
            .extend((0..n_categories).filter(|&c| ws.cat_counts[c] > 0.0));
        if ws.col_buf.len() < 2 {
            return None;
        }
        let total: f64 = ws.col_buf.iter().map(|&c| ws.cat_counts[c]).sum();
        let mode = ws
            .col_buf
            .iter()
            .copied()
            .fold(ws.col_buf[0], |best, c| if ws.cat_counts[c] > ws.cat_counts[best] { c } else { best });

        let params = &self.ctx.params;
        match params.categorical.split_type {
            CategoricalSplit::SingleCategory => {
                let category = ws.col_buf[ws.rng.gen_range(0..ws.col_buf.len())];
                let coef = self.draw_coef(&mut ws.rng);
                Some(HyperplaneTerm::CategoricalSingle {
                    column: col,
                    category: category as i32,
                    coef,
                    fill: coef * ws.cat_counts[category] / total,
                })
            }
            CategoricalSplit::SubSet => {
                ws.hp_coefs.clear();
                ws.hp_coefs.resize(n_categories, 0.0);
                if params.hyperplane.coef_by_prop {
                    ws.values.clear();
                    for _ in 0..ws.col_buf.len() {
                        let c = self.draw_coef(&mut ws.rng);
                        ws.values.push(c);
                    }
                    ws.values.sort_unstable_by(|a, b| b.total_cmp(a));
                    let counts = &ws.cat_counts;
                    ws.col_buf.sort_by(|&a, &b| counts[b].total_cmp(&counts[a]).then(a.cmp(&b)));
                    for (&c, &coef) in ws.col_buf.iter().zip(&ws.values) {
                        ws.hp_coefs[c] = coef;
                    }
                } else {
                    for &c in &ws.col_buf {
                        ws.hp_coefs[c] = self.draw_coef(&mut ws.rng);
                    }
                }

                let fill_new = match params.categorical.new_category_action {
                    NewCategoryAction::Weighted => {
                        ws.col_buf.iter().map(|&c| ws.cat_counts[c] * ws.hp_coefs[c]).sum::<f64>() / total
                    }
                    NewCategoryAction::Smallest => ws
                        .col_buf
                        .iter()
                        .map(|&c| ws.hp_coefs[c])
                        .fold(f64::INFINITY, f64::min),
                    NewCategoryAction::Random => ws.hp_coefs[ws.col_buf[ws.rng.gen_range(0..ws.col_buf.len())]],
                };
                for (c, coef) in ws.hp_coefs.iter_mut().enumerate() {
                    if !(ws.cat_counts[c] > 0.0) {
                        *coef = fill_new;
                    }
                }
                Some(HyperplaneTerm::CategoricalSubset {
                    column: col,
                    fill: ws.hp_coefs[mode],
                    coefs: ws.hp_coefs.as_slice().into(),
                    fill_new,
                })
            }
        }
    }
}

impl SplitModel for HyperplaneModel<'_, '_> {
    type Split = HyperplaneSplit;
    type Candidate = ();

    fn choose_candidate(&self, ws: &mut WorkerScratch) -> Option<()> {
        (ws.columns.n_available() > 0).then_some(())
    }

    fn evaluate_split(
        &self,
        ws: &mut WorkerScratch,
        st: usize,
        end: usize,
        _candidate: (),
        policy: SplitPolicy,
    ) -> Result<Option<(HyperplaneSplit, f64)>, BuildError> {
        let data = &self.ctx.data;
        let mark = ws.columns.mark();
        ws.hp_terms.clear();
        ws.hp_constant.clear();
        ws.comb.clear();
        ws.comb.resize(end - st, 0.0);

        while ws.hp_terms.len() < self.ctx.params.ndim {
            let Some(global) = ws.columns.draw(&mut ws.rng) else {
                break;
            };
            ws.columns.exclude(global);
            match self.make_term(ws, st, end, global) {
                Some(term) => {
                    for (k, &row) in ws.ix_arr[st..end].iter().enumerate() {
                        ws.comb[k] += term.contribution(data, row);
                    }
                    ws.hp_terms.push(term);
                }
                None => ws.hp_constant.push(global),
            }
        }
        ws.columns.restore_to(mark);
        for &global in &ws.hp_constant {
            ws.columns.exclude(global);
        }
        if ws.hp_terms.is_empty() {
            return Ok(None);
        }

        let (mut min, mut max) = (f64::INFINITY, f64::NEG_INFINITY);
        for &v in &ws.comb {
            if !v.is_finite() {
                return Err(BuildError::NonFiniteCombination);
            }
            min = min.min(v);
            max = max.max(v);
        }
        if !(max > min) {
            return Ok(None);
        }

        let (threshold, gain) = if policy.uses_gain() {
            ws.pairs.clear();
            ws.pairs.extend(
                ws.ix_arr[st..end]
                    .iter()
                    .zip(&ws.comb)
                    .map(|(&row, &v)| (v, ws.weights.weight(row))),
            );
            sort_pairs(&mut ws.pairs);
            let Some(cut) = best_gain_cut(&ws.pairs, policy, &mut ws.suffix) else {
                return Ok(None);
            };
            (cut.threshold, cut.gain)
        } else {
            let Some(threshold) = random_threshold(min, max, &mut ws.rng) else {
                return Ok(None);
            };
            (threshold, 0.0)
        };

        let split = HyperplaneSplit {
            terms: ws.hp_terms.drain(..).collect(),
            threshold,
            range: self.ctx.params.split.penalize_range.then(|| penalty_range(min, max)),
        };
        Ok(Some((split, gain)))
    }

    #[inline]
    fn route(&self, split: &HyperplaneSplit, row: usize) -> Route {
        if split.value(&self.ctx.data, row) <= split.threshold {
            Route::Left
        } else {
            Route::Right
        }
    }

    fn materialize_node(&self, _ws: &mut WorkerScratch, split: HyperplaneSplit, _wl: f64, _wr: f64) -> HyperplaneSplit {
        split
    }
}
