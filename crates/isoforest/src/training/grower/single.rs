//! Single-variable splits: one column, a threshold or a category set.

use super::{FitContext, SplitModel, branch_share};
use crate::data::{ColumnRef, is_missing};
use crate::model::SplitPolicy;
use crate::repr::{CategoricalSplit, CategoryBranch, SplitCondition, VarSplit};
use crate::training::BuildError;
use crate::training::split::{
    CategoricalChoice, best_gain_cut, penalty_range, random_threshold, resolve_unseen, single_cut,
    sort_pairs, subset_cut,
};
use crate::training::workspace::{Route, WorkerScratch};

/// Split model of isolation trees.
pub(crate) struct SingleVariableModel<'a, 'd> {
    ctx: &'a FitContext<'d>,
}

impl<'a, 'd> SingleVariableModel<'a, 'd> {
    pub fn new(ctx: &'a FitContext<'d>) -> Self {
        Self { ctx }
    }

    fn numeric_split(
        &self,
        ws: &mut WorkerScratch,
        st: usize,
        end: usize,
        col: usize,
        policy: SplitPolicy,
    ) -> Option<(VarSplit, f64)> {
        let data = &self.ctx.data;
        ws.pairs.clear();
        let (mut min, mut max) = (f64::INFINITY, f64::NEG_INFINITY);
        for &row in &ws.ix_arr[st..end] {
            let x = data.numeric_value(row, col);
            if is_missing(x) {
                continue;
            }
            min = min.min(x);
            max = max.max(x);
            ws.pairs.push((x, ws.weights.weight(row)));
        }
        if !(max > min) {
            ws.columns.exclude(data.global_index(ColumnRef::Numeric(col)));
            return None;
        }

        let (threshold, gain) = if policy.uses_gain() {
            sort_pairs(&mut ws.pairs);
            let cut = best_gain_cut(&ws.pairs, policy, &mut ws.suffix)?;
            (cut.threshold, cut.gain)
        } else {
            (random_threshold(min, max, &mut ws.rng)?, 0.0)
        };

        let split = VarSplit {
            column: ColumnRef::Numeric(col),
            condition: SplitCondition::Threshold(threshold),
            pct_left: 0.0,
            range: self.ctx.params.split.penalize_range.then(|| penalty_range(min, max)),
        };
        Some((split, gain))
    }

    fn categorical_split(
        &self,
        ws: &mut WorkerScratch,
        st: usize,
        end: usize,
        col: usize,
        policy: SplitPolicy,
    ) -> Result<Option<(VarSplit, f64)>, BuildError> {
        let data = &self.ctx.data;
        let n_categories = data.n_categories(col);
        ws.cat_counts.clear();
        ws.cat_counts.resize(n_categories, 0.0);
        for &row in &ws.ix_arr[st..end] {
            let code = data.category(row, col);
            if code < 0 {
                continue;
            }
            let slot = ws
                .cat_counts
                .get_mut(code as usize)
                .ok_or(BuildError::CategoryOutOfRange {
                    column: col,
                    code,
                    n_categories,
                })?;
            *slot += ws.weights.weight(row);
        }

        let params = &self.ctx.params;
        let cut = match params.categorical.split_type {
            CategoricalSplit::SubSet => subset_cut(
                &ws.cat_counts,
                policy,
                params.split.all_perm,
                &mut ws.rng,
                &mut ws.categorical,
            ),
            CategoricalSplit::SingleCategory => {
                single_cut(&ws.cat_counts, policy, &mut ws.rng, &mut ws.categorical)
            }
        };
        let Some(cut) = cut else {
            ws.columns.exclude(data.global_index(ColumnRef::Categorical(col)));
            return Ok(None);
        };

        let condition = match cut.choice {
            CategoricalChoice::Subset(branches) => SplitCondition::Subset(branches),
            CategoricalChoice::Single(code) => SplitCondition::Single(code),
        };
        let split = VarSplit {
            column: ColumnRef::Categorical(col),
            condition,
            pct_left: 0.0,
            range: None,
        };
        Ok(Some((split, cut.gain)))
    }
}

impl SplitModel for SingleVariableModel<'_, '_> {
    type Split = VarSplit;
    /// Global column index.
    type Candidate = usize;

    fn choose_candidate(&self, ws: &mut WorkerScratch) -> Option<usize> {
        ws.columns.draw(&mut ws.rng)
    }

    fn evaluate_split(
        &self,
        ws: &mut WorkerScratch,
        st: usize,
        end: usize,
        candidate: usize,
        policy: SplitPolicy,
    ) -> Result<Option<(VarSplit, f64)>, BuildError> {
        match self.ctx.data.column(candidate) {
            ColumnRef::Numeric(col) => Ok(self.numeric_split(ws, st, end, col, policy)),
            ColumnRef::Categorical(col) => self.categorical_split(ws, st, end, col, policy),
        }
    }

    #[inline]
    fn route(&self, split: &VarSplit, row: usize) -> Route {
        let data = &self.ctx.data;
        match (split.column, &split.condition) {
            (ColumnRef::Numeric(col), SplitCondition::Threshold(threshold)) => {
                let x = data.numeric_value(row, col);
                if is_missing(x) {
                    Route::Missing
                } else if x <= *threshold {
                    Route::Left
                } else {
                    Route::Right
                }
            }
            (ColumnRef::Categorical(col), condition) => {
                let code = data.category(row, col);
                if code < 0 {
                    return Route::Missing;
                }
                match condition {
                    SplitCondition::Subset(branches) => match branches.get(code as usize) {
                        Some(CategoryBranch::Left) => Route::Left,
                        Some(CategoryBranch::Right) => Route::Right,
                        _ => Route::Missing,
                    },
                    SplitCondition::Single(category) if code == *category => Route::Left,
                    _ => Route::Right,
                }
            }
            (ColumnRef::Numeric(_), _) => Route::Missing,
        }
    }

    fn materialize_node(
        &self,
        ws: &mut WorkerScratch,
        mut split: VarSplit,
        weight_left: f64,
        weight_right: f64,
    ) -> VarSplit {
        split.pct_left = branch_share(weight_left, weight_right);
        if let SplitCondition::Subset(branches) = &mut split.condition {
            resolve_unseen(
                branches,
                self.ctx.params.categorical.new_category_action,
                weight_left,
                weight_right,
                &mut ws.rng,
            );
        }
        split
    }
}
