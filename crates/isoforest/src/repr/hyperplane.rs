//! Hyperplane splits of the extended model.

use crate::data::{DatasetView, is_missing};

use super::tree::Tree;

/// One column's contribution to a linear combination.
#[derive(Debug, Clone, PartialEq)]
pub enum HyperplaneTerm {
    /// `(x - center) * coef`, with `fill` substituted for a missing `x`.
    Numeric {
        column: usize,
        coef: f64,
        center: f64,
        fill: f64,
    },
    /// `coefs[code]`; `fill` for a missing code, `fill_new` for a code
    /// beyond the fitted category range.
    CategoricalSubset {
        column: usize,
        coefs: Box<[f64]>,
        fill: f64,
        fill_new: f64,
    },
    /// `coef` when the code equals `category`, zero otherwise; `fill` for
    /// a missing code.
    CategoricalSingle {
        column: usize,
        category: i32,
        coef: f64,
        fill: f64,
    },
}

impl HyperplaneTerm {
    /// Contribution of this term for `row`.
    #[inline]
    pub fn contribution(&self, data: &DatasetView<'_>, row: usize) -> f64 {
        match self {
            HyperplaneTerm::Numeric {
                column,
                coef,
                center,
                fill,
            } => {
                let x = data.numeric_value(row, *column);
                let x = if is_missing(x) { *fill } else { x };
                (x - center) * coef
            }
            HyperplaneTerm::CategoricalSubset {
                column,
                coefs,
                fill,
                fill_new,
            } => {
                let code = data.category(row, *column);
                if code < 0 {
                    *fill
                } else {
                    coefs.get(code as usize).copied().unwrap_or(*fill_new)
                }
            }
            HyperplaneTerm::CategoricalSingle {
                column,
                category,
                coef,
                fill,
            } => {
                let code = data.category(row, *column);
                if code < 0 {
                    *fill
                } else if code == *category {
                    *coef
                } else {
                    0.0
                }
            }
        }
    }
}

/// Split payload of the extended model: `Σ terms <= threshold` goes left.
#[derive(Debug, Clone, PartialEq)]
pub struct HyperplaneSplit {
    pub terms: Vec<HyperplaneTerm>,
    pub threshold: f64,
    /// Allowed range of the combined value for the range penalty.
    pub range: Option<[f64; 2]>,
}

impl HyperplaneSplit {
    /// Combined value for `row`.
    #[inline]
    pub fn value(&self, data: &DatasetView<'_>, row: usize) -> f64 {
        self.terms.iter().map(|t| t.contribution(data, row)).sum()
    }
}

/// Tree of the extended model.
pub type HyperplaneTree = Tree<HyperplaneSplit>;
