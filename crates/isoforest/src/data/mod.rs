//! Input data abstractions for forest construction.
//!
//! The engine never copies the training data. It reads it through a
//! [`DatasetView`], which combines:
//!
//! - numeric columns, either dense feature-major `[n_columns, n_rows]`
//!   ([`NumericColumns::Dense`]) or compressed-by-column ([`CscView`]),
//! - categorical columns as integer codes `[n_columns, n_rows]`, where a
//!   negative code is missing and each column declares its category count,
//! - optional per-row sample weights and per-column sampling weights.
//!
//! Columns are addressed globally: numeric columns come first, followed by
//! the categorical ones (see [`ColumnRef`]).
//!
//! # Missing Values
//!
//! Any non-finite numeric value (`NaN`, `±inf`) is treated as missing. In
//! sparse columns only explicitly stored entries can be missing; implicit
//! entries are zeros.
//!
//! [`DatasetMut`] is the mutable counterpart used to write imputed values back
//! into the caller's buffers.

mod error;
mod mutate;
mod sparse;
mod views;

pub use error::DatasetError;
pub use mutate::{DatasetMut, NumericColumnsMut};
pub use sparse::CscView;
pub use views::{CategoricalColumns, ColumnRef, DatasetView, NumericColumns};

/// Whether a numeric value counts as missing.
#[inline]
pub fn is_missing(value: f64) -> bool {
    !value.is_finite()
}
