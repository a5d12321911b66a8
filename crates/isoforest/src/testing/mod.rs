//! Shared helpers for unit and integration tests.
//!
//! Everything here is deterministic: generators take an explicit seed.

pub mod data;
