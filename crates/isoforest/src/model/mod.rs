//! Forest configuration.
//!
//! [`IsoForestConfig`] is the entry point: build it with
//! `IsoForestConfig::builder()` and pass it to
//! [`IsoForestTrainer`](crate::training::IsoForestTrainer).

mod config;
mod params;

pub use config::{ConfigError, IsoForestConfig, IsoForestConfigBuilder};
pub use params::{
    CategoricalParams, CoefType, DepthLimit, HyperplaneParams, ImputeDepthWeighting, ImputeParams,
    ImputeRowWeighting, InterruptBehavior, OutputParams, ParamValidationError, SamplingParams,
    SplitParams, SplitPolicy,
};
