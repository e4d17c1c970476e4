//! Component model — the pluggable units the pipeline drives.
//!
//! - `Factor`: stateless computation producing one value series from market data.
//! - `Strategy`: owns an ordered, append-only set of factors and turns market
//!   data into a signal table.
//! - `PluginRegistry`: maps `module::class` keys to constructors and resolves
//!   configuration descriptors into live trait objects.
//!
//! Built-in implementations live in `factors` and `strategies` and register
//! themselves through `PluginRegistry::with_builtins()`.

pub mod factor;
pub mod factors;
pub mod params;
pub mod registry;
pub mod strategies;
pub mod strategy;

pub use factor::{compute_factor, Factor, FactorInfo};
pub use params::{param_bool, param_f64, param_str, param_usize, Params};
pub use registry::{
    PluginDescriptor, PluginError, PluginKind, PluginRegistry, StrategyDescriptor,
};
pub use strategy::{FactorSet, Strategy, StrategyInfo};

use thiserror::Error;

use crate::domain::FrameError;

/// Errors raised by factors and strategies while constructing or computing.
#[derive(Debug, Error)]
pub enum ComponentError {
    #[error("invalid parameter '{param}' for '{component}': {reason}")]
    InvalidParam {
        component: String,
        param: String,
        reason: String,
    },
    #[error("'{component}' requires field '{field}' which is missing from the data")]
    MissingField { component: String, field: String },
    #[error("'{component}' produced {actual} values for {expected} rows")]
    SeriesLength {
        component: String,
        expected: usize,
        actual: usize,
    },
    #[error(transparent)]
    Frame(#[from] FrameError),
}
