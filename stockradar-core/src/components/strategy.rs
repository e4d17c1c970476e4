//! Strategy trait and the append-only factor set strategies own.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{ComponentError, Factor, Params};
use crate::domain::{MarketFrame, SignalTable};
use crate::persist::{self, PersistError};

/// Ordered factors attached to a strategy.
///
/// Only supports appending: factors are attached once at load time in
/// configuration order and never removed or reordered.
#[derive(Default)]
pub struct FactorSet {
    factors: Vec<Box<dyn Factor>>,
}

impl FactorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, factor: Box<dyn Factor>) {
        self.factors.push(factor);
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Factor> {
        self.factors.iter().map(|f| f.as_ref())
    }

    pub fn names(&self) -> Vec<String> {
        self.factors.iter().map(|f| f.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }
}

impl fmt::Debug for FactorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.factors.iter().map(|x| x.name())).finish()
    }
}

/// Descriptive summary of a strategy instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyInfo {
    pub name: String,
    pub params: Params,
    pub required_factors: Vec<String>,
}

/// Trait for strategies.
///
/// The runner drives every strategy through the same stages:
/// `preprocess → validate → generate_signals → postprocess → save_signals`.
/// `validate` returning false skips the strategy; any `Err` from the other
/// stages aborts the run.
pub trait Strategy: Send {
    /// Instance name from configuration; also the artifact file prefix.
    fn name(&self) -> &str;

    fn params(&self) -> &Params;

    fn factors(&self) -> &FactorSet;

    fn factors_mut(&mut self) -> &mut FactorSet;

    /// Turn (preprocessed, validated) data into a signal table.
    fn generate_signals(&self, data: &MarketFrame) -> Result<SignalTable, ComponentError>;

    /// Whether `data` is usable by this strategy.
    fn validate(&self, data: &MarketFrame) -> bool;

    /// Transform the shared dataset before validation. Identity by default.
    ///
    /// The returned frame replaces the runner's dataset, so later strategies
    /// see what earlier ones added.
    fn preprocess(&self, data: MarketFrame) -> Result<MarketFrame, ComponentError> {
        Ok(data)
    }

    /// Transform generated signals (smoothing, risk limits...). Identity by default.
    fn postprocess(&self, signals: SignalTable) -> Result<SignalTable, ComponentError> {
        Ok(signals)
    }

    fn add_factor(&mut self, factor: Box<dyn Factor>) {
        self.factors_mut().push(factor);
    }

    /// Attached factor names in attachment order.
    fn required_factors(&self) -> Vec<String> {
        self.factors().names()
    }

    fn info(&self) -> StrategyInfo {
        StrategyInfo {
            name: self.name().to_string(),
            params: self.params().clone(),
            required_factors: self.required_factors(),
        }
    }

    /// Write `signals` to `{output_path}/{name}_{YYYYMMDDHHMMSS}.csv`, stamped
    /// with the current local time. Returns the written path.
    fn save_signals(
        &self,
        signals: &SignalTable,
        output_path: &Path,
    ) -> Result<PathBuf, PersistError> {
        let file_name = persist::signal_file_name(self.name(), chrono::Local::now().naive_local());
        persist::write_signals(signals, output_path, &file_name)
    }
}
