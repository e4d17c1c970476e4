//! Built-in strategies.

pub mod factor_score;
pub mod ma_crossover;

pub use factor_score::FactorScore;
pub use ma_crossover::MaCrossover;

use super::registry::{PluginRegistry, STRATEGIES_MODULE};
use super::{compute_factor, ComponentError, FactorSet, Strategy};
use crate::domain::MarketFrame;

pub(crate) fn register_builtins(registry: &mut PluginRegistry) {
    registry.register_strategy(STRATEGIES_MODULE, "FactorScore", |name, params| {
        Ok(Box::new(FactorScore::from_params(name, params)?) as Box<dyn Strategy>)
    });
    registry.register_strategy(STRATEGIES_MODULE, "MaCrossover", |name, params| {
        Ok(Box::new(MaCrossover::from_params(name, params)?) as Box<dyn Strategy>)
    });
}

/// Compute every attached factor over `data`, one column per factor.
pub(crate) fn factor_columns(
    factors: &FactorSet,
    data: &MarketFrame,
) -> Result<Vec<Vec<f64>>, ComponentError> {
    factors
        .iter()
        .map(|factor| {
            let prepared = factor.preprocess(data.clone())?;
            let values = compute_factor(factor, &prepared)?;
            // Preprocessing must not add or drop rows.
            if values.len() != data.len() {
                return Err(ComponentError::SeriesLength {
                    component: factor.name().to_string(),
                    expected: data.len(),
                    actual: values.len(),
                });
            }
            Ok(values)
        })
        .collect()
}

/// Row `i` of a column set.
pub(crate) fn row_values(columns: &[Vec<f64>], i: usize) -> Vec<f64> {
    columns.iter().map(|c| c[i]).collect()
}
