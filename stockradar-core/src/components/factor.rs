//! Factor trait — one value series per row of market data.

use serde::{Deserialize, Serialize};

use super::{ComponentError, Params};
use crate::domain::MarketFrame;

/// Descriptive summary of a factor instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorInfo {
    pub name: String,
    pub params: Params,
    pub required_fields: Vec<String>,
}

/// Trait for factors.
///
/// A factor is stateless: `calculate` must return one value per row of the
/// input frame, NaN where the value is undefined (warmup, gaps). Values for a
/// row may only depend on that row and earlier rows of the same symbol.
pub trait Factor: Send + Sync {
    /// Instance name from configuration (e.g. "mom_20").
    fn name(&self) -> &str;

    fn params(&self) -> &Params;

    /// Compute the factor for every row of `data`.
    fn calculate(&self, data: &MarketFrame) -> Result<Vec<f64>, ComponentError>;

    /// Whether `data` satisfies this factor's input requirements.
    fn validate(&self, data: &MarketFrame) -> bool;

    /// Transform input data before calculation. Identity by default.
    fn preprocess(&self, data: MarketFrame) -> Result<MarketFrame, ComponentError> {
        Ok(data)
    }

    /// Transform the raw factor series (winsorize, normalize...). Identity by default.
    fn postprocess(&self, values: Vec<f64>) -> Result<Vec<f64>, ComponentError> {
        Ok(values)
    }

    /// Fields `calculate` reads, in a stable order.
    fn required_fields(&self) -> Vec<String> {
        Vec::new()
    }

    fn info(&self) -> FactorInfo {
        FactorInfo {
            name: self.name().to_string(),
            params: self.params().clone(),
            required_fields: self.required_fields(),
        }
    }
}

/// Calculate and postprocess a factor, enforcing its field contract.
///
/// A missing required field is an error here, not a silent NaN series: by the
/// time a strategy computes its factors the data has already passed the
/// strategy's own validation.
pub fn compute_factor(factor: &dyn Factor, data: &MarketFrame) -> Result<Vec<f64>, ComponentError> {
    let required = factor.required_fields();
    if let Some(field) = data.missing_fields(&required).first() {
        return Err(ComponentError::MissingField {
            component: factor.name().to_string(),
            field: field.to_string(),
        });
    }

    let values = factor.postprocess(factor.calculate(data)?)?;
    if values.len() != data.len() {
        return Err(ComponentError::SeriesLength {
            component: factor.name().to_string(),
            expected: data.len(),
            actual: values.len(),
        });
    }
    Ok(values)
}
