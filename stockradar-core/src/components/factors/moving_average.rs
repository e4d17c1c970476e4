//! Simple moving average of any numeric field.

use crate::components::{param_str, param_usize, ComponentError, Factor, Params};
use crate::domain::MarketFrame;
use crate::series;

use super::positive;

#[derive(Debug, Clone)]
pub struct MovingAverage {
    name: String,
    params: Params,
    window: usize,
    field: String,
}

impl MovingAverage {
    pub fn new(
        name: impl Into<String>,
        window: usize,
        field: impl Into<String>,
    ) -> Result<Self, ComponentError> {
        let name = name.into();
        let field = field.into();
        let window = positive(&name, "window", window)?;
        if matches!(field.as_str(), "symbol" | "date") {
            return Err(ComponentError::InvalidParam {
                component: name,
                param: "field".to_string(),
                reason: format!("'{field}' is not numeric"),
            });
        }
        let mut params = Params::new();
        params.insert("window".into(), window.into());
        params.insert("field".into(), field.clone().into());
        Ok(Self {
            name,
            params,
            window,
            field,
        })
    }

    pub fn from_params(name: &str, params: &Params) -> Result<Self, ComponentError> {
        let mut factor = Self::new(
            name,
            param_usize(params, "window", 20),
            param_str(params, "field", "close"),
        )?;
        factor.params.extend(params.clone());
        Ok(factor)
    }
}

impl Factor for MovingAverage {
    fn name(&self) -> &str {
        &self.name
    }

    fn params(&self) -> &Params {
        &self.params
    }

    fn calculate(&self, data: &MarketFrame) -> Result<Vec<f64>, ComponentError> {
        let values = data
            .field(&self.field)
            .ok_or_else(|| ComponentError::MissingField {
                component: self.name.clone(),
                field: self.field.clone(),
            })?;
        Ok(data.map_per_symbol(&values, |v| series::sma(v, self.window)))
    }

    fn validate(&self, data: &MarketFrame) -> bool {
        !data.is_empty() && data.has_field(&self.field)
    }

    fn required_fields(&self) -> Vec<String> {
        vec![self.field.clone()]
    }
}
