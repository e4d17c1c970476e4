//! Realised volatility: rolling sample std of one-step close returns.

use crate::components::{param_bool, param_usize, ComponentError, Factor, Params};
use crate::domain::MarketFrame;
use crate::series;

const TRADING_DAYS: f64 = 252.0;

#[derive(Debug, Clone)]
pub struct Volatility {
    name: String,
    params: Params,
    window: usize,
    annualize: bool,
}

impl Volatility {
    pub fn new(
        name: impl Into<String>,
        window: usize,
        annualize: bool,
    ) -> Result<Self, ComponentError> {
        let name = name.into();
        if window < 2 {
            return Err(ComponentError::InvalidParam {
                component: name,
                param: "window".to_string(),
                reason: "must be >= 2".to_string(),
            });
        }
        let mut params = Params::new();
        params.insert("window".into(), window.into());
        params.insert("annualize".into(), annualize.into());
        Ok(Self {
            name,
            params,
            window,
            annualize,
        })
    }

    pub fn from_params(name: &str, params: &Params) -> Result<Self, ComponentError> {
        let mut factor = Self::new(
            name,
            param_usize(params, "window", 20),
            param_bool(params, "annualize", false),
        )?;
        factor.params.extend(params.clone());
        Ok(factor)
    }
}

impl Factor for Volatility {
    fn name(&self) -> &str {
        &self.name
    }

    fn params(&self) -> &Params {
        &self.params
    }

    fn calculate(&self, data: &MarketFrame) -> Result<Vec<f64>, ComponentError> {
        let closes = data.field("close").unwrap_or_default();
        let scale = if self.annualize {
            TRADING_DAYS.sqrt()
        } else {
            1.0
        };
        Ok(data.map_per_symbol(&closes, |c| {
            series::rolling_std(&series::pct_change(c), self.window)
                .into_iter()
                .map(|v| v * scale)
                .collect()
        }))
    }

    fn validate(&self, data: &MarketFrame) -> bool {
        !data.is_empty() && data.has_field("close")
    }

    fn required_fields(&self) -> Vec<String> {
        vec!["close".to_string()]
    }
}
