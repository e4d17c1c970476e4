//! Momentum factor: percentage rate of change of close over `period` rows.

use crate::components::{param_usize, ComponentError, Factor, Params};
use crate::domain::MarketFrame;
use crate::series;

use super::positive;

#[derive(Debug, Clone)]
pub struct Momentum {
    name: String,
    params: Params,
    period: usize,
}

impl Momentum {
    pub fn new(name: impl Into<String>, period: usize) -> Result<Self, ComponentError> {
        let name = name.into();
        let period = positive(&name, "period", period)?;
        let mut params = Params::new();
        params.insert("period".into(), period.into());
        Ok(Self {
            name,
            params,
            period,
        })
    }

    pub fn from_params(name: &str, params: &Params) -> Result<Self, ComponentError> {
        let mut factor = Self::new(name, param_usize(params, "period", 20))?;
        factor.params.extend(params.clone());
        Ok(factor)
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Factor for Momentum {
    fn name(&self) -> &str {
        &self.name
    }

    fn params(&self) -> &Params {
        &self.params
    }

    fn calculate(&self, data: &MarketFrame) -> Result<Vec<f64>, ComponentError> {
        let closes = data.field("close").unwrap_or_default();
        Ok(data.map_per_symbol(&closes, |c| series::rate_of_change(c, self.period)))
    }

    fn validate(&self, data: &MarketFrame) -> bool {
        !data.is_empty() && data.missing_fields(&self.required_fields()).is_empty()
    }

    fn required_fields(&self) -> Vec<String> {
        vec!["close".to_string()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::factors::make_frame;
    use crate::series::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn momentum_per_symbol() {
        let data = make_frame(&[("A", &[100.0, 110.0, 121.0]), ("B", &[50.0, 25.0])]);
        let factor = Momentum::new("mom", 1).unwrap();
        let values = factor.calculate(&data).unwrap();

        assert_eq!(values.len(), 5);
        assert!(values[0].is_nan());
        assert_approx(values[1], 10.0, DEFAULT_EPSILON);
        assert_approx(values[2], 10.0, DEFAULT_EPSILON);
        // B does not see A's last close.
        assert!(values[3].is_nan());
        assert_approx(values[4], -50.0, DEFAULT_EPSILON);
    }

    #[test]
    fn zero_period_is_rejected() {
        assert!(matches!(
            Momentum::new("mom", 0),
            Err(ComponentError::InvalidParam { .. })
        ));
    }

    #[test]
    fn params_default_and_are_reported() {
        let factor = Momentum::from_params("mom", &Params::new()).unwrap();
        assert_eq!(factor.period(), 20);
        assert_eq!(factor.info().params["period"], serde_json::json!(20));
    }

    #[test]
    fn empty_data_does_not_validate() {
        let factor = Momentum::new("mom", 5).unwrap();
        assert!(!factor.validate(&MarketFrame::default()));
        assert!(factor.validate(&make_frame(&[("A", &[1.0])])));
    }
}
