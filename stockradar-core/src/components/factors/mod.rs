//! Built-in factors.
//!
//! All factors compute per symbol over rows sorted by date, so values never
//! leak across symbols or from later rows.

pub mod momentum;
pub mod moving_average;
pub mod volatility;

pub use momentum::Momentum;
pub use moving_average::MovingAverage;
pub use volatility::Volatility;

use super::registry::{PluginRegistry, FACTORS_MODULE};
use super::{ComponentError, Factor};

pub(crate) fn register_builtins(registry: &mut PluginRegistry) {
    registry.register_factor(FACTORS_MODULE, "Momentum", |name, params| {
        Ok(Box::new(Momentum::from_params(name, params)?) as Box<dyn Factor>)
    });
    registry.register_factor(FACTORS_MODULE, "MovingAverage", |name, params| {
        Ok(Box::new(MovingAverage::from_params(name, params)?) as Box<dyn Factor>)
    });
    registry.register_factor(FACTORS_MODULE, "Volatility", |name, params| {
        Ok(Box::new(Volatility::from_params(name, params)?) as Box<dyn Factor>)
    });
}

/// Reject a zero lookback.
pub(crate) fn positive(
    component: &str,
    param: &str,
    value: usize,
) -> Result<usize, ComponentError> {
    if value == 0 {
        return Err(ComponentError::InvalidParam {
            component: component.to_string(),
            param: param.to_string(),
            reason: "must be >= 1".to_string(),
        });
    }
    Ok(value)
}

/// Build a frame from per-symbol close series for testing.
///
/// Dates start at 2024-01-02 and advance one day per row; open = close,
/// high/low = close ± 1, volume = 1000.
#[cfg(test)]
pub(crate) fn make_frame(series: &[(&str, &[f64])]) -> crate::domain::MarketFrame {
    use crate::domain::{Bar, MarketFrame};
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    let bars = series
        .iter()
        .flat_map(|(symbol, closes)| {
            closes.iter().enumerate().map(move |(i, &close)| Bar {
                symbol: symbol.to_string(),
                date: base_date + chrono::Duration::days(i as i64),
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1000.0,
            })
        })
        .collect();
    MarketFrame::new(bars)
}
