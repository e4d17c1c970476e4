//! Market data cleaning and feature enrichment.
//!
//! Cleaning: drop duplicate `(symbol, date)` rows, fill missing volume with 0,
//! forward-fill every other missing value within each symbol.
//! Features: `returns`, `volatility` (20-row std of returns), `ma_20`, `ma_50`.

use std::collections::BTreeMap;

use serde_json::json;

use super::{DataProcessor, ProcessError, Processed};
use crate::domain::MarketFrame;
use crate::observability::{Metadata, MetricsCollector};
use crate::series;

pub const ADDED_FEATURES: [&str; 4] = ["returns", "volatility", "ma_20", "ma_50"];
const VOLATILITY_WINDOW: usize = 20;
const MAX_MISSING_RATIO: f64 = 0.1;

#[derive(Debug, Clone, Default)]
pub struct MarketDataProcessor;

impl MarketDataProcessor {
    pub fn new() -> Self {
        Self
    }

    fn clean(&self, data: MarketFrame) -> Result<MarketFrame, ProcessError> {
        let deduped = data.dedup_rows();
        let ranges: Vec<_> = deduped
            .symbol_ranges()
            .into_iter()
            .map(|(_, range)| range)
            .collect();
        let (mut bars, mut columns) = deduped.into_parts();

        for range in &ranges {
            let mut last: [f64; 4] = [f64::NAN; 4];
            for bar in &mut bars[range.clone()] {
                if bar.volume.is_nan() {
                    bar.volume = 0.0;
                }
                for (slot, value) in last
                    .iter_mut()
                    .zip([&mut bar.open, &mut bar.high, &mut bar.low, &mut bar.close])
                {
                    if value.is_nan() {
                        *value = *slot;
                    } else {
                        *slot = *value;
                    }
                }
            }
            for values in columns.values_mut() {
                forward_fill(&mut values[range.clone()]);
            }
        }

        Ok(MarketFrame::from_parts(bars, columns)?)
    }

    fn add_features(&self, data: &mut MarketFrame) -> Result<(), ProcessError> {
        let closes = data.field("close").unwrap_or_default();
        let returns = data.map_per_symbol(&closes, series::pct_change);
        let volatility =
            data.map_per_symbol(&returns, |r| series::rolling_std(r, VOLATILITY_WINDOW));
        let ma_20 = data.map_per_symbol(&closes, |c| series::sma(c, 20));
        let ma_50 = data.map_per_symbol(&closes, |c| series::sma(c, 50));

        for (name, values) in ADDED_FEATURES.iter().zip([returns, volatility, ma_20, ma_50]) {
            data.insert_column(*name, values)?;
        }
        Ok(())
    }

    fn check_quality(&self, data: &MarketFrame, metrics: &mut MetricsCollector) {
        let features: Vec<&[f64]> = ADDED_FEATURES
            .iter()
            .filter_map(|name| data.column(name))
            .collect();

        let has_infinite = features
            .iter()
            .any(|values| values.iter().any(|v| v.is_infinite()));
        metrics.record_data_quality(
            "infinite_values_check",
            !has_infinite,
            &json!({ "has_infinite_values": has_infinite }),
        );

        let ratios: BTreeMap<&str, f64> = ADDED_FEATURES
            .iter()
            .zip(&features)
            .map(|(name, values)| (*name, missing_ratio(values)))
            .collect();
        let worst = ratios.values().copied().fold(0.0, f64::max);
        if worst >= MAX_MISSING_RATIO {
            tracing::debug!(worst_ratio = worst, "feature columns exceed missing-value budget");
        }
        metrics.record_data_quality(
            "missing_values_ratio",
            worst < MAX_MISSING_RATIO,
            &json!({ "missing_ratios": ratios }),
        );
    }
}

fn forward_fill(values: &mut [f64]) {
    let mut last = f64::NAN;
    for v in values.iter_mut() {
        if v.is_nan() {
            *v = last;
        } else {
            last = *v;
        }
    }
}

fn missing_ratio(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().filter(|v| v.is_nan()).count() as f64 / values.len() as f64
}

impl DataProcessor for MarketDataProcessor {
    fn name(&self) -> &str {
        "market_data"
    }

    fn display_name(&self) -> String {
        "Market Data Processor".to_string()
    }

    fn node_metadata(&self) -> BTreeMap<String, String> {
        let mut metadata = BTreeMap::new();
        metadata.insert("type".to_string(), "market_data".to_string());
        metadata.insert("version".to_string(), "1.0".to_string());
        metadata
    }

    fn process(
        &self,
        data: MarketFrame,
        metrics: &mut MetricsCollector,
    ) -> Result<Processed, ProcessError> {
        let input_rows = data.len();
        let mut data = self.clean(data)?;
        self.add_features(&mut data)?;
        self.check_quality(&data, metrics);

        let mut metadata = Metadata::new();
        metadata.insert(
            "processed_at".to_string(),
            json!(chrono::Local::now().naive_local().to_string()),
        );
        metadata.insert("added_features".to_string(), json!(ADDED_FEATURES));
        metadata.insert(
            "duplicates_dropped".to_string(),
            json!(input_rows - data.len()),
        );
        Ok(Processed { data, metadata })
    }
}
