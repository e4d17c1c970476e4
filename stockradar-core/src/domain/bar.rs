//! Bar — one market record for one symbol on one day.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// OHLCV record. Missing numeric values are carried as `f64::NAN`.
///
/// Volume is a float so that a missing value survives ingestion and can be
/// filled later by the market data processor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Returns true if any price or the volume is missing.
    pub fn has_gaps(&self) -> bool {
        self.open.is_nan()
            || self.high.is_nan()
            || self.low.is_nan()
            || self.close.is_nan()
            || self.volume.is_nan()
    }

    /// Numeric value of a base field by name.
    pub fn numeric(&self, field: &str) -> Option<f64> {
        match field {
            "open" => Some(self.open),
            "high" => Some(self.high),
            "low" => Some(self.low),
            "close" => Some(self.close),
            "volume" => Some(self.volume),
            _ => None,
        }
    }
}
