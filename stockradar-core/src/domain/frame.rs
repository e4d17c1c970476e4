//! MarketFrame — the tabular dataset strategies read and preprocess.
//!
//! Rows are OHLCV bars kept sorted by `(symbol, date)`, so every symbol's rows
//! are contiguous and per-symbol rolling computations can work on slices.
//! Derived numeric columns (factor inputs, moving averages, returns) live next
//! to the bars and always have exactly one value per row.

use std::collections::BTreeMap;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Bar;

/// Columns every market table carries.
pub const BASE_FIELDS: [&str; 7] = ["symbol", "date", "open", "high", "low", "close", "volume"];

#[derive(Debug, Error, PartialEq)]
pub enum FrameError {
    #[error("column '{name}' has {actual} values but the table has {expected} rows")]
    LengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
    #[error("'{0}' is a base field and cannot be used as a derived column")]
    ReservedName(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketFrame {
    bars: Vec<Bar>,
    columns: BTreeMap<String, Vec<f64>>,
}

impl MarketFrame {
    /// Build a frame from bars, sorting them by `(symbol, date)`.
    pub fn new(mut bars: Vec<Bar>) -> Self {
        bars.sort_by(|a, b| a.symbol.cmp(&b.symbol).then(a.date.cmp(&b.date)));
        Self {
            bars,
            columns: BTreeMap::new(),
        }
    }

    /// Build a frame from bars and derived columns aligned with them.
    ///
    /// Rows are reordered by `(symbol, date)` and every column follows the same
    /// permutation.
    pub fn from_parts(
        bars: Vec<Bar>,
        columns: BTreeMap<String, Vec<f64>>,
    ) -> Result<Self, FrameError> {
        let n = bars.len();
        for (name, values) in &columns {
            check_column(name, values.len(), n)?;
        }

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| {
            bars[a]
                .symbol
                .cmp(&bars[b].symbol)
                .then(bars[a].date.cmp(&bars[b].date))
        });

        let sorted_bars = order.iter().map(|&i| bars[i].clone()).collect();
        let sorted_columns = columns
            .into_iter()
            .map(|(name, values)| {
                let reordered = order.iter().map(|&i| values[i]).collect();
                (name, reordered)
            })
            .collect();

        Ok(Self {
            bars: sorted_bars,
            columns: sorted_columns,
        })
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn columns(&self) -> &BTreeMap<String, Vec<f64>> {
        &self.columns
    }

    /// Base fields followed by derived column names.
    pub fn column_names(&self) -> Vec<&str> {
        BASE_FIELDS
            .iter()
            .copied()
            .chain(self.columns.keys().map(String::as_str))
            .collect()
    }

    pub fn has_field(&self, name: &str) -> bool {
        BASE_FIELDS.contains(&name) || self.columns.contains_key(name)
    }

    /// Names from `fields` that this frame does not carry, in input order.
    pub fn missing_fields<'a>(&self, fields: &'a [String]) -> Vec<&'a str> {
        fields
            .iter()
            .map(String::as_str)
            .filter(|f| !self.has_field(f))
            .collect()
    }

    /// A derived column by name.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// Any numeric field (base OHLCV or derived) as an owned series.
    pub fn field(&self, name: &str) -> Option<Vec<f64>> {
        if let Some(values) = self.columns.get(name) {
            return Some(values.clone());
        }
        match name {
            "open" | "high" | "low" | "close" | "volume" => {
                Some(self.bars.iter().filter_map(|b| b.numeric(name)).collect())
            }
            _ => None,
        }
    }

    /// Insert or replace a derived column. Returns the previous values, if any.
    pub fn insert_column(
        &mut self,
        name: impl Into<String>,
        values: Vec<f64>,
    ) -> Result<Option<Vec<f64>>, FrameError> {
        let name = name.into();
        check_column(&name, values.len(), self.bars.len())?;
        Ok(self.columns.insert(name, values))
    }

    /// Distinct symbols in row order.
    pub fn symbols(&self) -> Vec<&str> {
        self.symbol_ranges().into_iter().map(|(s, _)| s).collect()
    }

    /// Contiguous row range of each symbol.
    pub fn symbol_ranges(&self) -> Vec<(&str, Range<usize>)> {
        let n = self.bars.len();
        let mut ranges = Vec::new();
        let mut start = 0;
        for i in 1..=n {
            if i == n || self.bars[i].symbol != self.bars[start].symbol {
                ranges.push((self.bars[start].symbol.as_str(), start..i));
                start = i;
            }
        }
        ranges
    }

    /// Apply `f` to each symbol's slice of `values` and stitch the results back
    /// together in row order. Results shorter or longer than the slice are
    /// padded with NaN or truncated.
    pub fn map_per_symbol<F>(&self, values: &[f64], f: F) -> Vec<f64>
    where
        F: Fn(&[f64]) -> Vec<f64>,
    {
        let mut out = Vec::with_capacity(values.len());
        for (_, range) in self.symbol_ranges() {
            let len = range.len();
            let mut chunk = f(&values[range]);
            chunk.resize(len, f64::NAN);
            out.extend(chunk);
        }
        out
    }

    /// Keep the rows matching `keep`, carrying derived columns along.
    pub fn filter_rows<F>(&self, keep: F) -> MarketFrame
    where
        F: Fn(&Bar) -> bool,
    {
        let indices: Vec<usize> = (0..self.bars.len())
            .filter(|&i| keep(&self.bars[i]))
            .collect();
        self.take_rows(&indices)
    }

    /// The most recent row of each symbol.
    pub fn latest_per_symbol(&self) -> MarketFrame {
        let indices: Vec<usize> = self
            .symbol_ranges()
            .into_iter()
            .map(|(_, range)| range.end - 1)
            .collect();
        self.take_rows(&indices)
    }

    /// Drop rows repeating an earlier `(symbol, date)`, keeping the first.
    pub fn dedup_rows(&self) -> MarketFrame {
        let indices: Vec<usize> = (0..self.bars.len())
            .filter(|&i| {
                i == 0
                    || self.bars[i].symbol != self.bars[i - 1].symbol
                    || self.bars[i].date != self.bars[i - 1].date
            })
            .collect();
        self.take_rows(&indices)
    }

    /// Drop every derived column whose name is not in `names`.
    pub fn select_columns(mut self, names: &[String]) -> MarketFrame {
        self.columns.retain(|name, _| names.contains(name));
        self
    }

    pub fn into_parts(self) -> (Vec<Bar>, BTreeMap<String, Vec<f64>>) {
        (self.bars, self.columns)
    }

    /// Deterministic blake3 digest over every row and derived column.
    pub fn content_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for bar in &self.bars {
            hasher.update(bar.symbol.as_bytes());
            hasher.update(&[0]);
            hasher.update(bar.date.to_string().as_bytes());
            for v in [bar.open, bar.high, bar.low, bar.close, bar.volume] {
                hasher.update(&v.to_bits().to_le_bytes());
            }
        }
        for (name, values) in &self.columns {
            hasher.update(name.as_bytes());
            for v in values {
                hasher.update(&v.to_bits().to_le_bytes());
            }
        }
        hasher.finalize().to_hex().to_string()
    }

    fn take_rows(&self, indices: &[usize]) -> MarketFrame {
        let bars = indices.iter().map(|&i| self.bars[i].clone()).collect();
        let columns = self
            .columns
            .iter()
            .map(|(name, values)| (name.clone(), indices.iter().map(|&i| values[i]).collect()))
            .collect();
        MarketFrame { bars, columns }
    }
}

fn check_column(name: &str, actual: usize, expected: usize) -> Result<(), FrameError> {
    if BASE_FIELDS.contains(&name) {
        return Err(FrameError::ReservedName(name.to_string()));
    }
    if actual != expected {
        return Err(FrameError::LengthMismatch {
            name: name.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bar(symbol: &str, day: u32, close: f64) -> Bar {
        Bar {
            symbol: symbol.into(),
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1_000.0,
        }
    }

    #[test]
    fn rows_are_sorted_by_symbol_then_date() {
        let frame = MarketFrame::new(vec![
            bar("MSFT", 3, 30.0),
            bar("AAPL", 2, 20.0),
            bar("AAPL", 1, 10.0),
        ]);
        let closes = frame.field("close").unwrap();
        assert_eq!(closes, vec![10.0, 20.0, 30.0]);
        assert_eq!(frame.symbols(), vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn from_parts_permutes_columns_with_rows() {
        let mut columns = BTreeMap::new();
        columns.insert("score".to_string(), vec![3.0, 1.0]);
        let frame =
            MarketFrame::from_parts(vec![bar("B", 1, 2.0), bar("A", 1, 1.0)], columns).unwrap();
        assert_eq!(frame.column("score").unwrap(), &[1.0, 3.0]);
    }

    #[test]
    fn insert_column_rejects_wrong_length() {
        let mut frame = MarketFrame::new(vec![bar("A", 1, 1.0), bar("A", 2, 2.0)]);
        let err = frame.insert_column("x", vec![1.0]).unwrap_err();
        assert_eq!(
            err,
            FrameError::LengthMismatch {
                name: "x".into(),
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn insert_column_rejects_base_field_names() {
        let mut frame = MarketFrame::new(vec![bar("A", 1, 1.0)]);
        assert_eq!(
            frame.insert_column("close", vec![1.0]).unwrap_err(),
            FrameError::ReservedName("close".into())
        );
    }

    #[test]
    fn map_per_symbol_does_not_leak_across_symbols() {
        let frame = MarketFrame::new(vec![
            bar("A", 1, 1.0),
            bar("A", 2, 2.0),
            bar("B", 1, 10.0),
            bar("B", 2, 20.0),
        ]);
        let closes = frame.field("close").unwrap();
        // Difference from previous row, per symbol.
        let diffs = frame.map_per_symbol(&closes, |s| {
            let mut out = vec![f64::NAN];
            out.extend(s.windows(2).map(|w| w[1] - w[0]));
            out
        });
        assert!(diffs[0].is_nan());
        assert_eq!(diffs[1], 1.0);
        assert!(diffs[2].is_nan());
        assert_eq!(diffs[3], 10.0);
    }

    #[test]
    fn latest_per_symbol_keeps_last_row() {
        let mut frame = MarketFrame::new(vec![
            bar("A", 1, 1.0),
            bar("A", 2, 2.0),
            bar("B", 5, 7.0),
        ]);
        frame.insert_column("x", vec![0.1, 0.2, 0.3]).unwrap();
        let latest = frame.latest_per_symbol();
        assert_eq!(latest.field("close").unwrap(), vec![2.0, 7.0]);
        assert_eq!(latest.column("x").unwrap(), &[0.2, 0.3]);
    }

    #[test]
    fn missing_fields_reports_unknown_names() {
        let frame = MarketFrame::new(vec![bar("A", 1, 1.0)]);
        let wanted = vec!["close".to_string(), "ma_20".to_string()];
        assert_eq!(frame.missing_fields(&wanted), vec!["ma_20"]);
    }

    #[test]
    fn content_hash_is_deterministic_and_sensitive() {
        let a = MarketFrame::new(vec![bar("A", 1, 1.0)]);
        let b = MarketFrame::new(vec![bar("A", 1, 1.0)]);
        let c = MarketFrame::new(vec![bar("A", 1, 1.5)]);
        assert_eq!(a.content_hash(), b.content_hash());
        assert_ne!(a.content_hash(), c.content_hash());
    }

    #[test]
    fn dedup_keeps_first_of_each_symbol_date() {
        let frame = MarketFrame::new(vec![
            bar("A", 1, 1.0),
            bar("A", 1, 9.0),
            bar("A", 2, 2.0),
            bar("B", 2, 3.0),
        ]);
        let deduped = frame.dedup_rows();
        assert_eq!(deduped.field("close").unwrap(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn empty_frame_has_no_symbols() {
        let frame = MarketFrame::default();
        assert!(frame.is_empty());
        assert!(frame.symbol_ranges().is_empty());
    }
}
