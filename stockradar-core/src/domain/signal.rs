//! Signal table — what a strategy emits and what gets persisted.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::FrameError;

/// Directional trading signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Signal {
    Short,
    Flat,
    Long,
}

impl Signal {
    /// Numeric encoding written to artifacts: -1, 0, 1.
    pub fn value(self) -> i8 {
        match self {
            Signal::Short => -1,
            Signal::Flat => 0,
            Signal::Long => 1,
        }
    }

    /// Classify a score against a pair of thresholds.
    ///
    /// Strictly above `long_above` is Long, strictly below `short_below` is
    /// Short, anything else (including NaN) is Flat.
    pub fn from_score(score: f64, long_above: f64, short_below: f64) -> Self {
        if score > long_above {
            Signal::Long
        } else if score < short_below {
            Signal::Short
        } else {
            Signal::Flat
        }
    }
}

/// One signal row. `factors` is aligned with the table's `factor_names`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRow {
    pub symbol: String,
    pub date: NaiveDate,
    pub signal: Signal,
    pub score: f64,
    pub factors: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalTable {
    factor_names: Vec<String>,
    rows: Vec<SignalRow>,
}

impl SignalTable {
    pub fn new(factor_names: Vec<String>) -> Self {
        Self {
            factor_names,
            rows: Vec::new(),
        }
    }

    /// Append a row; its factor values must line up with `factor_names`.
    pub fn push(&mut self, row: SignalRow) -> Result<(), FrameError> {
        if row.factors.len() != self.factor_names.len() {
            return Err(FrameError::LengthMismatch {
                name: format!("factors of {} {}", row.symbol, row.date),
                expected: self.factor_names.len(),
                actual: row.factors.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn factor_names(&self) -> &[String] {
        &self.factor_names
    }

    pub fn rows(&self) -> &[SignalRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn count(&self, signal: Signal) -> usize {
        self.rows.iter().filter(|r| r.signal == signal).count()
    }

    /// Keep only the last row of each symbol (rows are in symbol/date order).
    pub fn latest_per_symbol(mut self) -> Self {
        let mut kept: Vec<SignalRow> = Vec::new();
        for row in self.rows.drain(..) {
            match kept.last_mut() {
                Some(last) if last.symbol == row.symbol => *last = row,
                _ => kept.push(row),
            }
        }
        self.rows = kept;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(symbol: &str, day: u32, signal: Signal) -> SignalRow {
        SignalRow {
            symbol: symbol.into(),
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            signal,
            score: 0.0,
            factors: vec![1.0],
        }
    }

    #[test]
    fn signal_from_score_uses_strict_thresholds() {
        assert_eq!(Signal::from_score(2.1, 2.0, -2.0), Signal::Long);
        assert_eq!(Signal::from_score(2.0, 2.0, -2.0), Signal::Flat);
        assert_eq!(Signal::from_score(-2.5, 2.0, -2.0), Signal::Short);
        assert_eq!(Signal::from_score(f64::NAN, 2.0, -2.0), Signal::Flat);
    }

    #[test]
    fn push_rejects_misaligned_factor_values() {
        let mut table = SignalTable::new(vec!["a".into(), "b".into()]);
        assert!(table.push(row("X", 1, Signal::Long)).is_err());
        assert!(table.is_empty());
    }

    #[test]
    fn latest_per_symbol_keeps_last_row_of_each_symbol() {
        let mut table = SignalTable::new(vec!["f".into()]);
        table.push(row("A", 1, Signal::Short)).unwrap();
        table.push(row("A", 2, Signal::Long)).unwrap();
        table.push(row("B", 1, Signal::Flat)).unwrap();

        let latest = table.latest_per_symbol();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest.rows()[0].signal, Signal::Long);
        assert_eq!(latest.rows()[1].symbol, "B");
        assert_eq!(latest.count(Signal::Long), 1);
    }
}
