//! Local CSV data source.
//!
//! Expects a header row containing (case-insensitively) `symbol, date, open,
//! high, low, close, volume`; any other column is read as an extra numeric
//! field. Numeric cells that do not parse become NaN. Dates are `YYYY-MM-DD`.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use super::{DataError, DataSource};
use crate::domain::{Bar, MarketFrame, BASE_FIELDS};

#[derive(Debug, Clone)]
pub struct CsvDataSource {
    name: String,
    path: PathBuf,
}

impl CsvDataSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            name: "csv".to_string(),
            path: path.into(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and normalise the whole file.
    fn load(&self) -> Result<MarketFrame, DataError> {
        let file = File::open(&self.path).map_err(|source| DataError::Io {
            path: self.path.clone(),
            source,
        })?;
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(BufReader::new(file));

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.to_ascii_lowercase())
            .collect();
        let position = |name: &str| headers.iter().position(|h| h == name);

        let missing: Vec<String> = BASE_FIELDS
            .iter()
            .filter(|f| position(f).is_none())
            .map(|f| f.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(DataError::MissingColumns {
                path: self.path.clone(),
                columns: missing,
            });
        }
        let base: Vec<usize> = BASE_FIELDS.iter().filter_map(|f| position(f)).collect();
        let extras: Vec<(usize, &String)> = headers
            .iter()
            .enumerate()
            .filter(|(_, h)| !BASE_FIELDS.contains(&h.as_str()))
            .collect();

        let mut bars = Vec::new();
        let mut columns: BTreeMap<String, Vec<f64>> = extras
            .iter()
            .map(|(_, name)| ((*name).clone(), Vec::new()))
            .collect();

        for record in reader.records() {
            let record = record?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            let cell = |i: usize| record.get(i).unwrap_or("");

            let symbol = cell(base[0]);
            if symbol.is_empty() {
                return Err(DataError::InvalidRow {
                    line,
                    reason: "empty symbol".to_string(),
                });
            }
            let date = NaiveDate::parse_from_str(cell(base[1]), "%Y-%m-%d").map_err(|e| {
                DataError::InvalidRow {
                    line,
                    reason: format!("bad date '{}': {e}", cell(base[1])),
                }
            })?;

            bars.push(Bar {
                symbol: symbol.to_string(),
                date,
                open: parse_number(cell(base[2])),
                high: parse_number(cell(base[3])),
                low: parse_number(cell(base[4])),
                close: parse_number(cell(base[5])),
                volume: parse_number(cell(base[6])),
            });
            for (i, name) in &extras {
                if let Some(values) = columns.get_mut(name.as_str()) {
                    values.push(parse_number(cell(*i)));
                }
            }
        }

        let gaps = bars.iter().filter(|b| b.has_gaps()).count();
        if gaps > 0 {
            tracing::warn!(
                path = %self.path.display(),
                rows = gaps,
                "rows with missing OHLCV values"
            );
        }
        MarketFrame::from_parts(bars, columns).map_err(|e| DataError::Source(e.to_string()))
    }
}

fn parse_number(raw: &str) -> f64 {
    raw.parse::<f64>().unwrap_or(f64::NAN)
}

impl DataSource for CsvDataSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn node_type(&self) -> &str {
        "file"
    }

    fn lineage_metadata(&self) -> BTreeMap<String, String> {
        let mut metadata = BTreeMap::new();
        metadata.insert("path".to_string(), self.path.display().to_string());
        metadata
    }

    fn get_historical_data(
        &self,
        symbols: &[String],
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        fields: Option<&[String]>,
    ) -> Result<MarketFrame, DataError> {
        let start = start.unwrap_or(NaiveDate::MIN);
        let end = end.unwrap_or(NaiveDate::MAX);
        if start > end {
            return Err(DataError::InvalidRange { start, end });
        }

        let frame = self.load()?.filter_rows(|bar| {
            (symbols.is_empty() || symbols.contains(&bar.symbol))
                && bar.date >= start
                && bar.date <= end
        });
        if frame.is_empty() {
            return Err(DataError::NoData {
                symbols: symbols.to_vec(),
            });
        }
        tracing::debug!(
            source = %self.name,
            rows = frame.len(),
            symbols = frame.symbols().len(),
            "csv data loaded"
        );

        Ok(match fields {
            Some(fields) => frame.select_columns(fields),
            None => frame,
        })
    }

    fn validate_symbols(&self, symbols: &[String]) -> Result<Vec<String>, DataError> {
        let frame = self.load()?;
        let known: BTreeSet<&str> = frame.symbols().into_iter().collect();
        Ok(symbols
            .iter()
            .filter(|s| known.contains(s.as_str()))
            .cloned()
            .collect())
    }
}
