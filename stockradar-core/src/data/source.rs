//! DataSource trait and structured data errors.
//!
//! The trait abstracts over where market tables come from (local CSV, a
//! remote API, a fixture in tests) so the runner never depends on a concrete
//! source.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::MarketFrame;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("{path} is missing required columns: {}", columns.join(", "))]
    MissingColumns { path: PathBuf, columns: Vec<String> },

    #[error("row {line}: {reason}")]
    InvalidRow { line: u64, reason: String },

    #[error("invalid date range: start {start} is after end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("no data for symbols [{}] in the requested range", symbols.join(", "))]
    NoData { symbols: Vec<String> },

    #[error("data source error: {0}")]
    Source(String),
}

impl DataError {
    /// Short machine-readable name of the failure, used as alert metadata.
    pub fn kind(&self) -> &'static str {
        match self {
            DataError::Io { .. } => "io",
            DataError::Csv(_) => "csv",
            DataError::MissingColumns { .. } => "missing_columns",
            DataError::InvalidRow { .. } => "invalid_row",
            DataError::InvalidRange { .. } => "invalid_range",
            DataError::NoData { .. } => "no_data",
            DataError::Source(_) => "source",
        }
    }
}

/// Provider of market tables with `symbol, date, open, high, low, close,
/// volume` plus any extra numeric columns the source carries.
///
/// An empty `symbols` slice means every symbol the source knows. `fields`
/// restricts the extra columns returned; the base fields are always present.
pub trait DataSource {
    /// Name used in metric labels, alert titles and lineage ids.
    fn name(&self) -> &str;

    /// Lineage node type of this source.
    fn node_type(&self) -> &str {
        "api"
    }

    /// Extra metadata attached to this source's lineage node.
    fn lineage_metadata(&self) -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    fn get_historical_data(
        &self,
        symbols: &[String],
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        fields: Option<&[String]>,
    ) -> Result<MarketFrame, DataError>;

    /// Most recent row of each requested symbol.
    fn get_latest_data(
        &self,
        symbols: &[String],
        fields: Option<&[String]>,
    ) -> Result<MarketFrame, DataError> {
        Ok(self
            .get_historical_data(symbols, None, None, fields)?
            .latest_per_symbol())
    }

    /// The subset of `symbols` this source can serve, in input order.
    fn validate_symbols(&self, symbols: &[String]) -> Result<Vec<String>, DataError>;
}
