//! Signal table persistence — CSV artifacts under an output directory.
//!
//! Artifact names follow `{strategy}_{YYYYMMDDHHMMSS}.csv`. Columns are
//! `symbol, date, signal, score`, then one column per factor in the order the
//! strategy attached them.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::domain::SignalTable;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("CSV output is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Artifact file name for a strategy at a given wall-clock time.
pub fn signal_file_name(strategy: &str, at: NaiveDateTime) -> String {
    format!("{strategy}_{}.csv", at.format("%Y%m%d%H%M%S"))
}

/// Render a signal table as CSV text.
pub fn export_signals_csv(table: &SignalTable) -> Result<String, PersistError> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header = vec!["symbol", "date", "signal", "score"];
    header.extend(table.factor_names().iter().map(String::as_str));
    wtr.write_record(&header)?;

    for row in table.rows() {
        let mut record = vec![
            row.symbol.clone(),
            row.date.to_string(),
            row.signal.value().to_string(),
            format_value(row.score),
        ];
        record.extend(row.factors.iter().map(|v| format_value(*v)));
        wtr.write_record(&record)?;
    }

    let data = wtr
        .into_inner()
        .map_err(|e| PersistError::Csv(csv::Error::from(e.into_error())))?;
    Ok(String::from_utf8(data)?)
}

/// Write `table` to `dir/file_name`, creating `dir` if needed.
pub fn write_signals(
    table: &SignalTable,
    dir: &Path,
    file_name: &str,
) -> Result<PathBuf, PersistError> {
    std::fs::create_dir_all(dir).map_err(|source| PersistError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let path = dir.join(file_name);
    let csv = export_signals_csv(table)?;
    std::fs::write(&path, csv).map_err(|source| PersistError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// NaN is written as an empty cell.
fn format_value(v: f64) -> String {
    if v.is_nan() {
        String::new()
    } else {
        format!("{v:.6}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Signal, SignalRow};
    use chrono::NaiveDate;

    fn sample_table() -> SignalTable {
        let mut table = SignalTable::new(vec!["mom_20".into(), "vol_20".into()]);
        table
            .push(SignalRow {
                symbol: "AAPL".into(),
                date: NaiveDate::from_ymd_opt(2024, 5, 3).unwrap(),
                signal: Signal::Long,
                score: 1.5,
                factors: vec![3.0, f64::NAN],
            })
            .unwrap();
        table
    }

    #[test]
    fn file_name_uses_compact_timestamp() {
        let at = NaiveDate::from_ymd_opt(2024, 5, 3)
            .unwrap()
            .and_hms_opt(9, 7, 5)
            .unwrap();
        assert_eq!(signal_file_name("weekly", at), "weekly_20240503090705.csv");
    }

    #[test]
    fn csv_has_factor_columns_in_order() {
        let csv = export_signals_csv(&sample_table()).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "symbol,date,signal,score,mom_20,vol_20"
        );
        assert_eq!(lines.next().unwrap(), "AAPL,2024-05-03,1,1.500000,3.000000,");
    }

    #[test]
    fn write_creates_missing_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested/output");
        let path = write_signals(&sample_table(), &dir, "s_20240101000000.csv").unwrap();
        assert!(path.exists());
        assert_eq!(path.parent().unwrap(), dir);
    }
}
