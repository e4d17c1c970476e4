//! Pipeline configuration loaded from TOML.
//!
//! Parsing is two-phase: `toml` deserialises into the typed structs below,
//! then `validate()` collects every semantic problem (empty names, inverted
//! date range, duplicate strategy names) into one `ConfigError::Invalid`.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockradar_core::components::{PluginDescriptor, StrategyDescriptor};
use stockradar_core::data::{DataProcessor, FetchRequest, MarketDataProcessor};
use stockradar_core::observability::{
    ConsoleNotifier, LogNotifier, Observability, Retention, Severity,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid configuration:\n  - {}", .0.join("\n  - "))]
    Invalid(Vec<String>),
}

/// Top-level run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub data: DataConfig,
    #[serde(default)]
    pub processor: Option<ProcessorConfig>,
    #[serde(default)]
    pub strategies: Vec<StrategyDescriptor>,
    pub output: OutputConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Where market data comes from and which slice of it to load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    /// CSV file with `symbol,date,open,high,low,close,volume`.
    pub path: PathBuf,
    /// Empty means every symbol in the file.
    #[serde(default)]
    pub symbols: Vec<String>,
    /// Inclusive, `"YYYY-MM-DD"`.
    #[serde(default)]
    pub start: Option<NaiveDate>,
    #[serde(default)]
    pub end: Option<NaiveDate>,
    /// Extra columns to keep; all of them when absent.
    #[serde(default)]
    pub fields: Option<Vec<String>>,
}

impl DataConfig {
    pub fn fetch_request(&self) -> FetchRequest {
        FetchRequest {
            symbols: self.symbols.clone(),
            start: self.start,
            end: self.end,
            fields: self.fields.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessorKind {
    MarketData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorConfig {
    pub kind: ProcessorKind,
}

impl ProcessorConfig {
    pub fn build(&self) -> Box<dyn DataProcessor> {
        match self.kind {
            ProcessorKind::MarketData => Box::new(MarketDataProcessor::new()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory signal artifacts are written to; created if missing.
    pub path: PathBuf,
}

/// Retention and notifier settings for the run's observability context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default)]
    pub max_metrics: Option<usize>,
    #[serde(default)]
    pub max_alerts: Option<usize>,
    /// Print alerts to stdout.
    #[serde(default)]
    pub console_alerts: bool,
    /// Forward alerts at or above this severity to the log; `"off"` disables.
    #[serde(default = "default_log_alerts", with = "log_alerts_setting")]
    pub log_alerts: Option<Severity>,
}

/// `log_alerts` is a severity name or `"off"`, case-insensitive.
mod log_alerts_setting {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use stockradar_core::observability::Severity;

    const OFF: &str = "off";

    pub fn serialize<S: Serializer>(value: &Option<Severity>, ser: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(severity) => severity.serialize(ser),
            None => ser.serialize_str(OFF),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Option<Severity>, D::Error> {
        let raw = String::deserialize(de)?;
        if raw.eq_ignore_ascii_case(OFF) {
            return Ok(None);
        }
        serde_json::from_value(serde_json::Value::String(raw.to_ascii_uppercase()))
            .map(Some)
            .map_err(|_| {
                D::Error::custom(format!(
                    "unknown log_alerts '{raw}', expected off, info, warning, error or critical"
                ))
            })
    }
}

fn default_log_alerts() -> Option<Severity> {
    Some(Severity::Warning)
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            max_metrics: None,
            max_alerts: None,
            console_alerts: false,
            log_alerts: default_log_alerts(),
        }
    }
}

impl ObservabilityConfig {
    /// A fresh per-run context with the configured retention and notifiers.
    pub fn build(&self) -> Observability {
        let retention =
            |limit: Option<usize>| limit.map_or(Retention::Unbounded, Retention::KeepLast);
        let mut obs = Observability::with_retention(
            retention(self.max_metrics),
            retention(self.max_alerts),
        );
        if let Some(min_severity) = self.log_alerts {
            obs.alerts
                .add_notifier(Box::new(LogNotifier { min_severity }));
        }
        if self.console_alerts {
            obs.alerts.add_notifier(Box::new(ConsoleNotifier));
        }
        obs
    }
}

impl PipelineConfig {
    /// Parse and validate a TOML document. `origin` is only used in errors.
    pub fn from_toml(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: PipelineConfig = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content, path)
    }

    /// Check semantic constraints serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.data.path.as_os_str().is_empty() {
            errors.push("data.path must not be empty".to_string());
        }
        if let (Some(start), Some(end)) = (self.data.start, self.data.end) {
            if start > end {
                errors.push(format!("data.start {start} is after data.end {end}"));
            }
        }
        if self.data.symbols.iter().any(|s| s.trim().is_empty()) {
            errors.push("data.symbols contains an empty symbol".to_string());
        }
        if self.output.path.as_os_str().is_empty() {
            errors.push("output.path must not be empty".to_string());
        }
        if self.strategies.is_empty() {
            errors.push("at least one [[strategies]] entry is required".to_string());
        }
        if self.observability.max_metrics == Some(0) {
            errors.push("observability.max_metrics must be > 0".to_string());
        }
        if self.observability.max_alerts == Some(0) {
            errors.push("observability.max_alerts must be > 0".to_string());
        }

        let mut names = BTreeSet::new();
        for (i, strategy) in self.strategies.iter().enumerate() {
            let context = format!("strategies[{i}]");
            check_descriptor(&strategy.plugin, &context, &mut errors);
            if !names.insert(strategy.plugin.name.as_str()) {
                errors.push(format!(
                    "{context}: duplicate strategy name '{}'",
                    strategy.plugin.name
                ));
            }
            for (j, factor) in strategy.factors.iter().enumerate() {
                check_descriptor(factor, &format!("{context}.factors[{j}]"), &mut errors);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }
}

fn check_descriptor(descriptor: &PluginDescriptor, context: &str, errors: &mut Vec<String>) {
    for (field, value) in [
        ("module", &descriptor.module_path),
        ("class", &descriptor.class_name),
        ("name", &descriptor.name),
    ] {
        if value.trim().is_empty() {
            errors.push(format!("{context}: {field} must not be empty"));
        }
    }
    // Strategy names become artifact file names.
    if descriptor.name.contains(['/', '\\']) {
        errors.push(format!(
            "{context}: name '{}' must not contain path separators",
            descriptor.name
        ));
    }
}
