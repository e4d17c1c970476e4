//! Pipeline runner — loads data once and drives each strategy through its stages.
//!
//! ```text
//! Init → DataLoaded → per strategy:
//!     Preprocessing → Validating → Signaling → Postprocessing → Persisted
//! → Done            (Failed reachable from any state)
//! ```
//!
//! The dataset is threaded through strategies in configuration order and
//! every strategy's `preprocess` output replaces it, so later strategies see
//! what earlier ones added, even when the earlier strategy is then skipped.
//! Each stage returns a [`StageFailure`]: `Recoverable` skips the strategy,
//! `Fatal` aborts the run.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use stockradar_core::components::{
    ComponentError, PluginError, PluginRegistry, Strategy, StrategyDescriptor,
};
use stockradar_core::data::{
    fetch_historical, run_processor, CsvDataSource, DataError, DataProcessor, DataSource,
    ProcessError,
};
use stockradar_core::domain::MarketFrame;
use stockradar_core::observability::{
    DataNode, LineageError, Metadata, Observability, Operation, OperationType, Severity,
};
use stockradar_core::persist::PersistError;

use crate::config::{ConfigError, PipelineConfig};

/// Alert source used for failures the runner reports itself.
pub const RUNNER_SOURCE: &str = "pipeline_runner";

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] DataError),
    #[error("processing error: {0}")]
    Process(#[from] ProcessError),
    #[error("plugin error: {0}")]
    Plugin(#[from] PluginError),
    #[error("strategy '{strategy}' failed while {stage}: {source}")]
    Strategy {
        strategy: String,
        stage: Stage,
        #[source]
        source: ComponentError,
    },
    #[error("failed to persist signals of '{strategy}': {source}")]
    Persist {
        strategy: String,
        #[source]
        source: PersistError,
    },
    #[error("lineage error: {0}")]
    Lineage(#[from] LineageError),
}

impl RunError {
    /// Whether an instrumented collaborator already raised an alert for this.
    pub fn already_alerted(&self) -> bool {
        matches!(self, RunError::Data(_) | RunError::Process(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RunError::Config(_) => "config",
            RunError::Data(_) => "data",
            RunError::Process(_) => "process",
            RunError::Plugin(_) => "plugin",
            RunError::Strategy { .. } => "strategy",
            RunError::Persist { .. } => "persist",
            RunError::Lineage(_) => "lineage",
        }
    }
}

/// Per-strategy stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Preprocessing,
    Validating,
    Signaling,
    Postprocessing,
    Persisted,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Preprocessing => "preprocessing",
            Stage::Validating => "validating",
            Stage::Signaling => "signaling",
            Stage::Postprocessing => "postprocessing",
            Stage::Persisted => "persisted",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunState {
    Init,
    DataLoaded,
    Strategy { name: String, stage: Stage },
    Done,
    Failed,
}

/// How a stage failed.
#[derive(Debug)]
pub enum StageFailure {
    /// Skip this strategy, continue with the next.
    Recoverable { stage: Stage, reason: String },
    /// Abort the run.
    Fatal(RunError),
}

impl From<RunError> for StageFailure {
    fn from(e: RunError) -> Self {
        StageFailure::Fatal(e)
    }
}

impl From<PluginError> for StageFailure {
    fn from(e: PluginError) -> Self {
        StageFailure::Fatal(e.into())
    }
}

impl From<LineageError> for StageFailure {
    fn from(e: LineageError) -> Self {
        StageFailure::Fatal(e.into())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StrategyStatus {
    Completed { artifact: PathBuf, signal_count: usize },
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyOutcome {
    pub name: String,
    #[serde(flatten)]
    pub status: StrategyStatus,
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub final_state: RunState,
    /// blake3 digest of the dataset after loading and processing.
    pub dataset_hash: String,
    pub dataset_rows: usize,
    pub strategies: Vec<StrategyOutcome>,
}

impl RunReport {
    pub fn completed(&self) -> impl Iterator<Item = &StrategyOutcome> {
        self.strategies
            .iter()
            .filter(|o| matches!(o.status, StrategyStatus::Completed { .. }))
    }

    pub fn skipped(&self) -> impl Iterator<Item = &StrategyOutcome> {
        self.strategies
            .iter()
            .filter(|o| matches!(o.status, StrategyStatus::Skipped { .. }))
    }
}

/// Runs one configuration end to end.
pub struct PipelineRunner<'r> {
    config: PipelineConfig,
    registry: &'r PluginRegistry,
    source: Box<dyn DataSource + 'r>,
    processor: Option<Box<dyn DataProcessor + 'r>>,
    state: RunState,
}

impl<'r> PipelineRunner<'r> {
    /// A runner reading the configured CSV file and processor.
    pub fn new(config: PipelineConfig, registry: &'r PluginRegistry) -> Self {
        let source = Box::new(CsvDataSource::new(&config.data.path));
        let processor = config.processor.as_ref().map(|p| p.build());
        Self {
            config,
            registry,
            source,
            processor,
            state: RunState::Init,
        }
    }

    /// Load and validate the configuration at `path`, then build a runner.
    ///
    /// Config errors surface here, before any observability context exists,
    /// so they are returned to the caller and never alerted.
    pub fn from_path(path: &Path, registry: &'r PluginRegistry) -> Result<Self, RunError> {
        let config = PipelineConfig::load(path)?;
        Ok(Self::new(config, registry))
    }

    /// Replace the data source.
    pub fn with_source(mut self, source: Box<dyn DataSource + 'r>) -> Self {
        self.source = source;
        self
    }

    /// Replace (or remove) the processor.
    pub fn with_processor(mut self, processor: Option<Box<dyn DataProcessor + 'r>>) -> Self {
        self.processor = processor;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Execute the pipeline, recording metrics, alerts and lineage in `obs`.
    ///
    /// Fatal errors not already alerted by the fetch or processor wrappers
    /// raise one CRITICAL alert before being returned.
    pub fn run(&mut self, obs: &mut Observability) -> Result<RunReport, RunError> {
        let started = Instant::now();
        match self.execute(obs) {
            Ok(mut report) => {
                self.transition(RunState::Done);
                report.final_state = self.state.clone();
                let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
                obs.metrics.record_latency("pipeline_run", elapsed_ms);
                tracing::info!(
                    completed = report.completed().count(),
                    skipped = report.skipped().count(),
                    elapsed_ms,
                    "pipeline finished"
                );
                Ok(report)
            }
            Err(e) => {
                let chain = error_chain(&e);
                tracing::error!(state = ?self.state, error = %chain, "pipeline failed");
                if !e.already_alerted() {
                    let mut metadata = Metadata::new();
                    metadata.insert("error_type".to_string(), json!(e.kind()));
                    metadata.insert("state".to_string(), json!(self.state));
                    obs.alerts.trigger_alert(
                        "Pipeline Failed",
                        chain,
                        Severity::Critical,
                        RUNNER_SOURCE,
                        metadata,
                    );
                }
                self.transition(RunState::Failed);
                Err(e)
            }
        }
    }

    fn execute(&mut self, obs: &mut Observability) -> Result<RunReport, RunError> {
        let request = self.config.data.fetch_request();
        let mut tracked = fetch_historical(self.source.as_ref(), &request, obs)?;
        if let Some(processor) = &self.processor {
            tracked = run_processor(processor.as_ref(), tracked, obs)?;
        }

        let dataset_hash = tracked.data.content_hash();
        let dataset_rows = tracked.data.len();
        self.transition(RunState::DataLoaded);
        tracing::info!(
            rows = dataset_rows,
            symbols = tracked.data.symbols().len(),
            hash = dataset_hash.get(..12).unwrap_or(&dataset_hash),
            "data loaded"
        );

        let descriptors = self.config.strategies.clone();
        let mut data = tracked.data;
        let mut strategies = Vec::with_capacity(descriptors.len());

        for descriptor in &descriptors {
            let name = descriptor.plugin.name.clone();
            let status = match self.run_strategy(descriptor, &mut data, &tracked.node_id, obs) {
                Ok(status) => status,
                Err(StageFailure::Recoverable { stage, reason }) => {
                    tracing::error!(strategy = %name, %stage, %reason, "strategy skipped");
                    StrategyStatus::Skipped { reason }
                }
                Err(StageFailure::Fatal(e)) => return Err(e),
            };
            strategies.push(StrategyOutcome { name, status });
        }

        Ok(RunReport {
            final_state: self.state.clone(),
            dataset_hash,
            dataset_rows,
            strategies,
        })
    }

    fn run_strategy(
        &mut self,
        descriptor: &StrategyDescriptor,
        data: &mut MarketFrame,
        input_node: &str,
        obs: &mut Observability,
    ) -> Result<StrategyStatus, StageFailure> {
        let name = descriptor.plugin.name.clone();
        let strategy = self.registry.resolve_strategy(descriptor)?;
        let started = Instant::now();
        let failed = |stage: Stage| {
            let strategy = name.clone();
            move |source: ComponentError| RunError::Strategy {
                strategy,
                stage,
                source,
            }
        };

        self.enter(&name, Stage::Preprocessing);
        *data = strategy
            .preprocess(std::mem::take(data))
            .map_err(failed(Stage::Preprocessing))?;

        self.enter(&name, Stage::Validating);
        let valid = strategy.validate(data);
        obs.metrics.record_data_quality(
            &format!("validate_{name}"),
            valid,
            &json!({ "rows": data.len(), "factors": strategy.required_factors() }),
        );
        if !valid {
            return Err(StageFailure::Recoverable {
                stage: Stage::Validating,
                reason: format!("data failed validation for strategy '{name}'"),
            });
        }

        self.enter(&name, Stage::Signaling);
        let signals = strategy
            .generate_signals(data)
            .map_err(failed(Stage::Signaling))?;

        self.enter(&name, Stage::Postprocessing);
        let signals = strategy
            .postprocess(signals)
            .map_err(failed(Stage::Postprocessing))?;

        let artifact = strategy
            .save_signals(&signals, &self.config.output.path)
            .map_err(|source| RunError::Persist {
                strategy: name.clone(),
                source,
            })?;
        self.enter(&name, Stage::Persisted);

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        obs.metrics.record_latency(&format!("strategy_{name}"), elapsed_ms);
        obs.metrics.record_data_volume(&format!("signals_{name}"), signals.len());
        record_strategy_lineage(strategy.as_ref(), input_node, &artifact, signals.len(), obs)?;

        tracing::info!(
            strategy = %name,
            signals = signals.len(),
            artifact = %artifact.display(),
            "signals saved"
        );
        Ok(StrategyStatus::Completed {
            artifact,
            signal_count: signals.len(),
        })
    }

    fn enter(&mut self, name: &str, stage: Stage) {
        self.transition(RunState::Strategy {
            name: name.to_string(),
            stage,
        });
    }

    fn transition(&mut self, next: RunState) {
        tracing::debug!(from = ?self.state, to = ?next, "state transition");
        self.state = next;
    }
}

/// `input → signals:{name}` (TRANSFORM) and `signals:{name} → file` (WRITE).
fn record_strategy_lineage(
    strategy: &dyn Strategy,
    input_node: &str,
    artifact: &Path,
    signal_count: usize,
    obs: &mut Observability,
) -> Result<(), LineageError> {
    let name = strategy.name();
    let signals_id = format!("signals:{name}");
    let file_id = format!("file:{}", artifact.display());

    obs.lineage.add_node(
        DataNode::new(&signals_id, format!("{name} signals"), "signals")
            .with_metadata("factors", strategy.required_factors().join(","))
            .with_metadata("rows", signal_count.to_string()),
    );
    obs.lineage
        .add_node(DataNode::new(&file_id, artifact.display().to_string(), "file"));

    obs.lineage.add_edge(
        input_node,
        &signals_id,
        Operation::now(OperationType::Transform, name).with_detail("stage", "generate_signals"),
    )?;
    obs.lineage.add_edge(
        &signals_id,
        &file_id,
        Operation::now(OperationType::Write, name).with_detail("format", "csv"),
    )?;
    Ok(())
}

/// `error: cause: cause...` for logs and alert messages.
pub fn error_chain(error: &dyn std::error::Error) -> String {
    let mut out = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !out.contains(&text) {
            out.push_str(": ");
            out.push_str(&text);
        }
        source = cause.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collaborator_errors_are_already_alerted() {
        let data = RunError::Data(DataError::Source("down".into()));
        assert!(data.already_alerted());
        let plugin = RunError::Plugin(PluginError::Unknown {
            kind: stockradar_core::components::PluginKind::Strategy,
            key: "x::Y".into(),
        });
        assert!(!plugin.already_alerted());
        assert_eq!(plugin.kind(), "plugin");
    }

    #[test]
    fn invalid_config_fails_before_any_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.toml");
        std::fs::write(&path, "[data]\npath = \"p.csv\"\n\n[output]\npath = \"out\"\n").unwrap();
        let registry = PluginRegistry::with_builtins();

        match PipelineRunner::from_path(&path, &registry) {
            Err(err @ RunError::Config(ConfigError::Invalid(_))) => {
                assert_eq!(err.kind(), "config");
                assert!(!err.already_alerted());
            }
            Err(other) => panic!("expected config error, got {other}"),
            Ok(_) => panic!("config without strategies should be rejected"),
        };
    }

    #[test]
    fn error_chain_skips_repeated_messages() {
        let err = RunError::Strategy {
            strategy: "s".into(),
            stage: Stage::Signaling,
            source: ComponentError::MissingField {
                component: "f".into(),
                field: "close".into(),
            },
        };
        let chain = error_chain(&err);
        assert_eq!(chain.matches("requires field 'close'").count(), 1);
        assert!(chain.starts_with("strategy 's' failed while signaling"));
    }

    #[test]
    fn run_state_serializes_with_tag() {
        let state = RunState::Strategy {
            name: "m".into(),
            stage: Stage::Validating,
        };
        assert_eq!(
            serde_json::to_value(&state).unwrap(),
            json!({"state": "strategy", "name": "m", "stage": "validating"})
        );
    }
}
