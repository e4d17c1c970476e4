//! StockRadar Runner — configuration and pipeline orchestration.
//!
//! This crate builds on `stockradar-core` to provide:
//! - TOML pipeline configuration with semantic validation
//! - The staged runner: load data once, then preprocess, validate, generate,
//!   postprocess and persist each configured strategy in order
//! - Run reports with per-strategy outcomes

pub mod config;
pub mod runner;

pub use config::{
    ConfigError, DataConfig, ObservabilityConfig, OutputConfig, PipelineConfig, ProcessorConfig,
    ProcessorKind,
};
pub use runner::{
    error_chain, PipelineRunner, RunError, RunReport, RunState, Stage, StageFailure,
    StrategyOutcome, StrategyStatus, RUNNER_SOURCE,
};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn config_and_report_are_send_sync() {
        assert_send::<PipelineConfig>();
        assert_sync::<PipelineConfig>();
        assert_send::<RunReport>();
        assert_sync::<RunReport>();
    }

    #[test]
    fn run_error_is_send_sync() {
        assert_send::<RunError>();
        assert_sync::<RunError>();
    }
}
