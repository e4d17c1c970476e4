//! StockRadar CLI — run a signal pipeline and inspect the plugin registry.
//!
//! Commands:
//! - `run` — execute every configured strategy against one data load
//! - `plugins` — list the `module::class` keys the registry can resolve

mod logging;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use stockradar_core::components::PluginRegistry;
use stockradar_core::observability::Observability;
use stockradar_runner::{PipelineConfig, PipelineRunner, RunReport, StrategyStatus};

#[derive(Parser)]
#[command(
    name = "stockradar",
    about = "StockRadar CLI — pluggable factor and strategy signal pipeline"
)]
struct Cli {
    /// Log level when RUST_LOG is unset (error, warn, info, debug, trace).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline described by a TOML config file.
    Run {
        /// Path to the TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// As-of date (YYYY-MM-DD). Logged with the run.
        #[arg(long)]
        date: Option<String>,

        /// Write collected metrics, alerts and lineage to this JSON file.
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// List registered factor and strategy keys.
    Plugins,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    match cli.command {
        Commands::Run {
            config,
            date,
            export,
        } => run_pipeline(&config, date.as_deref(), export.as_deref()),
        Commands::Plugins => {
            list_plugins(&PluginRegistry::with_builtins());
            Ok(())
        }
    }
}

fn run_pipeline(config_path: &Path, date: Option<&str>, export: Option<&Path>) -> Result<()> {
    let as_of = date.map(parse_date).transpose()?;
    let config = PipelineConfig::load(config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;
    tracing::info!(
        config = %config_path.display(),
        as_of = ?as_of,
        strategies = config.strategies.len(),
        "starting pipeline"
    );

    let registry = PluginRegistry::with_builtins();
    let mut obs = config.observability.build();
    let mut runner = PipelineRunner::new(config, &registry);
    let result = runner.run(&mut obs);

    // Exported on failure too; the alerts explain what went wrong.
    if let Some(path) = export {
        write_export(&obs, path)?;
    }

    let report = result.context("pipeline run failed")?;
    print_summary(&report);
    Ok(())
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{s}', expected YYYY-MM-DD"))
}

fn write_export(obs: &Observability, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(&obs.export())
        .context("serializing observability export")?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    tracing::info!(path = %path.display(), "observability export written");
    Ok(())
}

fn list_plugins(registry: &PluginRegistry) {
    println!("Factors:");
    for key in registry.factor_keys() {
        println!("  {key}");
    }
    println!("Strategies:");
    for key in registry.strategy_keys() {
        println!("  {key}");
    }
}

fn print_summary(report: &RunReport) {
    println!();
    println!("=== Pipeline Result ===");
    println!("Rows:           {}", report.dataset_rows);
    println!("Dataset hash:   {}", &report.dataset_hash[..16]);
    println!();
    println!("{:<24} {:<10} Detail", "Strategy", "Status");
    println!("{}", "-".repeat(60));
    for outcome in &report.strategies {
        match &outcome.status {
            StrategyStatus::Completed {
                artifact,
                signal_count,
            } => println!(
                "{:<24} {:<10} {signal_count} signals -> {}",
                outcome.name,
                "completed",
                artifact.display()
            ),
            StrategyStatus::Skipped { reason } => {
                println!("{:<24} {:<10} {reason}", outcome.name, "skipped")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_accepts_date_and_export() {
        let cli = Cli::try_parse_from([
            "stockradar",
            "run",
            "--config",
            "pipeline.toml",
            "--date",
            "2024-03-01",
            "--export",
            "obs.json",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(cli.log_level, "debug");
        match cli.command {
            Commands::Run {
                config,
                date,
                export,
            } => {
                assert_eq!(config, PathBuf::from("pipeline.toml"));
                assert_eq!(date.as_deref(), Some("2024-03-01"));
                assert_eq!(export, Some(PathBuf::from("obs.json")));
            }
            Commands::Plugins => panic!("expected run"),
        }
    }

    #[test]
    fn run_requires_config() {
        assert!(Cli::try_parse_from(["stockradar", "run"]).is_err());
    }

    #[test]
    fn bad_date_is_rejected() {
        assert!(parse_date("2024-13-01").is_err());
        assert_eq!(
            parse_date("2024-02-29").unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
    }

    #[test]
    fn export_writes_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("obs.json");
        let mut obs = Observability::new();
        obs.metrics.record_data_volume("csv", 3);

        write_export(&obs, &path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["metrics"].as_array().unwrap().len(), 1);
        assert!(value["lineage"]["nodes"].as_array().unwrap().is_empty());
    }
}
