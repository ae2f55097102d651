//! TaskMaster CLI: run one free-text instruction through the pipeline.
//!
//! ```text
//! taskmaster "fetch AAPL and MSFT"
//! taskmaster --keep-going "fetch AAPL ZZZZZ"
//! ```
//!
//! Reports go to stdout as indented JSON. Diagnostics and logs go to stderr.
//! With `--metrics-file`, the run's Prometheus metrics are written to a file.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use taskmaster_core::data::MarketDataProvider;
use taskmaster_core::telemetry;
use taskmaster_core::{Pipeline, PipelineConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "taskmaster",
    about = "TaskMaster: fetch daily prices, add a 20-day SMA, store and report"
)]
struct Cli {
    /// Free-text instruction naming one or more upper-case ticker symbols.
    instruction: String,

    /// Process every ticker and report failures alongside successes.
    #[arg(long, default_value_t = false)]
    keep_going: bool,

    /// TOML config file. Environment variables still override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write Prometheus metrics for this run to FILE (textfile collector format).
    #[arg(long, value_name = "FILE")]
    metrics_file: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            // Usage errors exit 1 rather than clap's default 2.
            let _ = e.print();
            return ExitCode::FAILURE;
        }
        Err(e) => e.exit(),
    };

    // A missing .env file is normal.
    let _ = dotenvy::dotenv();
    init_tracing();

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let config = load_config(cli)?;
    tracing::debug!(?config, "configuration loaded");

    let metrics = match &cli.metrics_file {
        Some(path) => Some((path, telemetry::install_prometheus()?)),
        None => None,
    };

    let pipeline = Pipeline::new(config.clone(), build_provider(&config)?);
    let outcome = execute(cli, &pipeline);

    // Written on failure too, so error counters are not lost.
    if let Some((path, handle)) = metrics {
        std::fs::write(path, handle.render())
            .with_context(|| format!("failed to write metrics to {}", path.display()))?;
    }

    outcome
}

fn execute<P: MarketDataProvider>(cli: &Cli, pipeline: &Pipeline<P>) -> Result<ExitCode> {
    if cli.keep_going {
        let batch = pipeline.run_each(&cli.instruction)?;
        println!("{}", serde_json::to_string_pretty(&batch)?);
        return Ok(if batch.is_complete() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }

    let reports = pipeline.run(&cli.instruction)?;
    println!("{}", serde_json::to_string_pretty(&reports)?);
    Ok(ExitCode::SUCCESS)
}

/// Defaults, then the optional TOML file, then the process environment.
fn load_config(cli: &Cli) -> Result<PipelineConfig> {
    let base = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };
    Ok(base.with_env(|key| std::env::var(key).ok())?)
}

#[cfg(feature = "yahoo")]
fn build_provider(_config: &PipelineConfig) -> Result<taskmaster_core::data::YahooChartProvider> {
    Ok(taskmaster_core::data::YahooChartProvider::new()?)
}

#[cfg(not(feature = "yahoo"))]
fn build_provider(config: &PipelineConfig) -> Result<taskmaster_core::data::AlphaVantageProvider> {
    use taskmaster_core::config::API_KEY_VAR;

    let Some(api_key) = config.api_key.as_deref() else {
        anyhow::bail!("{API_KEY_VAR} is not set");
    };
    Ok(taskmaster_core::data::AlphaVantageProvider::new(api_key)?)
}
