//! TaskMaster Core: instruction parsing, market data, SMA enrichment,
//! SQLite persistence and reporting.
//!
//! - Instruction parser (ticker candidates from free text)
//! - Market data providers behind the `MarketDataProvider` trait
//! - Series normalizer (dialect-specific raw records → ascending `PriceBar`s)
//! - 20-day simple moving average
//! - Upsert store keyed by (date, ticker)
//! - Pipeline orchestrator with strict and keep-going batch modes
//! - Per-ticker counters and latency histogram via `metrics`

pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod indicators;
pub mod instruction;
pub mod pipeline;
pub mod report;
pub mod store;
pub mod telemetry;

pub use config::{ConfigError, PipelineConfig};
pub use domain::PriceBar;
pub use error::{ErrorKind, PipelineError};
pub use pipeline::{BatchReport, Pipeline, TickerFailure};
pub use report::TickerReport;
