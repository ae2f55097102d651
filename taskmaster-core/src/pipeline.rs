//! Pipeline orchestrator: instruction → per-ticker fetch, normalize, SMA,
//! persist, report.
//!
//! Two batch modes:
//! - [`Pipeline::run`]: all-or-nothing. The first failing ticker stops the
//!   batch and its error is returned. Tickers finished before it stay persisted.
//! - [`Pipeline::run_each`]: every ticker is attempted and the outcome of each
//!   is collected into a [`BatchReport`].

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::data::{normalize, MarketDataProvider};
use crate::domain::PriceBar;
use crate::error::{ErrorKind, PipelineError};
use crate::indicators::Sma;
use crate::instruction::extract_tickers;
use crate::report::{select_latest, TickerReport};
use crate::store::{PriceStore, StoreError};
use crate::telemetry::{self, RunMode, RunOutcome};

/// One ticker that did not produce a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerFailure {
    pub ticker: String,
    pub kind: ErrorKind,
    pub message: String,
}

/// Per-ticker outcomes of [`Pipeline::run_each`], in instruction order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub succeeded: Vec<TickerReport>,
    pub failed: Vec<TickerFailure>,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct Pipeline<P: MarketDataProvider> {
    config: PipelineConfig,
    provider: P,
    sma: Sma,
}

impl<P: MarketDataProvider> Pipeline<P> {
    pub fn new(config: PipelineConfig, provider: P) -> Self {
        Self {
            config,
            provider,
            sma: Sma::default(),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Strict run: the reports of every ticker, or the first failure.
    pub fn run(&self, instruction: &str) -> Result<Vec<TickerReport>, PipelineError> {
        let result = self.run_strict(instruction);
        let outcome = if result.is_ok() {
            RunOutcome::Success
        } else {
            RunOutcome::Failed
        };
        telemetry::record_run(RunMode::Strict, outcome);
        result
    }

    fn run_strict(&self, instruction: &str) -> Result<Vec<TickerReport>, PipelineError> {
        let tickers = tickers_in(instruction)?;
        let mut reports = Vec::with_capacity(tickers.len());

        for ticker in &tickers {
            match self.process_ticker(ticker) {
                Ok(report) => reports.push(report),
                Err(e) => {
                    warn!(ticker = %ticker, kind = %e.kind(), error = %e, "ticker failed, aborting batch");
                    return Err(e);
                }
            }
        }

        Ok(reports)
    }

    /// Keep-going run: each ticker is processed regardless of earlier failures.
    ///
    /// Only an instruction without any ticker candidates fails outright.
    pub fn run_each(&self, instruction: &str) -> Result<BatchReport, PipelineError> {
        let tickers = tickers_in(instruction).inspect_err(|_| {
            telemetry::record_run(RunMode::KeepGoing, RunOutcome::Failed);
        })?;
        let mut batch = BatchReport::default();

        for ticker in &tickers {
            match self.process_ticker(ticker) {
                Ok(report) => batch.succeeded.push(report),
                Err(e) => {
                    warn!(ticker = %ticker, kind = %e.kind(), error = %e, "ticker failed");
                    batch.failed.push(TickerFailure {
                        ticker: ticker.clone(),
                        kind: e.kind(),
                        message: e.to_string(),
                    });
                }
            }
        }

        info!(
            succeeded = batch.succeeded.len(),
            failed = batch.failed.len(),
            "batch complete"
        );
        let outcome = match (batch.succeeded.is_empty(), batch.failed.is_empty()) {
            (_, true) => RunOutcome::Success,
            (true, false) => RunOutcome::Failed,
            (false, false) => RunOutcome::Partial,
        };
        telemetry::record_run(RunMode::KeepGoing, outcome);
        Ok(batch)
    }

    /// Fetch → normalize → SMA → persist → select latest, for one ticker.
    pub fn process_ticker(&self, ticker: &str) -> Result<TickerReport, PipelineError> {
        let started = Instant::now();
        let result = self.enrich_and_store(ticker, started);
        match &result {
            Ok(_) => telemetry::record_ticker_success(started.elapsed()),
            Err(e) => telemetry::record_ticker_error(e.kind(), started.elapsed()),
        }
        result
    }

    fn enrich_and_store(&self, ticker: &str, started: Instant) -> Result<TickerReport, PipelineError> {
        let raw = self.provider.fetch(ticker, self.config.lookback)?;
        let fetched = raw.records.len();

        let mut bars = normalize(raw)?;
        self.sma.apply(&mut bars);
        bars.retain(|bar| bar.has_sma());
        info!(
            ticker,
            provider = self.provider.name(),
            fetched,
            enriched = bars.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "series prepared"
        );

        let report = select_latest(ticker, &bars)?;

        let written = self.persist(ticker, &bars)?;
        info!(
            ticker,
            rows = written,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "ticker stored"
        );

        Ok(report)
    }

    // The connection lives only for this batch and is closed when `store` drops.
    fn persist(&self, ticker: &str, bars: &[PriceBar]) -> Result<usize, PipelineError> {
        let store_err = |source: StoreError| PipelineError::Store {
            ticker: ticker.to_string(),
            source,
        };

        let mut store = PriceStore::open(&self.config.db_path).map_err(store_err)?;
        store.ensure_schema().map_err(store_err)?;
        store.upsert_batch(bars).map_err(store_err)
    }
}

fn tickers_in(instruction: &str) -> Result<Vec<String>, PipelineError> {
    let tickers = extract_tickers(instruction);
    if tickers.is_empty() {
        return Err(PipelineError::NoTickers);
    }
    info!(count = tickers.len(), tickers = ?tickers, "parsed instruction");
    Ok(tickers)
}
