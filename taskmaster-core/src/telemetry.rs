//! Pipeline metrics.
//!
//! Recorded through the `metrics` facade, so they cost nothing unless a
//! recorder is installed. The binary installs a Prometheus recorder on request
//! and writes the rendered text after the run.
//!
//! - `taskmaster_ticker_success_total`: tickers that produced a report
//! - `taskmaster_ticker_errors_total{kind}`: failed tickers by [`ErrorKind`]
//! - `taskmaster_ticker_latency_seconds`: per-ticker wall time, histogram
//! - `taskmaster_runs_total{mode, outcome}`: batch runs

use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

use crate::error::ErrorKind;

pub const TICKER_SUCCESS_TOTAL: &str = "taskmaster_ticker_success_total";
pub const TICKER_ERRORS_TOTAL: &str = "taskmaster_ticker_errors_total";
pub const TICKER_LATENCY_SECONDS: &str = "taskmaster_ticker_latency_seconds";
pub const RUNS_TOTAL: &str = "taskmaster_runs_total";

/// Histogram bucket bounds for ticker latency, in seconds.
pub const LATENCY_BUCKETS: [f64; 5] = [0.5, 1.0, 2.0, 5.0, 10.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Strict,
    KeepGoing,
}

impl RunMode {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::KeepGoing => "keep_going",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    Partial,
    Failed,
}

impl RunOutcome {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Partial => "partial",
            Self::Failed => "failed",
        }
    }
}

/// Prometheus builder with the latency buckets configured.
pub fn prometheus_builder() -> Result<PrometheusBuilder, BuildError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Full(TICKER_LATENCY_SECONDS.to_string()), &LATENCY_BUCKETS)
}

/// Install a process-wide Prometheus recorder and describe every metric.
///
/// Fails if a global recorder is already installed.
pub fn install_prometheus() -> Result<PrometheusHandle, BuildError> {
    let handle = prometheus_builder()?.install_recorder()?;
    describe_metrics();
    Ok(handle)
}

pub fn describe_metrics() {
    describe_counter!(TICKER_SUCCESS_TOTAL, "Tickers that produced a report");
    describe_counter!(TICKER_ERRORS_TOTAL, "Tickers that failed, by error kind");
    describe_histogram!(
        TICKER_LATENCY_SECONDS,
        Unit::Seconds,
        "Wall time to fetch, enrich and store one ticker"
    );
    describe_counter!(RUNS_TOTAL, "Batch runs by mode and outcome");
}

pub(crate) fn record_ticker_success(elapsed: Duration) {
    counter!(TICKER_SUCCESS_TOTAL).increment(1);
    histogram!(TICKER_LATENCY_SECONDS).record(elapsed.as_secs_f64());
}

pub(crate) fn record_ticker_error(kind: ErrorKind, elapsed: Duration) {
    counter!(TICKER_ERRORS_TOTAL, "kind" => kind.as_str()).increment(1);
    histogram!(TICKER_LATENCY_SECONDS).record(elapsed.as_secs_f64());
}

pub(crate) fn record_run(mode: RunMode, outcome: RunOutcome) {
    counter!(RUNS_TOTAL, "mode" => mode.as_str(), "outcome" => outcome.as_str()).increment(1);
}
