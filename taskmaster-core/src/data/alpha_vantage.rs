//! Alpha Vantage data provider.
//!
//! Fetches daily OHLC bars from the `TIME_SERIES_DAILY` endpoint. Alpha Vantage
//! reports most failures (unknown symbol, bad key, throttling) as HTTP 200 with
//! a diagnostic key in the body, so the body is inspected before the series.

use super::provider::{DataError, FieldDialect, MarketDataProvider, RawRecord, RawSeries};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co/query";

/// Number of trading days in a `compact` response.
const COMPACT_SIZE: usize = 100;

const SERIES_KEY: &str = "Time Series (Daily)";

/// Body keys Alpha Vantage uses for error payloads.
const DIAGNOSTIC_KEYS: [&str; 3] = ["Error Message", "Information", "Note"];

/// Alpha Vantage data provider.
pub struct AlphaVantageProvider {
    client: reqwest::blocking::Client,
    api_key: String,
    base_url: String,
}

impl AlphaVantageProvider {
    pub fn new(api_key: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("taskmaster/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Point the provider at a different endpoint (mirrors, local stubs).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn output_size(lookback: usize) -> &'static str {
        if lookback <= COMPACT_SIZE {
            "compact"
        } else {
            "full"
        }
    }

    /// Turn a decoded response body into a raw series of at most `lookback`
    /// records, most recent first.
    fn parse_response(
        ticker: &str,
        mut body: Map<String, Value>,
        lookback: usize,
    ) -> Result<RawSeries, DataError> {
        for key in DIAGNOSTIC_KEYS {
            if let Some(diagnostic) = body.get(key) {
                let text = diagnostic
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| diagnostic.to_string());
                return Err(DataError::unavailable(ticker, text));
            }
        }

        let series = match body.remove(SERIES_KEY) {
            Some(Value::Object(series)) => series,
            Some(other) => {
                return Err(DataError::malformed(
                    ticker,
                    format!("'{SERIES_KEY}' is not an object: {other}"),
                ))
            }
            None => {
                return Err(DataError::unavailable(
                    ticker,
                    format!("response has no '{SERIES_KEY}'"),
                ))
            }
        };

        let mut records = Vec::with_capacity(series.len());
        for (date, value) in series {
            match value {
                Value::Object(fields) => records.push(RawRecord::new(date, fields)),
                other => {
                    return Err(DataError::malformed(
                        ticker,
                        format!("record for {date} is not an object: {other}"),
                    ))
                }
            }
        }

        if records.is_empty() {
            return Err(DataError::unavailable(ticker, "empty time series"));
        }

        // ISO dates sort lexically; keep the most recent `lookback` days.
        records.sort_by(|a, b| b.date.cmp(&a.date));
        records.truncate(lookback);

        Ok(RawSeries {
            ticker: ticker.to_string(),
            dialect: FieldDialect::AlphaVantage,
            records,
        })
    }
}

impl MarketDataProvider for AlphaVantageProvider {
    fn name(&self) -> &str {
        "alpha_vantage"
    }

    fn fetch(&self, ticker: &str, lookback: usize) -> Result<RawSeries, DataError> {
        let output_size = Self::output_size(lookback);
        debug!(ticker, output_size, url = %self.base_url, "requesting daily series");

        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("function", "TIME_SERIES_DAILY"),
                ("symbol", ticker),
                ("outputsize", output_size),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            // The request URL carries the API key.
            .map_err(|e| DataError::unavailable(ticker, e.without_url().to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DataError::unavailable(ticker, format!("HTTP {status}")));
        }

        let body: Map<String, Value> = resp.json().map_err(|e| {
            DataError::malformed(ticker, format!("failed to decode response: {}", e.without_url()))
        })?;

        Self::parse_response(ticker, body, lookback)
    }
}
