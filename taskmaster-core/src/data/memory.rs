//! In-memory provider backed by pre-built raw series.
//!
//! Used by tests and offline runs. Every fetch is recorded so callers can
//! check which tickers the pipeline actually asked for.

use super::provider::{DataError, FieldDialect, MarketDataProvider, RawRecord, RawSeries};
use chrono::NaiveDate;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct InMemoryProvider {
    series: HashMap<String, RawSeries>,
    fetched: Mutex<Vec<String>>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a series under its own ticker, replacing any previous one.
    pub fn with_series(mut self, series: RawSeries) -> Self {
        self.insert(series);
        self
    }

    pub fn insert(&mut self, series: RawSeries) {
        self.series.insert(series.ticker.clone(), series);
    }

    /// Tickers passed to `fetch`, in call order.
    pub fn fetched(&self) -> Vec<String> {
        self.fetched
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

impl MarketDataProvider for InMemoryProvider {
    fn name(&self) -> &str {
        "in_memory"
    }

    fn fetch(&self, ticker: &str, _lookback: usize) -> Result<RawSeries, DataError> {
        if let Ok(mut calls) = self.fetched.lock() {
            calls.push(ticker.to_string());
        }

        self.series
            .get(ticker)
            .cloned()
            .ok_or_else(|| DataError::unavailable(ticker, "no data"))
    }
}

/// Build a `Plain`-dialect series from `(date, open, high, low, close)` rows.
pub fn plain_series<I>(ticker: &str, rows: I) -> RawSeries
where
    I: IntoIterator<Item = (NaiveDate, f64, f64, f64, f64)>,
{
    let records = rows
        .into_iter()
        .map(|(date, open, high, low, close)| {
            let mut fields = Map::new();
            fields.insert("open".into(), Value::from(open));
            fields.insert("high".into(), Value::from(high));
            fields.insert("low".into(), Value::from(low));
            fields.insert("close".into(), Value::from(close));
            RawRecord::new(date.format("%Y-%m-%d").to_string(), fields)
        })
        .collect();

    RawSeries {
        ticker: ticker.to_string(),
        dialect: FieldDialect::Plain,
        records,
    }
}

/// Consecutive-calendar-day series with the given closes.
///
/// open = close - 0.5, high = close + 1.0, low = close - 1.0.
pub fn series_from_closes(ticker: &str, start: NaiveDate, closes: &[f64]) -> RawSeries {
    plain_series(
        ticker,
        closes.iter().zip(start.iter_days()).map(|(&close, date)| {
            (date, close - 0.5, close + 1.0, close - 1.0, close)
        }),
    )
}
