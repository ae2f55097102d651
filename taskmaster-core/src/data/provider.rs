//! Market data provider trait and structured error types.
//!
//! The MarketDataProvider trait abstracts over data sources (Alpha Vantage,
//! Yahoo Finance, in-memory fixtures) so the pipeline can swap implementations
//! and tests can run without a network.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Key convention a provider uses for the four price fields of a record.
///
/// The normalizer is the only component that looks at these names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldDialect {
    /// `"1. open"`, `"2. high"`, `"3. low"`, `"4. close"`, values as strings.
    AlphaVantage,
    /// `open`, `high`, `low`, `close`, values as JSON numbers or null.
    Plain,
}

/// One raw per-date record exactly as the provider keyed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub date: String,
    pub fields: Map<String, Value>,
}

impl RawRecord {
    pub fn new(date: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            date: date.into(),
            fields,
        }
    }
}

/// Raw series for a single ticker, in whatever order the provider returned it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSeries {
    pub ticker: String,
    pub dialect: FieldDialect,
    pub records: Vec<RawRecord>,
}

/// Structured error types for fetch and normalization.
///
/// Both variants carry the ticker so a failure can be reported on its own line.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    #[error("data unavailable for {ticker}: {reason}")]
    Unavailable { ticker: String, reason: String },

    #[error("malformed data for {ticker}: {reason}")]
    MalformedData { ticker: String, reason: String },
}

impl DataError {
    pub fn unavailable(ticker: &str, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            ticker: ticker.to_string(),
            reason: reason.into(),
        }
    }

    pub fn malformed(ticker: &str, reason: impl Into<String>) -> Self {
        Self::MalformedData {
            ticker: ticker.to_string(),
            reason: reason.into(),
        }
    }

    pub fn ticker(&self) -> &str {
        match self {
            Self::Unavailable { ticker, .. } | Self::MalformedData { ticker, .. } => ticker,
        }
    }
}

/// Trait for market data providers (Alpha Vantage, Yahoo, in-memory).
///
/// Implementations handle the specifics of talking to one source. They do not
/// retry and they do not cache: a failed fetch is reported as-is.
pub trait MarketDataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch at least `lookback` trading days of daily bars for `ticker`.
    fn fetch(&self, ticker: &str, lookback: usize) -> Result<RawSeries, DataError>;
}

impl<P: MarketDataProvider + ?Sized> MarketDataProvider for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fetch(&self, ticker: &str, lookback: usize) -> Result<RawSeries, DataError> {
        (**self).fetch(ticker, lookback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_name_the_ticker() {
        let err = DataError::unavailable("ZZZZZ", "Invalid API call");
        assert_eq!(err.to_string(), "data unavailable for ZZZZZ: Invalid API call");
        assert_eq!(err.ticker(), "ZZZZZ");

        let err = DataError::malformed("AAPL", "missing close");
        assert_eq!(err.to_string(), "malformed data for AAPL: missing close");
    }
}
