//! PriceBar: one trading day for one ticker.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Longest ticker symbol accepted anywhere in the pipeline.
pub const MAX_TICKER_LEN: usize = 5;

/// Daily OHLC bar for a single ticker, optionally enriched with its SMA.
///
/// `sma20` stays `None` until the SMA transformer has seen a full window of
/// closes ending at this bar. Bars with `sma20 == None` are never written to
/// the store or reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub ticker: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub sma20: Option<f64>,
}

impl PriceBar {
    /// Bar with OHLC filled in and no SMA yet.
    pub fn new(
        ticker: impl Into<String>,
        date: NaiveDate,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    ) -> Self {
        Self {
            date,
            ticker: ticker.into(),
            open,
            high,
            low,
            close,
            sma20: None,
        }
    }

    pub fn has_sma(&self) -> bool {
        self.sma20.is_some()
    }
}

/// 1-5 ASCII uppercase letters.
pub fn is_valid_ticker(ticker: &str) -> bool {
    !ticker.is_empty()
        && ticker.len() <= MAX_TICKER_LEN
        && ticker.bytes().all(|b| b.is_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bar() -> PriceBar {
        PriceBar::new(
            "AAPL",
            NaiveDate::from_ymd_opt(2025, 7, 21).unwrap(),
            212.05,
            215.78,
            211.64,
            212.32,
        )
    }

    #[test]
    fn new_bar_has_no_sma() {
        let bar = sample_bar();
        assert!(!bar.has_sma());
    }

    #[test]
    fn has_sma_once_enriched() {
        let mut bar = sample_bar();
        bar.sma20 = Some(210.0);
        assert!(bar.has_sma());
    }

    #[test]
    fn ticker_validation() {
        assert!(is_valid_ticker("A"));
        assert!(is_valid_ticker("GOOGL"));
        assert!(!is_valid_ticker(""));
        assert!(!is_valid_ticker("TOOLONG"));
        assert!(!is_valid_ticker("aapl"));
        assert!(!is_valid_ticker("BRK.B"));
    }
}
