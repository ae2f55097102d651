//! Reporter: the latest fully-computed row per ticker.

use crate::domain::PriceBar;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportError {
    #[error("no valid data for {ticker}: fewer than 20 trading days with a complete SMA")]
    NoValidData { ticker: String },
}

/// Output record for one ticker.
///
/// Serializes as `{ticker, date: "YYYY-MM-DD", open, high, low, close, sma20}`
/// with every price as a JSON number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerReport {
    pub ticker: String,
    #[serde(with = "iso_date")]
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub sma20: f64,
}

impl TickerReport {
    /// `None` when the bar's SMA is undefined.
    pub fn from_bar(bar: &PriceBar) -> Option<Self> {
        Some(Self {
            ticker: bar.ticker.clone(),
            date: bar.date,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            sma20: bar.sma20?,
        })
    }
}

/// Pick the bar with the greatest date among those with a defined SMA.
///
/// The input does not need to be sorted.
pub fn select_latest(ticker: &str, bars: &[PriceBar]) -> Result<TickerReport, ReportError> {
    bars.iter()
        .filter(|bar| bar.has_sma())
        .max_by_key(|bar| bar.date)
        .and_then(TickerReport::from_bar)
        .ok_or_else(|| ReportError::NoValidData {
            ticker: ticker.to_string(),
        })
}

mod iso_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&date.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDate::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}
