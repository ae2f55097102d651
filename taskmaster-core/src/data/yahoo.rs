//! Yahoo Finance data provider.
//!
//! Fetches daily bars from Yahoo's v8 chart API. The response is columnar
//! (one array per field, indexed by timestamp); it is zipped into per-date
//! records here so the normalizer sees the same shape as every other provider.
//!
//! Yahoo Finance has no official API and is subject to unannounced format changes.

use super::provider::{DataError, FieldDialect, MarketDataProvider, RawRecord, RawSeries};
use chrono::{Duration as ChronoDuration, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
}

/// Yahoo Finance chart provider.
pub struct YahooChartProvider {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl YahooChartProvider {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Calendar days to request so that `lookback` trading days are covered,
    /// allowing for weekends and a handful of holidays.
    fn calendar_span(lookback: usize) -> Option<i64> {
        i64::try_from(lookback).ok()?.checked_mul(7)?.checked_div(5)?.checked_add(10)
    }

    /// Build the chart API URL for a ticker ending at `end`.
    fn chart_url(&self, ticker: &str, lookback: usize, end: NaiveDate) -> Result<String, DataError> {
        let out_of_range =
            || DataError::unavailable(ticker, format!("lookback of {lookback} days is out of range"));

        let span = Self::calendar_span(lookback)
            .and_then(ChronoDuration::try_days)
            .ok_or_else(out_of_range)?;
        let start = end.checked_sub_signed(span).ok_or_else(out_of_range)?;
        let end = end.succ_opt().ok_or_else(out_of_range)?;

        let start_ts = start.and_time(NaiveTime::MIN).and_utc().timestamp();
        let end_ts = end.and_time(NaiveTime::MIN).and_utc().timestamp();
        Ok(format!(
            "{}/{ticker}?period1={start_ts}&period2={end_ts}&interval=1d",
            self.base_url
        ))
    }

    /// Parse the chart API response into plain per-date records.
    fn parse_response(
        ticker: &str,
        resp: ChartResponse,
        lookback: usize,
    ) -> Result<RawSeries, DataError> {
        if let Some(err) = resp.chart.error {
            return Err(DataError::unavailable(
                ticker,
                format!("{}: {}", err.code, err.description),
            ));
        }

        let data = resp
            .chart
            .result
            .and_then(|r| r.into_iter().next())
            .ok_or_else(|| DataError::unavailable(ticker, "empty chart result"))?;

        let timestamps = data
            .timestamp
            .ok_or_else(|| DataError::unavailable(ticker, "no timestamps in chart result"))?;

        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| DataError::malformed(ticker, "no quote data"))?;

        let mut records = Vec::with_capacity(timestamps.len());
        for (i, &ts) in timestamps.iter().enumerate() {
            let date = chrono::DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.date_naive())
                .ok_or_else(|| DataError::malformed(ticker, format!("invalid timestamp: {ts}")))?;

            let prices = [&quote.open, &quote.high, &quote.low, &quote.close].map(|c| value_at(c, i));
            // Holiday placeholders must not use up the lookback window.
            if prices.iter().all(Value::is_null) {
                continue;
            }
            let [open, high, low, close] = prices;
            let fields = json!({ "open": open, "high": high, "low": low, "close": close });

            if let Value::Object(fields) = fields {
                records.push(RawRecord::new(date.format("%Y-%m-%d").to_string(), fields));
            }
        }

        if records.is_empty() {
            return Err(DataError::unavailable(ticker, "no bars in chart result"));
        }

        // Timestamps arrive ascending; keep the most recent `lookback`.
        let excess = records.len().saturating_sub(lookback);
        records.drain(..excess);

        Ok(RawSeries {
            ticker: ticker.to_string(),
            dialect: FieldDialect::Plain,
            records,
        })
    }
}

/// Column value at `i`, or null when Yahoo left a gap.
fn value_at(column: &[Option<f64>], i: usize) -> Value {
    column.get(i).copied().flatten().map_or(Value::Null, Value::from)
}

impl MarketDataProvider for YahooChartProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch(&self, ticker: &str, lookback: usize) -> Result<RawSeries, DataError> {
        let url = self.chart_url(ticker, lookback, Utc::now().date_naive())?;
        debug!(ticker, %url, "requesting chart");

        let resp = self
            .client
            .get(&url)
            .send()
            .map_err(|e| DataError::unavailable(ticker, e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(DataError::unavailable(ticker, "symbol not found"));
        }
        if !status.is_success() {
            return Err(DataError::unavailable(ticker, format!("HTTP {status}")));
        }

        let chart: ChartResponse = resp
            .json()
            .map_err(|e| DataError::malformed(ticker, format!("failed to parse response: {e}")))?;

        Self::parse_response(ticker, chart, lookback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart(json: &str) -> ChartResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn zips_columns_into_records() {
        let resp = chart(
            r#"{"chart":{"result":[{
                "timestamp":[1704205800,1704292200],
                "indicators":{"quote":[{
                    "open":[100.0,101.0],"high":[102.0,103.0],
                    "low":[99.0,100.0],"close":[101.5,102.5],
                    "volume":[1000,2000]
                }]}
            }],"error":null}}"#,
        );

        let series = YahooChartProvider::parse_response("SPY", resp, 100).unwrap();
        assert_eq!(series.dialect, FieldDialect::Plain);
        assert_eq!(series.records.len(), 2);
        assert_eq!(series.records[0].date, "2024-01-02");
        assert_eq!(series.records[1].fields["close"], Value::from(102.5));
    }

    #[test]
    fn partial_gaps_become_null() {
        let resp = chart(
            r#"{"chart":{"result":[{
                "timestamp":[1704205800],
                "indicators":{"quote":[{
                    "open":[null],"high":[102.0],"low":[99.0],"close":[101.0]
                }]}
            }],"error":null}}"#,
        );

        let series = YahooChartProvider::parse_response("SPY", resp, 100).unwrap();
        assert_eq!(series.records[0].fields["open"], Value::Null);
        assert_eq!(series.records[0].fields["close"], Value::from(101.0));
    }

    #[test]
    fn placeholder_days_do_not_count_toward_lookback() {
        // 2024-01-03 is an all-null placeholder in the middle of the window.
        let resp = chart(
            r#"{"chart":{"result":[{
                "timestamp":[1704205800,1704292200,1704378600],
                "indicators":{"quote":[{
                    "open":[1.0,null,3.0],"high":[1.0,null,3.0],
                    "low":[1.0,null,3.0],"close":[1.0,null,3.0]
                }]}
            }],"error":null}}"#,
        );

        let series = YahooChartProvider::parse_response("SPY", resp, 2).unwrap();
        let dates: Vec<&str> = series.records.iter().map(|r| r.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-01-02", "2024-01-04"]);
    }

    #[test]
    fn only_placeholders_is_unavailable() {
        let resp = chart(
            r#"{"chart":{"result":[{
                "timestamp":[1704205800],
                "indicators":{"quote":[{
                    "open":[null],"high":[null],"low":[null],"close":[null]
                }]}
            }],"error":null}}"#,
        );

        assert!(matches!(
            YahooChartProvider::parse_response("SPY", resp, 100),
            Err(DataError::Unavailable { .. })
        ));
    }

    #[test]
    fn not_found_is_unavailable() {
        let resp = chart(
            r#"{"chart":{"result":null,"error":{
                "code":"Not Found","description":"No data found, symbol may be delisted"
            }}}"#,
        );

        match YahooChartProvider::parse_response("ZZZZZ", resp, 100) {
            Err(DataError::Unavailable { ticker, reason }) => {
                assert_eq!(ticker, "ZZZZZ");
                assert!(reason.contains("Not Found"));
            }
            other => panic!("expected Unavailable, got: {other:?}"),
        }
    }

    #[test]
    fn truncates_to_lookback() {
        let resp = chart(
            r#"{"chart":{"result":[{
                "timestamp":[1704205800,1704292200,1704378600],
                "indicators":{"quote":[{
                    "open":[1.0,2.0,3.0],"high":[1.0,2.0,3.0],
                    "low":[1.0,2.0,3.0],"close":[1.0,2.0,3.0]
                }]}
            }],"error":null}}"#,
        );

        let series = YahooChartProvider::parse_response("SPY", resp, 2).unwrap();
        let dates: Vec<&str> = series.records.iter().map(|r| r.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-01-03", "2024-01-04"]);
    }

    #[test]
    fn chart_url_covers_lookback() {
        let provider = YahooChartProvider::new().unwrap().with_base_url("http://localhost");
        let end = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let url = provider.chart_url("SPY", 20, end).unwrap();
        assert!(url.starts_with("http://localhost/SPY?period1="));
        assert!(url.ends_with("&interval=1d"));
        assert_eq!(YahooChartProvider::calendar_span(20), Some(38));
    }

    #[test]
    fn oversized_lookback_is_an_error_not_a_panic() {
        let provider = YahooChartProvider::new().unwrap().with_base_url("http://localhost");
        let end = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();

        for lookback in [100_000_000, usize::MAX] {
            match provider.chart_url("SPY", lookback, end) {
                Err(DataError::Unavailable { ticker, reason }) => {
                    assert_eq!(ticker, "SPY");
                    assert!(reason.contains("out of range"));
                }
                other => panic!("expected Unavailable, got: {other:?}"),
            }
        }
        assert!(provider.chart_url("SPY", 5_000, end).is_ok());
    }
}
