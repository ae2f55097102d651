//! Series normalizer: provider records → canonical ascending PriceBar series.
//!
//! This is the only place that knows provider field names. Downstream code
//! sees `PriceBar` and nothing else.
//!
//! Rules:
//! - every retained record must carry finite, non-negative open/high/low/close
//! - numbers may arrive as JSON numbers or as numeric strings
//! - a record with all four prices null is a non-trading placeholder and is dropped
//! - dates keep day granularity only; a trailing time component is discarded
//! - output is strictly ascending by date; a repeated date keeps the record the
//!   provider listed last

use super::provider::{DataError, FieldDialect, RawRecord, RawSeries};
use crate::domain::{is_valid_ticker, PriceBar};
use chrono::NaiveDate;
use serde_json::Value;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PriceField {
    Open,
    High,
    Low,
    Close,
}

impl PriceField {
    const ALL: [PriceField; 4] = [Self::Open, Self::High, Self::Low, Self::Close];

    fn key(self, dialect: FieldDialect) -> &'static str {
        match (dialect, self) {
            (FieldDialect::AlphaVantage, Self::Open) => "1. open",
            (FieldDialect::AlphaVantage, Self::High) => "2. high",
            (FieldDialect::AlphaVantage, Self::Low) => "3. low",
            (FieldDialect::AlphaVantage, Self::Close) => "4. close",
            (FieldDialect::Plain, Self::Open) => "open",
            (FieldDialect::Plain, Self::High) => "high",
            (FieldDialect::Plain, Self::Low) => "low",
            (FieldDialect::Plain, Self::Close) => "close",
        }
    }
}

/// Normalize a raw provider series into an ascending, de-duplicated bar series.
pub fn normalize(raw: RawSeries) -> Result<Vec<PriceBar>, DataError> {
    let RawSeries {
        ticker,
        dialect,
        records,
    } = raw;

    if !is_valid_ticker(&ticker) {
        return Err(DataError::malformed(
            &ticker,
            "ticker must be 1-5 uppercase letters",
        ));
    }

    let mut bars = Vec::with_capacity(records.len());
    let mut placeholders = 0usize;

    for record in &records {
        if is_placeholder(record, dialect) {
            placeholders += 1;
            continue;
        }
        bars.push(parse_record(&ticker, dialect, record)?);
    }

    if placeholders > 0 {
        debug!(ticker = %ticker, placeholders, "dropped non-trading placeholder records");
    }

    // Stable sort: records sharing a date stay in provider order.
    bars.sort_by_key(|bar| bar.date);

    let before = bars.len();
    let mut deduped: Vec<PriceBar> = Vec::with_capacity(before);
    for bar in bars {
        match deduped.last_mut() {
            Some(last) if last.date == bar.date => *last = bar,
            _ => deduped.push(bar),
        }
    }

    let duplicates = before - deduped.len();
    if duplicates > 0 {
        warn!(ticker = %ticker, duplicates, "provider repeated dates; kept the last record for each");
    }

    if deduped.is_empty() {
        return Err(DataError::unavailable(&ticker, "no usable series"));
    }

    Ok(deduped)
}

fn is_placeholder(record: &RawRecord, dialect: FieldDialect) -> bool {
    PriceField::ALL
        .iter()
        .all(|field| matches!(record.fields.get(field.key(dialect)), Some(Value::Null)))
}

fn parse_record(
    ticker: &str,
    dialect: FieldDialect,
    record: &RawRecord,
) -> Result<PriceBar, DataError> {
    let date = parse_date(&record.date).ok_or_else(|| {
        DataError::malformed(ticker, format!("unparseable date '{}'", record.date))
    })?;

    let price = |field: PriceField| -> Result<f64, DataError> {
        let key = field.key(dialect);
        let value = record.fields.get(key).ok_or_else(|| {
            DataError::malformed(ticker, format!("{date}: missing field '{key}'"))
        })?;
        coerce_price(value).ok_or_else(|| {
            DataError::malformed(ticker, format!("{date}: invalid value for '{key}': {value}"))
        })
    };

    Ok(PriceBar::new(
        ticker,
        date,
        price(PriceField::Open)?,
        price(PriceField::High)?,
        price(PriceField::Low)?,
        price(PriceField::Close)?,
    ))
}

/// Parse `YYYY-MM-DD`, ignoring any time component after the day.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let day = match raw.as_bytes().get(10) {
        Some(b' ') | Some(b'T') => raw.get(..10)?,
        _ => raw,
    };
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// A finite, non-negative price from a JSON number or numeric string.
fn coerce_price(value: &Value) -> Option<f64> {
    let price = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (price.is_finite() && price >= 0.0).then_some(price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("fields must be an object"),
        }
    }

    fn av_record(date: &str, close: &str) -> RawRecord {
        RawRecord::new(
            date,
            fields(json!({
                "1. open": "10.0",
                "2. high": "12.0",
                "3. low": "9.0",
                "4. close": close,
                "5. volume": "100"
            })),
        )
    }

    fn plain_record(date: &str, close: Value) -> RawRecord {
        RawRecord::new(
            date,
            fields(json!({ "open": 10.0, "high": 12.0, "low": 9.0, "close": close })),
        )
    }

    fn series(dialect: FieldDialect, records: Vec<RawRecord>) -> RawSeries {
        RawSeries {
            ticker: "IBM".into(),
            dialect,
            records,
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn alpha_vantage_strings_are_coerced() {
        let raw = series(
            FieldDialect::AlphaVantage,
            vec![av_record("2024-01-02", "11.25")],
        );
        let bars = normalize(raw).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].ticker, "IBM");
        assert_eq!(bars[0].date, d(2024, 1, 2));
        assert_eq!(bars[0].open, 10.0);
        assert_eq!(bars[0].close, 11.25);
        assert_eq!(bars[0].sma20, None);
    }

    #[test]
    fn output_is_sorted_ascending() {
        let raw = series(
            FieldDialect::AlphaVantage,
            vec![
                av_record("2024-01-04", "3"),
                av_record("2024-01-02", "1"),
                av_record("2024-01-03", "2"),
            ],
        );
        let closes: Vec<f64> = normalize(raw).unwrap().iter().map(|b| b.close).collect();
        assert_eq!(closes, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn repeated_date_keeps_last_record() {
        let raw = series(
            FieldDialect::Plain,
            vec![
                plain_record("2024-01-02", json!(1.0)),
                plain_record("2024-01-03", json!(2.0)),
                plain_record("2024-01-02", json!(5.0)),
            ],
        );
        let bars = normalize(raw).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 5.0);
    }

    #[test]
    fn missing_field_is_malformed() {
        let mut record = av_record("2024-01-02", "1.0");
        record.fields.remove("4. close");
        let err = normalize(series(FieldDialect::AlphaVantage, vec![record])).unwrap_err();
        match err {
            DataError::MalformedData { ticker, reason } => {
                assert_eq!(ticker, "IBM");
                assert!(reason.contains("4. close"), "reason: {reason}");
            }
            other => panic!("expected MalformedData, got: {other:?}"),
        }
    }

    #[test]
    fn non_numeric_string_is_malformed() {
        let raw = series(FieldDialect::AlphaVantage, vec![av_record("2024-01-02", "n/a")]);
        assert!(matches!(
            normalize(raw),
            Err(DataError::MalformedData { .. })
        ));
    }

    #[test]
    fn negative_price_is_malformed() {
        let raw = series(FieldDialect::Plain, vec![plain_record("2024-01-02", json!(-3.0))]);
        assert!(matches!(
            normalize(raw),
            Err(DataError::MalformedData { .. })
        ));
    }

    #[test]
    fn partially_null_record_is_malformed() {
        let raw = series(FieldDialect::Plain, vec![plain_record("2024-01-02", Value::Null)]);
        assert!(matches!(
            normalize(raw),
            Err(DataError::MalformedData { .. })
        ));
    }

    #[test]
    fn all_null_record_is_dropped() {
        let placeholder = RawRecord::new(
            "2024-01-03",
            fields(json!({ "open": null, "high": null, "low": null, "close": null })),
        );
        let raw = series(
            FieldDialect::Plain,
            vec![plain_record("2024-01-02", json!(11.0)), placeholder],
        );
        let bars = normalize(raw).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].date, d(2024, 1, 2));
    }

    #[test]
    fn time_component_is_truncated() {
        let raw = series(
            FieldDialect::Plain,
            vec![
                plain_record("2024-01-02 16:00:00", json!(1.0)),
                plain_record("2024-01-03T16:00:00Z", json!(2.0)),
            ],
        );
        let dates: Vec<NaiveDate> = normalize(raw).unwrap().iter().map(|b| b.date).collect();
        assert_eq!(dates, vec![d(2024, 1, 2), d(2024, 1, 3)]);
    }

    #[test]
    fn bad_date_is_malformed() {
        let raw = series(FieldDialect::Plain, vec![plain_record("01/02/2024", json!(1.0))]);
        assert!(matches!(
            normalize(raw),
            Err(DataError::MalformedData { .. })
        ));
    }

    #[test]
    fn invalid_ticker_is_malformed() {
        let mut raw = series(FieldDialect::Plain, vec![plain_record("2024-01-02", json!(1.0))]);
        raw.ticker = "toolong".into();
        assert!(matches!(
            normalize(raw),
            Err(DataError::MalformedData { .. })
        ));
    }

    #[test]
    fn empty_series_is_unavailable() {
        let raw = series(FieldDialect::Plain, vec![]);
        assert!(matches!(normalize(raw), Err(DataError::Unavailable { .. })));
    }

    #[test]
    fn wrong_dialect_keys_are_malformed() {
        // Plain keys read through the Alpha Vantage dialect
        let raw = series(
            FieldDialect::AlphaVantage,
            vec![plain_record("2024-01-02", json!(1.0))],
        );
        assert!(matches!(
            normalize(raw),
            Err(DataError::MalformedData { .. })
        ));
    }
}
