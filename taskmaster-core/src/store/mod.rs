//! SQLite persistence for enriched price bars.
//!
//! One table, `prices`, keyed by (date, ticker). Writes are upserts: storing a
//! bar whose key already exists replaces every column of the old row. Only bars
//! with a defined `sma20` are accepted.
//!
//! A [`PriceStore`] owns a single connection. The pipeline opens one per ticker
//! batch and drops it when the batch is done, so the connection is released on
//! every exit path.

pub mod schema;

use crate::domain::PriceBar;
use chrono::NaiveDate;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use schema::prices;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open database '{path}': {source}")]
    Connection {
        path: String,
        #[source]
        source: diesel::ConnectionError,
    },

    #[error("database query failed: {0}")]
    Query(#[from] diesel::result::Error),

    #[error("refusing to store {ticker} {date}: sma20 is undefined")]
    UndefinedSma { ticker: String, date: NaiveDate },

    #[error("stored row {ticker} '{date}' is invalid: {reason}")]
    InvalidRow {
        ticker: String,
        date: String,
        reason: String,
    },
}

/// Row shape shared by inserts, upserts and selects.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = prices, primary_key(date, ticker), check_for_backend(diesel::sqlite::Sqlite))]
struct PriceRow {
    date: String,
    ticker: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    sma20: Option<f64>,
}

impl PriceRow {
    fn from_bar(bar: &PriceBar) -> Result<Self, StoreError> {
        if bar.sma20.is_none() {
            return Err(StoreError::UndefinedSma {
                ticker: bar.ticker.clone(),
                date: bar.date,
            });
        }
        Ok(Self {
            date: bar.date.format(DATE_FORMAT).to_string(),
            ticker: bar.ticker.clone(),
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            sma20: bar.sma20,
        })
    }

    fn into_bar(self) -> Result<PriceBar, StoreError> {
        let date = NaiveDate::parse_from_str(&self.date, DATE_FORMAT).map_err(|e| {
            StoreError::InvalidRow {
                ticker: self.ticker.clone(),
                date: self.date.clone(),
                reason: e.to_string(),
            }
        })?;
        Ok(PriceBar {
            date,
            ticker: self.ticker,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            sma20: self.sma20,
        })
    }
}

/// Handle to the price database.
pub struct PriceStore {
    conn: SqliteConnection,
}

impl PriceStore {
    /// Open (creating if needed) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::establish(&path.as_ref().to_string_lossy())
    }

    /// Private in-memory database; gone when the store is dropped.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::establish(":memory:")
    }

    fn establish(url: &str) -> Result<Self, StoreError> {
        let mut conn =
            SqliteConnection::establish(url).map_err(|source| StoreError::Connection {
                path: url.to_string(),
                source,
            })?;
        conn.batch_execute("PRAGMA busy_timeout=5000;")?;
        Ok(Self { conn })
    }

    /// Create the `prices` table if it does not exist.
    pub fn ensure_schema(&mut self) -> Result<(), StoreError> {
        self.conn.batch_execute(schema::CREATE_PRICES_TABLE)?;
        Ok(())
    }

    /// Insert or replace the row for `(bar.date, bar.ticker)`.
    pub fn upsert(&mut self, bar: &PriceBar) -> Result<(), StoreError> {
        let row = PriceRow::from_bar(bar)?;
        upsert_row(&mut self.conn, &row)
    }

    /// Upsert every bar in one transaction. Any failure rolls the whole batch back.
    pub fn upsert_batch(&mut self, bars: &[PriceBar]) -> Result<usize, StoreError> {
        let rows = bars
            .iter()
            .map(PriceRow::from_bar)
            .collect::<Result<Vec<_>, _>>()?;

        self.conn.transaction::<_, StoreError, _>(|conn| {
            for row in &rows {
                upsert_row(conn, row)?;
            }
            Ok(())
        })?;

        debug!(rows = rows.len(), "upserted batch");
        Ok(rows.len())
    }

    /// All stored bars for `ticker`, ascending by date.
    pub fn load(&mut self, ticker: &str) -> Result<Vec<PriceBar>, StoreError> {
        prices::table
            .filter(prices::ticker.eq(ticker))
            .order(prices::date.asc())
            .select(PriceRow::as_select())
            .load::<PriceRow>(&mut self.conn)?
            .into_iter()
            .map(PriceRow::into_bar)
            .collect()
    }

    /// Most recent stored bar for `ticker`.
    pub fn latest(&mut self, ticker: &str) -> Result<Option<PriceBar>, StoreError> {
        prices::table
            .filter(prices::ticker.eq(ticker))
            .order(prices::date.desc())
            .select(PriceRow::as_select())
            .first::<PriceRow>(&mut self.conn)
            .optional()?
            .map(PriceRow::into_bar)
            .transpose()
    }

    /// Number of stored rows for `ticker`.
    pub fn count(&mut self, ticker: &str) -> Result<i64, StoreError> {
        Ok(prices::table
            .filter(prices::ticker.eq(ticker))
            .count()
            .get_result(&mut self.conn)?)
    }
}

fn upsert_row(conn: &mut SqliteConnection, row: &PriceRow) -> Result<(), StoreError> {
    diesel::insert_into(prices::table)
        .values(row)
        .on_conflict((prices::date, prices::ticker))
        .do_update()
        .set(row)
        .execute(conn)?;
    Ok(())
}
