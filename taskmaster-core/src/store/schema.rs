//! Table definition for the `prices` table.

/// DDL applied by [`super::PriceStore::ensure_schema`]. Safe to run every time.
pub const CREATE_PRICES_TABLE: &str = "CREATE TABLE IF NOT EXISTS prices (
    date   TEXT,
    ticker TEXT,
    open   REAL,
    high   REAL,
    low    REAL,
    close  REAL,
    sma20  REAL,
    PRIMARY KEY (date, ticker)
);";

diesel::table! {
    prices (date, ticker) {
        date -> Text,
        ticker -> Text,
        open -> Double,
        high -> Double,
        low -> Double,
        close -> Double,
        sma20 -> Nullable<Double>,
    }
}
