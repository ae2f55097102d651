//! Domain types for TaskMaster

pub mod bar;

pub use bar::{is_valid_ticker, PriceBar, MAX_TICKER_LEN};
