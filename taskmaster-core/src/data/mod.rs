//! Market data: providers and the series normalizer

pub mod alpha_vantage;
pub mod memory;
pub mod normalize;
pub mod provider;
pub mod yahoo;

pub use alpha_vantage::AlphaVantageProvider;
pub use memory::InMemoryProvider;
pub use normalize::normalize;
pub use provider::{DataError, FieldDialect, MarketDataProvider, RawRecord, RawSeries};
pub use yahoo::YahooChartProvider;
