//! Instruction parsing.
//!
//! Ticker extraction is purely lexical: every standalone run of 1-5 uppercase
//! ASCII letters is a candidate. Whether a candidate is a real symbol is left
//! to the market data provider, which fails per ticker when it has no data.

use regex::Regex;
use std::sync::OnceLock;

/// Extract candidate tickers from a free-text instruction.
///
/// Matches are returned in the order they appear. Duplicates are kept.
pub fn extract_tickers(instruction: &str) -> Vec<String> {
    ticker_pattern()
        .find_iter(instruction)
        .map(|m| m.as_str().to_string())
        .collect()
}

#[allow(clippy::expect_used)] // pattern is a literal
fn ticker_pattern() -> &'static Regex {
    static TICKER_REGEX: OnceLock<Regex> = OnceLock::new();
    TICKER_REGEX.get_or_init(|| Regex::new(r"\b[A-Z]{1,5}\b").expect("ticker regex is valid"))
}
