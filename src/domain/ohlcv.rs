//! OHLCV bar representation.

use chrono::{DateTime, NaiveDate};

/// One daily bar of a single futures contract.
///
/// Only `date` and `close` feed the adjustment; the remaining fields are
/// carried through untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvBar {
    pub symbol: String,
    pub timestamp: i64,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl OhlcvBar {
    /// Build a bar from a unix timestamp in seconds. The bar's date is the
    /// UTC calendar date of the timestamp.
    pub fn from_timestamp(
        symbol: &str,
        timestamp: i64,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Option<Self> {
        let date = DateTime::from_timestamp(timestamp, 0)?.date_naive();
        Some(Self {
            symbol: symbol.to_string(),
            timestamp,
            date,
            open,
            high,
            low,
            close,
            volume,
        })
    }
}
