//! OHLCV bar representation.

use chrono::NaiveDate;

/// One daily bar for a single instrument. Never mutated after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl OhlcvBar {
    /// A bar can only be traded at a strictly positive, finite close.
    pub fn is_tradeable(&self) -> bool {
        self.close.is_finite() && self.close > 0.0
    }
}
