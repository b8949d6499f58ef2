//! Bar source port trait.

use crate::domain::error::SteptraderError;
use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;

/// Supplies daily bars for one instrument, sorted by strictly increasing date.
pub trait DataPort {
    /// Bars within the inclusive `[start_date, end_date]` range; an open
    /// bound means no limit on that side.
    fn fetch_ohlcv(
        &self,
        symbol: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<OhlcvBar>, SteptraderError>;

    /// First date, last date and bar count, or `None` when no data exists.
    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, SteptraderError>;
}
