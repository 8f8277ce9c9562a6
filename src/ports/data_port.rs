//! Bar data access port trait.

use chrono::NaiveDateTime;

use crate::domain::bar::Bar;
use crate::domain::error::StratsigError;

pub trait DataPort {
    /// Fetch the full bar series for a ticker, sorted ascending by timestamp.
    fn fetch_bars(&self, ticker: &str) -> Result<Vec<Bar>, StratsigError>;

    fn list_tickers(&self) -> Result<Vec<String>, StratsigError>;

    /// First timestamp, last timestamp and bar count, or `None` when the
    /// ticker has no rows.
    fn data_range(
        &self,
        ticker: &str,
    ) -> Result<Option<(NaiveDateTime, NaiveDateTime, usize)>, StratsigError>;
}
