//! Market data access port.

use crate::domain::error::OverlayError;
use crate::domain::market_data::DailyBar;
use chrono::NaiveDate;

pub trait MarketDataPort {
    /// Daily bars for `ticker` within `[start_date, end_date]`, sorted by date.
    fn fetch_daily(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<DailyBar>, OverlayError>;

    fn list_tickers(&self) -> Result<Vec<String>, OverlayError>;

    /// First date, last date and row count, or `None` when the ticker has no rows.
    fn get_data_range(&self, ticker: &str) -> Result<Option<(NaiveDate, NaiveDate, usize)>, OverlayError>;
}
