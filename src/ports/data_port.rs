//! Price data access port trait.

use crate::domain::error::BacktestError;
use crate::domain::price::PriceSeries;
use chrono::NaiveDate;

pub trait PriceDataPort {
    /// Daily closes for `ticker` with `start_date <= date <= end_date`,
    /// sorted ascending.
    fn fetch_prices(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<PriceSeries, BacktestError>;

    fn list_tickers(&self) -> Result<Vec<String>, BacktestError>;
}
