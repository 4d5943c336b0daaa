//! Report output port trait.

use crate::domain::error::BacktestError;
use crate::domain::metrics::Metrics;
use crate::domain::optimizer::SearchResult;
use crate::domain::quarter::Quarter;

/// Port for writing search results and quarter summaries.
pub trait ReportPort {
    fn write_search(
        &mut self,
        ticker: &str,
        result: &SearchResult,
        metrics: &Metrics,
    ) -> Result<(), BacktestError>;

    fn write_quarters(
        &mut self,
        ticker: &str,
        quarters: &[Quarter<'_>],
    ) -> Result<(), BacktestError>;
}
