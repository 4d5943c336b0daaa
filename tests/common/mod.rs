#![allow(dead_code)]

use chrono::NaiveDate;
use std::collections::HashMap;
use trendgrid::domain::error::BacktestError;
use trendgrid::domain::metrics::Metrics;
use trendgrid::domain::optimizer::SearchResult;
use trendgrid::domain::price::PriceSeries;
use trendgrid::domain::quarter::Quarter;
pub use trendgrid::domain::price::PriceObservation;
use trendgrid::ports::data_port::PriceDataPort;
use trendgrid::ports::report_port::ReportPort;

pub struct MockPriceDataPort {
    pub data: HashMap<String, Vec<PriceObservation>>,
    pub errors: HashMap<String, String>,
}

impl MockPriceDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_closes(mut self, ticker: &str, closes: &[f64]) -> Self {
        self.data
            .insert(ticker.to_string(), make_observations(closes));
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }
}

impl PriceDataPort for MockPriceDataPort {
    fn fetch_prices(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<PriceSeries, BacktestError> {
        if let Some(reason) = self.errors.get(ticker) {
            return Err(BacktestError::Data {
                reason: reason.clone(),
            });
        }
        let observations: Vec<PriceObservation> = self
            .data
            .get(ticker)
            .map(|obs| {
                obs.iter()
                    .filter(|o| o.date >= start_date && o.date <= end_date)
                    .copied()
                    .collect()
            })
            .unwrap_or_default();
        if observations.is_empty() {
            return Err(BacktestError::NoData {
                ticker: ticker.to_string(),
                start: start_date,
                end: end_date,
            });
        }
        PriceSeries::new(observations)
    }

    fn list_tickers(&self) -> Result<Vec<String>, BacktestError> {
        let mut tickers: Vec<String> = self.data.keys().cloned().collect();
        tickers.sort();
        Ok(tickers)
    }
}

/// Records what was reported instead of printing it.
#[derive(Default)]
pub struct MockReportPort {
    pub searches: Vec<(String, SearchResult, Metrics)>,
    pub quarters: Vec<(String, Vec<String>)>,
}

impl ReportPort for MockReportPort {
    fn write_search(
        &mut self,
        ticker: &str,
        result: &SearchResult,
        metrics: &Metrics,
    ) -> Result<(), BacktestError> {
        self.searches
            .push((ticker.to_string(), result.clone(), metrics.clone()));
        Ok(())
    }

    fn write_quarters(
        &mut self,
        ticker: &str,
        quarters: &[Quarter<'_>],
    ) -> Result<(), BacktestError> {
        self.quarters.push((
            ticker.to_string(),
            quarters.iter().map(|q| q.label()).collect(),
        ));
        Ok(())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// One observation per calendar day starting 2024-01-01.
pub fn make_observations(closes: &[f64]) -> Vec<PriceObservation> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| PriceObservation {
            date: date(2024, 1, 1) + chrono::Duration::days(i as i64),
            close,
        })
        .collect()
}

pub fn make_series(closes: &[f64]) -> PriceSeries {
    PriceSeries::new(make_observations(closes)).unwrap()
}

/// Deterministic trending series with oscillation, long enough for the
/// default grid's 100-bar window.
pub fn generate_closes(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let t = i as f64;
            100.0 + t * 0.15 + (t / 9.0).sin() * 8.0 + (t / 3.7).cos() * 2.5
        })
        .collect()
}
