//! Daily price observations and the validated series built from them.

use crate::domain::error::BacktestError;
use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceObservation {
    pub date: NaiveDate,
    pub close: f64,
}

/// Chronologically sorted, non-empty sequence of daily closes.
///
/// Construction checks that dates are strictly increasing and every close
/// is a positive finite number; the series is read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    observations: Vec<PriceObservation>,
}

impl PriceSeries {
    pub fn new(observations: Vec<PriceObservation>) -> Result<Self, BacktestError> {
        if observations.is_empty() {
            return Err(BacktestError::EmptyPriceSeries);
        }

        for obs in &observations {
            if !obs.close.is_finite() || obs.close <= 0.0 {
                return Err(BacktestError::InvalidPrice {
                    date: obs.date,
                    close: obs.close,
                });
            }
        }

        for pair in observations.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(BacktestError::UnsortedPriceSeries {
                    previous: pair[0].date,
                    date: pair[1].date,
                });
            }
        }

        Ok(Self { observations })
    }

    /// Build a series from parallel date/close slices.
    pub fn from_closes(dates: &[NaiveDate], closes: &[f64]) -> Result<Self, BacktestError> {
        if dates.len() != closes.len() {
            return Err(BacktestError::MisalignedSeries {
                prices: closes.len(),
                positions: dates.len(),
            });
        }
        let observations = dates
            .iter()
            .zip(closes)
            .map(|(&date, &close)| PriceObservation { date, close })
            .collect();
        Self::new(observations)
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn observations(&self) -> &[PriceObservation] {
        &self.observations
    }

    pub fn close(&self, index: usize) -> f64 {
        self.observations[index].close
    }

    pub fn date(&self, index: usize) -> NaiveDate {
        self.observations[index].date
    }

    pub fn first_date(&self) -> NaiveDate {
        self.observations[0].date
    }

    pub fn last_date(&self) -> NaiveDate {
        self.observations[self.observations.len() - 1].date
    }

    /// (close - prev_close) / prev_close for the bar at `index`; 0 for the first bar.
    pub fn period_return(&self, index: usize) -> f64 {
        if index == 0 {
            return 0.0;
        }
        let prev = self.observations[index - 1].close;
        (self.observations[index].close - prev) / prev
    }
}
