//! Simple Moving Average indicator.
//!
//! SMA(n)[i] = sum(C[i-j] for j in 0..n) / n
//! Warmup: first (n-1) bars are invalid. No partial windows.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::price::PriceSeries;

pub fn calculate_sma(prices: &PriceSeries, period: usize) -> IndicatorSeries {
    let observations = prices.observations();
    let mut values = Vec::with_capacity(observations.len());

    for (i, obs) in observations.iter().enumerate() {
        let valid = period > 0 && i + 1 >= period;

        let value = if valid {
            let window = &observations[i + 1 - period..=i];
            window.iter().map(|o| o.close).sum::<f64>() / period as f64
        } else {
            0.0
        };

        values.push(IndicatorPoint {
            date: obs.date,
            valid,
            value,
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Sma(period),
        values,
    }
}
