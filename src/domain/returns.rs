//! Per-bar market and strategy returns.
//!
//! The strategy earns the bar-t price change only when the position held at
//! the close of bar t-1 was Long, so entering on a bar earns nothing until
//! the following bar.

use crate::domain::error::BacktestError;
use crate::domain::price::PriceSeries;
use crate::domain::risk::{PositionSeries, PositionState};
use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReturnRecord {
    pub date: NaiveDate,
    pub position: PositionState,
    pub market_return: f64,
    pub strategy_return: f64,
    pub cumulative_market_return: f64,
    pub cumulative_strategy_return: f64,
}

/// Compute one record per price bar. The first bar has a period return of 0.
pub fn compute_returns(
    prices: &PriceSeries,
    positions: &PositionSeries,
) -> Result<Vec<ReturnRecord>, BacktestError> {
    if positions.span() != prices.len() {
        return Err(BacktestError::MisalignedSeries {
            prices: prices.len(),
            positions: positions.span(),
        });
    }

    let mut records = Vec::with_capacity(prices.len());
    let mut market_growth = 1.0_f64;
    let mut strategy_growth = 1.0_f64;

    for index in 0..prices.len() {
        let market_return = prices.period_return(index);
        let held = index > 0 && positions.state_at(index - 1).is_long();
        let strategy_return = if held { market_return } else { 0.0 };

        market_growth *= 1.0 + market_return;
        strategy_growth *= 1.0 + strategy_return;

        records.push(ReturnRecord {
            date: prices.date(index),
            position: positions.state_at(index),
            market_return,
            strategy_return,
            cumulative_market_return: market_growth - 1.0,
            cumulative_strategy_return: strategy_growth - 1.0,
        });
    }

    Ok(records)
}

/// Cumulative strategy return on the last bar, 0 for an empty run.
pub fn terminal_strategy_return(records: &[ReturnRecord]) -> f64 {
    records
        .last()
        .map(|r| r.cumulative_strategy_return)
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::price::PriceObservation;
    use crate::domain::risk::PositionPoint;
    use crate::domain::risk::PositionState::{Flat, Long};

    fn make_series(prices: &[f64]) -> PriceSeries {
        PriceSeries::new(
            prices
                .iter()
                .enumerate()
                .map(|(i, &close)| PriceObservation {
                    date: NaiveDate::from_ymd_opt(2024, 1, (i + 1) as u32).unwrap(),
                    close,
                })
                .collect(),
        )
        .unwrap()
    }

    fn make_positions(
        prices: &PriceSeries,
        start: usize,
        states: &[PositionState],
    ) -> PositionSeries {
        PositionSeries {
            start,
            points: states
                .iter()
                .enumerate()
                .map(|(i, &state)| PositionPoint {
                    date: prices.date(start + i),
                    state,
                    exit: None,
                })
                .collect(),
        }
    }

    #[test]
    fn entry_bar_earns_nothing() {
        let prices = make_series(&[100.0, 110.0, 121.0, 133.1]);
        let positions = make_positions(&prices, 1, &[Long, Long, Flat]);
        let records = compute_returns(&prices, &positions).unwrap();

        assert_eq!(records.len(), 4);
        assert_eq!(records[0].strategy_return, 0.0);
        // Long decided on bar 1 earns nothing on bar 1
        assert_eq!(records[1].strategy_return, 0.0);
        assert!((records[2].strategy_return - 0.10).abs() < 1e-12);
        assert!((records[3].strategy_return - 0.10).abs() < 1e-12);
    }

    #[test]
    fn cumulative_returns_compound() {
        let prices = make_series(&[100.0, 110.0, 121.0, 133.1]);
        let positions = make_positions(&prices, 1, &[Long, Long, Flat]);
        let records = compute_returns(&prices, &positions).unwrap();

        assert!((records[3].cumulative_market_return - 0.331).abs() < 1e-12);
        assert!((records[3].cumulative_strategy_return - 0.21).abs() < 1e-12);
        assert!((terminal_strategy_return(&records) - 0.21).abs() < 1e-12);
    }

    #[test]
    fn warm_up_bars_are_flat() {
        let prices = make_series(&[100.0, 50.0, 100.0]);
        let positions = make_positions(&prices, 2, &[Long]);
        let records = compute_returns(&prices, &positions).unwrap();

        assert_eq!(records[0].position, Flat);
        assert_eq!(records[1].position, Flat);
        assert_eq!(records[2].position, Long);
        assert!(records.iter().all(|r| r.strategy_return == 0.0));
        assert!((records[1].market_return - (-0.5)).abs() < 1e-12);
        assert!((records[2].cumulative_market_return - 0.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_misaligned_positions() {
        let prices = make_series(&[100.0, 101.0, 102.0]);
        let other = make_series(&[100.0, 101.0, 102.0, 103.0]);
        let positions = make_positions(&other, 1, &[Long, Long, Long]);
        let err = compute_returns(&prices, &positions).unwrap_err();
        assert!(matches!(
            err,
            BacktestError::MisalignedSeries {
                prices: 3,
                positions: 4
            }
        ));
    }

    #[test]
    fn terminal_return_of_empty_run_is_zero() {
        assert_eq!(terminal_strategy_return(&[]), 0.0);
    }
}
