//! Moving-average trend signal.
//!
//! The trend is Up on a bar when SMA(short) > SMA(long) and Down otherwise.
//! Bars before the long average is fully populated form the warm-up period
//! and carry no signal.

use crate::domain::error::BacktestError;
use crate::domain::indicator::sma::calculate_sma;
use crate::domain::indicator::{IndicatorSeries, IndicatorType};
use crate::domain::price::PriceSeries;
use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Up,
    Down,
}

impl Trend {
    /// 1 for Up, 0 for Down.
    pub fn flag(self) -> u8 {
        match self {
            Trend::Up => 1,
            Trend::Down => 0,
        }
    }
}

/// Change of trend relative to the previous evaluable bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    None,
    /// Down -> Up
    Bullish,
    /// Up -> Down
    Bearish,
}

impl Transition {
    pub fn value(self) -> i8 {
        match self {
            Transition::None => 0,
            Transition::Bullish => 1,
            Transition::Bearish => -1,
        }
    }

    fn between(previous: Trend, current: Trend) -> Self {
        match (previous, current) {
            (Trend::Down, Trend::Up) => Transition::Bullish,
            (Trend::Up, Trend::Down) => Transition::Bearish,
            _ => Transition::None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalPoint {
    pub date: NaiveDate,
    pub short_avg: f64,
    pub long_avg: f64,
    pub trend: Trend,
    pub transition: Transition,
}

/// Signals for every bar from `start` to the end of the price series.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalSeries {
    pub short_window: usize,
    pub long_window: usize,
    /// Index into the price series of the first evaluable bar.
    pub start: usize,
    pub points: Vec<SignalPoint>,
}

impl SignalSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Signal for the price bar at `index`, `None` during warm-up.
    pub fn at(&self, index: usize) -> Option<&SignalPoint> {
        index
            .checked_sub(self.start)
            .and_then(|offset| self.points.get(offset))
    }
}

pub fn validate_windows(short_window: usize, long_window: usize) -> Result<(), BacktestError> {
    if short_window == 0 || short_window >= long_window {
        return Err(BacktestError::InvalidWindowPair {
            short: short_window,
            long: long_window,
        });
    }
    Ok(())
}

pub fn generate(
    prices: &PriceSeries,
    short_window: usize,
    long_window: usize,
) -> Result<SignalSeries, BacktestError> {
    validate_windows(short_window, long_window)?;
    check_history(prices, long_window)?;

    let short = calculate_sma(prices, short_window);
    let long = calculate_sma(prices, long_window);
    Ok(build(prices, short_window, long_window, &short, &long))
}

/// Same as [`generate`] but reuses averages that were computed up front.
pub fn generate_from_indicators(
    prices: &PriceSeries,
    short: &IndicatorSeries,
    long: &IndicatorSeries,
) -> Result<SignalSeries, BacktestError> {
    let IndicatorType::Sma(short_window) = short.indicator_type;
    let IndicatorType::Sma(long_window) = long.indicator_type;
    validate_windows(short_window, long_window)?;
    check_history(prices, long_window)?;

    if short.values.len() != prices.len() || long.values.len() != prices.len() {
        return Err(BacktestError::MisalignedSeries {
            prices: prices.len(),
            positions: short.values.len().min(long.values.len()),
        });
    }

    Ok(build(prices, short_window, long_window, short, long))
}

fn check_history(prices: &PriceSeries, long_window: usize) -> Result<(), BacktestError> {
    if prices.len() <= long_window {
        return Err(BacktestError::InsufficientHistory {
            bars: prices.len(),
            required: long_window,
        });
    }
    Ok(())
}

fn build(
    prices: &PriceSeries,
    short_window: usize,
    long_window: usize,
    short: &IndicatorSeries,
    long: &IndicatorSeries,
) -> SignalSeries {
    let start = long_window - 1;
    let mut points: Vec<SignalPoint> = Vec::with_capacity(prices.len() - start);

    for index in start..prices.len() {
        // Both windows are full from `start` onwards since short < long.
        let short_avg = short.values[index].value;
        let long_avg = long.values[index].value;

        let trend = if short_avg > long_avg {
            Trend::Up
        } else {
            Trend::Down
        };
        let transition = match points.last() {
            Some(prev) => Transition::between(prev.trend, trend),
            None => Transition::None,
        };

        points.push(SignalPoint {
            date: prices.date(index),
            short_avg,
            long_avg,
            trend,
            transition,
        });
    }

    SignalSeries {
        short_window,
        long_window,
        start,
        points,
    }
}
