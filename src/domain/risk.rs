//! Stop-loss / take-profit overlay on top of the trend signal.
//!
//! Position state is a forward-only state machine: the state on each bar
//! depends on the state realised on the previous bar (forced exits
//! included) and on the current close. One new series is built per run.

use crate::domain::error::BacktestError;
use crate::domain::price::PriceSeries;
use crate::domain::signal::{SignalSeries, Trend};
use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionState {
    Flat,
    Long,
}

impl PositionState {
    pub fn is_long(self) -> bool {
        self == PositionState::Long
    }
}

/// Why a Long position was closed on a bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Signal,
    StopLoss,
    TakeProfit,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskLimits {
    pub stop_loss: f64,
    pub take_profit: f64,
}

impl RiskLimits {
    pub fn new(stop_loss: f64, take_profit: f64) -> Result<Self, BacktestError> {
        let limits = Self {
            stop_loss,
            take_profit,
        };
        limits.validate()?;
        Ok(limits)
    }

    pub fn validate(&self) -> Result<(), BacktestError> {
        check_fraction("stop_loss", self.stop_loss)?;
        check_fraction("take_profit", self.take_profit)?;
        Ok(())
    }

    pub fn stop_loss_triggered(&self, prev_close: f64, close: f64) -> bool {
        close < prev_close * (1.0 - self.stop_loss)
    }

    pub fn take_profit_triggered(&self, prev_close: f64, close: f64) -> bool {
        close > prev_close * (1.0 + self.take_profit)
    }
}

fn check_fraction(name: &'static str, value: f64) -> Result<(), BacktestError> {
    if !(value > 0.0 && value < 1.0) {
        return Err(BacktestError::InvalidRiskParameter { name, value });
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionPoint {
    pub date: NaiveDate,
    pub state: PositionState,
    pub exit: Option<ExitReason>,
}

/// Managed positions for every bar from `start` to the end of the price series.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionSeries {
    pub start: usize,
    pub points: Vec<PositionPoint>,
}

impl PositionSeries {
    /// State held at the close of price bar `index`. Flat during warm-up.
    pub fn state_at(&self, index: usize) -> PositionState {
        index
            .checked_sub(self.start)
            .and_then(|offset| self.points.get(offset))
            .map(|p| p.state)
            .unwrap_or(PositionState::Flat)
    }

    /// Number of price bars this series spans, warm-up included.
    pub fn span(&self) -> usize {
        self.start + self.points.len()
    }

    pub fn exits(&self) -> impl Iterator<Item = &PositionPoint> {
        self.points.iter().filter(|p| p.exit.is_some())
    }
}

/// One transition of the position state machine.
///
/// `previous` is `None` on the first evaluable bar, where no stop or
/// take-profit check applies.
pub fn next_state(
    previous: Option<PositionState>,
    trend: Trend,
    prev_close: f64,
    close: f64,
    limits: &RiskLimits,
) -> (PositionState, Option<ExitReason>) {
    let target = match trend {
        Trend::Up => PositionState::Long,
        Trend::Down => PositionState::Flat,
    };

    if previous != Some(PositionState::Long) {
        return (target, None);
    }

    if limits.stop_loss_triggered(prev_close, close) {
        (PositionState::Flat, Some(ExitReason::StopLoss))
    } else if limits.take_profit_triggered(prev_close, close) {
        (PositionState::Flat, Some(ExitReason::TakeProfit))
    } else if target == PositionState::Flat {
        (PositionState::Flat, Some(ExitReason::Signal))
    } else {
        (target, None)
    }
}

pub fn apply_risk_management(
    prices: &PriceSeries,
    signals: &SignalSeries,
    limits: &RiskLimits,
) -> Result<PositionSeries, BacktestError> {
    limits.validate()?;

    if signals.start + signals.points.len() != prices.len() {
        return Err(BacktestError::MisalignedSeries {
            prices: prices.len(),
            positions: signals.start + signals.points.len(),
        });
    }

    let mut points: Vec<PositionPoint> = Vec::with_capacity(signals.len());
    let mut previous: Option<PositionState> = None;

    for (offset, signal) in signals.points.iter().enumerate() {
        let index = signals.start + offset;
        let prev_close = if index > 0 {
            prices.close(index - 1)
        } else {
            prices.close(index)
        };

        let (state, exit) = next_state(
            previous,
            signal.trend,
            prev_close,
            prices.close(index),
            limits,
        );

        points.push(PositionPoint {
            date: signal.date,
            state,
            exit,
        });
        previous = Some(state);
    }

    Ok(PositionSeries {
        start: signals.start,
        points,
    })
}
