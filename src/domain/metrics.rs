//! Performance metrics for a strategy run.

use crate::domain::error::BacktestError;
use crate::domain::returns::{ReturnRecord, terminal_strategy_return};

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub periods: usize,
    pub total_return: f64,
    /// `None` when strategy returns have zero variance.
    pub sharpe_ratio: Option<f64>,
    /// `None` when the curve falls below a running peak of zero, where the
    /// peak-relative ratio is undefined.
    pub max_drawdown: Option<f64>,
    /// Drawdown of the equity curve `1 + cumulative return`; always defined.
    pub equity_max_drawdown: f64,
    /// Terminal return divided by the number of years (linear).
    pub annualized_return: f64,
    /// (1 + terminal return)^(252 / periods) - 1.
    pub geometric_annualized_return: f64,
}

impl Metrics {
    pub fn compute(records: &[ReturnRecord]) -> Result<Self, BacktestError> {
        if records.is_empty() {
            return Err(BacktestError::EmptyPriceSeries);
        }

        let periods = records.len();
        let total_return = terminal_strategy_return(records);
        let years = periods as f64 / TRADING_DAYS_PER_YEAR;

        let sharpe_ratio = match sharpe_ratio(records) {
            Ok(s) => Some(s),
            Err(e) => {
                tracing::debug!(error = %e, "sharpe ratio undefined");
                None
            }
        };

        let max_drawdown = match max_drawdown(records) {
            Ok(dd) => Some(dd),
            Err(e) => {
                tracing::debug!(error = %e, "max drawdown undefined");
                None
            }
        };

        Ok(Metrics {
            periods,
            total_return,
            sharpe_ratio,
            max_drawdown,
            equity_max_drawdown: equity_max_drawdown(records),
            annualized_return: total_return / years,
            geometric_annualized_return: (1.0 + total_return).powf(1.0 / years) - 1.0,
        })
    }
}

/// Annualised Sharpe ratio of the strategy's per-bar returns.
///
/// The first record carries no period return and is left out. Uses the
/// sample standard deviation and no risk-free rate.
pub fn sharpe_ratio(records: &[ReturnRecord]) -> Result<f64, BacktestError> {
    let returns: Vec<f64> = records.iter().skip(1).map(|r| r.strategy_return).collect();

    if returns.len() < 2 {
        return Err(BacktestError::DegenerateSeries {
            reason: format!("{} period returns, need at least 2", returns.len()),
        });
    }

    let n = returns.len() as f64;
    let mean: f64 = returns.iter().sum::<f64>() / n;
    let variance: f64 = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let stddev = variance.sqrt();

    if stddev == 0.0 || stddev <= mean.abs() * 1e-9 {
        return Err(BacktestError::DegenerateSeries {
            reason: "strategy returns have zero variance".into(),
        });
    }

    Ok(mean / stddev * TRADING_DAYS_PER_YEAR.sqrt())
}

/// Most negative (cum - peak) / peak over the cumulative strategy return.
///
/// Returns 0 when the curve never falls below its running peak. A fall
/// below a peak that is not positive has no finite ratio and yields
/// `DegenerateSeries`; [`equity_max_drawdown`] covers that case.
pub fn max_drawdown(records: &[ReturnRecord]) -> Result<f64, BacktestError> {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;

    for record in records {
        let cum = record.cumulative_strategy_return;
        if cum > peak {
            peak = cum;
        }
        if cum < peak {
            if peak <= 0.0 {
                return Err(BacktestError::DegenerateSeries {
                    reason: format!(
                        "cumulative return {cum} on {} is below a non-positive peak {peak}",
                        record.date
                    ),
                });
            }
            max_dd = max_dd.min((cum - peak) / peak);
        }
    }

    Ok(max_dd)
}

/// Most negative fractional fall of the equity curve `1 + cum` from its
/// running peak. Equity starts at 1, so the ratio is always defined.
pub fn equity_max_drawdown(records: &[ReturnRecord]) -> f64 {
    let mut peak = 1.0_f64;
    let mut max_dd = 0.0_f64;

    for record in records {
        let equity = 1.0 + record.cumulative_strategy_return;
        peak = peak.max(equity);
        max_dd = max_dd.min((equity - peak) / peak);
    }

    max_dd
}
