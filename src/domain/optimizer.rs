//! Exhaustive grid search over strategy parameters.
//!
//! Every cell of the Cartesian product runs signal -> risk overlay ->
//! returns independently against the same read-only price series. Cells are
//! scored by terminal cumulative strategy return; a strictly greater score
//! replaces the best so far, so the earliest enumerated cell wins ties.

use rayon::prelude::*;
use std::collections::HashMap;

use crate::domain::error::BacktestError;
use crate::domain::indicator::{IndicatorSeries, IndicatorType, compute_indicators};
use crate::domain::price::PriceSeries;
use crate::domain::returns::{ReturnRecord, compute_returns, terminal_strategy_return};
use crate::domain::risk::{PositionSeries, RiskLimits, apply_risk_management};
use crate::domain::signal::{self, SignalSeries, validate_windows};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterSet {
    pub short_window: usize,
    pub long_window: usize,
    pub stop_loss: f64,
    pub take_profit: f64,
}

impl ParameterSet {
    pub fn validate(&self) -> Result<(), BacktestError> {
        validate_windows(self.short_window, self.long_window)?;
        self.limits().validate()
    }

    pub fn limits(&self) -> RiskLimits {
        RiskLimits {
            stop_loss: self.stop_loss,
            take_profit: self.take_profit,
        }
    }
}

impl std::fmt::Display for ParameterSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "short_window={}, long_window={}, stop_loss={}, take_profit={}",
            self.short_window, self.long_window, self.stop_loss, self.take_profit
        )
    }
}

/// Output of a single signal -> overlay -> returns pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationRun {
    pub params: ParameterSet,
    pub signals: SignalSeries,
    pub positions: PositionSeries,
    pub records: Vec<ReturnRecord>,
}

impl SimulationRun {
    pub fn terminal_return(&self) -> f64 {
        terminal_strategy_return(&self.records)
    }
}

/// Run the full pipeline for one parameter set.
pub fn simulate(
    prices: &PriceSeries,
    params: &ParameterSet,
) -> Result<SimulationRun, BacktestError> {
    let signals = signal::generate(prices, params.short_window, params.long_window)?;
    finish_run(prices, params, signals)
}

fn simulate_cached(
    prices: &PriceSeries,
    params: &ParameterSet,
    averages: &HashMap<IndicatorType, IndicatorSeries>,
) -> Result<SimulationRun, BacktestError> {
    params.validate()?;
    let signals = match (
        averages.get(&IndicatorType::Sma(params.short_window)),
        averages.get(&IndicatorType::Sma(params.long_window)),
    ) {
        (Some(short), Some(long)) => signal::generate_from_indicators(prices, short, long)?,
        _ => signal::generate(prices, params.short_window, params.long_window)?,
    };
    finish_run(prices, params, signals)
}

fn finish_run(
    prices: &PriceSeries,
    params: &ParameterSet,
    signals: SignalSeries,
) -> Result<SimulationRun, BacktestError> {
    let positions = apply_risk_management(prices, &signals, &params.limits())?;
    let records = compute_returns(prices, &positions)?;
    Ok(SimulationRun {
        params: *params,
        signals,
        positions,
        records,
    })
}

/// The four search axes, enumerated outer to inner in field order.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterGrid {
    pub short_windows: Vec<usize>,
    pub long_windows: Vec<usize>,
    pub stop_losses: Vec<f64>,
    pub take_profits: Vec<f64>,
}

impl Default for ParameterGrid {
    /// Short 10..=30 step 5, long 50..=100 step 10, three stops, three targets.
    fn default() -> Self {
        Self {
            short_windows: (10..31).step_by(5).collect(),
            long_windows: (50..101).step_by(10).collect(),
            stop_losses: vec![0.03, 0.05, 0.07],
            take_profits: vec![0.05, 0.10, 0.15],
        }
    }
}

impl ParameterGrid {
    pub fn size(&self) -> usize {
        self.short_windows.len()
            * self.long_windows.len()
            * self.stop_losses.len()
            * self.take_profits.len()
    }

    /// All cells in enumeration order, invalid combinations included.
    pub fn combinations(&self) -> Vec<ParameterSet> {
        let mut cells = Vec::with_capacity(self.size());
        for &short_window in &self.short_windows {
            for &long_window in &self.long_windows {
                for &stop_loss in &self.stop_losses {
                    for &take_profit in &self.take_profits {
                        cells.push(ParameterSet {
                            short_window,
                            long_window,
                            stop_loss,
                            take_profit,
                        });
                    }
                }
            }
        }
        cells
    }

    fn indicator_types(&self) -> Vec<IndicatorType> {
        self.short_windows
            .iter()
            .chain(&self.long_windows)
            .map(|&w| IndicatorType::Sma(w))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub index: usize,
    pub params: ParameterSet,
    pub score: f64,
}

#[derive(Debug, Clone)]
pub struct SkippedCell {
    pub index: usize,
    pub params: ParameterSet,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct SearchResult {
    pub best_params: ParameterSet,
    pub best_return: f64,
    /// Return records of the winning run.
    pub records: Vec<ReturnRecord>,
    /// Every scored cell, in enumeration order.
    pub evaluations: Vec<Evaluation>,
    pub skipped: Vec<SkippedCell>,
}

impl SearchResult {
    pub fn evaluated(&self) -> usize {
        self.evaluations.len()
    }

    /// Scored cells ordered best first; ties keep enumeration order.
    pub fn ranked(&self) -> Vec<&Evaluation> {
        let mut ranked: Vec<&Evaluation> = self.evaluations.iter().collect();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.index.cmp(&b.index)));
        ranked
    }
}

enum CellOutcome {
    Scored(Evaluation),
    Skipped(SkippedCell),
}

/// Grid search executor.
pub struct GridSearch {
    parallel: bool,
    max_combinations: Option<usize>,
}

impl Default for GridSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl GridSearch {
    pub fn new() -> Self {
        Self {
            parallel: true,
            max_combinations: None,
        }
    }

    /// Enables or disables parallel execution.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Reject grids with more cells than `cap` before running anything.
    pub fn with_max_combinations(mut self, cap: Option<usize>) -> Self {
        self.max_combinations = cap;
        self
    }

    pub fn search(
        &self,
        prices: &PriceSeries,
        grid: &ParameterGrid,
    ) -> Result<SearchResult, BacktestError> {
        let size = grid.size();
        if let Some(cap) = self.max_combinations {
            if size > cap {
                return Err(BacktestError::GridTooLarge { size, cap });
            }
        }

        let cells = grid.combinations();
        let averages = compute_indicators(prices, &grid.indicator_types());
        tracing::info!(
            cells = size,
            bars = prices.len(),
            parallel = self.parallel,
            "starting grid search"
        );

        let outcomes = evaluate_all(prices, &cells, &averages, self.parallel)?;

        let mut evaluations = Vec::new();
        let mut skipped = Vec::new();
        for outcome in outcomes {
            match outcome {
                CellOutcome::Scored(e) => evaluations.push(e),
                CellOutcome::Skipped(s) => skipped.push(s),
            }
        }

        let best = evaluations
            .iter()
            .fold(None, |best: Option<&Evaluation>, candidate| match best {
                Some(current) if !(candidate.score > current.score) => Some(current),
                _ => Some(candidate),
            })
            .cloned();

        let Some(best) = best else {
            tracing::warn!(skipped = skipped.len(), "no valid parameter combination");
            return Err(BacktestError::NoValidCombination {
                skipped: skipped.len(),
            });
        };

        let winner = simulate_cached(prices, &best.params, &averages)?;
        tracing::info!(
            evaluated = evaluations.len(),
            skipped = skipped.len(),
            best = %best.params,
            best_return = best.score,
            "grid search complete"
        );

        Ok(SearchResult {
            best_params: best.params,
            best_return: best.score,
            records: winner.records,
            evaluations,
            skipped,
        })
    }
}

/// Outcomes in enumeration order. The first error that is not a parameter
/// validation failure aborts the search.
fn evaluate_all(
    prices: &PriceSeries,
    cells: &[ParameterSet],
    averages: &HashMap<IndicatorType, IndicatorSeries>,
    parallel: bool,
) -> Result<Vec<CellOutcome>, BacktestError> {
    let evaluate = |(index, params): (usize, &ParameterSet)| {
        evaluate_cell(prices, index, params, averages)
    };

    if parallel {
        cells.par_iter().enumerate().map(evaluate).collect()
    } else {
        cells.iter().enumerate().map(evaluate).collect()
    }
}

fn evaluate_cell(
    prices: &PriceSeries,
    index: usize,
    params: &ParameterSet,
    averages: &HashMap<IndicatorType, IndicatorSeries>,
) -> Result<CellOutcome, BacktestError> {
    match simulate_cached(prices, params, averages) {
        Ok(run) => {
            let score = run.terminal_return();
            tracing::debug!(%params, cumulative_return = score, "evaluated");
            Ok(CellOutcome::Scored(Evaluation {
                index,
                params: *params,
                score,
            }))
        }
        Err(e) if e.is_parameter_error() => {
            match e {
                BacktestError::InvalidWindowPair { .. } => {
                    tracing::debug!(%params, "skipping invalid window pair");
                }
                _ => tracing::warn!(%params, error = %e, "skipping cell"),
            }
            Ok(CellOutcome::Skipped(SkippedCell {
                index,
                params: *params,
                reason: e.to_string(),
            }))
        }
        Err(e) => {
            tracing::error!(%params, error = %e, "aborting grid search");
            Err(e)
        }
    }
}

/// Convenience wrapper running a sequential search with no cap.
pub fn search(
    prices: &PriceSeries,
    short_windows: &[usize],
    long_windows: &[usize],
    stop_losses: &[f64],
    take_profits: &[f64],
) -> Result<SearchResult, BacktestError> {
    let grid = ParameterGrid {
        short_windows: short_windows.to_vec(),
        long_windows: long_windows.to_vec(),
        stop_losses: stop_losses.to_vec(),
        take_profits: take_profits.to_vec(),
    };
    GridSearch::new().with_parallelism(false).search(prices, &grid)
}
