//! Plain-text report writer.

use crate::domain::error::BacktestError;
use crate::domain::metrics::Metrics;
use crate::domain::optimizer::SearchResult;
use crate::domain::quarter::Quarter;
use crate::ports::report_port::ReportPort;
use std::io::Write;

/// Ranked cells listed under the winner.
const TOP_N: usize = 5;
/// Closes shown per quarter.
const QUARTER_PREVIEW: usize = 5;

pub struct ConsoleReportAdapter<W: Write> {
    out: W,
}

impl<W: Write> ConsoleReportAdapter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

fn pct(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

impl<W: Write> ReportPort for ConsoleReportAdapter<W> {
    fn write_search(
        &mut self,
        ticker: &str,
        result: &SearchResult,
        metrics: &Metrics,
    ) -> Result<(), BacktestError> {
        let out = &mut self.out;
        let p = &result.best_params;

        writeln!(out, "=== {} ===", ticker)?;
        writeln!(
            out,
            "Combinations:     {} evaluated, {} skipped",
            result.evaluated(),
            result.skipped.len()
        )?;
        writeln!(out, "Best Parameters:")?;
        writeln!(out, "  Short Window:   {}", p.short_window)?;
        writeln!(out, "  Long Window:    {}", p.long_window)?;
        writeln!(out, "  Stop Loss:      {}", pct(p.stop_loss))?;
        writeln!(out, "  Take Profit:    {}", pct(p.take_profit))?;
        writeln!(out, "Best Return:      {}", pct(result.best_return))?;

        writeln!(out, "Metrics:")?;
        writeln!(out, "  Periods:        {}", metrics.periods)?;
        match metrics.sharpe_ratio {
            Some(s) => writeln!(out, "  Sharpe Ratio:   {:.4}", s)?,
            None => writeln!(out, "  Sharpe Ratio:   n/a")?,
        }
        match metrics.max_drawdown {
            Some(dd) => writeln!(out, "  Max Drawdown:   {} (from return peak)", pct(dd))?,
            None => writeln!(out, "  Max Drawdown:   n/a (from return peak)")?,
        }
        writeln!(
            out,
            "  Max Drawdown:   {} (from equity peak)",
            pct(metrics.equity_max_drawdown)
        )?;
        writeln!(out, "  Annualized:     {} (linear)", pct(metrics.annualized_return))?;
        writeln!(
            out,
            "  Annualized:     {} (compound)",
            pct(metrics.geometric_annualized_return)
        )?;

        let ranked = result.ranked();
        if ranked.len() > 1 {
            writeln!(out, "Top {}:", TOP_N.min(ranked.len()))?;
            for (rank, eval) in ranked.iter().take(TOP_N).enumerate() {
                writeln!(out, "  {}. {}  {}", rank + 1, eval.params, pct(eval.score))?;
            }
        }

        out.flush()?;
        Ok(())
    }

    fn write_quarters(
        &mut self,
        ticker: &str,
        quarters: &[Quarter<'_>],
    ) -> Result<(), BacktestError> {
        let out = &mut self.out;
        writeln!(out, "=== {} ({} quarters) ===", ticker, quarters.len())?;

        for quarter in quarters {
            writeln!(
                out,
                "{}: {} bars",
                quarter.label(),
                quarter.observations.len()
            )?;
            for obs in quarter.observations.iter().take(QUARTER_PREVIEW) {
                writeln!(out, "  {}  {:.4}", obs.date, obs.close)?;
            }
        }

        out.flush()?;
        Ok(())
    }
}
