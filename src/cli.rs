//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::console_report_adapter::ConsoleReportAdapter;
use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::config_validation::{
    DataConfig, SearchOptions, build_data_config, build_grid, build_search_options,
    validate_data_config, validate_grid_config,
};
use crate::domain::error::BacktestError;
use crate::domain::metrics::Metrics;
use crate::domain::optimizer::{GridSearch, ParameterGrid, SearchResult};
use crate::domain::quarter::split_into_quarters;
use crate::ports::data_port::PriceDataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(
    name = "trendgrid",
    about = "Moving-average crossover back-tester with grid search"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Grid-search the strategy parameters for each ticker
    Optimize {
        #[arg(short, long)]
        config: PathBuf,
        /// Run a single ticker instead of the configured list
        #[arg(long)]
        ticker: Option<String>,
        /// Evaluate the grid on one thread
        #[arg(long)]
        sequential: bool,
    },
    /// Show the calendar-quarter split of each ticker's prices
    Quarters {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        ticker: Option<String>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Optimize {
            config,
            ticker,
            sequential,
        } => run_optimize(&config, ticker.as_deref(), sequential),
        Command::Quarters { config, ticker } => run_quarters(&config, ticker.as_deref()),
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(fail)
}

fn fail(err: BacktestError) -> ExitCode {
    eprintln!("error: {err}");
    (&err).into()
}

fn run_optimize(config_path: &PathBuf, ticker: Option<&str>, sequential: bool) -> ExitCode {
    // Stage 1: Load and validate config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let data_config = match build_data_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let grid = match build_grid(&adapter) {
        Ok(g) => g,
        Err(e) => return fail(e),
    };
    let mut options = match build_search_options(&adapter) {
        Ok(o) => o,
        Err(e) => return fail(e),
    };
    if sequential {
        options.parallel = false;
    }

    // Stage 2: Resolve tickers
    let data_port = CsvAdapter::new(data_config.directory.clone());
    let tickers = match resolve_tickers(ticker, &data_config, &data_port) {
        Ok(t) => t,
        Err(e) => return fail(e),
    };
    eprintln!(
        "Optimizing {} ticker(s) over {} combinations, {} to {}",
        tickers.len(),
        grid.size(),
        data_config.start_date,
        data_config.end_date,
    );

    // Stage 3: Search and report
    let mut report = ConsoleReportAdapter::new(io::stdout().lock());

    match run_optimize_pipeline(
        &data_port,
        &mut report,
        &tickers,
        &data_config,
        &grid,
        options,
    ) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(e),
    }
}

/// Fetch, search and report every ticker. A failing ticker is reported
/// and skipped; the last failure is returned when no ticker succeeds.
pub fn run_optimize_pipeline(
    data_port: &dyn PriceDataPort,
    report: &mut dyn ReportPort,
    tickers: &[String],
    data_config: &DataConfig,
    grid: &ParameterGrid,
    options: SearchOptions,
) -> Result<(), BacktestError> {
    let search = GridSearch::new()
        .with_parallelism(options.parallel)
        .with_max_combinations(options.max_combinations);

    let mut succeeded = 0;
    let mut last_error = None;

    for ticker in tickers {
        match optimize_ticker(data_port, &search, ticker, data_config, grid) {
            Ok((result, metrics)) => {
                report.write_search(ticker, &result, &metrics)?;
                succeeded += 1;
            }
            Err(e) => {
                eprintln!("warning: skipping {} ({})", ticker, e);
                last_error = Some(e);
            }
        }
    }

    match last_error {
        Some(e) if succeeded == 0 => Err(e),
        _ => Ok(()),
    }
}

pub fn optimize_ticker(
    data_port: &dyn PriceDataPort,
    search: &GridSearch,
    ticker: &str,
    data_config: &DataConfig,
    grid: &ParameterGrid,
) -> Result<(SearchResult, Metrics), BacktestError> {
    let prices = data_port.fetch_prices(ticker, data_config.start_date, data_config.end_date)?;
    tracing::info!(
        ticker,
        bars = prices.len(),
        first = %prices.first_date(),
        last = %prices.last_date(),
        "prices loaded"
    );

    let result = search.search(&prices, grid)?;
    let metrics = Metrics::compute(&result.records)?;
    Ok((result, metrics))
}

fn run_quarters(config_path: &PathBuf, ticker: Option<&str>) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let data_config = match build_data_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };

    let data_port = CsvAdapter::new(data_config.directory.clone());
    let tickers = match resolve_tickers(ticker, &data_config, &data_port) {
        Ok(t) => t,
        Err(e) => return fail(e),
    };
    let mut report = ConsoleReportAdapter::new(io::stdout().lock());

    match run_quarters_pipeline(&data_port, &mut report, &tickers, &data_config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(e),
    }
}

/// Split and report every ticker by calendar quarter, skipping failing
/// tickers the same way [`run_optimize_pipeline`] does.
pub fn run_quarters_pipeline(
    data_port: &dyn PriceDataPort,
    report: &mut dyn ReportPort,
    tickers: &[String],
    data_config: &DataConfig,
) -> Result<(), BacktestError> {
    let mut succeeded = 0;
    let mut last_error = None;

    for ticker in tickers {
        match data_port.fetch_prices(ticker, data_config.start_date, data_config.end_date) {
            Ok(prices) => {
                tracing::info!(
                    ticker,
                    first = %prices.first_date(),
                    last = %prices.last_date(),
                    "splitting into quarters"
                );
                report.write_quarters(ticker, &split_into_quarters(&prices))?;
                succeeded += 1;
            }
            Err(e) => {
                eprintln!("warning: skipping {} ({})", ticker, e);
                last_error = Some(e);
            }
        }
    }

    match last_error {
        Some(e) if succeeded == 0 => Err(e),
        _ => Ok(()),
    }
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_data_config(&adapter) {
        return fail(e);
    }
    if let Err(e) = validate_grid_config(&adapter) {
        return fail(e);
    }

    let grid = match build_grid(&adapter) {
        Ok(g) => g,
        Err(e) => return fail(e),
    };
    let options = match build_search_options(&adapter) {
        Ok(o) => o,
        Err(e) => return fail(e),
    };

    if let Some(cap) = options.max_combinations.filter(|&cap| grid.size() > cap) {
        return fail(BacktestError::GridTooLarge {
            size: grid.size(),
            cap,
        });
    }

    println!("Config is valid");
    println!(
        "  Grid: {} short x {} long x {} stop-loss x {} take-profit = {} combinations",
        grid.short_windows.len(),
        grid.long_windows.len(),
        grid.stop_losses.len(),
        grid.take_profits.len(),
        grid.size(),
    );
    ExitCode::SUCCESS
}

/// `--ticker` overrides the configured list; with neither, every ticker the
/// data source lists is used.
pub fn resolve_tickers(
    ticker_override: Option<&str>,
    data_config: &DataConfig,
    data_port: &dyn PriceDataPort,
) -> Result<Vec<String>, BacktestError> {
    if let Some(t) = ticker_override {
        return Ok(vec![t.trim().to_uppercase()]);
    }
    if !data_config.tickers.is_empty() {
        return Ok(data_config.tickers.clone());
    }

    let tickers = data_port.list_tickers()?;
    if tickers.is_empty() {
        return Err(BacktestError::Data {
            reason: format!("no price files in {}", data_config.directory.display()),
        });
    }
    Ok(tickers)
}
