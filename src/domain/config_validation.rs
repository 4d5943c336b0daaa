//! Configuration validation and parsing.
//!
//! Validates every key before any data is loaded, then turns the config
//! into the domain types the search runs on.

use crate::domain::error::BacktestError;
use crate::domain::optimizer::ParameterGrid;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use std::collections::HashSet;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub struct DataConfig {
    pub directory: PathBuf,
    /// Empty when `tickers` is absent: every ticker the data source lists.
    pub tickers: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    pub parallel: bool,
    pub max_combinations: Option<usize>,
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    build_data_config(config).map(|_| ())
}

pub fn validate_grid_config(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    build_grid(config)?;
    build_search_options(config)?;
    Ok(())
}

pub fn build_data_config(config: &dyn ConfigPort) -> Result<DataConfig, BacktestError> {
    let directory = required(config, "data", "directory")?;
    let tickers = match config.get_string("data", "tickers") {
        Some(s) => parse_tickers(&s)?,
        None => Vec::new(),
    };

    let start_date = parse_date(config.get_string("data", "start_date").as_deref(), "start_date")?;
    let end_date = parse_date(config.get_string("data", "end_date").as_deref(), "end_date")?;
    if start_date >= end_date {
        return Err(invalid("data", "start_date", "start_date must be before end_date"));
    }

    Ok(DataConfig {
        directory: PathBuf::from(directory),
        tickers,
        start_date,
        end_date,
    })
}

/// Grid axes from `[grid]`; absent keys fall back to the default grid.
pub fn build_grid(config: &dyn ConfigPort) -> Result<ParameterGrid, BacktestError> {
    let defaults = ParameterGrid::default();

    let short_windows = match config.get_string("grid", "short_windows") {
        Some(s) => parse_window_axis(&s, "short_windows")?,
        None => defaults.short_windows,
    };
    let long_windows = match config.get_string("grid", "long_windows") {
        Some(s) => parse_window_axis(&s, "long_windows")?,
        None => defaults.long_windows,
    };
    let stop_losses = match config.get_string("grid", "stop_losses") {
        Some(s) => parse_fraction_axis(&s, "stop_losses")?,
        None => defaults.stop_losses,
    };
    let take_profits = match config.get_string("grid", "take_profits") {
        Some(s) => parse_fraction_axis(&s, "take_profits")?,
        None => defaults.take_profits,
    };

    let grid = ParameterGrid {
        short_windows,
        long_windows,
        stop_losses,
        take_profits,
    };

    let any_valid_pair = grid
        .short_windows
        .iter()
        .any(|s| grid.long_windows.iter().any(|l| s < l));
    if !any_valid_pair {
        return Err(invalid(
            "grid",
            "long_windows",
            "no long window is greater than any short window",
        ));
    }

    Ok(grid)
}

pub fn build_search_options(config: &dyn ConfigPort) -> Result<SearchOptions, BacktestError> {
    let cap = config.get_int("grid", "max_combinations", 0);
    if cap < 0 {
        return Err(invalid(
            "grid",
            "max_combinations",
            "max_combinations must be non-negative",
        ));
    }

    Ok(SearchOptions {
        parallel: config.get_bool("grid", "parallel", true),
        max_combinations: if cap == 0 { None } else { Some(cap as usize) },
    })
}

/// Comma-separated ticker list, upper-cased, no empties or duplicates.
pub fn parse_tickers(input: &str) -> Result<Vec<String>, BacktestError> {
    let mut tickers = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(invalid("data", "tickers", "empty token in ticker list"));
        }
        let ticker = trimmed.to_uppercase();
        if !seen.insert(ticker.clone()) {
            return Err(invalid(
                "data",
                "tickers",
                &format!("duplicate ticker: {ticker}"),
            ));
        }
        tickers.push(ticker);
    }

    Ok(tickers)
}

/// `10, 20, 30` or `start..end [step n]` (end exclusive).
pub fn parse_window_axis(input: &str, key: &str) -> Result<Vec<usize>, BacktestError> {
    let input = input.trim();

    let values: Vec<usize> = if let Some((start, rest)) = input.split_once("..") {
        let (end, step) = match rest.split_once("step") {
            Some((end, step)) => (end, parse_usize(step, key)?),
            None => (rest, 1),
        };
        let start = parse_usize(start, key)?;
        let end = parse_usize(end, key)?;
        if step == 0 {
            return Err(invalid("grid", key, "step must be at least 1"));
        }
        (start..end).step_by(step).collect()
    } else {
        input
            .split(',')
            .map(|token| parse_usize(token, key))
            .collect::<Result<_, _>>()?
    };

    if values.is_empty() {
        return Err(invalid("grid", key, "axis is empty"));
    }
    if values.contains(&0) {
        return Err(invalid("grid", key, "windows must be at least 1"));
    }
    Ok(values)
}

/// Comma-separated fractions, each strictly between 0 and 1.
pub fn parse_fraction_axis(input: &str, key: &str) -> Result<Vec<f64>, BacktestError> {
    let mut values = Vec::new();
    for token in input.split(',') {
        let value: f64 = token.trim().parse().map_err(|_| {
            invalid("grid", key, &format!("not a number: {:?}", token.trim()))
        })?;
        if !(value > 0.0 && value < 1.0) {
            return Err(invalid(
                "grid",
                key,
                &format!("{value} must lie strictly between 0 and 1"),
            ));
        }
        values.push(value);
    }
    Ok(values)
}

fn parse_usize(token: &str, key: &str) -> Result<usize, BacktestError> {
    token
        .trim()
        .parse()
        .map_err(|_| invalid("grid", key, &format!("not a window size: {:?}", token.trim())))
}

fn parse_date(value: Option<&str>, field: &str) -> Result<NaiveDate, BacktestError> {
    match value {
        None => Err(BacktestError::ConfigMissing {
            section: "data".to_string(),
            key: field.to_string(),
        }),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            invalid(
                "data",
                field,
                &format!("invalid {} format, expected YYYY-MM-DD", field),
            )
        }),
    }
}

fn required(config: &dyn ConfigPort, section: &str, key: &str) -> Result<String, BacktestError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(BacktestError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
    }
}

fn invalid(section: &str, key: &str, reason: &str) -> BacktestError {
    BacktestError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    const DATA: &str = "[data]\ndirectory = /tmp/prices\ntickers = btc-usd, ETH-USD\nstart_date = 2020-01-01\nend_date = 2024-01-01\n";

    #[test]
    fn valid_data_config_builds() {
        let config = make_config(DATA);
        let data = build_data_config(&config).unwrap();
        assert_eq!(data.directory, PathBuf::from("/tmp/prices"));
        assert_eq!(data.tickers, vec!["BTC-USD", "ETH-USD"]);
        assert_eq!(data.start_date, NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        assert!(validate_data_config(&config).is_ok());
    }

    #[test]
    fn missing_directory_fails() {
        let config = make_config("[data]\ntickers = BTC-USD\nstart_date = 2020-01-01\nend_date = 2024-01-01\n");
        let err = validate_data_config(&config).unwrap_err();
        assert!(matches!(err, BacktestError::ConfigMissing { key, .. } if key == "directory"));
    }

    #[test]
    fn invalid_start_date_format_fails() {
        let config = make_config("[data]\ndirectory = x\ntickers = A\nstart_date = 2020/01/01\nend_date = 2024-01-01\n");
        let err = validate_data_config(&config).unwrap_err();
        assert!(matches!(err, BacktestError::ConfigInvalid { key, .. } if key == "start_date"));
    }

    #[test]
    fn start_date_after_end_date_fails() {
        let config = make_config("[data]\ndirectory = x\ntickers = A\nstart_date = 2024-01-01\nend_date = 2020-01-01\n");
        let err = validate_data_config(&config).unwrap_err();
        assert!(matches!(err, BacktestError::ConfigInvalid { key, .. } if key == "start_date"));
    }

    #[test]
    fn missing_end_date_fails() {
        let config = make_config("[data]\ndirectory = x\ntickers = A\nstart_date = 2020-01-01\n");
        let err = validate_data_config(&config).unwrap_err();
        assert!(matches!(err, BacktestError::ConfigMissing { key, .. } if key == "end_date"));
    }

    #[test]
    fn absent_tickers_means_all() {
        let config = make_config("[data]\ndirectory = x\nstart_date = 2020-01-01\nend_date = 2024-01-01\n");
        let data = build_data_config(&config).unwrap();
        assert!(data.tickers.is_empty());
    }

    #[test]
    fn blank_tickers_fails() {
        let config = make_config("[data]\ndirectory = x\ntickers =\nstart_date = 2020-01-01\nend_date = 2024-01-01\n");
        let err = validate_data_config(&config).unwrap_err();
        assert!(matches!(err, BacktestError::ConfigInvalid { key, .. } if key == "tickers"));
    }

    #[test]
    fn duplicate_ticker_fails() {
        let err = parse_tickers("BTC-USD, btc-usd").unwrap_err();
        assert!(matches!(err, BacktestError::ConfigInvalid { reason, .. } if reason.contains("duplicate")));
    }

    #[test]
    fn empty_ticker_token_fails() {
        assert!(parse_tickers("BTC-USD,,ETH-USD").is_err());
    }

    #[test]
    fn window_axis_list() {
        assert_eq!(parse_window_axis("10, 20,30", "k").unwrap(), vec![10, 20, 30]);
    }

    #[test]
    fn window_axis_range_with_step() {
        assert_eq!(
            parse_window_axis("10..31 step 5", "k").unwrap(),
            vec![10, 15, 20, 25, 30]
        );
        assert_eq!(parse_window_axis("3..6", "k").unwrap(), vec![3, 4, 5]);
    }

    #[test]
    fn window_axis_rejects_bad_input() {
        assert!(parse_window_axis("10..5", "k").is_err());
        assert!(parse_window_axis("0, 5", "k").is_err());
        assert!(parse_window_axis("1..10 step 0", "k").is_err());
        assert!(parse_window_axis("ten", "k").is_err());
    }

    #[test]
    fn fraction_axis_bounds() {
        assert_eq!(parse_fraction_axis("0.03, 0.05", "k").unwrap(), vec![0.03, 0.05]);
        assert!(parse_fraction_axis("0.0", "k").is_err());
        assert!(parse_fraction_axis("1.0", "k").is_err());
        assert!(parse_fraction_axis("abc", "k").is_err());
    }

    #[test]
    fn grid_defaults_when_section_absent() {
        let grid = build_grid(&make_config(DATA)).unwrap();
        assert_eq!(grid, ParameterGrid::default());
    }

    #[test]
    fn grid_from_config() {
        let config = make_config(
            r#"
[grid]
short_windows = 5..16 step 5
long_windows = 20, 40
stop_losses = 0.02
take_profits = 0.1, 0.2
"#,
        );
        let grid = build_grid(&config).unwrap();
        assert_eq!(grid.short_windows, vec![5, 10, 15]);
        assert_eq!(grid.long_windows, vec![20, 40]);
        assert_eq!(grid.stop_losses, vec![0.02]);
        assert_eq!(grid.take_profits, vec![0.1, 0.2]);
        assert_eq!(grid.size(), 12);
    }

    #[test]
    fn grid_without_any_valid_pair_fails() {
        let config = make_config("[grid]\nshort_windows = 50, 60\nlong_windows = 10, 50\n");
        let err = validate_grid_config(&config).unwrap_err();
        assert!(matches!(err, BacktestError::ConfigInvalid { key, .. } if key == "long_windows"));
    }

    #[test]
    fn search_options_defaults() {
        let options = build_search_options(&make_config(DATA)).unwrap();
        assert!(options.parallel);
        assert_eq!(options.max_combinations, None);
    }

    #[test]
    fn search_options_from_config() {
        let config = make_config("[grid]\nparallel = false\nmax_combinations = 500\n");
        let options = build_search_options(&config).unwrap();
        assert!(!options.parallel);
        assert_eq!(options.max_combinations, Some(500));
    }

    #[test]
    fn negative_cap_fails() {
        let config = make_config("[grid]\nmax_combinations = -1\n");
        let err = validate_grid_config(&config).unwrap_err();
        assert!(matches!(err, BacktestError::ConfigInvalid { key, .. } if key == "max_combinations"));
    }
}
