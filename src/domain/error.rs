//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for trendgrid.
#[derive(Debug, thiserror::Error)]
pub enum BacktestError {
    #[error("price series is empty")]
    EmptyPriceSeries,

    #[error("insufficient history: have {bars} bars, need more than {required}")]
    InsufficientHistory { bars: usize, required: usize },

    #[error("price dates must be strictly increasing: {date} follows {previous}")]
    UnsortedPriceSeries { previous: NaiveDate, date: NaiveDate },

    #[error("invalid close price {close} on {date}")]
    InvalidPrice { date: NaiveDate, close: f64 },

    #[error("invalid window pair: short window {short} must be at least 1 and below long window {long}")]
    InvalidWindowPair { short: usize, long: usize },

    #[error("invalid {name} {value}: must lie strictly between 0 and 1")]
    InvalidRiskParameter { name: &'static str, value: f64 },

    #[error("degenerate return series: {reason}")]
    DegenerateSeries { reason: String },

    #[error("position series covers {positions} bars but price series has {prices}")]
    MisalignedSeries { prices: usize, positions: usize },

    #[error("no valid parameter combination ({skipped} cells skipped)")]
    NoValidCombination { skipped: usize },

    #[error("grid has {size} combinations, cap is {cap}")]
    GridTooLarge { size: usize, cap: usize },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("no data for {ticker} between {start} and {end}")]
    NoData {
        ticker: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("data source error: {reason}")]
    Data { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BacktestError {
    /// Errors raised by parameter validation. The grid search skips cells
    /// failing with one of these instead of aborting.
    pub fn is_parameter_error(&self) -> bool {
        matches!(
            self,
            BacktestError::InvalidWindowPair { .. }
                | BacktestError::InvalidRiskParameter { .. }
                | BacktestError::InsufficientHistory { .. }
        )
    }

    /// Process exit code: 1 I/O, 2 config, 3 data source, 4 parameter
    /// validation, 5 missing or unusable data, 6 no search result.
    pub fn exit_code(&self) -> u8 {
        match self {
            BacktestError::Io(_) => 1,
            BacktestError::ConfigParse { .. }
            | BacktestError::ConfigMissing { .. }
            | BacktestError::ConfigInvalid { .. } => 2,
            BacktestError::Data { .. } => 3,
            BacktestError::InvalidWindowPair { .. }
            | BacktestError::InvalidRiskParameter { .. }
            | BacktestError::GridTooLarge { .. } => 4,
            BacktestError::EmptyPriceSeries
            | BacktestError::InsufficientHistory { .. }
            | BacktestError::UnsortedPriceSeries { .. }
            | BacktestError::InvalidPrice { .. }
            | BacktestError::MisalignedSeries { .. }
            | BacktestError::NoData { .. } => 5,
            BacktestError::DegenerateSeries { .. } | BacktestError::NoValidCombination { .. } => 6,
        }
    }
}

impl From<&BacktestError> for std::process::ExitCode {
    fn from(err: &BacktestError) -> Self {
        std::process::ExitCode::from(err.exit_code())
    }
}
