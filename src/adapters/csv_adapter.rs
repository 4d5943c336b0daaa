//! CSV file price data adapter.
//!
//! Reads `<base_path>/<TICKER>.csv`. Columns are located by header name
//! (`date` and `close`, case-insensitive), so exports with extra columns
//! such as open/high/low/volume load unchanged.

use crate::domain::error::BacktestError;
use crate::domain::price::{PriceObservation, PriceSeries};
use crate::ports::data_port::PriceDataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, ticker: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", ticker))
    }
}

fn column(headers: &csv::StringRecord, name: &str) -> Result<usize, BacktestError> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
        .ok_or_else(|| BacktestError::Data {
            reason: format!("missing {} column", name),
        })
}

impl PriceDataPort for CsvAdapter {
    fn fetch_prices(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<PriceSeries, BacktestError> {
        let path = self.csv_path(ticker);
        let content = fs::read_to_string(&path).map_err(|e| BacktestError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr.headers().map_err(|e| BacktestError::Data {
            reason: format!("CSV header error: {}", e),
        })?;
        let date_col = column(headers, "date")?;
        let close_col = column(headers, "close")?;

        let mut observations = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| BacktestError::Data {
                reason: format!("CSV parse error: {}", e),
            })?;

            let date_str = record.get(date_col).unwrap_or_default().trim();
            // timestamps such as "2024-01-15 00:00:00" keep only the date part
            let date_part = date_str.split([' ', 'T']).next().unwrap_or_default();
            let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").map_err(|e| {
                BacktestError::Data {
                    reason: format!("invalid date {:?}: {}", date_str, e),
                }
            })?;

            if date < start_date || date > end_date {
                continue;
            }

            let close_str = record.get(close_col).unwrap_or_default().trim();
            if close_str.is_empty() {
                tracing::debug!(ticker, %date, "skipping row without close");
                continue;
            }
            let close: f64 = close_str.parse().map_err(|e| BacktestError::Data {
                reason: format!("invalid close value {:?}: {}", close_str, e),
            })?;

            observations.push(PriceObservation { date, close });
        }

        if observations.is_empty() {
            return Err(BacktestError::NoData {
                ticker: ticker.to_string(),
                start: start_date,
                end: end_date,
            });
        }

        observations.sort_by_key(|o| o.date);
        tracing::debug!(ticker, bars = observations.len(), "loaded prices");
        PriceSeries::new(observations)
    }

    fn list_tickers(&self) -> Result<Vec<String>, BacktestError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| BacktestError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut tickers = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| BacktestError::Data {
                reason: format!("directory entry error: {}", e),
            })?;

            let name = entry.file_name();
            let name_str = name.to_string_lossy();

            if let Some(ticker) = name_str.strip_suffix(".csv") {
                tickers.push(ticker.to_string());
            }
        }

        tickers.sort();
        Ok(tickers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        let csv_content = "Date,Open,High,Low,Close,Volume\n\
            2024-01-17,110.0,120.0,105.0,115.0,55000\n\
            2024-01-15,100.0,110.0,90.0,105.0,50000\n\
            2024-01-16,105.0,115.0,100.0,110.0,60000\n";

        fs::write(path.join("BTC-USD.csv"), csv_content).unwrap();
        fs::write(path.join("ETH-USD.csv"), "date,close\n").unwrap();
        fs::write(path.join("notes.txt"), "ignored").unwrap();

        (dir, path)
    }

    fn closes(prices: &PriceSeries) -> Vec<f64> {
        prices.observations().iter().map(|o| o.close).collect()
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn fetch_prices_reads_close_column_sorted() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let prices = adapter
            .fetch_prices("BTC-USD", d(2024, 1, 15), d(2024, 1, 17))
            .unwrap();

        assert_eq!(prices.len(), 3);
        assert_eq!(prices.date(0), d(2024, 1, 15));
        assert_eq!(closes(&prices), vec![105.0, 110.0, 115.0]);
    }

    #[test]
    fn fetch_prices_filters_by_date() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let prices = adapter
            .fetch_prices("BTC-USD", d(2024, 1, 16), d(2024, 1, 16))
            .unwrap();

        assert_eq!(prices.len(), 1);
        assert_eq!(prices.close(0), 110.0);
    }

    #[test]
    fn fetch_prices_accepts_timestamps() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("SPY.csv"),
            "Date,Close\n2024-01-15 00:00:00,470.5\n2024-01-16T00:00:00,472.0\n",
        )
        .unwrap();
        let adapter = CsvAdapter::new(dir.path().to_path_buf());

        let prices = adapter
            .fetch_prices("SPY", d(2024, 1, 1), d(2024, 1, 31))
            .unwrap();
        assert_eq!(closes(&prices), vec![470.5, 472.0]);
    }

    #[test]
    fn fetch_prices_errors_for_missing_file() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let err = adapter
            .fetch_prices("XYZ", d(2024, 1, 1), d(2024, 1, 31))
            .unwrap_err();
        assert!(matches!(err, BacktestError::Data { .. }));
    }

    #[test]
    fn fetch_prices_errors_for_empty_range() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let err = adapter
            .fetch_prices("ETH-USD", d(2024, 1, 1), d(2024, 1, 31))
            .unwrap_err();
        assert!(matches!(err, BacktestError::NoData { ticker, .. } if ticker == "ETH-USD"));
    }

    #[test]
    fn fetch_prices_errors_without_close_column() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("X.csv"), "date,price\n2024-01-15,1.0\n").unwrap();
        let adapter = CsvAdapter::new(dir.path().to_path_buf());

        let err = adapter
            .fetch_prices("X", d(2024, 1, 1), d(2024, 1, 31))
            .unwrap_err();
        assert!(matches!(err, BacktestError::Data { reason } if reason.contains("close")));
    }

    #[test]
    fn fetch_prices_rejects_non_positive_close() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("X.csv"), "date,close\n2024-01-15,0.0\n").unwrap();
        let adapter = CsvAdapter::new(dir.path().to_path_buf());

        let err = adapter
            .fetch_prices("X", d(2024, 1, 1), d(2024, 1, 31))
            .unwrap_err();
        assert!(matches!(err, BacktestError::InvalidPrice { .. }));
    }

    #[test]
    fn list_tickers_returns_csv_stems() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        assert_eq!(adapter.list_tickers().unwrap(), vec!["BTC-USD", "ETH-USD"]);
    }
}
