//! CSV file market data adapter.
//!
//! Reads `<TICKER>.csv` from a directory. Either a two-column `date,close`
//! layout or a full `date,open,high,low,close,volume` layout is accepted;
//! columns are located by header name. Rows whose close is not a finite
//! positive number are skipped.

use crate::domain::error::SimtraderError;
use crate::domain::ledger::is_usable_price;
use crate::ports::market_data_port::MarketDataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

pub struct CsvMarketAdapter {
    base_path: PathBuf,
}

impl CsvMarketAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, ticker: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", ticker))
    }

    /// Closing prices sorted by date, oldest first.
    fn closes(&self, ticker: &str) -> Result<Vec<f64>, SimtraderError> {
        let path = self.csv_path(ticker);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SimtraderError::NoData {
                    ticker: ticker.to_string(),
                });
            }
            Err(e) => {
                return Err(SimtraderError::DataFetch {
                    ticker: ticker.to_string(),
                    reason: format!("failed to read {}: {}", path.display(), e),
                });
            }
        };

        let parse_error = |reason: String| SimtraderError::DataFetch {
            ticker: ticker.to_string(),
            reason,
        };

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| parse_error(format!("CSV parse error: {}", e)))?
            .clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| parse_error(format!("missing {} column", name)))
        };
        let date_idx = column("date")?;
        let close_idx = column("close")?;

        let mut rows: Vec<(NaiveDate, f64)> = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| parse_error(format!("CSV parse error: {}", e)))?;

            let date_str = record
                .get(date_idx)
                .ok_or_else(|| parse_error("missing date value".into()))?;
            let date = NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d")
                .map_err(|e| parse_error(format!("invalid date format: {}", e)))?;

            let close: f64 = record
                .get(close_idx)
                .ok_or_else(|| parse_error("missing close value".into()))?
                .trim()
                .parse()
                .map_err(|e| parse_error(format!("invalid close value: {}", e)))?;

            if !is_usable_price(close) {
                tracing::debug!(ticker, %date, close, "skipping unusable close");
                continue;
            }
            rows.push((date, close));
        }

        if rows.is_empty() {
            return Err(SimtraderError::NoData {
                ticker: ticker.to_string(),
            });
        }

        rows.sort_by_key(|(date, _)| *date);
        Ok(rows.into_iter().map(|(_, close)| close).collect())
    }
}

impl MarketDataPort for CsvMarketAdapter {
    fn price_series(&self, ticker: &str) -> Result<Vec<f64>, SimtraderError> {
        self.closes(ticker)
    }

    fn current_price(&self, ticker: &str) -> Result<f64, SimtraderError> {
        self.closes(ticker)?
            .last()
            .copied()
            .ok_or_else(|| SimtraderError::NoData {
                ticker: ticker.to_string(),
            })
    }
}
