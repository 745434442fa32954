#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use simtrader::domain::config::TradingConfig;
use simtrader::domain::error::SimtraderError;
use simtrader::ports::market_data_port::MarketDataPort;
use simtrader::ports::universe_port::UniversePort;
use std::cell::RefCell;
use std::collections::HashMap;

/// Market data double. The current price defaults to the last element of
/// the series unless overridden with `with_price`.
pub struct MockMarket {
    pub series: RefCell<HashMap<String, Vec<f64>>>,
    pub prices: RefCell<HashMap<String, f64>>,
    pub errors: HashMap<String, String>,
}

impl MockMarket {
    pub fn new() -> Self {
        Self {
            series: RefCell::new(HashMap::new()),
            prices: RefCell::new(HashMap::new()),
            errors: HashMap::new(),
        }
    }

    pub fn with_series(self, ticker: &str, series: Vec<f64>) -> Self {
        self.series.borrow_mut().insert(ticker.to_string(), series);
        self
    }

    pub fn with_price(self, ticker: &str, price: f64) -> Self {
        self.prices.borrow_mut().insert(ticker.to_string(), price);
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }

    /// Replace a ticker's data between cycles.
    pub fn set_series(&self, ticker: &str, series: Vec<f64>) {
        self.prices.borrow_mut().remove(ticker);
        self.series.borrow_mut().insert(ticker.to_string(), series);
    }

    pub fn set_price(&self, ticker: &str, price: f64) {
        self.prices.borrow_mut().insert(ticker.to_string(), price);
    }
}

impl MarketDataPort for MockMarket {
    fn price_series(&self, ticker: &str) -> Result<Vec<f64>, SimtraderError> {
        if let Some(reason) = self.errors.get(ticker) {
            return Err(SimtraderError::DataFetch {
                ticker: ticker.to_string(),
                reason: reason.clone(),
            });
        }
        self.series
            .borrow()
            .get(ticker)
            .cloned()
            .ok_or_else(|| SimtraderError::NoData {
                ticker: ticker.to_string(),
            })
    }

    fn current_price(&self, ticker: &str) -> Result<f64, SimtraderError> {
        if let Some(reason) = self.errors.get(ticker) {
            return Err(SimtraderError::DataFetch {
                ticker: ticker.to_string(),
                reason: reason.clone(),
            });
        }
        if let Some(price) = self.prices.borrow().get(ticker) {
            return Ok(*price);
        }
        self.series
            .borrow()
            .get(ticker)
            .and_then(|s| s.last().copied())
            .ok_or_else(|| SimtraderError::NoData {
                ticker: ticker.to_string(),
            })
    }
}

pub struct MockUniverse {
    pub tickers: Vec<String>,
    pub fail: bool,
}

impl MockUniverse {
    pub fn new(tickers: &[&str]) -> Self {
        Self {
            tickers: tickers.iter().map(|t| t.to_string()).collect(),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            tickers: Vec::new(),
            fail: true,
        }
    }
}

impl UniversePort for MockUniverse {
    fn tickers(&self) -> Result<Vec<String>, SimtraderError> {
        if self.fail {
            return Err(SimtraderError::Universe {
                reason: "constituent list unavailable".into(),
            });
        }
        Ok(self.tickers.clone())
    }
}

/// A series of `lookback + 1` closes moving from `past` to `current`.
pub fn series_moving(past: f64, current: f64, lookback: usize) -> Vec<f64> {
    let mut series = vec![past; lookback];
    series.push(current);
    series
}

pub fn ts(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
}

pub fn default_config() -> TradingConfig {
    TradingConfig::default()
}

/// Budget for exactly `slots` default-sized positions.
pub fn config_with_slots(slots: usize) -> TradingConfig {
    let position_size = 10.0;
    let initial_budget = position_size * slots as f64;
    TradingConfig {
        initial_budget,
        position_size,
        max_positions: TradingConfig::derived_max_positions(initial_budget, position_size),
        ..TradingConfig::default()
    }
}
