//! Explicit run configuration with documented defaults.

use std::path::PathBuf;

pub const DEFAULT_INITIAL_BUDGET: f64 = 1000.0;
pub const DEFAULT_POSITION_SIZE: f64 = 10.0;
pub const DEFAULT_SHORT_TRIGGER: f64 = 0.10;
pub const DEFAULT_BUY_TRIGGER: f64 = -0.05;
pub const DEFAULT_TAKE_PROFIT: f64 = 0.03;
pub const DEFAULT_STOP_LOSS: f64 = 0.05;
pub const DEFAULT_LOOKBACK_DAYS: usize = 7;

/// Budget, trigger and exit parameters shared by the ledger and the cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct TradingConfig {
    /// Starting cash, also the base for total return.
    pub initial_budget: f64,
    /// Cash committed to every new position.
    pub position_size: f64,
    pub max_positions: usize,
    /// Price-change ratio at or above which a ticker becomes a short candidate.
    pub short_trigger: f64,
    /// Price-change ratio at or below which a ticker becomes a long candidate.
    pub buy_trigger: f64,
    /// Fractional distance from entry to the take-profit level.
    pub take_profit_pct: f64,
    /// Fractional distance from entry to the stop-loss level (a magnitude).
    pub stop_loss_pct: f64,
    pub lookback_days: usize,
}

impl TradingConfig {
    /// Position slots implied by the budget: `floor(initial_budget / position_size)`.
    pub fn derived_max_positions(initial_budget: f64, position_size: f64) -> usize {
        if position_size <= 0.0 {
            return 0;
        }
        (initial_budget / position_size).floor() as usize
    }
}

impl Default for TradingConfig {
    fn default() -> Self {
        TradingConfig {
            initial_budget: DEFAULT_INITIAL_BUDGET,
            position_size: DEFAULT_POSITION_SIZE,
            max_positions: Self::derived_max_positions(
                DEFAULT_INITIAL_BUDGET,
                DEFAULT_POSITION_SIZE,
            ),
            short_trigger: DEFAULT_SHORT_TRIGGER,
            buy_trigger: DEFAULT_BUY_TRIGGER,
            take_profit_pct: DEFAULT_TAKE_PROFIT,
            stop_loss_pct: DEFAULT_STOP_LOSS,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
        }
    }
}

/// Where market data comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    Yahoo,
    Csv(PathBuf),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataConfig {
    pub data_dir: PathBuf,
    pub source: DataSource,
    /// Explicit universe; when set the S&P 500 download is skipped.
    pub tickers: Option<Vec<String>>,
    pub max_companies: usize,
    pub request_timeout_secs: u64,
    pub request_pause_ms: u64,
    pub universe_cache_hours: u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            data_dir: PathBuf::from("data"),
            source: DataSource::Yahoo,
            tickers: None,
            max_companies: 1000,
            request_timeout_secs: 10,
            request_pause_ms: 0,
            universe_cache_hours: 24,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleConfig {
    pub interval_minutes: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        ScheduleConfig {
            interval_minutes: 30,
        }
    }
}
