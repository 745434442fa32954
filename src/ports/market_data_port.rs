//! Market data port trait.

use crate::domain::error::SimtraderError;

/// Source of closing prices for a ticker.
///
/// An `Err` means the ticker is unusable for the current cycle only; callers
/// skip it and continue with the rest of the universe.
pub trait MarketDataPort {
    /// Recent closing prices, oldest first.
    fn price_series(&self, ticker: &str) -> Result<Vec<f64>, SimtraderError>;

    fn current_price(&self, ticker: &str) -> Result<f64, SimtraderError>;
}
