//! Ticker universe port trait.

use crate::domain::error::SimtraderError;

pub trait UniversePort {
    /// Tradable ticker symbols in scan order.
    fn tickers(&self) -> Result<Vec<String>, SimtraderError>;
}
