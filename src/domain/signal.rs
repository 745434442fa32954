//! Entry and exit signals.
//!
//! Pure functions: a price series becomes a price-change ratio, the ratio
//! becomes an entry signal, and an open position plus a quote becomes an
//! optional exit reason.

use std::fmt;

use super::config::TradingConfig;
use super::position::{Direction, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    OpenLong,
    OpenShort,
    /// Neither trigger was reached.
    Hold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    TakeProfit,
    StopLoss,
}

impl ExitReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ExitReason::TakeProfit => "take profit reached",
            ExitReason::StopLoss => "stop loss triggered",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fractional change between the latest observation and the one
/// `lookback` steps earlier.
///
/// Returns `None` with fewer than `lookback + 1` observations or when the
/// reference price is not a positive number.
pub fn price_change(series: &[f64], lookback: usize) -> Option<f64> {
    if series.len() < lookback + 1 {
        return None;
    }
    let current = *series.last()?;
    let past = series[series.len() - 1 - lookback];
    if !past.is_finite() || past <= 0.0 || !current.is_finite() {
        return None;
    }
    Some((current - past) / past)
}

/// Short is checked before long.
pub fn classify_entry(ratio: f64, config: &TradingConfig) -> Signal {
    if ratio >= config.short_trigger {
        Signal::OpenShort
    } else if ratio <= config.buy_trigger {
        Signal::OpenLong
    } else {
        Signal::Hold
    }
}

/// Take-profit is checked before stop-loss in both directions.
pub fn should_exit(position: &Position, current_price: f64) -> Option<ExitReason> {
    match position.direction {
        Direction::Long => {
            if current_price >= position.take_profit {
                Some(ExitReason::TakeProfit)
            } else if current_price <= position.stop_loss {
                Some(ExitReason::StopLoss)
            } else {
                None
            }
        }
        Direction::Short => {
            if current_price <= position.take_profit {
                Some(ExitReason::TakeProfit)
            } else if current_price >= position.stop_loss {
                Some(ExitReason::StopLoss)
            } else {
                None
            }
        }
    }
}
