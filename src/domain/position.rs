//! Positions and the trade audit log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which way a position bets on price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// Action recorded when a position in this direction is opened.
    pub fn opening_action(self) -> TradeAction {
        match self {
            Direction::Long => TradeAction::Buy,
            Direction::Short => TradeAction::Short,
        }
    }

    /// Action recorded when a position in this direction is closed.
    pub fn closing_action(self) -> TradeAction {
        match self {
            Direction::Long => TradeAction::Sell,
            Direction::Short => TradeAction::Cover,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "LONG"),
            Direction::Short => write!(f, "SHORT"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeAction {
    Buy,
    Sell,
    Short,
    Cover,
}

impl TradeAction {
    pub fn is_opening(self) -> bool {
        matches!(self, TradeAction::Buy | TradeAction::Short)
    }
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TradeAction::Buy => "BUY",
            TradeAction::Sell => "SELL",
            TradeAction::Short => "SHORT",
            TradeAction::Cover => "COVER",
        };
        f.write_str(s)
    }
}

/// An open simulated holding. Stop and target levels are fixed at entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub ticker: String,
    pub direction: Direction,
    pub entry_price: f64,
    pub quantity: f64,
    pub entry_timestamp: DateTime<Utc>,
    pub stop_loss: f64,
    pub take_profit: f64,
}

impl Position {
    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        match self.direction {
            Direction::Long => (price - self.entry_price) * self.quantity,
            Direction::Short => (self.entry_price - price) * self.quantity,
        }
    }

    /// Mark-to-market value of the position.
    ///
    /// A short keeps its reserved budget idle, so it is valued as that budget
    /// plus the unrealized gain.
    pub fn valuation(&self, price: f64, position_budget: f64) -> f64 {
        match self.direction {
            Direction::Long => price * self.quantity,
            Direction::Short => position_budget + self.unrealized_pnl(price),
        }
    }
}

/// Immutable record of a single buy/sell/short/cover event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub ticker: String,
    pub action: TradeAction,
    pub price: f64,
    pub quantity: f64,
    pub timestamp: DateTime<Utc>,
    pub profit_loss: f64,
    pub reason: String,
}

impl Trade {
    pub fn is_profitable(&self) -> bool {
        self.profit_loss > 0.0
    }

    pub fn is_losing(&self) -> bool {
        self.profit_loss < 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 14, 30, 0).unwrap()
    }

    fn sample_long_position() -> Position {
        Position {
            ticker: "AAPL".into(),
            direction: Direction::Long,
            entry_price: 100.0,
            quantity: 0.1,
            entry_timestamp: ts(),
            stop_loss: 95.0,
            take_profit: 103.0,
        }
    }

    fn sample_short_position() -> Position {
        Position {
            ticker: "TSLA".into(),
            direction: Direction::Short,
            entry_price: 50.0,
            quantity: 0.2,
            entry_timestamp: ts(),
            stop_loss: 52.5,
            take_profit: 48.5,
        }
    }

    #[test]
    fn opening_and_closing_actions() {
        assert_eq!(Direction::Long.opening_action(), TradeAction::Buy);
        assert_eq!(Direction::Long.closing_action(), TradeAction::Sell);
        assert_eq!(Direction::Short.opening_action(), TradeAction::Short);
        assert_eq!(Direction::Short.closing_action(), TradeAction::Cover);
        assert!(TradeAction::Buy.is_opening());
        assert!(TradeAction::Short.is_opening());
        assert!(!TradeAction::Sell.is_opening());
        assert!(!TradeAction::Cover.is_opening());
    }

    #[test]
    fn unrealized_pnl_long() {
        let pos = sample_long_position();
        assert!((pos.unrealized_pnl(110.0) - 1.0).abs() < 1e-9);
        assert!((pos.unrealized_pnl(90.0) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn unrealized_pnl_short() {
        let pos = sample_short_position();
        assert!((pos.unrealized_pnl(48.0) - 0.4).abs() < 1e-9);
        assert!((pos.unrealized_pnl(55.0) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn valuation_long_is_market_value() {
        let pos = sample_long_position();
        assert!((pos.valuation(120.0, 10.0) - 12.0).abs() < 1e-9);
    }

    #[test]
    fn valuation_short_adds_gain_to_reserved_budget() {
        let pos = sample_short_position();
        assert!((pos.valuation(48.0, 10.0) - 10.4).abs() < 1e-9);
        assert!((pos.valuation(50.0, 10.0) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn trade_action_display_and_serde() {
        assert_eq!(TradeAction::Cover.to_string(), "COVER");
        assert_eq!(
            serde_json::to_string(&TradeAction::Short).unwrap(),
            "\"SHORT\""
        );
        assert_eq!(serde_json::to_string(&Direction::Long).unwrap(), "\"long\"");
        let parsed: Direction = serde_json::from_str("\"short\"").unwrap();
        assert_eq!(parsed, Direction::Short);
    }

    #[test]
    fn trade_outcome_buckets() {
        let mut trade = Trade {
            ticker: "AAPL".into(),
            action: TradeAction::Sell,
            price: 103.0,
            quantity: 0.1,
            timestamp: ts(),
            profit_loss: 0.3,
            reason: "take profit reached".into(),
        };
        assert!(trade.is_profitable());
        assert!(!trade.is_losing());

        trade.profit_loss = 0.0;
        assert!(!trade.is_profitable());
        assert!(!trade.is_losing());

        trade.profit_loss = -0.5;
        assert!(trade.is_losing());
    }
}
