//! Cash, open positions and the trade log.
//!
//! The ledger is mutated only through [`Ledger::open`] and [`Ledger::close`].
//! Every open debits exactly one position budget and every close credits that
//! budget back together with the realized profit or loss.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::config::TradingConfig;
use super::error::LedgerError;
use super::position::{Direction, Position, Trade};

/// A quote can be traded on or valued at only if it is finite and positive.
pub fn is_usable_price(price: f64) -> bool {
    price.is_finite() && price > 0.0
}

/// Persistable state of a ledger.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub cash: f64,
    pub positions: HashMap<String, Position>,
    pub trades: Vec<Trade>,
}

/// Aggregate figures derived from the trade log and current state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerStats {
    pub total_trades: usize,
    pub profitable_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    pub total_realized_pl: f64,
    pub cash: f64,
    pub open_position_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ledger {
    config: TradingConfig,
    cash: f64,
    positions: HashMap<String, Position>,
    trades: Vec<Trade>,
}

impl Ledger {
    pub fn new(config: TradingConfig) -> Self {
        Ledger {
            cash: config.initial_budget,
            config,
            positions: HashMap::new(),
            trades: Vec::new(),
        }
    }

    /// Rebuild a ledger from persisted state.
    ///
    /// Positions are re-keyed by their own ticker so a hand-edited store
    /// cannot produce a mapping entry that disagrees with its position.
    pub fn restore(config: TradingConfig, snapshot: LedgerSnapshot) -> Self {
        let positions = snapshot
            .positions
            .into_values()
            .map(|pos| (pos.ticker.clone(), pos))
            .collect();
        Ledger {
            config,
            cash: snapshot.cash,
            positions,
            trades: snapshot.trades,
        }
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            cash: self.cash,
            positions: self.positions.clone(),
            trades: self.trades.clone(),
        }
    }

    pub fn config(&self) -> &TradingConfig {
        &self.config
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn positions(&self) -> &HashMap<String, Position> {
        &self.positions
    }

    pub fn position(&self, ticker: &str) -> Option<&Position> {
        self.positions.get(ticker)
    }

    pub fn has_position(&self, ticker: &str) -> bool {
        self.positions.contains_key(ticker)
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    /// Open positions sorted by ticker, for stable iteration and display.
    pub fn sorted_positions(&self) -> Vec<&Position> {
        let mut positions: Vec<&Position> = self.positions.values().collect();
        positions.sort_by(|a, b| a.ticker.cmp(&b.ticker));
        positions
    }

    pub fn capacity_available(&self) -> bool {
        self.cash >= self.config.position_size
            && self.position_count() < self.config.max_positions
    }

    pub fn open(
        &mut self,
        ticker: &str,
        direction: Direction,
        entry_price: f64,
        now: DateTime<Utc>,
    ) -> Result<Position, LedgerError> {
        if self.has_position(ticker) {
            return Err(LedgerError::AlreadyOpen(ticker.to_string()));
        }
        if !self.capacity_available() {
            return Err(LedgerError::CapacityExhausted {
                cash: self.cash,
                open: self.position_count(),
                max: self.config.max_positions,
            });
        }
        if !is_usable_price(entry_price) {
            return Err(LedgerError::InvalidPrice {
                ticker: ticker.to_string(),
                price: entry_price,
            });
        }

        let budget = self.config.position_size;
        let quantity = budget / entry_price;
        let (stop_loss, take_profit) = match direction {
            Direction::Long => (
                entry_price * (1.0 - self.config.stop_loss_pct),
                entry_price * (1.0 + self.config.take_profit_pct),
            ),
            Direction::Short => (
                entry_price * (1.0 + self.config.stop_loss_pct),
                entry_price * (1.0 - self.config.take_profit_pct),
            ),
        };

        let position = Position {
            ticker: ticker.to_string(),
            direction,
            entry_price,
            quantity,
            entry_timestamp: now,
            stop_loss,
            take_profit,
        };

        self.cash -= budget;
        self.trades.push(Trade {
            ticker: ticker.to_string(),
            action: direction.opening_action(),
            price: entry_price,
            quantity,
            timestamp: now,
            profit_loss: 0.0,
            reason: self.entry_reason(direction),
        });
        self.positions.insert(ticker.to_string(), position.clone());

        tracing::info!(
            ticker,
            %direction,
            price = entry_price,
            quantity,
            "opened position"
        );
        Ok(position)
    }

    pub fn close(
        &mut self,
        ticker: &str,
        exit_price: f64,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<Trade, LedgerError> {
        if !exit_price.is_finite() || exit_price <= 0.0 {
            return Err(LedgerError::InvalidPrice {
                ticker: ticker.to_string(),
                price: exit_price,
            });
        }
        let position = self
            .positions
            .remove(ticker)
            .ok_or_else(|| LedgerError::NotOpen(ticker.to_string()))?;

        let profit_loss = position.unrealized_pnl(exit_price);
        self.cash += self.config.position_size + profit_loss;

        let trade = Trade {
            ticker: ticker.to_string(),
            action: position.direction.closing_action(),
            price: exit_price,
            quantity: position.quantity,
            timestamp: now,
            profit_loss,
            reason: reason.to_string(),
        };
        self.trades.push(trade.clone());

        tracing::info!(
            ticker,
            direction = %position.direction,
            price = exit_price,
            profit_loss,
            reason,
            "closed position"
        );
        Ok(trade)
    }

    /// Cash plus the current valuation of every open position.
    ///
    /// A position without a usable quote is valued at its reserved budget.
    pub fn mark_to_market(&self, current_prices: &HashMap<String, f64>) -> f64 {
        let budget = self.config.position_size;
        let position_value: f64 = self
            .positions
            .values()
            .map(|pos| match current_prices.get(&pos.ticker) {
                Some(&price) if is_usable_price(price) => pos.valuation(price, budget),
                _ => budget,
            })
            .sum();
        self.cash + position_value
    }

    pub fn statistics(&self) -> LedgerStats {
        let total_trades = self.trades.len();
        let profitable_trades = self.trades.iter().filter(|t| t.is_profitable()).count();
        let losing_trades = self.trades.iter().filter(|t| t.is_losing()).count();
        let total_realized_pl = self.trades.iter().map(|t| t.profit_loss).sum();
        let win_rate = if total_trades > 0 {
            profitable_trades as f64 / total_trades as f64
        } else {
            0.0
        };

        LedgerStats {
            total_trades,
            profitable_trades,
            losing_trades,
            win_rate,
            total_realized_pl,
            cash: self.cash,
            open_position_count: self.position_count(),
        }
    }

    fn entry_reason(&self, direction: Direction) -> String {
        let days = self.config.lookback_days;
        match direction {
            Direction::Long => format!(
                "price dropped {:.0}% in {} days - buying opportunity",
                self.config.buy_trigger.abs() * 100.0,
                days
            ),
            Direction::Short => format!(
                "price jumped {:.0}% in {} days - shorting opportunity",
                self.config.short_trigger * 100.0,
                days
            ),
        }
    }
}
