//! Opening and closing positions against the ledger.
//!
//! Glue between signal outputs, quotes from the market data port, and the
//! ledger's capacity rules.

use chrono::{DateTime, Utc};

use super::ledger::Ledger;
use super::position::{Direction, Position, Trade};
use super::signal::should_exit;
use crate::ports::market_data_port::MarketDataPort;

/// What happened to a batch of entry candidates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryOutcome {
    pub opened: Vec<Position>,
    /// Candidates passed over for lack of a quote or a rejected open.
    pub skipped: Vec<String>,
    /// True when the batch stopped early because the ledger ran out of room.
    pub capacity_exhausted: bool,
}

/// Open positions for the candidates, long candidates first.
///
/// The whole batch stops as soon as the ledger has no capacity, so earlier
/// candidates (and longs over shorts) win when slots are scarce.
pub fn execute_entries(
    ledger: &mut Ledger,
    long_candidates: &[String],
    short_candidates: &[String],
    market: &dyn MarketDataPort,
    now: DateTime<Utc>,
) -> EntryOutcome {
    let mut outcome = EntryOutcome::default();

    let candidates = long_candidates
        .iter()
        .map(|t| (t, Direction::Long))
        .chain(short_candidates.iter().map(|t| (t, Direction::Short)));

    for (ticker, direction) in candidates {
        if !ledger.capacity_available() {
            tracing::info!("cannot open more positions - budget limit reached");
            outcome.capacity_exhausted = true;
            break;
        }

        let price = match market.current_price(ticker) {
            Ok(p) => p,
            Err(e) => {
                tracing::debug!(ticker = ticker.as_str(), error = %e, "no quote, skipping entry");
                outcome.skipped.push(ticker.clone());
                continue;
            }
        };

        match ledger.open(ticker, direction, price, now) {
            Ok(position) => outcome.opened.push(position),
            Err(e) => {
                tracing::debug!(ticker = ticker.as_str(), error = %e, "entry rejected");
                outcome.skipped.push(ticker.clone());
            }
        }
    }

    outcome
}

/// Close every open position whose stop-loss or take-profit has been hit.
///
/// A position without a quote is left open.
pub fn close_triggered_positions(
    ledger: &mut Ledger,
    market: &dyn MarketDataPort,
    now: DateTime<Utc>,
) -> Vec<Trade> {
    let mut exits = Vec::new();
    for position in ledger.sorted_positions() {
        let price = match market.current_price(&position.ticker) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(
                    ticker = position.ticker.as_str(),
                    error = %e,
                    "no quote for open position, keeping it"
                );
                continue;
            }
        };
        if let Some(reason) = should_exit(position, price) {
            exits.push((position.ticker.clone(), price, reason));
        }
    }

    let mut closed = Vec::with_capacity(exits.len());
    for (ticker, price, reason) in exits {
        match ledger.close(&ticker, price, reason.as_str(), now) {
            Ok(trade) => closed.push(trade),
            Err(e) => tracing::debug!(ticker = ticker.as_str(), error = %e, "close rejected"),
        }
    }
    closed
}
