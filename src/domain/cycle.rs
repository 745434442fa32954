//! One trading cycle: exits, scan, entries, persistence, summary.
//!
//! The scheduler decides when cycles run; [`TradingEngine::run_cycle`] only
//! ever runs one to completion. State is persisted only after every trade of
//! the cycle has been applied to the in-memory ledger.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

use super::config::TradingConfig;
use super::error::SimtraderError;
use super::ledger::Ledger;
use super::lifecycle::{close_triggered_positions, execute_entries};
use super::performance::PerformanceSnapshot;
use super::signal::{classify_entry, price_change, Signal};
use crate::ports::market_data_port::MarketDataPort;
use crate::ports::store_port::{LedgerStore, PerformanceLog};
use crate::ports::universe_port::UniversePort;

/// Flat record consumed by reporting and status views.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleSummary {
    pub timestamp: DateTime<Utc>,
    pub initial_budget: f64,
    pub current_value: f64,
    pub total_return: f64,
    pub cash: f64,
    pub active_positions: usize,
    pub total_trades: usize,
    pub profitable_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    pub total_profit: f64,
}

impl CycleSummary {
    pub fn to_snapshot(&self) -> PerformanceSnapshot {
        PerformanceSnapshot {
            timestamp: self.timestamp,
            portfolio_value: self.current_value,
            cash: self.cash,
            total_return: self.total_return,
            active_positions: self.active_positions,
            total_trades: self.total_trades,
            win_rate: self.win_rate,
            total_profit: self.total_profit,
        }
    }
}

/// Tickers from one scan, split by the signal they produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Candidates {
    pub long: Vec<String>,
    pub short: Vec<String>,
}

pub struct TradingEngine<'a> {
    config: TradingConfig,
    market: &'a dyn MarketDataPort,
    universe: &'a dyn UniversePort,
    store: &'a dyn LedgerStore,
    performance: Option<&'a dyn PerformanceLog>,
}

impl<'a> TradingEngine<'a> {
    pub fn new(
        config: TradingConfig,
        market: &'a dyn MarketDataPort,
        universe: &'a dyn UniversePort,
        store: &'a dyn LedgerStore,
    ) -> Self {
        TradingEngine {
            config,
            market,
            universe,
            store,
            performance: None,
        }
    }

    /// Also append a snapshot to `log` after every successful cycle.
    pub fn with_performance_log(mut self, log: &'a dyn PerformanceLog) -> Self {
        self.performance = Some(log);
        self
    }

    pub fn config(&self) -> &TradingConfig {
        &self.config
    }

    /// Ledger hydrated from the store, or a fresh one when nothing is stored.
    pub fn load_ledger(&self) -> Result<Ledger, SimtraderError> {
        Ok(match self.store.load()? {
            Some(snapshot) => Ledger::restore(self.config.clone(), snapshot),
            None => Ledger::new(self.config.clone()),
        })
    }

    pub fn run_cycle(
        &self,
        ledger: &mut Ledger,
        now: DateTime<Utc>,
    ) -> Result<CycleSummary, SimtraderError> {
        tracing::info!("=== starting trading cycle ===");

        let tickers = self.universe.tickers()?;
        if tickers.is_empty() {
            tracing::warn!("ticker universe is empty");
        }

        let closed = close_triggered_positions(ledger, self.market, now);
        if !closed.is_empty() {
            tracing::info!(count = closed.len(), "closed triggered positions");
        }

        let candidates = self.scan(ledger, &tickers);
        let outcome = execute_entries(ledger, &candidates.long, &candidates.short, self.market, now);
        tracing::info!(
            opened = outcome.opened.len(),
            skipped = outcome.skipped.len(),
            capacity_exhausted = outcome.capacity_exhausted,
            "entries executed"
        );

        self.store.save(&ledger.snapshot())?;

        let summary = self.summarize(ledger, now);
        tracing::info!(
            cash = summary.cash,
            positions = summary.active_positions,
            total_trades = summary.total_trades,
            win_rate = summary.win_rate,
            "portfolio status"
        );

        if let Some(log) = self.performance {
            if let Err(e) = log.append(&summary.to_snapshot()) {
                tracing::warn!(error = %e, "failed to record performance snapshot");
            }
        }

        tracing::info!("=== trading cycle complete ===");
        Ok(summary)
    }

    /// Run a cycle, logging instead of propagating a failure.
    ///
    /// A failed cycle persists nothing; the next one starts from the last
    /// stored state.
    pub fn run_cycle_logged(&self, ledger: &mut Ledger, now: DateTime<Utc>) -> Option<CycleSummary> {
        match self.run_cycle(ledger, now) {
            Ok(summary) => Some(summary),
            Err(e) => {
                tracing::error!(error = %e, "error in trading cycle");
                None
            }
        }
    }

    /// Classify every ticker not already held.
    pub fn scan(&self, ledger: &Ledger, tickers: &[String]) -> Candidates {
        tracing::info!(count = tickers.len(), "scanning for opportunities");
        let mut candidates = Candidates::default();

        for ticker in tickers {
            if ledger.has_position(ticker) {
                continue;
            }
            let series = match self.market.price_series(ticker) {
                Ok(s) => s,
                Err(e) => {
                    tracing::debug!(ticker = ticker.as_str(), error = %e, "no price series");
                    continue;
                }
            };
            let Some(change) = price_change(&series, self.config.lookback_days) else {
                continue;
            };

            match classify_entry(change, &self.config) {
                Signal::OpenShort => {
                    tracing::info!(
                        ticker = ticker.as_str(),
                        change,
                        "short candidate"
                    );
                    candidates.short.push(ticker.clone());
                }
                Signal::OpenLong => {
                    tracing::info!(
                        ticker = ticker.as_str(),
                        change,
                        "long candidate"
                    );
                    candidates.long.push(ticker.clone());
                }
                Signal::Hold => {}
            }
        }

        candidates
    }

    /// Mark the ledger to market with whatever quotes are available.
    pub fn summarize(&self, ledger: &Ledger, now: DateTime<Utc>) -> CycleSummary {
        let prices: HashMap<String, f64> = ledger
            .positions()
            .keys()
            .filter_map(|ticker| {
                self.market
                    .current_price(ticker)
                    .ok()
                    .map(|p| (ticker.clone(), p))
            })
            .collect();
        summarize_ledger(ledger, &prices, now)
    }
}

/// Build a summary from a ledger and a set of quotes.
pub fn summarize_ledger(
    ledger: &Ledger,
    prices: &HashMap<String, f64>,
    now: DateTime<Utc>,
) -> CycleSummary {
    let initial_budget = ledger.config().initial_budget;
    let current_value = ledger.mark_to_market(prices);
    let stats = ledger.statistics();
    CycleSummary {
        timestamp: now,
        initial_budget,
        current_value,
        total_return: (current_value - initial_budget) / initial_budget,
        cash: stats.cash,
        active_positions: stats.open_position_count,
        total_trades: stats.total_trades,
        profitable_trades: stats.profitable_trades,
        losing_trades: stats.losing_trades,
        win_rate: stats.win_rate,
        total_profit: stats.total_realized_pl,
    }
}
