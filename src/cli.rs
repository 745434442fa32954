//! CLI definition and dispatch.

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use crate::adapters::csv_market_adapter::CsvMarketAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::file_store::{FileStore, UNIVERSE_CACHE_FILE};
use crate::adapters::universe_adapter::{Sp500Universe, StaticUniverse};
#[cfg(feature = "network")]
use crate::adapters::yahoo_adapter::YahooMarketAdapter;
use crate::domain::config::{DataConfig, DataSource, ScheduleConfig, TradingConfig};
use crate::domain::config_validation::{
    validate_data_config, validate_schedule_config, validate_trading_config,
};
use crate::domain::cycle::{summarize_ledger, CycleSummary, TradingEngine};
use crate::domain::error::SimtraderError;
use crate::domain::ledger::{is_usable_price, Ledger};
use crate::domain::performance::PerformanceReport;
use crate::ports::config_port::ConfigPort;
use crate::ports::market_data_port::MarketDataPort;
use crate::ports::store_port::{LedgerStore, PerformanceLog};
use crate::ports::universe_port::UniversePort;

#[derive(Parser, Debug)]
#[command(name = "simtrader", about = "Long/short equity paper-trading simulator")]
pub struct Cli {
    /// INI configuration file; built-in defaults when omitted
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    /// Debug-level logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a single trading cycle
    Run,
    /// Run trading cycles on a fixed interval
    Continuous {
        /// Minutes between cycles; overrides [schedule] interval_minutes
        #[arg(long)]
        interval: Option<u64>,
        /// Stop after this many cycles
        #[arg(long)]
        max_cycles: Option<u64>,
    },
    /// Show the stored portfolio marked to market
    Status,
    /// Build a performance report from the recorded history
    Analyze {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Copy data files to a timestamped backup and prune old backups
    Backup {
        #[arg(long, default_value_t = 30)]
        keep_days: u64,
    },
}

/// Everything a command needs from the configuration file, validated.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub trading: TradingConfig,
    pub data: DataConfig,
    pub schedule: ScheduleConfig,
}

pub fn run(cli: Cli) -> ExitCode {
    init_logging(cli.verbose);

    let result = load_settings(cli.config.as_deref()).and_then(|settings| match cli.command {
        Command::Run => run_once(&settings),
        Command::Continuous {
            interval,
            max_cycles,
        } => run_continuous(&settings, interval, max_cycles),
        Command::Status => run_status(&settings),
        Command::Analyze { output } => run_analyze(&settings, output.as_deref()),
        Command::Backup { keep_days } => run_backup(&settings, keep_days),
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Install the global fmt subscriber. `RUST_LOG` overrides the level.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn load_config(path: Option<&Path>) -> Result<FileConfigAdapter, SimtraderError> {
    match path {
        None => Ok(FileConfigAdapter::empty()),
        Some(path) => {
            tracing::info!(file = %path.display(), "loading config");
            FileConfigAdapter::from_file(path).map_err(|e| SimtraderError::ConfigParse {
                file: path.display().to_string(),
                reason: e.to_string(),
            })
        }
    }
}

pub fn load_settings(path: Option<&Path>) -> Result<Settings, SimtraderError> {
    let adapter = load_config(path)?;
    build_settings(&adapter)
}

pub fn build_settings(adapter: &dyn ConfigPort) -> Result<Settings, SimtraderError> {
    validate_trading_config(adapter)?;
    validate_data_config(adapter)?;
    validate_schedule_config(adapter)?;

    Ok(Settings {
        trading: build_trading_config(adapter),
        data: build_data_config(adapter)?,
        schedule: build_schedule_config(adapter),
    })
}

pub fn build_trading_config(adapter: &dyn ConfigPort) -> TradingConfig {
    let defaults = TradingConfig::default();
    let initial_budget = adapter.get_double("trading", "initial_budget", defaults.initial_budget);
    let position_size = adapter.get_double("trading", "position_size", defaults.position_size);
    let derived = TradingConfig::derived_max_positions(initial_budget, position_size);

    TradingConfig {
        initial_budget,
        position_size,
        max_positions: adapter
            .get_int("trading", "max_positions", derived as i64)
            .max(0) as usize,
        short_trigger: adapter.get_double("trading", "short_trigger", defaults.short_trigger),
        buy_trigger: adapter.get_double("trading", "buy_trigger", defaults.buy_trigger),
        take_profit_pct: adapter.get_double("trading", "take_profit", defaults.take_profit_pct),
        stop_loss_pct: adapter.get_double("trading", "stop_loss", defaults.stop_loss_pct),
        lookback_days: adapter
            .get_int("trading", "lookback_days", defaults.lookback_days as i64)
            .max(1) as usize,
    }
}

pub fn build_data_config(adapter: &dyn ConfigPort) -> Result<DataConfig, SimtraderError> {
    let defaults = DataConfig::default();

    let source = match adapter.get_string("data", "source").as_deref() {
        Some("csv") => {
            let dir = adapter
                .get_string("data", "csv_dir")
                .ok_or_else(|| SimtraderError::ConfigMissing {
                    section: "data".into(),
                    key: "csv_dir".into(),
                })?;
            DataSource::Csv(PathBuf::from(dir))
        }
        _ => DataSource::Yahoo,
    };

    let tickers = match adapter.get_string("data", "tickers") {
        Some(list) => Some(StaticUniverse::from_list(&list)?.tickers()?),
        None => None,
    };

    let non_negative = |key: &str, default: u64| {
        adapter.get_int("data", key, default as i64).max(0) as u64
    };

    Ok(DataConfig {
        data_dir: adapter
            .get_string("data", "data_dir")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir),
        source,
        tickers,
        max_companies: non_negative("max_companies", defaults.max_companies as u64) as usize,
        request_timeout_secs: non_negative("request_timeout_secs", defaults.request_timeout_secs),
        request_pause_ms: non_negative("request_pause_ms", defaults.request_pause_ms),
        universe_cache_hours: non_negative("universe_cache_hours", defaults.universe_cache_hours),
    })
}

pub fn build_schedule_config(adapter: &dyn ConfigPort) -> ScheduleConfig {
    let defaults = ScheduleConfig::default();
    ScheduleConfig {
        interval_minutes: adapter
            .get_int("schedule", "interval_minutes", defaults.interval_minutes as i64)
            .max(1) as u64,
    }
}

pub fn build_market(data: &DataConfig) -> Result<Box<dyn MarketDataPort>, SimtraderError> {
    match &data.source {
        DataSource::Csv(dir) => Ok(Box::new(CsvMarketAdapter::new(dir.clone()))),
        DataSource::Yahoo => build_yahoo(data),
    }
}

#[cfg(feature = "network")]
fn build_yahoo(data: &DataConfig) -> Result<Box<dyn MarketDataPort>, SimtraderError> {
    Ok(Box::new(YahooMarketAdapter::new(
        Duration::from_secs(data.request_timeout_secs),
        Duration::from_millis(data.request_pause_ms),
    )?))
}

#[cfg(not(feature = "network"))]
fn build_yahoo(_data: &DataConfig) -> Result<Box<dyn MarketDataPort>, SimtraderError> {
    Err(SimtraderError::ConfigInvalid {
        section: "data".into(),
        key: "source".into(),
        reason: "yahoo source requires the network feature".into(),
    })
}

pub fn build_universe(data: &DataConfig) -> Box<dyn UniversePort> {
    if let Some(tickers) = &data.tickers {
        return Box::new(StaticUniverse::new(tickers.clone()));
    }

    let universe = Sp500Universe::new(
        data.data_dir.join(UNIVERSE_CACHE_FILE),
        data.universe_cache_hours,
        data.max_companies,
    );
    #[cfg(feature = "network")]
    let universe = universe.with_timeout(Duration::from_secs(data.request_timeout_secs));
    Box::new(universe)
}

fn run_once(settings: &Settings) -> Result<(), SimtraderError> {
    let market = build_market(&settings.data)?;
    let universe = build_universe(&settings.data);
    let store = FileStore::new(settings.data.data_dir.clone());
    let engine = TradingEngine::new(
        settings.trading.clone(),
        market.as_ref(),
        universe.as_ref(),
        &store,
    )
    .with_performance_log(&store);

    eprintln!("Budget: ${:.2}", settings.trading.initial_budget);
    eprintln!("Position size: ${:.2}", settings.trading.position_size);

    let mut ledger = engine.load_ledger()?;
    let summary = engine
        .run_cycle(&mut ledger, Utc::now())
        .map_err(|e| SimtraderError::Cycle {
            reason: e.to_string(),
        })?;
    print_summary(&summary);
    Ok(())
}

fn run_continuous(
    settings: &Settings,
    interval: Option<u64>,
    max_cycles: Option<u64>,
) -> Result<(), SimtraderError> {
    let interval_minutes = interval.unwrap_or(settings.schedule.interval_minutes).max(1);
    let market = build_market(&settings.data)?;
    let universe = build_universe(&settings.data);
    let store = FileStore::new(settings.data.data_dir.clone());
    let engine = TradingEngine::new(
        settings.trading.clone(),
        market.as_ref(),
        universe.as_ref(),
        &store,
    )
    .with_performance_log(&store);

    eprintln!("Running a cycle every {interval_minutes} minutes, Ctrl+C to stop");

    let mut completed = 0u64;
    loop {
        // Reload so a failed cycle never leaks partial state into the next one.
        match engine.load_ledger() {
            Ok(mut ledger) => {
                if let Some(summary) = engine.run_cycle_logged(&mut ledger, Utc::now()) {
                    print_summary(&summary);
                }
            }
            Err(e) => tracing::error!(error = %e, "failed to load stored ledger"),
        }

        completed += 1;
        if max_cycles.is_some_and(|max| completed >= max) {
            break;
        }

        tracing::info!(minutes = interval_minutes, "waiting for next cycle");
        std::thread::sleep(Duration::from_secs(interval_minutes * 60));
    }

    Ok(())
}

fn run_status(settings: &Settings) -> Result<(), SimtraderError> {
    let store = FileStore::new(settings.data.data_dir.clone());
    let ledger = match store.load()? {
        Some(snapshot) => Ledger::restore(settings.trading.clone(), snapshot),
        None => {
            println!("No stored portfolio in {}", store.dir().display());
            Ledger::new(settings.trading.clone())
        }
    };

    let market = build_market(&settings.data)?;
    let prices = current_prices(&ledger, market.as_ref());
    let summary = summarize_ledger(&ledger, &prices, Utc::now());

    println!("{}", render_status(&summary, &ledger, &prices));
    Ok(())
}

fn run_analyze(settings: &Settings, output: Option<&Path>) -> Result<(), SimtraderError> {
    let store = FileStore::new(settings.data.data_dir.clone());
    let history = store.history()?;
    let trades = store.load()?.map(|s| s.trades).unwrap_or_default();

    let now = Utc::now();
    let Some(report) =
        PerformanceReport::compute(&history, &trades, settings.trading.initial_budget)
    else {
        println!("No performance data available");
        return Ok(());
    };

    let text = report.render_text(now);
    println!("{text}");

    let path = match output {
        Some(p) => p.to_path_buf(),
        None => default_report_path(&settings.data.data_dir, now),
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, text)?;
    eprintln!("Report written to: {}", path.display());
    Ok(())
}

fn run_backup(settings: &Settings, keep_days: u64) -> Result<(), SimtraderError> {
    let store = FileStore::new(settings.data.data_dir.clone());
    let dir = store.backup(Utc::now())?;
    println!("Backup created: {}", dir.display());

    let removed = store.cleanup_backups(keep_days)?;
    if !removed.is_empty() {
        println!("Removed {} backup(s) older than {} days", removed.len(), keep_days);
    }
    Ok(())
}

pub fn default_report_path(data_dir: &Path, now: DateTime<Utc>) -> PathBuf {
    data_dir.join(format!("report_{}.txt", now.format("%Y%m%d_%H%M%S")))
}

/// Quotes for every open position; tickers without a usable quote are left out.
pub fn current_prices(ledger: &Ledger, market: &dyn MarketDataPort) -> HashMap<String, f64> {
    ledger
        .positions()
        .keys()
        .filter_map(|ticker| match market.current_price(ticker) {
            Ok(price) if is_usable_price(price) => Some((ticker.clone(), price)),
            Ok(price) => {
                tracing::warn!(ticker = ticker.as_str(), price, "unusable current price");
                None
            }
            Err(e) => {
                tracing::warn!(ticker = ticker.as_str(), error = %e, "no current price");
                None
            }
        })
        .collect()
}

pub fn render_summary(summary: &CycleSummary) -> String {
    [
        "=== Simulation Results ===".to_string(),
        format!("Current value:    ${:.2}", summary.current_value),
        format!("Cash:             ${:.2}", summary.cash),
        format!("Total return:     {:.2}%", summary.total_return * 100.0),
        format!("Active positions: {}", summary.active_positions),
        format!("Total trades:     {}", summary.total_trades),
        format!("Win rate:         {:.1}%", summary.win_rate * 100.0),
        format!("Total profit:     ${:.2}", summary.total_profit),
    ]
    .join("\n")
}

fn print_summary(summary: &CycleSummary) {
    println!("\n{}", render_summary(summary));
}

pub fn render_status(
    summary: &CycleSummary,
    ledger: &Ledger,
    prices: &HashMap<String, f64>,
) -> String {
    let mut lines = vec![render_summary(summary)];

    let positions = ledger.sorted_positions();
    if !positions.is_empty() {
        lines.push(String::new());
        lines.push("=== Open Positions ===".to_string());
        for pos in positions {
            let line = match prices.get(&pos.ticker) {
                Some(&price) => format!(
                    "  {:<6} {:<5} @ ${:.2}  now ${:.2}  P&L ${:+.2}",
                    pos.ticker,
                    pos.direction,
                    pos.entry_price,
                    price,
                    pos.unrealized_pnl(price)
                ),
                None => format!(
                    "  {:<6} {:<5} @ ${:.2}  (no quote)",
                    pos.ticker, pos.direction, pos.entry_price
                ),
            };
            lines.push(line);
        }
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["simtrader", "run", "-v", "-c", "sim.ini"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("sim.ini")));
        assert!(matches!(cli.command, Command::Run));
    }

    #[test]
    fn cli_parses_continuous_options() {
        let cli = Cli::try_parse_from([
            "simtrader",
            "continuous",
            "--interval",
            "5",
            "--max-cycles",
            "3",
        ])
        .unwrap();
        match cli.command {
            Command::Continuous {
                interval,
                max_cycles,
            } => {
                assert_eq!(interval, Some(5));
                assert_eq!(max_cycles, Some(3));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_backup_default_keep_days() {
        let cli = Cli::try_parse_from(["simtrader", "backup"]).unwrap();
        assert!(matches!(cli.command, Command::Backup { keep_days: 30 }));
    }

    #[test]
    fn cli_rejects_unknown_command() {
        assert!(Cli::try_parse_from(["simtrader", "trade"]).is_err());
    }

    #[test]
    fn report_path_uses_timestamp() {
        let now = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        assert_eq!(
            default_report_path(Path::new("data"), now),
            PathBuf::from("data/report_20240506_070809.txt")
        );
    }

    #[test]
    fn summary_rendering_formats_percentages() {
        let summary = CycleSummary {
            timestamp: Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap(),
            initial_budget: 1000.0,
            current_value: 1012.5,
            total_return: 0.0125,
            cash: 950.0,
            active_positions: 5,
            total_trades: 8,
            profitable_trades: 2,
            losing_trades: 1,
            win_rate: 0.25,
            total_profit: 1.5,
        };
        let text = render_summary(&summary);
        assert!(text.contains("Current value:    $1012.50"));
        assert!(text.contains("Total return:     1.25%"));
        assert!(text.contains("Win rate:         25.0%"));
    }
}
