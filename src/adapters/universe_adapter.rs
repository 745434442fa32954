//! Ticker universe adapters.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::domain::error::SimtraderError;
use crate::domain::universe::{dedup_tickers, normalize_ticker, parse_tickers};
use crate::ports::universe_port::UniversePort;

pub const DEFAULT_CONSTITUENTS_URL: &str =
    "https://raw.githubusercontent.com/datasets/s-and-p-500-companies/main/data/constituents.csv";

const MAX_CACHE_HOURS: u64 = 24 * 365 * 100;

/// Large caps across sectors, used when no constituent list can be obtained.
/// Contains repeats; callers go through [`fallback_tickers`].
const FALLBACK_TICKERS: &[&str] = &[
    // Technology
    "AAPL", "MSFT", "GOOGL", "GOOG", "AMZN", "TSLA", "META", "NVDA", "NFLX", "ADBE", "CSCO",
    "AVGO", "ORCL", "INTC", "QCOM", "AMAT", "TXN", "IBM", "KLAC", "LRCX", "MRVL", "FTNT",
    "ANET", "PANW", "CDNS", "SNPS", "ADSK", "INTU", "CTSH", "FISV",
    // Healthcare
    "JNJ", "PFE", "ABBV", "MRK", "TMO", "ABT", "DHR", "BMY", "AMGN", "MDT", "GILD", "CVS",
    "UNH", "ANTM", "CI", "HUM", "BIIB", "REGN", "VRTX", "ISRG",
    // Financials
    "JPM", "BAC", "WFC", "GS", "MS", "C", "AXP", "BLK", "SCHW", "CB", "SPGI", "ICE", "CME",
    "COF", "TFC", "USB", "PNC", "AON", "MMC", "AJG",
    // Consumer and retail
    "WMT", "HD", "PG", "KO", "PEP", "DIS", "NKE", "MCD", "SBUX", "TGT", "COST", "LOW", "CRM",
    "TJX", "BKNG", "EL", "MDLZ", "GIS", "K", "HSY",
    // Industrials
    "GE", "MMM", "CAT", "UPS", "HON", "RTX", "LMT", "BA", "UNP", "FDX", "DE", "NSC", "CSX",
    "NOC", "GD", "EMR", "ETN", "PH", "CMI", "ITW",
    // Energy and utilities
    "XOM", "CVX", "COP", "EOG", "SLB", "PSX", "VLO", "MPC", "KMI", "OKE", "NEE", "SO", "DUK",
    "AEP", "EXC", "XEL", "D", "PCG", "SRE", "PEG",
    // Communication services
    "T", "VZ", "CMCSA", "CHTR", "TMUS", "DISH",
    // Materials
    "LIN", "APD", "ECL", "DD", "DOW", "PPG", "SHW", "FCX", "NEM", "GOLD",
    // Real estate
    "AMT", "PLD", "CCI", "EQIX", "PSA", "WELL", "DLR", "O", "SPG", "AVB",
    // Consumer staples
    "WMT", "PG", "KO", "PEP", "COST", "CL", "KHC", "GIS", "K", "CAG",
];

/// The built-in list with repeats removed, in declaration order.
pub fn fallback_tickers() -> Vec<String> {
    dedup_tickers(FALLBACK_TICKERS.iter().copied())
}

/// Fixed ticker list, typically from the `tickers` configuration key.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticUniverse {
    tickers: Vec<String>,
}

impl StaticUniverse {
    pub fn new(tickers: Vec<String>) -> Self {
        Self { tickers }
    }

    /// Parse a comma-separated list; errors name the `[data] tickers` key.
    pub fn from_list(list: &str) -> Result<Self, SimtraderError> {
        parse_tickers(list)
            .map(Self::new)
            .map_err(|e| SimtraderError::ConfigInvalid {
                section: "data".into(),
                key: "tickers".into(),
                reason: e.to_string(),
            })
    }
}

impl UniversePort for StaticUniverse {
    fn tickers(&self) -> Result<Vec<String>, SimtraderError> {
        Ok(self.tickers.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct UniverseCache {
    tickers: Vec<String>,
    last_updated: DateTime<Utc>,
}

/// S&P 500 constituents with an on-disk cache.
///
/// Resolution order: fresh cache, download, stale cache, built-in list.
pub struct Sp500Universe {
    cache_path: PathBuf,
    ttl: Duration,
    max_companies: usize,
    #[cfg_attr(not(feature = "network"), allow(dead_code))]
    source_url: Option<String>,
    #[cfg(feature = "network")]
    timeout: std::time::Duration,
}

impl Sp500Universe {
    pub fn new(cache_path: PathBuf, ttl_hours: u64, max_companies: usize) -> Self {
        Self {
            cache_path,
            ttl: Duration::hours(ttl_hours.min(MAX_CACHE_HOURS) as i64),
            max_companies,
            source_url: Some(DEFAULT_CONSTITUENTS_URL.to_string()),
            #[cfg(feature = "network")]
            timeout: std::time::Duration::from_secs(10),
        }
    }

    /// Never download; only the cache and the built-in list are used.
    pub fn offline(mut self) -> Self {
        self.source_url = None;
        self
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    #[cfg(feature = "network")]
    pub fn with_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolve the universe as of `now`. Never fails.
    pub fn tickers_at(&self, now: DateTime<Utc>) -> Vec<String> {
        let cached = self.read_cache();

        if let Some(cache) = &cached {
            if now - cache.last_updated < self.ttl {
                tracing::debug!(count = cache.tickers.len(), "using cached universe");
                return cache.tickers.clone();
            }
        }

        match self.refresh(now) {
            Ok(tickers) => {
                tracing::info!(count = tickers.len(), "loaded S&P 500 constituents");
                return tickers;
            }
            Err(e) => tracing::warn!(error = %e, "constituent download failed"),
        }

        if let Some(cache) = cached {
            tracing::warn!(
                last_updated = %cache.last_updated,
                "falling back to stale universe cache"
            );
            return cache.tickers;
        }

        let tickers = fallback_tickers();
        tracing::warn!(count = tickers.len(), "falling back to built-in universe");
        tickers
    }

    fn read_cache(&self) -> Option<UniverseCache> {
        let content = fs::read_to_string(&self.cache_path).ok()?;
        match serde_json::from_str::<UniverseCache>(&content) {
            Ok(cache) if !cache.tickers.is_empty() => Some(cache),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(
                    file = %self.cache_path.display(),
                    error = %e,
                    "ignoring unreadable universe cache"
                );
                None
            }
        }
    }

    fn write_cache(&self, cache: &UniverseCache) -> Result<(), SimtraderError> {
        if let Some(parent) = self.cache_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(cache).map_err(|e| SimtraderError::Storage {
            reason: format!("{}: {}", self.cache_path.display(), e),
        })?;
        fs::write(&self.cache_path, json)?;
        Ok(())
    }

    fn refresh(&self, now: DateTime<Utc>) -> Result<Vec<String>, SimtraderError> {
        let body = self.download()?;
        let tickers = parse_constituents(&body, self.max_companies)?;

        let cache = UniverseCache {
            tickers: tickers.clone(),
            last_updated: now,
        };
        if let Err(e) = self.write_cache(&cache) {
            tracing::warn!(error = %e, "failed to write universe cache");
        }
        Ok(tickers)
    }

    #[cfg(feature = "network")]
    fn download(&self) -> Result<String, SimtraderError> {
        let url = self.source_url.as_deref().ok_or_else(|| SimtraderError::Universe {
            reason: "no constituent source configured".into(),
        })?;
        let universe_error = |reason: String| SimtraderError::Universe { reason };

        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| universe_error(format!("failed to build HTTP client: {}", e)))?;
        let response = client
            .get(url)
            .send()
            .map_err(|e| universe_error(format!("request failed: {}", e)))?;
        if !response.status().is_success() {
            return Err(universe_error(format!("HTTP {}", response.status())));
        }
        response
            .text()
            .map_err(|e| universe_error(format!("failed to read body: {}", e)))
    }

    #[cfg(not(feature = "network"))]
    fn download(&self) -> Result<String, SimtraderError> {
        Err(SimtraderError::Universe {
            reason: "built without network support".into(),
        })
    }
}

impl UniversePort for Sp500Universe {
    fn tickers(&self) -> Result<Vec<String>, SimtraderError> {
        Ok(self.tickers_at(Utc::now()))
    }
}

/// Extract the `Symbol` column of a constituents CSV, normalized and truncated.
pub fn parse_constituents(csv_text: &str, max: usize) -> Result<Vec<String>, SimtraderError> {
    let universe_error = |reason: String| SimtraderError::Universe { reason };

    let mut rdr = csv::Reader::from_reader(csv_text.as_bytes());
    let headers = rdr
        .headers()
        .map_err(|e| universe_error(format!("CSV parse error: {}", e)))?;
    let symbol_idx = headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case("symbol"))
        .ok_or_else(|| universe_error("missing Symbol column".into()))?;

    let mut symbols = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| universe_error(format!("CSV parse error: {}", e)))?;
        if let Some(symbol) = record.get(symbol_idx).map(str::trim).filter(|s| !s.is_empty()) {
            symbols.push(normalize_ticker(symbol));
        }
    }

    let mut tickers = dedup_tickers(symbols);
    tickers.truncate(max);
    if tickers.is_empty() {
        return Err(universe_error("constituent list is empty".into()));
    }
    Ok(tickers)
}
