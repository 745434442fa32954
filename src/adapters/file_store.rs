//! Flat-file persistence in a data directory.
//!
//! - `positions.json`: cash and open positions, rewritten on every save
//! - `trades.csv`: full trade history, rewritten on every save
//! - `performance.csv`: one row per cycle, appended

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::domain::error::SimtraderError;
use crate::domain::ledger::LedgerSnapshot;
use crate::domain::performance::PerformanceSnapshot;
use crate::domain::position::{Position, Trade};
use crate::ports::store_port::{LedgerStore, PerformanceLog};

pub const POSITIONS_FILE: &str = "positions.json";
pub const TRADES_FILE: &str = "trades.csv";
pub const PERFORMANCE_FILE: &str = "performance.csv";
pub const UNIVERSE_CACHE_FILE: &str = "sp500_companies.json";

const BACKUP_PREFIX: &str = "backup_";
const SECONDS_PER_DAY: u64 = 24 * 3600;

#[derive(Debug, Serialize, Deserialize)]
struct PositionsFile {
    cash: f64,
    #[serde(default)]
    positions: BTreeMap<String, Position>,
}

pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    fn ensure_dir(&self) -> Result<(), SimtraderError> {
        fs::create_dir_all(&self.dir).map_err(|e| SimtraderError::Storage {
            reason: format!("failed to create {}: {}", self.dir.display(), e),
        })
    }

    fn load_trades(&self) -> Result<Vec<Trade>, SimtraderError> {
        let path = self.path(TRADES_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let mut rdr = csv::Reader::from_path(&path).map_err(|e| format_error(&path, e))?;
        rdr.deserialize()
            .collect::<Result<Vec<Trade>, _>>()
            .map_err(|e| format_error(&path, e))
    }

    /// Write the trade log to its temp file and return that path.
    fn write_trades_tmp(&self, trades: &[Trade]) -> Result<PathBuf, SimtraderError> {
        let tmp = self.path(TRADES_FILE).with_extension("csv.tmp");
        {
            let mut wtr = csv::Writer::from_path(&tmp).map_err(|e| storage_error(&tmp, e))?;
            if trades.is_empty() {
                wtr.write_record([
                    "ticker",
                    "action",
                    "price",
                    "quantity",
                    "timestamp",
                    "profit_loss",
                    "reason",
                ])
                .map_err(|e| storage_error(&tmp, e))?;
            }
            for trade in trades {
                wtr.serialize(trade).map_err(|e| storage_error(&tmp, e))?;
            }
            wtr.flush().map_err(|e| storage_error(&tmp, e))?;
        }
        Ok(tmp)
    }

    /// Write cash and open positions to their temp file and return that path.
    fn write_positions_tmp(&self, snapshot: &LedgerSnapshot) -> Result<PathBuf, SimtraderError> {
        let tmp = self.path(POSITIONS_FILE).with_extension("json.tmp");
        let file = PositionsFile {
            cash: snapshot.cash,
            positions: snapshot
                .positions
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        };
        let json = serde_json::to_string_pretty(&file).map_err(|e| storage_error(&tmp, e))?;
        fs::write(&tmp, json).map_err(|e| storage_error(&tmp, e))?;
        Ok(tmp)
    }

    /// Copy every existing data file into a fresh `backup_<timestamp>` directory.
    pub fn backup(&self, now: DateTime<Utc>) -> Result<PathBuf, SimtraderError> {
        let backup_dir = self.path(&format!(
            "{}{}",
            BACKUP_PREFIX,
            now.format("%Y%m%d_%H%M%S")
        ));
        fs::create_dir_all(&backup_dir).map_err(|e| storage_error(&backup_dir, e))?;

        for name in [
            POSITIONS_FILE,
            TRADES_FILE,
            PERFORMANCE_FILE,
            UNIVERSE_CACHE_FILE,
        ] {
            let src = self.path(name);
            if src.exists() {
                fs::copy(&src, backup_dir.join(name)).map_err(|e| storage_error(&src, e))?;
            }
        }

        tracing::info!(dir = %backup_dir.display(), "data backup created");
        Ok(backup_dir)
    }

    /// Remove backup directories last modified more than `keep_days` ago.
    pub fn cleanup_backups(&self, keep_days: u64) -> Result<Vec<PathBuf>, SimtraderError> {
        let cutoff = SystemTime::now()
            .checked_sub(Duration::from_secs(keep_days.saturating_mul(SECONDS_PER_DAY)))
            .unwrap_or(SystemTime::UNIX_EPOCH);

        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(storage_error(&self.dir, e)),
        };

        let mut removed = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| storage_error(&self.dir, e))?;
            let path = entry.path();
            let is_backup = entry.file_name().to_string_lossy().starts_with(BACKUP_PREFIX);
            if !is_backup || !path.is_dir() {
                continue;
            }
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .map_err(|e| storage_error(&path, e))?;
            if modified < cutoff {
                fs::remove_dir_all(&path).map_err(|e| storage_error(&path, e))?;
                tracing::info!(dir = %path.display(), "removed old backup");
                removed.push(path);
            }
        }
        removed.sort();
        Ok(removed)
    }
}

fn storage_error(path: &Path, e: impl std::fmt::Display) -> SimtraderError {
    SimtraderError::Storage {
        reason: format!("{}: {}", path.display(), e),
    }
}

fn format_error(path: &Path, e: impl std::fmt::Display) -> SimtraderError {
    SimtraderError::StorageFormat {
        file: path.display().to_string(),
        reason: e.to_string(),
    }
}

impl LedgerStore for FileStore {
    fn load(&self) -> Result<Option<LedgerSnapshot>, SimtraderError> {
        let path = self.path(POSITIONS_FILE);
        if !path.exists() {
            if self.path(TRADES_FILE).exists() {
                tracing::warn!(
                    dir = %self.dir.display(),
                    "trade history found without positions file, starting fresh"
                );
            }
            return Ok(None);
        }

        let content = fs::read_to_string(&path).map_err(|e| storage_error(&path, e))?;
        let file: PositionsFile =
            serde_json::from_str(&content).map_err(|e| format_error(&path, e))?;

        Ok(Some(LedgerSnapshot {
            cash: file.cash,
            positions: file.positions.into_iter().collect(),
            trades: self.load_trades()?,
        }))
    }

    /// Both files are fully written before either replaces its previous
    /// version, so a failed write leaves the stored ledger untouched.
    fn save(&self, snapshot: &LedgerSnapshot) -> Result<(), SimtraderError> {
        self.ensure_dir()?;
        let trades_tmp = self.write_trades_tmp(&snapshot.trades)?;
        let positions_tmp = match self.write_positions_tmp(snapshot) {
            Ok(tmp) => tmp,
            Err(e) => {
                if let Err(rm) = fs::remove_file(&trades_tmp) {
                    tracing::warn!(
                        file = %trades_tmp.display(),
                        error = %rm,
                        "failed to remove temp file"
                    );
                }
                return Err(e);
            }
        };

        let trades_path = self.path(TRADES_FILE);
        fs::rename(&trades_tmp, &trades_path).map_err(|e| storage_error(&trades_path, e))?;
        let positions_path = self.path(POSITIONS_FILE);
        fs::rename(&positions_tmp, &positions_path)
            .map_err(|e| storage_error(&positions_path, e))
    }
}

impl PerformanceLog for FileStore {
    fn append(&self, snapshot: &PerformanceSnapshot) -> Result<(), SimtraderError> {
        self.ensure_dir()?;
        let path = self.path(PERFORMANCE_FILE);
        let needs_header = fs::metadata(&path).map(|m| m.len() == 0).unwrap_or(true);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| storage_error(&path, e))?;
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        wtr.serialize(snapshot).map_err(|e| storage_error(&path, e))?;
        wtr.flush().map_err(|e| storage_error(&path, e))
    }

    fn history(&self) -> Result<Vec<PerformanceSnapshot>, SimtraderError> {
        let path = self.path(PERFORMANCE_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let mut rdr = csv::Reader::from_path(&path).map_err(|e| format_error(&path, e))?;
        rdr.deserialize()
            .collect::<Result<Vec<PerformanceSnapshot>, _>>()
            .map_err(|e| format_error(&path, e))
    }
}
