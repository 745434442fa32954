//! Persistence port traits.

use crate::domain::error::SimtraderError;
use crate::domain::ledger::LedgerSnapshot;
use crate::domain::performance::PerformanceSnapshot;

/// Load/save contract for ledger state.
pub trait LedgerStore {
    /// `Ok(None)` when nothing has been stored yet.
    fn load(&self) -> Result<Option<LedgerSnapshot>, SimtraderError>;

    /// Replaces the stored positions, cash and full trade history.
    fn save(&self, snapshot: &LedgerSnapshot) -> Result<(), SimtraderError>;
}

/// Append-only history of per-cycle performance snapshots.
pub trait PerformanceLog {
    fn append(&self, snapshot: &PerformanceSnapshot) -> Result<(), SimtraderError>;

    fn history(&self) -> Result<Vec<PerformanceSnapshot>, SimtraderError>;
}
