//! In-memory ledger store and performance log.

use std::cell::RefCell;

use crate::domain::error::SimtraderError;
use crate::domain::ledger::LedgerSnapshot;
use crate::domain::performance::PerformanceSnapshot;
use crate::ports::store_port::{LedgerStore, PerformanceLog};

/// Keeps state for the life of the process only.
#[derive(Debug, Default)]
pub struct MemoryStore {
    ledger: RefCell<Option<LedgerSnapshot>>,
    history: RefCell<Vec<PerformanceSnapshot>>,
    saves: RefCell<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seeded with a stored ledger.
    pub fn with_snapshot(snapshot: LedgerSnapshot) -> Self {
        let store = Self::default();
        *store.ledger.borrow_mut() = Some(snapshot);
        store
    }

    pub fn save_count(&self) -> usize {
        *self.saves.borrow()
    }
}

impl LedgerStore for MemoryStore {
    fn load(&self) -> Result<Option<LedgerSnapshot>, SimtraderError> {
        Ok(self.ledger.borrow().clone())
    }

    fn save(&self, snapshot: &LedgerSnapshot) -> Result<(), SimtraderError> {
        *self.ledger.borrow_mut() = Some(snapshot.clone());
        *self.saves.borrow_mut() += 1;
        Ok(())
    }
}

impl PerformanceLog for MemoryStore {
    fn append(&self, snapshot: &PerformanceSnapshot) -> Result<(), SimtraderError> {
        self.history.borrow_mut().push(snapshot.clone());
        Ok(())
    }

    fn history(&self) -> Result<Vec<PerformanceSnapshot>, SimtraderError> {
        Ok(self.history.borrow().clone())
    }
}
