use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use stratum_core::{BoxError, LedgerEntry, LedgerStore, Lineage};

/// An in-memory ledger store.
///
/// Clones share the same entries. Appends can be made to fail on demand with
/// [`InMemoryLedgerStore::set_failing`], to exercise bookkeeping failures.
#[derive(Clone, Debug, Default)]
pub struct InMemoryLedgerStore {
    entries: Arc<Mutex<Vec<LedgerEntry>>>,
    failing: Arc<AtomicBool>,
}

impl InMemoryLedgerStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        log::debug!("Creating a new InMemoryLedgerStore");
        Self::default()
    }

    /// Makes every following append fail (`true`) or succeed (`false`).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Every entry of every lineage, in append order.
    pub async fn all_entries(&self) -> Vec<LedgerEntry> {
        self.entries.lock().await.clone()
    }
}

/// Errors returned by the [`InMemoryLedgerStore`].
#[derive(Debug, thiserror::Error)]
pub enum InMemoryLedgerStoreError {
    /// Appends were switched off with [`InMemoryLedgerStore::set_failing`].
    #[error("Ledger store is refusing writes")]
    WritesRefused,
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn append(&self, entry: LedgerEntry) -> Result<(), BoxError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Box::new(InMemoryLedgerStoreError::WritesRefused));
        }
        log::debug!(
            "Appending ledger entry {}@{} ({})",
            entry.lineage,
            entry.version,
            entry.direction.past_tense()
        );
        self.entries.lock().await.push(entry);
        Ok(())
    }

    async fn entries(&self, lineage: &Lineage) -> Result<Vec<LedgerEntry>, BoxError> {
        Ok(self
            .entries
            .lock()
            .await
            .iter()
            .filter(|e| &e.lineage == lineage)
            .cloned()
            .collect())
    }
}
