//! Version ledger: the persisted, append-only history of applied and reverted
//! migrations, per lineage.
//!
//! The ledger is the only source of truth for what has been applied. Backends
//! implement [`LedgerStore`], which only knows how to append an entry and list
//! the entries of a lineage; everything else is derived here.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{BoxError, MigrationError};
use crate::migration::Direction;
use crate::version::{Lineage, Version};

/// One row of the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// The lineage the migration belongs to.
    pub lineage: Lineage,
    /// The migration version.
    pub version: Version,
    /// The migration name at the time it ran.
    pub name: String,
    /// Whether this entry records an `up` (applied) or a `down` (reverted).
    pub direction: Direction,
    /// When the migration finished.
    pub applied_at: DateTime<Utc>,
    /// Checksum of the migration when it was applied. Reverted entries carry none.
    pub checksum: Option<String>,
}

/// Storage backend of the ledger.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Durably appends an entry. Must only return `Ok` once the entry is persisted.
    async fn append(&self, entry: LedgerEntry) -> Result<(), BoxError>;

    /// Returns every entry of a lineage, in the order they were appended.
    async fn entries(&self, lineage: &Lineage) -> Result<Vec<LedgerEntry>, BoxError>;
}

#[async_trait]
impl<T: LedgerStore + ?Sized> LedgerStore for Arc<T> {
    async fn append(&self, entry: LedgerEntry) -> Result<(), BoxError> {
        (**self).append(entry).await
    }

    async fn entries(&self, lineage: &Lineage) -> Result<Vec<LedgerEntry>, BoxError> {
        (**self).entries(lineage).await
    }
}

/// Queries and records migration history on top of a [`LedgerStore`].
#[derive(Debug, Clone)]
pub struct Ledger<S> {
    store: S,
}

impl<S: LedgerStore> Ledger<S> {
    /// Creates a ledger over a store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Records that a migration's `up` completed.
    pub async fn record_applied(
        &self,
        lineage: &Lineage,
        version: Version,
        name: &str,
        checksum: Option<String>,
    ) -> Result<LedgerEntry, MigrationError> {
        self.record(lineage, version, name, Direction::Up, checksum)
            .await
    }

    /// Records that a migration's `down` completed.
    pub async fn record_reverted(
        &self,
        lineage: &Lineage,
        version: Version,
        name: &str,
    ) -> Result<LedgerEntry, MigrationError> {
        self.record(lineage, version, name, Direction::Down, None)
            .await
    }

    async fn record(
        &self,
        lineage: &Lineage,
        version: Version,
        name: &str,
        direction: Direction,
        checksum: Option<String>,
    ) -> Result<LedgerEntry, MigrationError> {
        let entry = LedgerEntry {
            lineage: lineage.clone(),
            version,
            name: name.to_string(),
            direction,
            applied_at: Utc::now(),
            checksum,
        };

        self.store
            .append(entry.clone())
            .await
            .map_err(|source| {
                log::error!(
                    "Ledger write failed for {}@{} ({}): {}",
                    lineage,
                    version,
                    direction.past_tense(),
                    source
                );
                MigrationError::Persistence {
                    lineage: lineage.clone(),
                    version,
                    direction,
                    source,
                }
            })?;

        Ok(entry)
    }

    /// The full append log of a lineage.
    pub async fn history(&self, lineage: &Lineage) -> Result<Vec<LedgerEntry>, MigrationError> {
        self.store
            .entries(lineage)
            .await
            .map_err(MigrationError::Ledger)
    }

    /// The live `applied` entry of every currently applied version.
    ///
    /// A version is applied when its latest entry is an `applied` one.
    pub async fn applied(
        &self,
        lineage: &Lineage,
    ) -> Result<BTreeMap<Version, LedgerEntry>, MigrationError> {
        let mut applied = BTreeMap::new();
        for entry in self.history(lineage).await? {
            match entry.direction {
                Direction::Up => {
                    applied.insert(entry.version, entry);
                }
                Direction::Down => {
                    applied.remove(&entry.version);
                }
            }
        }
        Ok(applied)
    }

    /// Versions currently considered applied.
    pub async fn applied_versions(
        &self,
        lineage: &Lineage,
    ) -> Result<BTreeSet<Version>, MigrationError> {
        Ok(self.applied(lineage).await?.into_keys().collect())
    }

    /// Highest applied version, if any.
    pub async fn latest_applied(&self, lineage: &Lineage) -> Result<Option<Version>, MigrationError> {
        Ok(self.applied_versions(lineage).await?.last().copied())
    }
}
