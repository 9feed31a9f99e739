//! # Stratum memory store
//!
//! In-memory implementations of stratum's backends, primarily for testing.
//!
//! [`InMemoryDatabase`] is a [`DocumentDatabase`](stratum_core::DocumentDatabase)
//! keeping collections, documents and indexes in a map, and
//! [`InMemoryLedgerStore`] keeps the ledger in a vector:
//!
//! ```ignore
//! use std::sync::Arc;
//! use stratum_core::{Lineage, Migrator, MigratorConfig, UpOptions};
//! use stratum_mem::{InMemoryDatabase, InMemoryLedgerStore};
//!
//! let migrator = Migrator::new(
//!     registry,
//!     Arc::new(InMemoryDatabase::new()),
//!     InMemoryLedgerStore::new(),
//!     MigratorConfig::default(),
//! );
//! migrator.up(&Lineage::ADMIN, UpOptions::default()).await?;
//! ```
//!
//! Nothing is persisted: dropping the values loses every document and
//! ledger entry.

#![deny(missing_docs)]

mod database;
mod ledger_store;

pub use database::*;
pub use ledger_store::*;
