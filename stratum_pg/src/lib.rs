//! # Stratum postgres store
//!
//! PostgreSQL backends for stratum: a JSONB-backed [`PgDocumentDatabase`] and
//! the [`PgLedgerStore`] keeping the migration ledger in `_stratum_ledger`.

#![deny(missing_docs)]

/// The document database implementation for postgres
pub mod document_database;

/// The ledger store implementation for postgres
pub mod ledger_store;

mod sql;

pub use document_database::*;
pub use ledger_store::*;
