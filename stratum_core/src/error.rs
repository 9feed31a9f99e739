//! Error taxonomy shared by the registry, ledger, runner and authoring tool.

use std::path::PathBuf;

use crate::migration::Direction;
use crate::version::{Lineage, Version};

/// Boxed error returned by database and ledger backends, and by migration bodies.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur during migration operations.
///
/// None of these are retried automatically: every variant terminates the
/// current run and is surfaced to the caller.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// The caller supplied missing or malformed arguments.
    #[error("Usage error: {0}")]
    Usage(String),

    /// A version string does not have the `major.minor.patch` numeric shape.
    #[error("Invalid version '{input}': {reason}")]
    Format {
        /// The rejected input.
        input: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Two migrations claim the same version within a lineage, or a requested
    /// version conflicts with what is registered or already on disk.
    #[error("Conflict in lineage {lineage} at version {version}: {reason}")]
    Conflict {
        /// The lineage where the conflict was found.
        lineage: Lineage,
        /// The contested version.
        version: Version,
        /// Details about the conflict.
        reason: String,
    },

    /// A migration body failed while running.
    #[error("Migration {lineage}@{version} ({name}) failed during {direction}: {source}")]
    Execution {
        /// The lineage of the failed migration.
        lineage: Lineage,
        /// The version of the failed migration.
        version: Version,
        /// The name of the failed migration.
        name: String,
        /// Whether `up` or `down` was running.
        direction: Direction,
        /// The error returned by the migration body.
        #[source]
        source: BoxError,
    },

    /// A rollback reached a migration that declares itself irreversible.
    #[error(
        "Migration {lineage}@{version} ({name}) cannot be rolled back: down is not supported"
    )]
    UnsupportedRollback {
        /// The lineage of the blocking migration.
        lineage: Lineage,
        /// The version of the blocking migration.
        version: Version,
        /// The name of the blocking migration.
        name: String,
    },

    /// The migration body succeeded but the ledger write did not.
    ///
    /// The database has been mutated without the bookkeeping reflecting it.
    #[error(
        "Migration {lineage}@{version} was {} but the ledger could not record it; \
         manual reconciliation required: {source}",
        .direction.past_tense()
    )]
    Persistence {
        /// The lineage of the affected migration.
        lineage: Lineage,
        /// The version of the affected migration.
        version: Version,
        /// The direction that ran successfully.
        direction: Direction,
        /// The ledger backend error.
        #[source]
        source: BoxError,
    },

    /// A migration's checksum doesn't match what was recorded when it was applied.
    #[error(
        "Migration {lineage}@{version} ({name}) checksum mismatch: expected {expected}, found {found}"
    )]
    ChecksumMismatch {
        /// The lineage of the drifted migration.
        lineage: Lineage,
        /// The version of the drifted migration.
        version: Version,
        /// The name of the migration.
        name: String,
        /// The checksum recorded in the ledger.
        expected: String,
        /// The checksum computed from the registered migration.
        found: String,
    },

    /// The ledger could not be read.
    #[error("Ledger error: {0}")]
    Ledger(#[source] BoxError),

    /// A file system operation of the authoring tool failed.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        /// The path being accessed.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The migration template could not be rendered.
    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),
}
