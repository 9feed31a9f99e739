//! The migration record contract.
//!
//! A migration is a struct implementing [`MigrationInfo`] (usually through
//! `#[derive(MigrationInfo)]`) and [`Migration`]. Bodies receive a
//! [`MigrationContext`] built by the runner instead of reaching for global
//! state, so everything a migration touches arrives through its parameter.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::database::{Document, DocumentDatabase, Filter, IndexSpec, Update};
use crate::error::BoxError;
use crate::version::{Lineage, Version};

/// The direction a migration runs in.
///
/// Ledger entries store the past tense: `applied` for `Up`, `reverted` for `Down`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Forward, via `up`.
    #[serde(rename = "applied")]
    Up,
    /// Backward, via `down`.
    #[serde(rename = "reverted")]
    Down,
}

impl Direction {
    /// `applied` or `reverted`.
    pub fn past_tense(&self) -> &'static str {
        match self {
            Direction::Up => "applied",
            Direction::Down => "reverted",
        }
    }

    /// Inverse of [`Direction::past_tense`].
    pub fn from_past_tense(raw: &str) -> Option<Self> {
        match raw {
            "applied" => Some(Direction::Up),
            "reverted" => Some(Direction::Down),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => f.write_str("up"),
            Direction::Down => f.write_str("down"),
        }
    }
}

/// Static metadata of a migration.
///
/// Derive it with `#[derive(MigrationInfo)]` from `stratum_derive`, which also
/// checks the version format at compile time.
pub trait MigrationInfo {
    /// Three-part numeric version, e.g. `"1.4.0"`. Unique within a lineage.
    fn version(&self) -> &'static str;

    /// Short human-readable name, e.g. `"create_accounts"`.
    fn name(&self) -> &'static str;

    /// Free-form description.
    fn description(&self) -> &'static str {
        ""
    }

    /// Whether `down` reverses `up`.
    ///
    /// Returning `false` is the explicit "rollback unsupported" marker: the
    /// runner refuses to roll back past this migration and never calls `down`.
    fn reversible(&self) -> bool {
        true
    }
}

/// Returned by the default `down` body.
#[derive(Debug, thiserror::Error)]
#[error("down is not implemented for this migration")]
pub struct NotReversible;

/// Represents a single database migration.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use stratum_core::{BoxError, IndexSpec, Migration, MigrationContext, MigrationInfo};
///
/// #[derive(MigrationInfo)]
/// #[migration(version = "1.0.0", description = "Unique index on account emails")]
/// pub struct CreateAccounts;
///
/// #[async_trait]
/// impl Migration for CreateAccounts {
///     async fn up(&self, ctx: &MigrationContext<'_>) -> Result<(), BoxError> {
///         ctx.collection("accounts")
///             .create_index(&IndexSpec::new("accounts_email").asc("email").unique())
///             .await
///     }
///
///     async fn down(&self, ctx: &MigrationContext<'_>) -> Result<(), BoxError> {
///         ctx.collection("accounts").drop_collection().await
///     }
/// }
/// ```
#[async_trait]
pub trait Migration: MigrationInfo + Send + Sync {
    /// Moves the database forward.
    ///
    /// Should be written so that re-running it over an already migrated
    /// database is harmless.
    async fn up(&self, ctx: &MigrationContext<'_>) -> Result<(), BoxError>;

    /// Reverses the effect of `up`.
    async fn down(&self, _ctx: &MigrationContext<'_>) -> Result<(), BoxError> {
        Err(Box::new(NotReversible))
    }

    /// Returns the checksum of this migration for drift detection.
    ///
    /// Default implementation computes SHA-256 over the version, name,
    /// description and reversibility.
    fn checksum(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.version().as_bytes());
        hasher.update([0]);
        hasher.update(self.name().as_bytes());
        hasher.update([0]);
        hasher.update(self.description().as_bytes());
        hasher.update([u8::from(self.reversible())]);
        format!("{:x}", hasher.finalize())
    }
}

/// Everything a migration body is allowed to use.
///
/// Constructed by the runner right before the body runs.
#[derive(Clone, Copy)]
pub struct MigrationContext<'a> {
    database: &'a dyn DocumentDatabase,
    lineage: &'a Lineage,
    version: Version,
    direction: Direction,
}

impl<'a> MigrationContext<'a> {
    /// Creates a context for one migration run.
    pub fn new(
        database: &'a dyn DocumentDatabase,
        lineage: &'a Lineage,
        version: Version,
        direction: Direction,
    ) -> Self {
        Self {
            database,
            lineage,
            version,
            direction,
        }
    }

    /// The raw database handle.
    pub fn database(&self) -> &'a dyn DocumentDatabase {
        self.database
    }

    /// A handle scoped to one collection.
    pub fn collection(&self, name: impl Into<String>) -> CollectionHandle<'a> {
        CollectionHandle {
            database: self.database,
            name: name.into(),
        }
    }

    /// The lineage being migrated.
    pub fn lineage(&self) -> &'a Lineage {
        self.lineage
    }

    /// The version of the running migration.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Whether `up` or `down` is running.
    pub fn direction(&self) -> Direction {
        self.direction
    }
}

impl fmt::Debug for MigrationContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationContext")
            .field("lineage", &self.lineage)
            .field("version", &self.version)
            .field("direction", &self.direction)
            .finish()
    }
}

/// Convenience wrapper around [`DocumentDatabase`] for a single collection.
pub struct CollectionHandle<'a> {
    database: &'a dyn DocumentDatabase,
    name: String,
}

impl CollectionHandle<'_> {
    /// The collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// See [`DocumentDatabase::collection_exists`].
    pub async fn exists(&self) -> Result<bool, BoxError> {
        self.database.collection_exists(&self.name).await
    }

    /// See [`DocumentDatabase::create_collection`].
    pub async fn create(&self) -> Result<(), BoxError> {
        self.database.create_collection(&self.name).await
    }

    /// See [`DocumentDatabase::drop_collection`].
    pub async fn drop_collection(&self) -> Result<(), BoxError> {
        self.database.drop_collection(&self.name).await
    }

    /// See [`DocumentDatabase::create_index`].
    pub async fn create_index(&self, index: &IndexSpec) -> Result<(), BoxError> {
        self.database.create_index(&self.name, index).await
    }

    /// See [`DocumentDatabase::drop_index`].
    pub async fn drop_index(&self, index: &str) -> Result<(), BoxError> {
        self.database.drop_index(&self.name, index).await
    }

    /// See [`DocumentDatabase::insert_one`].
    pub async fn insert_one(&self, document: Document) -> Result<(), BoxError> {
        self.database.insert_one(&self.name, document).await
    }

    /// See [`DocumentDatabase::find`].
    pub async fn find(&self, filter: &Filter) -> Result<Vec<Document>, BoxError> {
        self.database.find(&self.name, filter).await
    }

    /// See [`DocumentDatabase::update_many`].
    pub async fn update_many(&self, filter: &Filter, update: &Update) -> Result<u64, BoxError> {
        self.database.update_many(&self.name, filter, update).await
    }
}
