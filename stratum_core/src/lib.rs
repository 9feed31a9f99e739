//! # Stratum
//!
//! Ordered, versioned and reversible migrations for document databases, with
//! an append-only ledger recording what has been applied per lineage.

#![deny(missing_docs)]

pub mod authoring;
pub mod database;
pub mod error;
pub mod ledger;
pub mod migration;
pub mod migrator;
pub mod registry;
pub mod version;

pub use authoring::{MigrationAuthor, NewMigration};
pub use database::{Condition, Document, DocumentDatabase, Filter, IndexOrder, IndexSpec, Update, UpdateOp};
pub use error::{BoxError, MigrationError};
pub use ledger::{Ledger, LedgerEntry, LedgerStore};
pub use migration::{CollectionHandle, Direction, Migration, MigrationContext, MigrationInfo, NotReversible};
pub use migrator::{
    DownOptions, MigrationState, Migrator, MigratorConfig, RunReport, StatusEntry, StatusReport,
    UpOptions,
};
pub use registry::{LoadedMigration, Registry};
pub use version::{Lineage, Version};

pub mod prelude {
    //! The prelude module for the `stratum_core` crate.
    pub use super::{
        BoxError, DocumentDatabase, DownOptions, Filter, IndexSpec, Lineage, Migration,
        MigrationContext, MigrationError, MigrationInfo, Migrator, Registry, UpOptions, Update,
        Version,
    };
}
