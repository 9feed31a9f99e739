//! # Stratum
//!
//! Ordered, versioned and reversible migrations for document databases.
//!
//! The `derive` feature (on by default) provides `#[derive(MigrationInfo)]`.
//! Its expansion names `stratum_core` directly, so crates using it depend on
//! `stratum_core` as well. `in-memory` and `postgres` enable the backends.

#![deny(missing_docs)]

pub use stratum_core::*;

#[cfg(feature = "derive")]
/// Proc-macros for the `stratum` crate.
pub mod derive {
    //! Contains proc-macros for the `stratum` crate.
    pub use stratum_derive::*;
}

#[cfg(feature = "in-memory")]
/// In-memory backends, for tests and development.
pub mod mem {
    //! In-memory document database and ledger store.
    pub use stratum_mem::*;
}

#[cfg(feature = "postgres")]
/// PostgreSQL backends.
pub mod pg {
    //! PostgreSQL document database and ledger store.
    pub use stratum_pg::*;
}

pub mod prelude {
    //! The prelude module for the `stratum` crate.
    pub use stratum_core::prelude::*;

    #[cfg(feature = "derive")]
    pub use super::derive::*;
    #[cfg(feature = "in-memory")]
    pub use super::mem::*;
    #[cfg(feature = "postgres")]
    pub use super::pg::*;
}
