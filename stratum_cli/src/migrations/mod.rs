//! Migrations shipped with the CLI, one module per lineage.
//!
//! Files follow the `<lineage>/v<major>_<minor>_<patch>_<name>.rs` layout
//! written by `stratum create-migration`.

use stratum_core::{Lineage, Registry};

mod admin;
mod sample;

/// Every bundled migration, grouped by lineage.
pub fn registry() -> Registry {
    Registry::new()
        .with_lineage(Lineage::ADMIN, admin::migrations())
        .with_lineage(Lineage::SAMPLE, sample::migrations())
}
