//! CLI command implementations

pub(crate) mod create_migration;
pub(crate) mod rollback;
pub(crate) mod run;
pub(crate) mod status;
