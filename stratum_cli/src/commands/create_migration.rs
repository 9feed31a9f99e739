//! Create-migration command implementation

use anyhow::Result;
use std::sync::Arc;

use stratum_core::MigrationError;
use stratum_mem::{InMemoryDatabase, InMemoryLedgerStore};

use crate::cli::{CreateMigrationArgs, GlobalArgs};
use crate::context::{Backend, RuntimeContext, parse_lineage};

/// Execute the create-migration command
pub async fn execute(args: &CreateMigrationArgs, global: &GlobalArgs) -> Result<()> {
    let (version, name, description) = required_arguments(args)?;
    let lineage = parse_lineage(&args.lineage)?;

    // Authoring only consults the registry, never the database.
    let backend = Backend {
        database: Arc::new(InMemoryDatabase::new()),
        ledger: Arc::new(InMemoryLedgerStore::new()),
    };
    let ctx = RuntimeContext::with_backend(global, backend, args.dir.as_deref());

    let created = ctx
        .migrator
        .create_migration(&lineage, version, name, description)?;

    println!("Created {}", created.path.display());
    println!();
    println!("{}", created.next_steps());
    Ok(())
}

fn required_arguments(args: &CreateMigrationArgs) -> Result<(&str, &str, &str), MigrationError> {
    let missing = |argument: &str| {
        MigrationError::Usage(format!(
            "missing <{argument}>\n\nUsage: stratum create-migration <version> <name> <description> [--lineage <LINEAGE>] [--dir <DIR>]"
        ))
    };

    let version = args.version.as_deref().ok_or_else(|| missing("version"))?;
    let name = args.name.as_deref().ok_or_else(|| missing("name"))?;
    let description = args
        .description
        .as_deref()
        .ok_or_else(|| missing("description"))?;
    Ok((version, name, description))
}

#[cfg(test)]
#[path = "create_migration_test.rs"]
mod tests;
