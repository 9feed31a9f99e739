//! Rollback command implementation

use anyhow::Result;
use stratum_core::{DownOptions, Version};

use crate::cli::{GlobalArgs, RollbackArgs};
use crate::context::{RuntimeContext, parse_lineage};

/// Execute the rollback command
pub async fn execute(args: &RollbackArgs, global: &GlobalArgs) -> Result<()> {
    let lineage = parse_lineage(&args.lineage)?;
    let options = DownOptions {
        to_version: args.to_version.as_deref().map(Version::parse).transpose()?,
        steps: args.steps,
    };
    let ctx = RuntimeContext::new(global).await?;

    if args.dry_run {
        let plan = ctx.migrator.plan_down(&lineage, &options).await?;
        if plan.is_empty() {
            println!("Lineage {lineage}: nothing to roll back");
        } else {
            println!("Dry run - would revert in lineage {lineage}:");
            for loaded in &plan {
                let marker = if loaded.migration.reversible() {
                    ""
                } else {
                    " [irreversible, rollback stops here]"
                };
                println!(
                    "  {:<10} {}{}",
                    loaded.version,
                    loaded.migration.name(),
                    marker
                );
            }
        }
        return Ok(());
    }

    let report = ctx.migrator.down(&lineage, options).await?;
    if report.executed.is_empty() {
        println!("Lineage {lineage}: nothing to roll back");
        return Ok(());
    }

    for entry in &report.executed {
        println!("  reverted {:<10} {}", entry.version, entry.name);
    }
    println!();
    println!(
        "Reverted {} migration{} in lineage {}",
        report.executed.len(),
        if report.executed.len() == 1 { "" } else { "s" },
        lineage
    );
    Ok(())
}
