//! Run command implementation

use anyhow::Result;
use stratum_core::{UpOptions, Version};

use crate::cli::{GlobalArgs, RunArgs};
use crate::context::{RuntimeContext, parse_lineage};

/// Execute the run command
pub async fn execute(args: &RunArgs, global: &GlobalArgs) -> Result<()> {
    let lineage = parse_lineage(&args.lineage)?;
    let options = UpOptions {
        to_version: args.to_version.as_deref().map(Version::parse).transpose()?,
    };
    let ctx = RuntimeContext::new(global).await?;

    if args.dry_run {
        let plan = ctx.migrator.plan_up(&lineage, &options).await?;
        if plan.is_empty() {
            println!("Lineage {lineage}: up to date");
        } else {
            println!("Dry run - would apply to lineage {lineage}:");
            for loaded in &plan {
                println!("  {:<10} {}", loaded.version, loaded.migration.name());
            }
        }
        return Ok(());
    }

    let report = ctx.migrator.up(&lineage, options).await?;
    if report.executed.is_empty() {
        println!("Lineage {lineage}: up to date");
        return Ok(());
    }

    for entry in &report.executed {
        println!("  applied  {:<10} {}", entry.version, entry.name);
    }
    println!();
    println!(
        "Applied {} migration{} to lineage {}",
        report.executed.len(),
        if report.executed.len() == 1 { "" } else { "s" },
        lineage
    );
    Ok(())
}
