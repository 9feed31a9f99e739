//! Status command implementation

use anyhow::Result;

use crate::cli::{GlobalArgs, StatusArgs};
use crate::context::{RuntimeContext, parse_lineage};

/// Execute the status command
pub async fn execute(args: &StatusArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = RuntimeContext::new(global).await?;

    let lineages = match &args.lineage {
        Some(raw) => vec![parse_lineage(raw)?],
        None => ctx.migrator.registry().lineages().cloned().collect(),
    };

    for (i, lineage) in lineages.iter().enumerate() {
        if i > 0 {
            println!();
        }
        let report = ctx.migrator.status(lineage).await?;
        print!("{report}");
    }

    Ok(())
}
