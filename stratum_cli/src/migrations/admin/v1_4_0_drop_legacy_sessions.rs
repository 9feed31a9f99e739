//! Migration 1.4.0 (admin): Drop the legacy sessions collection and tokens

use async_trait::async_trait;
use stratum_core::{BoxError, Filter, Migration, MigrationContext, Update};
use stratum_derive::MigrationInfo;

/// Deleted session data can't be brought back, so there is no `down`.
#[derive(MigrationInfo)]
#[migration(
    version = "1.4.0",
    name = "drop_legacy_sessions",
    description = "Drop the legacy sessions collection and tokens",
    irreversible
)]
pub struct DropLegacySessions;

#[async_trait]
impl Migration for DropLegacySessions {
    async fn up(&self, ctx: &MigrationContext<'_>) -> Result<(), BoxError> {
        ctx.collection("legacy_sessions").drop_collection().await?;
        ctx.collection("accounts")
            .update_many(
                &Filter::all().exists("legacy_token", true),
                &Update::new().unset("legacy_token"),
            )
            .await?;
        Ok(())
    }
}
