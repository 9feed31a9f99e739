//! Migration 1.3.0 (admin): Every account gets an explicit mfa_enabled flag

use async_trait::async_trait;
use stratum_core::{BoxError, Filter, Migration, MigrationContext, Update};
use stratum_derive::MigrationInfo;

#[derive(MigrationInfo)]
#[migration(
    version = "1.3.0",
    name = "backfill_mfa_flag",
    description = "Every account gets an explicit mfa_enabled flag"
)]
pub struct BackfillMfaFlag;

#[async_trait]
impl Migration for BackfillMfaFlag {
    async fn up(&self, ctx: &MigrationContext<'_>) -> Result<(), BoxError> {
        let matched = ctx
            .collection("accounts")
            .update_many(
                &Filter::all().exists("mfa_enabled", false),
                &Update::new().set("mfa_enabled", false),
            )
            .await?;
        log::info!("Backfilled mfa_enabled on {} accounts", matched);
        Ok(())
    }

    async fn down(&self, ctx: &MigrationContext<'_>) -> Result<(), BoxError> {
        // Unsets every `false` flag, including ones written after the backfill.
        // Accounts with MFA turned on keep theirs.
        ctx.collection("accounts")
            .update_many(
                &Filter::all().eq("mfa_enabled", false),
                &Update::new().unset("mfa_enabled"),
            )
            .await?;
        Ok(())
    }
}
