//! Migration 1.0.0 (admin): Accounts collection with unique emails

use async_trait::async_trait;
use stratum_core::{BoxError, IndexSpec, Migration, MigrationContext};
use stratum_derive::MigrationInfo;

#[derive(MigrationInfo)]
#[migration(
    version = "1.0.0",
    name = "create_accounts",
    description = "Accounts collection with unique emails"
)]
pub struct CreateAccounts;

#[async_trait]
impl Migration for CreateAccounts {
    async fn up(&self, ctx: &MigrationContext<'_>) -> Result<(), BoxError> {
        let accounts = ctx.collection("accounts");
        accounts.create().await?;
        accounts
            .create_index(&IndexSpec::new("accounts_email_unique").asc("email").unique())
            .await?;
        accounts
            .create_index(&IndexSpec::new("accounts_created_at").desc("created_at"))
            .await
    }

    async fn down(&self, ctx: &MigrationContext<'_>) -> Result<(), BoxError> {
        ctx.collection("accounts").drop_collection().await
    }
}
