//! Migration 2.1.0 (sample): Index sample items by tag

use async_trait::async_trait;
use stratum_core::{BoxError, IndexSpec, Migration, MigrationContext};
use stratum_derive::MigrationInfo;

#[derive(MigrationInfo)]
#[migration(
    version = "2.1.0",
    name = "index_sample_tags",
    description = "Index sample items by tag"
)]
pub struct IndexSampleTags;

const INDEX: &str = "sample_items_tags";

#[async_trait]
impl Migration for IndexSampleTags {
    async fn up(&self, ctx: &MigrationContext<'_>) -> Result<(), BoxError> {
        ctx.collection("sample_items")
            .create_index(&IndexSpec::new(INDEX).asc("tags"))
            .await
    }

    async fn down(&self, ctx: &MigrationContext<'_>) -> Result<(), BoxError> {
        ctx.collection("sample_items").drop_index(INDEX).await
    }
}
