//! Migration 2.0.0 (sample): Sample items collection with seed documents

use async_trait::async_trait;
use serde_json::json;
use stratum_core::{BoxError, Filter, IndexSpec, Migration, MigrationContext};
use stratum_derive::MigrationInfo;

#[derive(MigrationInfo)]
#[migration(
    version = "2.0.0",
    name = "create_sample_items",
    description = "Sample items collection with seed documents"
)]
pub struct CreateSampleItems;

#[async_trait]
impl Migration for CreateSampleItems {
    async fn up(&self, ctx: &MigrationContext<'_>) -> Result<(), BoxError> {
        let items = ctx.collection("sample_items");
        items
            .create_index(&IndexSpec::new("sample_items_slug").asc("slug").unique())
            .await?;

        for (slug, title) in [("welcome", "Welcome"), ("getting-started", "Getting started")] {
            if !items.find(&Filter::all().eq("slug", slug)).await?.is_empty() {
                continue;
            }
            let document = json!({ "slug": slug, "title": title, "seed": true });
            if let Some(document) = document.as_object() {
                items.insert_one(document.clone()).await?;
            }
        }
        Ok(())
    }

    async fn down(&self, ctx: &MigrationContext<'_>) -> Result<(), BoxError> {
        ctx.collection("sample_items").drop_collection().await
    }
}
