//! The prelude is enough to declare and run a migration.

use std::sync::Arc;

use async_trait::async_trait;
use stratum::prelude::*;
use stratum_mem::{InMemoryDatabase, InMemoryLedgerStore};

#[derive(MigrationInfo)]
#[migration(version = "0.1.0", description = "Hello, world")]
struct HelloWorld;

#[async_trait]
impl Migration for HelloWorld {
    async fn up(&self, ctx: &MigrationContext<'_>) -> Result<(), BoxError> {
        ctx.collection("greetings").create().await
    }

    async fn down(&self, ctx: &MigrationContext<'_>) -> Result<(), BoxError> {
        ctx.collection("greetings").drop_collection().await
    }
}

#[tokio::test]
async fn hello_world() {
    let lineage = Lineage::new("hello").unwrap();
    let database = InMemoryDatabase::new();
    let mut registry = Registry::new();
    registry.register(lineage.clone(), HelloWorld);

    let migrator = Migrator::new(
        registry,
        Arc::new(database.clone()),
        InMemoryLedgerStore::new(),
        Default::default(),
    );

    let report = migrator.up(&lineage, UpOptions::default()).await.unwrap();
    assert_eq!(report.executed.len(), 1);
    assert_eq!(database.collection_names().await, vec!["greetings".to_string()]);

    migrator.down(&lineage, DownOptions::default()).await.unwrap();
    assert!(database.collection_names().await.is_empty());
}
