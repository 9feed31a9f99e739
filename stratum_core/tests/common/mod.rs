#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use stratum_core::{
    BoxError, Migration, MigrationContext, MigrationInfo, Migrator, MigratorConfig, Registry,
};
use stratum_mem::{InMemoryDatabase, InMemoryLedgerStore};

/// Calls made to migration bodies, in order, e.g. `"up admin 1.3.0"`.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn calls(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    fn push(&self, call: String) {
        self.0.lock().unwrap().push(call);
    }
}

/// A migration whose behavior is decided by the test.
#[derive(Clone)]
pub struct Scripted {
    version: &'static str,
    name: &'static str,
    description: &'static str,
    reversible: bool,
    fail_up: bool,
    fail_down: bool,
    journal: Journal,
}

impl Scripted {
    pub fn new(version: &'static str, name: &'static str, journal: &Journal) -> Self {
        Self {
            version,
            name,
            description: "",
            reversible: true,
            fail_up: false,
            fail_down: false,
            journal: journal.clone(),
        }
    }

    pub fn irreversible(mut self) -> Self {
        self.reversible = false;
        self
    }

    pub fn failing_up(mut self) -> Self {
        self.fail_up = true;
        self
    }

    pub fn failing_down(mut self) -> Self {
        self.fail_down = true;
        self
    }

    pub fn described(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    pub fn shared(self) -> Arc<dyn Migration> {
        Arc::new(self)
    }
}

impl MigrationInfo for Scripted {
    fn version(&self) -> &'static str {
        self.version
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn description(&self) -> &'static str {
        self.description
    }

    fn reversible(&self) -> bool {
        self.reversible
    }
}

#[async_trait]
impl Migration for Scripted {
    async fn up(&self, ctx: &MigrationContext<'_>) -> Result<(), BoxError> {
        self.journal
            .push(format!("up {} {}", ctx.lineage(), self.version));
        if self.fail_up {
            return Err(format!("{} exploded", self.name).into());
        }
        let marker = json!({"version": self.version});
        ctx.collection(format!("{}_marks", ctx.lineage()))
            .insert_one(marker.as_object().cloned().unwrap_or_default())
            .await
    }

    async fn down(&self, ctx: &MigrationContext<'_>) -> Result<(), BoxError> {
        self.journal
            .push(format!("down {} {}", ctx.lineage(), self.version));
        if !self.reversible {
            return Err(Box::new(stratum_core::NotReversible));
        }
        if self.fail_down {
            return Err(format!("{} refused to go down", self.name).into());
        }
        Ok(())
    }
}

pub struct Harness {
    pub migrator: Migrator<InMemoryLedgerStore>,
    pub database: InMemoryDatabase,
    pub store: InMemoryLedgerStore,
}

pub fn harness(registry: Registry) -> Harness {
    harness_with(registry, MigratorConfig::default())
}

pub fn harness_with(registry: Registry, config: MigratorConfig) -> Harness {
    let _ = env_logger::builder().is_test(true).try_init();
    let database = InMemoryDatabase::new();
    let store = InMemoryLedgerStore::new();
    let migrator = Migrator::new(
        registry,
        Arc::new(database.clone()),
        store.clone(),
        config,
    );
    Harness {
        migrator,
        database,
        store,
    }
}

pub fn versions<'a>(versions: impl IntoIterator<Item = &'a stratum_core::Version>) -> Vec<String> {
    versions.into_iter().map(|v| v.to_string()).collect()
}
