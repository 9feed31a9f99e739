//! Runtime context for CLI commands

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use stratum_core::{DocumentDatabase, LedgerStore, Lineage, MigrationError, Migrator, MigratorConfig};
use stratum_mem::{InMemoryDatabase, InMemoryLedgerStore};
use stratum_pg::{PgDocumentDatabase, PgLedgerStore};

use crate::cli::GlobalArgs;
use crate::migrations;

/// The database and ledger a command works against.
pub struct Backend {
    /// Document database handed to migration bodies
    pub database: Arc<dyn DocumentDatabase>,

    /// Ledger storage
    pub ledger: Arc<dyn LedgerStore>,
}

impl Backend {
    /// Connects to the backend named by a database URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        if database_url == "memory:" {
            log::warn!("Using the in-memory backend: nothing will be persisted");
            return Ok(Self {
                database: Arc::new(InMemoryDatabase::new()),
                ledger: Arc::new(InMemoryLedgerStore::new()),
            });
        }

        if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .acquire_timeout(Duration::from_secs(30))
                .connect(database_url)
                .await
                .context("Failed to connect to PostgreSQL")?;
            return Ok(Self {
                database: Arc::new(PgDocumentDatabase::new(pool.clone())),
                ledger: Arc::new(PgLedgerStore::new(pool)),
            });
        }

        Err(MigrationError::Usage(format!(
            "unsupported database url '{database_url}': expected postgres://... or memory:"
        ))
        .into())
    }
}

/// Runtime context containing the migrator over the bundled migrations
pub struct RuntimeContext {
    /// The migrator
    pub migrator: Migrator<Arc<dyn LedgerStore>>,
}

impl RuntimeContext {
    /// Create a new runtime context from global arguments
    pub async fn new(args: &GlobalArgs) -> Result<Self> {
        let backend = Backend::connect(&args.database_url).await?;
        Ok(Self::with_backend(args, backend, None))
    }

    /// Create a context over an existing backend, optionally overriding the
    /// migrations directory.
    pub fn with_backend(args: &GlobalArgs, backend: Backend, dir: Option<&str>) -> Self {
        let config = MigratorConfig {
            verify_checksums: !args.no_verify_checksums,
            migrations_dir: PathBuf::from(dir.unwrap_or(&args.migrations_dir)),
        };
        log::debug!("Migrator configuration: {:?}", config);

        Self {
            migrator: Migrator::new(
                migrations::registry(),
                backend.database,
                backend.ledger,
                config,
            ),
        }
    }
}

/// Parses a `--lineage` value.
pub fn parse_lineage(raw: &str) -> Result<Lineage> {
    Ok(Lineage::new(raw)?)
}
