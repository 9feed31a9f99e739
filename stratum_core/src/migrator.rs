//! The migration runner.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use stratum_core::{Lineage, Migrator, MigratorConfig, Registry, UpOptions};
//! use stratum_mem::{InMemoryDatabase, InMemoryLedgerStore};
//!
//! let registry = Registry::new().with_lineage(Lineage::ADMIN, admin::migrations());
//! let migrator = Migrator::new(
//!     registry,
//!     Arc::new(InMemoryDatabase::new()),
//!     InMemoryLedgerStore::new(),
//!     MigratorConfig::default(),
//! );
//!
//! let report = migrator.up(&Lineage::ADMIN, UpOptions::default()).await?;
//! println!("Applied {} migrations", report.executed.len());
//! println!("{}", migrator.status(&Lineage::ADMIN).await?);
//! ```
//!
//! # Execution model
//!
//! Migrations run one at a time, in version order, and the ledger write of
//! each one completes before the next one starts. A failing body stops the
//! run immediately; whatever it changed stays changed and nothing is rolled
//! back automatically. Every mutating operation holds the migrator's run lock,
//! so runs of different lineages sharing the database never interleave within
//! one process. Nothing guards against two processes running at once.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::authoring::{MigrationAuthor, NewMigration};
use crate::database::DocumentDatabase;
use crate::error::MigrationError;
use crate::ledger::{Ledger, LedgerEntry, LedgerStore};
use crate::migration::{Direction, MigrationContext, NotReversible};
use crate::registry::{LoadedMigration, Registry};
use crate::version::{Lineage, Version};

/// Configuration of a [`Migrator`].
#[derive(Debug, Clone)]
pub struct MigratorConfig {
    /// Compare the checksum of every applied migration with the registered one
    /// before mutating anything, and refuse to run on a mismatch.
    ///
    /// Default: `true`
    pub verify_checksums: bool,

    /// Root directory of migration sources, one sub-directory per lineage.
    /// Used by [`Migrator::create_migration`].
    ///
    /// Default: `migrations`
    pub migrations_dir: PathBuf,
}

impl Default for MigratorConfig {
    fn default() -> Self {
        Self {
            verify_checksums: true,
            migrations_dir: PathBuf::from("migrations"),
        }
    }
}

/// Options of [`Migrator::up`].
#[derive(Debug, Clone, Default)]
pub struct UpOptions {
    /// Stop after this version (inclusive). `None` applies everything pending.
    pub to_version: Option<Version>,
}

/// Options of [`Migrator::down`].
///
/// With neither field set, only the most recently applied migration is reverted.
#[derive(Debug, Clone, Default)]
pub struct DownOptions {
    /// Revert every applied migration newer than this version, which itself stays applied.
    pub to_version: Option<Version>,
    /// Revert this many of the most recently applied migrations.
    pub steps: Option<usize>,
}

/// The outcome of a successful `up` or `down`.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// The migrated lineage.
    pub lineage: Lineage,
    /// Which way the migrations ran.
    pub direction: Direction,
    /// Ledger entries written, in execution order.
    pub executed: Vec<LedgerEntry>,
}

/// Whether a registered migration is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationState {
    /// Applied at the given time.
    Applied {
        /// When `up` completed.
        applied_at: DateTime<Utc>,
    },
    /// Not applied.
    Pending,
}

/// One registered migration in a [`StatusReport`].
#[derive(Debug, Clone)]
pub struct StatusEntry {
    /// The migration version.
    pub version: Version,
    /// The migration name.
    pub name: String,
    /// The migration description.
    pub description: String,
    /// Whether the migration can be rolled back.
    pub reversible: bool,
    /// Applied or pending.
    pub state: MigrationState,
    /// The migration changed since it was applied.
    pub drifted: bool,
}

/// Per-version state of a lineage.
#[derive(Debug, Clone)]
pub struct StatusReport {
    /// The reported lineage.
    pub lineage: Lineage,
    /// Registered migrations, ascending.
    pub entries: Vec<StatusEntry>,
    /// Applied versions that have no registered migration anymore.
    pub orphaned: Vec<LedgerEntry>,
}

impl StatusReport {
    /// The registered migrations that are not applied.
    pub fn pending(&self) -> impl Iterator<Item = &StatusEntry> {
        self.entries
            .iter()
            .filter(|e| e.state == MigrationState::Pending)
    }

    /// The highest applied registered version.
    pub fn current_version(&self) -> Option<Version> {
        self.entries
            .iter()
            .filter(|e| matches!(e.state, MigrationState::Applied { .. }))
            .map(|e| e.version)
            .max()
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let current = self
            .current_version()
            .map(|v| v.to_string())
            .unwrap_or_else(|| "none".to_string());
        writeln!(f, "Lineage {} (current version: {})", self.lineage, current)?;

        if self.entries.is_empty() {
            writeln!(f, "  no migrations registered")?;
        }
        for entry in &self.entries {
            let state = match &entry.state {
                MigrationState::Applied { applied_at } => {
                    format!("applied {}", applied_at.format("%Y-%m-%d %H:%M:%S UTC"))
                }
                MigrationState::Pending => "pending".to_string(),
            };
            write!(f, "  {:<10} {:<32} {}", entry.version, entry.name, state)?;
            if !entry.reversible {
                write!(f, " [irreversible]")?;
            }
            if entry.drifted {
                write!(f, " [checksum drift]")?;
            }
            writeln!(f)?;
        }
        for orphan in &self.orphaned {
            writeln!(
                f,
                "  {:<10} {:<32} applied but not registered",
                orphan.version, orphan.name
            )?;
        }
        Ok(())
    }
}

/// Applies, reverts and reports migrations for every lineage of a registry.
pub struct Migrator<S> {
    registry: Registry,
    database: Arc<dyn DocumentDatabase>,
    ledger: Ledger<S>,
    config: MigratorConfig,
    run_lock: Mutex<()>,
}

impl<S: LedgerStore> Migrator<S> {
    /// Creates a migrator.
    pub fn new(
        registry: Registry,
        database: Arc<dyn DocumentDatabase>,
        ledger_store: S,
        config: MigratorConfig,
    ) -> Self {
        log::debug!("Creating a new Migrator");
        Self {
            registry,
            database,
            ledger: Ledger::new(ledger_store),
            config,
            run_lock: Mutex::new(()),
        }
    }

    /// The registry of this migrator.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The ledger of this migrator.
    pub fn ledger(&self) -> &Ledger<S> {
        &self.ledger
    }

    /// The shared database handle.
    pub fn database(&self) -> &Arc<dyn DocumentDatabase> {
        &self.database
    }

    /// Reports every registered version of a lineage as applied or pending.
    pub async fn status(&self, lineage: &Lineage) -> Result<StatusReport, MigrationError> {
        let registered = self.registry.load(lineage)?;
        let mut applied = self.ledger.applied(lineage).await?;

        let entries = registered
            .iter()
            .map(|loaded| {
                let migration = &loaded.migration;
                let (state, drifted) = match applied.remove(&loaded.version) {
                    Some(entry) => (
                        MigrationState::Applied {
                            applied_at: entry.applied_at,
                        },
                        entry
                            .checksum
                            .is_some_and(|recorded| recorded != migration.checksum()),
                    ),
                    None => (MigrationState::Pending, false),
                };
                StatusEntry {
                    version: loaded.version,
                    name: migration.name().to_string(),
                    description: migration.description().to_string(),
                    reversible: migration.reversible(),
                    state,
                    drifted,
                }
            })
            .collect();

        Ok(StatusReport {
            lineage: lineage.clone(),
            entries,
            orphaned: applied.into_values().collect(),
        })
    }

    /// The migrations [`Migrator::up`] would run, in execution order.
    pub async fn plan_up(
        &self,
        lineage: &Lineage,
        options: &UpOptions,
    ) -> Result<Vec<LoadedMigration>, MigrationError> {
        let registered = self.registry.load(lineage)?;
        let applied = self.ledger.applied_versions(lineage).await?;

        Ok(registered
            .into_iter()
            .filter(|m| !applied.contains(&m.version))
            .filter(|m| options.to_version.is_none_or(|cap| m.version <= cap))
            .collect())
    }

    /// The migrations [`Migrator::down`] would revert, in execution order.
    pub async fn plan_down(
        &self,
        lineage: &Lineage,
        options: &DownOptions,
    ) -> Result<Vec<LoadedMigration>, MigrationError> {
        let candidates: Vec<Version> = {
            let applied = self.ledger.applied_versions(lineage).await?;
            let newest_first = applied.into_iter().rev();
            match (options.to_version, options.steps) {
                (Some(_), Some(_)) => {
                    return Err(MigrationError::Usage(
                        "a rollback takes either a target version or a number of steps, not both"
                            .to_string(),
                    ));
                }
                (_, Some(0)) => {
                    return Err(MigrationError::Usage(
                        "the number of rollback steps must be at least 1".to_string(),
                    ));
                }
                (Some(target), None) => newest_first.take_while(|v| *v > target).collect(),
                (None, steps) => newest_first.take(steps.unwrap_or(1)).collect(),
            }
        };

        let registered: BTreeMap<Version, LoadedMigration> = self
            .registry
            .load(lineage)?
            .into_iter()
            .map(|m| (m.version, m))
            .collect();

        candidates
            .into_iter()
            .map(|version| {
                registered
                    .get(&version)
                    .cloned()
                    .ok_or_else(|| MigrationError::Conflict {
                        lineage: lineage.clone(),
                        version,
                        reason: "applied according to the ledger but no migration is registered"
                            .to_string(),
                    })
            })
            .collect()
    }

    /// Applies the pending migrations of a lineage in ascending version order.
    ///
    /// Stops at the first failing migration. The ledger then reflects exactly
    /// the migrations that completed before it.
    pub async fn up(
        &self,
        lineage: &Lineage,
        options: UpOptions,
    ) -> Result<RunReport, MigrationError> {
        let _guard = self.run_lock.lock().await;

        self.verify_checksums(lineage).await?;
        let pending = self.plan_up(lineage, &options).await?;

        if pending.is_empty() {
            log::info!("Lineage {}: nothing to apply", lineage);
        }

        let mut executed = Vec::with_capacity(pending.len());
        for LoadedMigration { version, migration } in pending {
            log::info!(
                "Running migration {}@{} ({})...",
                lineage,
                version,
                migration.name()
            );

            let ctx = MigrationContext::new(self.database.as_ref(), lineage, version, Direction::Up);
            migration
                .up(&ctx)
                .await
                .map_err(|source| MigrationError::Execution {
                    lineage: lineage.clone(),
                    version,
                    name: migration.name().to_string(),
                    direction: Direction::Up,
                    source,
                })?;

            let entry = self
                .ledger
                .record_applied(lineage, version, migration.name(), Some(migration.checksum()))
                .await?;

            log::info!(
                "Migration {}@{} ({}) applied successfully",
                lineage,
                version,
                migration.name()
            );
            executed.push(entry);
        }

        Ok(RunReport {
            lineage: lineage.clone(),
            direction: Direction::Up,
            executed,
        })
    }

    /// Reverts applied migrations of a lineage in descending version order.
    ///
    /// Reaching an irreversible migration aborts the run before touching it;
    /// the reversions that already completed in this call stay committed. A
    /// `down` left at its default body is reported the same way.
    pub async fn down(
        &self,
        lineage: &Lineage,
        options: DownOptions,
    ) -> Result<RunReport, MigrationError> {
        let _guard = self.run_lock.lock().await;

        self.verify_checksums(lineage).await?;
        let targets = self.plan_down(lineage, &options).await?;

        if targets.is_empty() {
            log::info!("Lineage {}: nothing to revert", lineage);
        }

        let mut executed = Vec::with_capacity(targets.len());
        for LoadedMigration { version, migration } in targets {
            if !migration.reversible() {
                log::warn!(
                    "Rollback of {} stopped at {} ({}): migration is irreversible",
                    lineage,
                    version,
                    migration.name()
                );
                return Err(MigrationError::UnsupportedRollback {
                    lineage: lineage.clone(),
                    version,
                    name: migration.name().to_string(),
                });
            }

            log::info!(
                "Reverting migration {}@{} ({})...",
                lineage,
                version,
                migration.name()
            );

            let ctx =
                MigrationContext::new(self.database.as_ref(), lineage, version, Direction::Down);
            migration.down(&ctx).await.map_err(|source| {
                if source.downcast_ref::<NotReversible>().is_some() {
                    log::warn!(
                        "Rollback of {} stopped at {} ({}): down is not implemented",
                        lineage,
                        version,
                        migration.name()
                    );
                    MigrationError::UnsupportedRollback {
                        lineage: lineage.clone(),
                        version,
                        name: migration.name().to_string(),
                    }
                } else {
                    MigrationError::Execution {
                        lineage: lineage.clone(),
                        version,
                        name: migration.name().to_string(),
                        direction: Direction::Down,
                        source,
                    }
                }
            })?;

            let entry = self
                .ledger
                .record_reverted(lineage, version, migration.name())
                .await?;

            log::info!(
                "Migration {}@{} ({}) reverted successfully",
                lineage,
                version,
                migration.name()
            );
            executed.push(entry);
        }

        Ok(RunReport {
            lineage: lineage.clone(),
            direction: Direction::Down,
            executed,
        })
    }

    /// Writes a new migration skeleton for a lineage.
    ///
    /// The version must be well formed and not already registered in the lineage.
    pub fn create_migration(
        &self,
        lineage: &Lineage,
        version: &str,
        name: &str,
        description: &str,
    ) -> Result<NewMigration, MigrationError> {
        if !version.trim().is_empty() {
            let parsed = Version::parse(version)?;
            if self.registry.contains(lineage, &parsed) {
                return Err(MigrationError::Conflict {
                    lineage: lineage.clone(),
                    version: parsed,
                    reason: "a migration with this version is already registered".to_string(),
                });
            }
        }

        MigrationAuthor::new(&self.config.migrations_dir).create(lineage, version, name, description)
    }

    async fn verify_checksums(&self, lineage: &Lineage) -> Result<(), MigrationError> {
        if !self.config.verify_checksums {
            return Ok(());
        }

        let registered = self.registry.load(lineage)?;
        let applied = self.ledger.applied(lineage).await?;

        for loaded in registered {
            let Some(entry) = applied.get(&loaded.version) else {
                continue;
            };
            let Some(expected) = &entry.checksum else {
                continue;
            };
            let found = loaded.migration.checksum();
            if &found != expected {
                return Err(MigrationError::ChecksumMismatch {
                    lineage: lineage.clone(),
                    version: loaded.version,
                    name: loaded.migration.name().to_string(),
                    expected: expected.clone(),
                    found,
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(entries: Vec<StatusEntry>) -> StatusReport {
        StatusReport {
            lineage: Lineage::ADMIN,
            entries,
            orphaned: vec![],
        }
    }

    fn entry(version: &str, state: MigrationState) -> StatusEntry {
        StatusEntry {
            version: version.parse().unwrap(),
            name: format!("m_{version}"),
            description: String::new(),
            reversible: true,
            state,
            drifted: false,
        }
    }

    #[test]
    fn current_version_is_the_highest_applied() {
        let at = Utc::now();
        let status = report(vec![
            entry("1.0.0", MigrationState::Applied { applied_at: at }),
            entry("1.3.0", MigrationState::Applied { applied_at: at }),
            entry("1.4.0", MigrationState::Pending),
        ]);
        assert_eq!(status.current_version(), Some(Version::new(1, 3, 0)));
        assert_eq!(status.pending().count(), 1);
    }

    #[test]
    fn display_lists_every_version() {
        let status = report(vec![
            entry("1.0.0", MigrationState::Applied { applied_at: Utc::now() }),
            entry("1.4.0", MigrationState::Pending),
        ]);
        let rendered = status.to_string();
        assert!(rendered.starts_with("Lineage admin (current version: 1.0.0)"));
        assert!(rendered.contains("1.0.0"));
        assert!(rendered.contains("applied"));
        assert!(rendered.contains("1.4.0"));
        assert!(rendered.contains("pending"));
    }

    #[test]
    fn display_without_migrations() {
        let rendered = report(vec![]).to_string();
        assert!(rendered.contains("current version: none"));
        assert!(rendered.contains("no migrations registered"));
    }

    #[test]
    fn config_defaults() {
        let config = MigratorConfig::default();
        assert!(config.verify_checksums);
        assert_eq!(config.migrations_dir, PathBuf::from("migrations"));
    }
}
