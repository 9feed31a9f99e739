//! Migration registry: every known migration, grouped by lineage.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::MigrationError;
use crate::migration::Migration;
use crate::version::{Lineage, Version};

/// A migration whose version has been parsed and validated.
#[derive(Clone)]
pub struct LoadedMigration {
    /// The parsed version.
    pub version: Version,
    /// The migration itself.
    pub migration: Arc<dyn Migration>,
}

impl std::fmt::Debug for LoadedMigration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedMigration")
            .field("version", &self.version)
            .field("name", &self.migration.name())
            .finish()
    }
}

/// Holds the migrations of every lineage.
///
/// Registration order is irrelevant: [`Registry::load`] always returns
/// migrations sorted by their numeric version.
#[derive(Clone, Default)]
pub struct Registry {
    lineages: BTreeMap<Lineage, Vec<Arc<dyn Migration>>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a single migration under a lineage.
    pub fn register(&mut self, lineage: Lineage, migration: impl Migration + 'static) -> &mut Self {
        self.register_arc(lineage, Arc::new(migration))
    }

    /// Registers an already shared migration under a lineage.
    pub fn register_arc(&mut self, lineage: Lineage, migration: Arc<dyn Migration>) -> &mut Self {
        self.lineages.entry(lineage).or_default().push(migration);
        self
    }

    /// Registers every migration of an iterator under a lineage.
    pub fn with_lineage(
        mut self,
        lineage: Lineage,
        migrations: impl IntoIterator<Item = Arc<dyn Migration>>,
    ) -> Self {
        let entry = self.lineages.entry(lineage).or_default();
        entry.extend(migrations);
        self
    }

    /// The lineages with at least one registration call.
    pub fn lineages(&self) -> impl Iterator<Item = &Lineage> {
        self.lineages.keys()
    }

    /// Loads the migrations of a lineage, sorted by version.
    ///
    /// Fails with [`MigrationError::Format`] on a malformed version and
    /// [`MigrationError::Conflict`] when two migrations share a version. An
    /// unknown lineage yields an empty list.
    pub fn load(&self, lineage: &Lineage) -> Result<Vec<LoadedMigration>, MigrationError> {
        let Some(migrations) = self.lineages.get(lineage) else {
            return Ok(Vec::new());
        };

        let mut by_version: BTreeMap<Version, LoadedMigration> = BTreeMap::new();
        for migration in migrations {
            let version = Version::parse(migration.version()).map_err(|e| match e {
                MigrationError::Format { input, reason } => MigrationError::Format {
                    input,
                    reason: format!("{reason} (migration '{}')", migration.name()),
                },
                other => other,
            })?;

            if let Some(existing) = by_version.get(&version) {
                return Err(MigrationError::Conflict {
                    lineage: lineage.clone(),
                    version,
                    reason: format!(
                        "both '{}' and '{}' claim this version",
                        existing.migration.name(),
                        migration.name()
                    ),
                });
            }

            by_version.insert(
                version,
                LoadedMigration {
                    version,
                    migration: migration.clone(),
                },
            );
        }

        Ok(by_version.into_values().collect())
    }

    /// Whether a lineage has a migration registered for `version`.
    ///
    /// Malformed registrations are skipped here; they surface on [`Registry::load`].
    pub fn contains(&self, lineage: &Lineage, version: &Version) -> bool {
        self.lineages.get(lineage).is_some_and(|migrations| {
            migrations
                .iter()
                .any(|m| Version::parse(m.version()).is_ok_and(|v| &v == version))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;
    use crate::migration::{MigrationContext, MigrationInfo};
    use async_trait::async_trait;

    struct Fixed(&'static str, &'static str);

    impl MigrationInfo for Fixed {
        fn version(&self) -> &'static str {
            self.0
        }

        fn name(&self) -> &'static str {
            self.1
        }
    }

    #[async_trait]
    impl Migration for Fixed {
        async fn up(&self, _ctx: &MigrationContext<'_>) -> Result<(), BoxError> {
            Ok(())
        }
    }

    #[test]
    fn migrations_are_sorted_numerically() {
        let mut registry = Registry::new();
        registry
            .register(Lineage::ADMIN, Fixed("1.10.0", "ten"))
            .register(Lineage::ADMIN, Fixed("1.4.0", "four"))
            .register(Lineage::ADMIN, Fixed("1.0.0", "zero"))
            .register(Lineage::ADMIN, Fixed("1.9.0", "nine"));

        let loaded = registry.load(&Lineage::ADMIN).unwrap();
        let names: Vec<&str> = loaded.iter().map(|m| m.migration.name()).collect();
        assert_eq!(names, vec!["zero", "four", "nine", "ten"]);
    }

    #[test]
    fn duplicate_versions_are_rejected() {
        let mut registry = Registry::new();
        registry
            .register(Lineage::ADMIN, Fixed("1.0.0", "first"))
            .register(Lineage::ADMIN, Fixed("1.0.0", "second"));

        match registry.load(&Lineage::ADMIN).unwrap_err() {
            MigrationError::Conflict {
                lineage,
                version,
                reason,
            } => {
                assert_eq!(lineage, Lineage::ADMIN);
                assert_eq!(version, Version::new(1, 0, 0));
                assert!(reason.contains("first") && reason.contains("second"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn same_version_in_different_lineages_is_fine() {
        let mut registry = Registry::new();
        registry
            .register(Lineage::ADMIN, Fixed("1.0.0", "admin"))
            .register(Lineage::SAMPLE, Fixed("1.0.0", "sample"));

        assert_eq!(registry.load(&Lineage::ADMIN).unwrap().len(), 1);
        assert_eq!(registry.load(&Lineage::SAMPLE).unwrap().len(), 1);
        assert_eq!(registry.lineages().count(), 2);
    }

    #[test]
    fn malformed_versions_are_rejected() {
        let mut registry = Registry::new();
        registry.register(Lineage::ADMIN, Fixed("1.5", "short"));

        match registry.load(&Lineage::ADMIN).unwrap_err() {
            MigrationError::Format { input, reason } => {
                assert_eq!(input, "1.5");
                assert!(reason.contains("short"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_lineage_is_empty() {
        let registry = Registry::new();
        assert!(registry.load(&Lineage::SAMPLE).unwrap().is_empty());
    }

    #[test]
    fn contains_compares_parsed_versions() {
        let mut registry = Registry::new();
        registry.register(Lineage::ADMIN, Fixed("1.3.0", "three"));
        assert!(registry.contains(&Lineage::ADMIN, &Version::new(1, 3, 0)));
        assert!(!registry.contains(&Lineage::ADMIN, &Version::new(1, 3, 1)));
        assert!(!registry.contains(&Lineage::SAMPLE, &Version::new(1, 3, 0)));
    }
}
