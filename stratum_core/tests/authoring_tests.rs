mod common;

use std::fs;

use common::{Journal, Scripted, harness_with};
use stratum_core::{Lineage, MigrationError, MigratorConfig, Registry};

fn config(dir: &tempfile::TempDir) -> MigratorConfig {
    MigratorConfig {
        migrations_dir: dir.path().to_path_buf(),
        ..Default::default()
    }
}

#[test]
fn create_migration_writes_a_named_skeleton() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness_with(Registry::new(), config(&dir));

    let created = h
        .migrator
        .create_migration(
            &Lineage::ADMIN,
            "1.5.0",
            "Add MFA flag",
            "Adds mfa_enabled to accounts",
        )
        .unwrap();

    assert_eq!(
        created.path,
        dir.path().join("admin").join("v1_5_0_add_mfa_flag.rs")
    );
    let source = fs::read_to_string(&created.path).unwrap();
    assert!(source.contains("#[derive(MigrationInfo)]"));
    assert!(source.contains("version = \"1.5.0\""));
    assert!(source.contains("async fn up"));
    assert!(source.contains("async fn down"));
}

#[test]
fn create_migration_rejects_malformed_versions() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness_with(Registry::new(), config(&dir));

    for bad in ["1.5", "1.5.x", "v1.5.0", "1.5.0.1", "-1.0.0", " 1.0.0"] {
        let err = h
            .migrator
            .create_migration(&Lineage::ADMIN, bad, "name", "description")
            .unwrap_err();
        assert!(matches!(err, MigrationError::Format { .. }), "{bad}: {err}");
    }
    assert!(!dir.path().join("admin").exists(), "nothing is written");
}

#[test]
fn create_migration_rejects_missing_arguments() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness_with(Registry::new(), config(&dir));

    let err = h
        .migrator
        .create_migration(&Lineage::ADMIN, "", "name", "description")
        .unwrap_err();
    assert!(matches!(err, MigrationError::Usage(_)));

    let err = h
        .migrator
        .create_migration(&Lineage::ADMIN, "1.5.0", "name", "")
        .unwrap_err();
    assert!(matches!(err, MigrationError::Usage(_)));
}

#[test]
fn create_migration_rejects_registered_versions() {
    let dir = tempfile::tempdir().unwrap();
    let journal = Journal::default();
    let registry = Registry::new().with_lineage(
        Lineage::ADMIN,
        [Scripted::new("1.4.0", "drop_legacy", &journal).shared()],
    );
    let h = harness_with(registry, config(&dir));

    let err = h
        .migrator
        .create_migration(&Lineage::ADMIN, "1.4.0", "again", "dup")
        .unwrap_err();
    assert!(matches!(err, MigrationError::Conflict { .. }));

    // Another lineage has its own version space.
    h.migrator
        .create_migration(&Lineage::SAMPLE, "1.4.0", "sample", "ok")
        .unwrap();
}

#[test]
fn create_migration_rejects_versions_already_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness_with(Registry::new(), config(&dir));

    h.migrator
        .create_migration(&Lineage::ADMIN, "1.5.0", "first", "one")
        .unwrap();
    let err = h
        .migrator
        .create_migration(&Lineage::ADMIN, "1.5.0", "second", "two")
        .unwrap_err();
    assert!(matches!(err, MigrationError::Conflict { .. }));

    let files = fs::read_dir(dir.path().join("admin")).unwrap().count();
    assert_eq!(files, 1);
}
