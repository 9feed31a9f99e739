use super::*;
use std::fs;

fn global(dir: &tempfile::TempDir) -> GlobalArgs {
    GlobalArgs {
        verbose: false,
        database_url: "memory:".to_string(),
        migrations_dir: dir.path().display().to_string(),
        no_verify_checksums: false,
    }
}

fn args(version: Option<&str>, name: Option<&str>, description: Option<&str>) -> CreateMigrationArgs {
    CreateMigrationArgs {
        version: version.map(String::from),
        name: name.map(String::from),
        description: description.map(String::from),
        lineage: "admin".to_string(),
        dir: None,
    }
}

#[tokio::test]
async fn writes_the_migration_file() {
    let dir = tempfile::tempdir().unwrap();

    execute(
        &args(Some("1.5.0"), Some("add audit log"), Some("Audit log collection")),
        &global(&dir),
    )
    .await
    .unwrap();

    let path = dir.path().join("admin").join("v1_5_0_add_audit_log.rs");
    let source = fs::read_to_string(path).unwrap();
    assert!(source.contains("pub struct AddAuditLog;"));
}

#[tokio::test]
async fn dir_flag_overrides_the_migrations_dir() {
    let dir = tempfile::tempdir().unwrap();
    let other = tempfile::tempdir().unwrap();
    let mut create = args(Some("2.2.0"), Some("tags"), Some("Tag index"));
    create.lineage = "sample".to_string();
    create.dir = Some(other.path().display().to_string());

    execute(&create, &global(&dir)).await.unwrap();

    assert!(other.path().join("sample").join("v2_2_0_tags.rs").exists());
    assert!(!dir.path().join("sample").exists());
}

#[tokio::test]
async fn missing_arguments_are_usage_errors() {
    let dir = tempfile::tempdir().unwrap();

    for incomplete in [
        args(None, None, None),
        args(Some("1.5.0"), None, None),
        args(Some("1.5.0"), Some("x"), None),
    ] {
        let err = execute(&incomplete, &global(&dir)).await.unwrap_err();
        let err = err.downcast_ref::<MigrationError>().unwrap();
        assert!(matches!(err, MigrationError::Usage(_)));
        assert!(err.to_string().contains("Usage: stratum create-migration"));
    }
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn bundled_versions_conflict() {
    let dir = tempfile::tempdir().unwrap();

    let err = execute(&args(Some("1.3.0"), Some("dup"), Some("dup")), &global(&dir))
        .await
        .unwrap_err();
    let err = err.downcast_ref::<MigrationError>().unwrap();
    assert!(matches!(err, MigrationError::Conflict { .. }));
}

#[tokio::test]
async fn bad_versions_are_format_errors() {
    let dir = tempfile::tempdir().unwrap();

    let err = execute(&args(Some("1.5"), Some("x"), Some("y")), &global(&dir))
        .await
        .unwrap_err();
    let err = err.downcast_ref::<MigrationError>().unwrap();
    assert!(matches!(err, MigrationError::Format { .. }));
}
