use super::*;
use clap::{CommandFactory, Parser};

#[test]
fn verify_cli_args() {
    // Validates the entire command tree: short flag conflicts,
    // duplicate args, and other clap definition errors.
    Cli::command().debug_assert();
}

#[test]
fn create_migration_positionals_are_optional() {
    let cli = Cli::try_parse_from(["stratum", "create-migration", "1.5.0"]).unwrap();
    match cli.command {
        Commands::CreateMigration(args) => {
            assert_eq!(args.version.as_deref(), Some("1.5.0"));
            assert!(args.name.is_none());
            assert_eq!(args.lineage, "admin");
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn rollback_rejects_steps_with_target() {
    let result = Cli::try_parse_from(["stratum", "rollback", "--steps", "2", "--to", "1.0.0"]);
    assert!(result.is_err());
}

#[test]
fn run_options() {
    let cli = Cli::try_parse_from([
        "stratum",
        "--database-url",
        "memory:",
        "run",
        "--lineage",
        "sample",
        "--to",
        "2.0.0",
        "--dry-run",
    ])
    .unwrap();
    assert_eq!(cli.global.database_url, "memory:");
    match cli.command {
        Commands::Run(args) => {
            assert_eq!(args.lineage, "sample");
            assert_eq!(args.to_version.as_deref(), Some("2.0.0"));
            assert!(args.dry_run);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}
