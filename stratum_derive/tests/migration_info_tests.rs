//! Tests for the MigrationInfo derive macro.

use stratum_core::MigrationInfo;
use stratum_derive::MigrationInfo;

/// Test basic derivation with automatic name generation.
#[derive(MigrationInfo)]
#[migration(version = "1.0.0")]
struct CreateAccounts;

#[test]
fn name_defaults_to_snake_case_struct_name() {
    assert_eq!(CreateAccounts.version(), "1.0.0");
    assert_eq!(CreateAccounts.name(), "create_accounts");
    assert_eq!(CreateAccounts.description(), "");
    assert!(CreateAccounts.reversible());
}

/// Test derivation with every attribute.
#[derive(MigrationInfo)]
#[migration(
    version = "1.4.0",
    name = "drop_sessions",
    description = "Drops the legacy sessions collection",
    irreversible
)]
struct DropLegacySessions;

#[test]
fn explicit_attributes_are_used() {
    assert_eq!(DropLegacySessions.version(), "1.4.0");
    assert_eq!(DropLegacySessions.name(), "drop_sessions");
    assert_eq!(
        DropLegacySessions.description(),
        "Drops the legacy sessions collection"
    );
    assert!(!DropLegacySessions.reversible());
}

/// Test derivation on a struct with fields and generics.
#[derive(MigrationInfo)]
#[migration(version = "2.10.1", description = "generic")]
struct Backfill<T: Default> {
    _value: T,
}

#[test]
fn works_with_generics() {
    let m = Backfill::<u8> { _value: 0 };
    assert_eq!(m.version(), "2.10.1");
    assert_eq!(m.name(), "backfill");
}

/// Test that acronyms are split sensibly.
#[derive(MigrationInfo)]
#[migration(version = "1.3.0")]
struct BackfillTOTPSecrets;

#[test]
fn acronym_names() {
    assert_eq!(BackfillTOTPSecrets.name(), "backfill_totp_secrets");
}
