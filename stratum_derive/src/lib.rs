mod migration_info;

/// Derive macro implementing `stratum_core::MigrationInfo`.
///
/// # Basic Usage
///
/// ```ignore
/// use stratum_derive::MigrationInfo;
///
/// #[derive(MigrationInfo)]
/// #[migration(version = "1.3.0", description = "Backfill the MFA flag")]
/// struct BackfillMfaFlag;
///
/// assert_eq!(BackfillMfaFlag.name(), "backfill_mfa_flag");
/// ```
///
/// The version is checked at compile time: anything but three dot-separated
/// non-negative integers is a compile error.
///
/// # Custom Name
///
/// ```ignore
/// #[derive(MigrationInfo)]
/// #[migration(version = "1.3.0", name = "mfa_backfill")]
/// struct BackfillMfaFlag;
/// ```
///
/// # Irreversible Migrations
///
/// ```ignore
/// #[derive(MigrationInfo)]
/// #[migration(version = "1.4.0", irreversible)]
/// struct DropLegacySessions;
///
/// // The runner refuses to roll back past this migration.
/// assert!(!DropLegacySessions.reversible());
/// ```
#[proc_macro_derive(MigrationInfo, attributes(migration))]
pub fn migration_info(item: proc_macro::TokenStream) -> proc_macro::TokenStream {
    migration_info::migration_info_impl(item)
}
