//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand};

/// Stratum - ordered, versioned and reversible document database migrations
#[derive(Parser, Debug)]
#[command(name = "stratum")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Database to migrate: `postgres://...` or `memory:`
    #[arg(long, global = true, env = "DATABASE_URL", default_value = "memory:")]
    pub database_url: String,

    /// Root directory of migration sources, one sub-directory per lineage
    #[arg(
        long,
        global = true,
        env = "STRATUM_MIGRATIONS_DIR",
        default_value = "migrations"
    )]
    pub migrations_dir: String,

    /// Run even if applied migrations changed since they were applied
    #[arg(long, global = true)]
    pub no_verify_checksums: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a new migration skeleton
    CreateMigration(CreateMigrationArgs),

    /// Show applied and pending migrations
    Status(StatusArgs),

    /// Apply pending migrations
    Run(RunArgs),

    /// Revert applied migrations
    Rollback(RollbackArgs),
}

/// Arguments for the create-migration command
///
/// The positionals are optional for clap so that a missing one is reported
/// like every other usage error.
#[derive(Args, Debug)]
pub struct CreateMigrationArgs {
    /// Version of the new migration, e.g. 1.5.0
    pub version: Option<String>,

    /// Short name, turned into the file and type name
    pub name: Option<String>,

    /// What the migration does
    pub description: Option<String>,

    /// Lineage the migration belongs to
    #[arg(short, long, default_value = "admin")]
    pub lineage: String,

    /// Override the migrations directory
    #[arg(short, long)]
    pub dir: Option<String>,
}

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Only show this lineage (default: every registered lineage)
    #[arg(short, long)]
    pub lineage: Option<String>,
}

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Lineage to migrate
    #[arg(short, long, default_value = "admin")]
    pub lineage: String,

    /// Stop after this version (inclusive)
    #[arg(long = "to")]
    pub to_version: Option<String>,

    /// Print what would run without running it
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the rollback command
#[derive(Args, Debug)]
pub struct RollbackArgs {
    /// Lineage to roll back
    #[arg(short, long, default_value = "admin")]
    pub lineage: String,

    /// Number of applied migrations to revert (default: 1)
    #[arg(long, conflicts_with = "to_version")]
    pub steps: Option<usize>,

    /// Revert every migration above this version
    #[arg(long = "to")]
    pub to_version: Option<String>,

    /// Print what would be reverted without reverting it
    #[arg(long)]
    pub dry_run: bool,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
