//! Stratum CLI - versioned migrations for document databases

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;
mod context;
mod migrations;

use cli::Cli;
use commands::{create_migration, rollback, run, status};

#[tokio::main]
async fn main() -> Result<()> {
    // Every failure, argument errors included, exits with status 1.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            let _ = e.print();
            std::process::exit(1);
        }
    };

    init_logging(cli.global.verbose);

    match &cli.command {
        cli::Commands::CreateMigration(args) => create_migration::execute(args, &cli.global).await,
        cli::Commands::Status(args) => status::execute(args, &cli.global).await,
        cli::Commands::Run(args) => run::execute(args, &cli.global).await,
        cli::Commands::Rollback(args) => rollback::execute(args, &cli.global).await,
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_target(false)
        .init();
}
