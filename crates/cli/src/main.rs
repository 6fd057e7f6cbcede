//! ecomstore CLI - database migrations and catalog maintenance.
//!
//! # Usage
//!
//! ```bash
//! # Apply pending migrations
//! ecomstore migrate
//!
//! # Load categories and products from YAML (idempotent, keyed by SKU)
//! ecomstore seed --file catalog.yaml
//!
//! # Abandon carts nobody touched for a month
//! ecomstore carts prune --days 30
//! ```
//!
//! All commands read `ECOMSTORE_DATABASE_URL`, falling back to `DATABASE_URL`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "ecomstore")]
#[command(author, version, about = "ecomstore operator tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Upsert categories and products from a YAML catalog
    Seed {
        /// Path to the catalog file
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Cart maintenance
    Carts {
        #[command(subcommand)]
        action: CartsAction,
    },
}

#[derive(Subcommand)]
enum CartsAction {
    /// Mark active carts untouched for N days as abandoned
    Prune {
        /// Age in days after which an active cart is abandoned
        #[arg(short, long, default_value_t = 30)]
        days: u32,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await,
        Commands::Seed { file } => commands::seed::catalog(&file).await,
        Commands::Carts { action } => match action {
            CartsAction::Prune { days } => commands::carts::prune(days).await,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_prune_days_default() {
        let cli = Cli::try_parse_from(["ecomstore", "carts", "prune"]).unwrap_or_else(|e| panic!("{e}"));
        assert!(matches!(
            cli.command,
            Commands::Carts {
                action: CartsAction::Prune { days: 30 }
            }
        ));
    }
}
