//! CLI subcommands.

pub mod carts;
pub mod migrate;
pub mod seed;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

use ecomstore_server::db::{self, RepositoryError};

/// Errors surfaced by any subcommand.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0} catalog validation errors found")]
    InvalidCatalog(usize),

    #[error("--days {0} reaches before the earliest supported date")]
    DaysOutOfRange(u32),
}

/// Connect using `ECOMSTORE_DATABASE_URL` or `DATABASE_URL`.
pub(crate) async fn connect() -> Result<PgPool, CliError> {
    let _ = dotenvy::dotenv();

    let database_url = std::env::var("ECOMSTORE_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CliError::MissingEnvVar("ECOMSTORE_DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    Ok(db::create_pool(&database_url).await?)
}
