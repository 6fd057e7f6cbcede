//! Database migration command.
//!
//! Migrations live in `crates/server/migrations/` and are embedded in the
//! server library, so the CLI always applies the set the server was built
//! against.

use ecomstore_server::db::MIGRATOR;

use super::CliError;

/// Apply every pending migration.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CliError> {
    let pool = super::connect().await?;

    tracing::info!(
        available = MIGRATOR.iter().count(),
        "Running migrations..."
    );
    MIGRATOR.run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
