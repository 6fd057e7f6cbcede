//! Cart maintenance commands.

use chrono::{DateTime, Duration, Utc};

use ecomstore_server::db::CartRepository;

use super::CliError;

/// `None` when `days` reaches past the earliest representable date.
fn cutoff(now: DateTime<Utc>, days: u32) -> Option<DateTime<Utc>> {
    Duration::try_days(i64::from(days)).and_then(|age| now.checked_sub_signed(age))
}

/// Mark active carts not updated in `days` days as abandoned.
///
/// # Errors
///
/// Returns an error if `days` is out of range, the database is unreachable
/// or the update fails.
pub async fn prune(days: u32) -> Result<(), CliError> {
    let cutoff = cutoff(Utc::now(), days).ok_or(CliError::DaysOutOfRange(days))?;
    let pool = super::connect().await?;

    tracing::info!(%cutoff, "Abandoning stale carts");
    let changed = CartRepository::new(&pool)
        .mark_stale_abandoned(cutoff)
        .await?;

    tracing::info!(carts = changed, "Prune complete");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cutoff() {
        let now = Utc::now();
        assert_eq!(cutoff(now, 0), Some(now));
        assert_eq!(now - cutoff(now, 30).unwrap(), Duration::days(30));
    }

    #[test]
    fn test_cutoff_out_of_range() {
        assert_eq!(cutoff(Utc::now(), u32::MAX), None);
        assert!(cutoff(Utc::now(), 36_500).is_some());
    }

    #[tokio::test]
    async fn test_prune_rejects_huge_age_before_connecting() {
        assert!(matches!(
            prune(u32::MAX).await,
            Err(CliError::DaysOutOfRange(u32::MAX))
        ));
    }
}
