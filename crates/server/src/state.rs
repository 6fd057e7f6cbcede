//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::paypal::{PayPalClient, PayPalError, PaymentProcessor};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    pool: PgPool,
    payments: Arc<dyn PaymentProcessor>,
}

impl AppState {
    /// Create application state backed by the configured `PayPal` account.
    ///
    /// # Errors
    ///
    /// Returns an error if the `PayPal` HTTP client cannot be built.
    pub fn new(config: Config, pool: PgPool) -> Result<Self, PayPalError> {
        let payments = Arc::new(PayPalClient::new(config.paypal.clone())?);
        Ok(Self::with_processor(config, pool, payments))
    }

    /// Create application state with a specific payment processor.
    #[must_use]
    pub fn with_processor(
        config: Config,
        pool: PgPool,
        payments: Arc<dyn PaymentProcessor>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                payments,
            }),
        }
    }

    /// Get a reference to the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get the payment processor.
    #[must_use]
    pub fn payments(&self) -> &dyn PaymentProcessor {
        self.inner.payments.as_ref()
    }
}
