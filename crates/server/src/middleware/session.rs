//! Cookie sessions stored in `PostgreSQL`.
//!
//! The session holds only the logged-in [`CurrentUser`](crate::models::CurrentUser);
//! carts and orders are always read from their own tables.

use sqlx::PgPool;
use tower_sessions::cookie::{SameSite, time::Duration};
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::Config;

pub const SESSION_COOKIE_NAME: &str = "ecomstore_session";

/// A week without requests logs the user out.
const IDLE_TIMEOUT_DAYS: i64 = 7;

/// Session layer over the `tower_sessions.session` table (created by the
/// server migrations, not by the store at startup).
///
/// The cookie is `Secure` only when the public base URL is https, so local
/// development over plain http keeps working.
#[must_use]
pub fn create_session_layer(pool: &PgPool, config: &Config) -> SessionManagerLayer<PostgresStore> {
    SessionManagerLayer::new(PostgresStore::new(pool.clone()))
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(Duration::days(IDLE_TIMEOUT_DAYS)))
        .with_secure(config.is_https())
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
