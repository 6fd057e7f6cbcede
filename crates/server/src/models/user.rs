//! Customer accounts.

use chrono::{DateTime, Utc};
use serde::Serialize;

use ecomstore_core::{Email, UserId};

/// A registered customer. The password hash never leaves the repository.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    /// Stored lowercased; unique.
    pub email: Email,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
