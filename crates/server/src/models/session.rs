//! What a login session remembers about the user.

use serde::{Deserialize, Serialize};

use ecomstore_core::{Email, UserId};

use super::User;

/// The logged-in user, as stored in the session.
///
/// Written on register/login, read by `RequireAuth` on every protected
/// request without touching the `users` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: Email,
    pub name: Option<String>,
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
        }
    }
}

/// Session keys.
pub mod keys {
    pub const CURRENT_USER: &str = "current_user";
}
