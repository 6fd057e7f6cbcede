//! Errors from registration and login.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::db::RepositoryError;

/// Per-field validation messages, keyed by the JSON field name.
pub type FieldErrors = BTreeMap<&'static str, String>;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Registration input rejected; every failing field is listed.
    #[error("invalid registration details")]
    Validation(FieldErrors),

    /// Unknown email or wrong password. The two are not distinguished.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("an account with this email already exists")]
    UserAlreadyExists,

    /// Session points at an account that no longer exists.
    #[error("user not found")]
    UserNotFound,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("password hashing failed")]
    PasswordHash,
}
