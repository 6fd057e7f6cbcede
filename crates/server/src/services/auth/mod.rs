//! Authentication service.
//!
//! Email and password accounts. Passwords are hashed with Argon2id; the
//! session layer keeps the user logged in afterwards.

mod error;

pub use error::{AuthError, FieldErrors};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;
use tracing::instrument;

use ecomstore_core::{Email, Name, Password, UserId};

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::User;

/// Registration form as submitted by the client.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub email: String,
    #[serde(default)]
    pub name: String,
    pub password: String,
    pub confirm_password: String,
}

impl Registration {
    /// Validate every field, collecting one message per failing field.
    ///
    /// # Errors
    ///
    /// Returns the field errors if any field is invalid or the two passwords
    /// differ.
    pub fn validate(&self) -> Result<(Email, Name, Password), FieldErrors> {
        let mut errors = FieldErrors::new();

        let email = Email::parse(&self.email)
            .map_err(|e| errors.insert("email", e.to_string()))
            .ok();
        let name = Name::parse(&self.name)
            .map_err(|e| errors.insert("name", e.to_string()))
            .ok();
        let password = Password::parse(&self.password)
            .map_err(|e| errors.insert("password", e.to_string()))
            .ok();

        if self.password != self.confirm_password {
            errors.insert("confirmPassword", "passwords do not match".to_string());
        }

        match (email, name, password) {
            (Some(email), Some(name), Some(password)) if errors.is_empty() => {
                Ok((email, name, password))
            }
            _ => Err(errors),
        }
    }
}

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Register a new user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` with per-field messages if the form is invalid.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip(self, registration), fields(email = %registration.email))]
    pub async fn register(&self, registration: &Registration) -> Result<User, AuthError> {
        let (email, name, password) = registration.validate().map_err(AuthError::Validation)?;

        let password_hash = hash_password(password.expose())?;
        let name = name.into_option();

        let user = self
            .users
            .create(&email, name.as_deref(), &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Login with email and password.
    ///
    /// An unknown email and a wrong password produce the same error.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn get_user(&self, user_id: UserId) -> Result<User, AuthError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
