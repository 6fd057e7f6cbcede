//! Authentication extractors.
//!
//! The logged-in user lives in the session under
//! [`keys::CURRENT_USER`](crate::models::session::keys::CURRENT_USER).

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tower_sessions::Session;

use crate::models::CurrentUser;
use crate::models::session::keys;

/// Extractor that requires a logged-in user.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", user.email)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Rejection for requests that cannot be tied to a logged-in user.
#[derive(Debug)]
pub enum AuthRejection {
    /// No user in the session.
    Unauthenticated,
    /// The session could not be read at all.
    SessionUnavailable,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "authentication required" })),
            )
                .into_response(),
            Self::SessionUnavailable => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "session unavailable" })),
            )
                .into_response(),
        }
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let Some(session) = parts.extensions.get::<Session>() else {
            tracing::error!("Session layer missing from router");
            return Err(AuthRejection::SessionUnavailable);
        };

        let user: Option<CurrentUser> = session
            .get(keys::CURRENT_USER)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to load session");
                AuthRejection::SessionUnavailable
            })?;

        user.map(Self).ok_or(AuthRejection::Unauthenticated)
    }
}

/// Extractor that optionally gets the current user.
///
/// A session that cannot be read counts as anonymous.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => session
                .get::<CurrentUser>(keys::CURRENT_USER)
                .await
                .unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "Failed to load session, treating as anonymous");
                    None
                }),
            None => None,
        };

        Ok(Self(user))
    }
}

/// Store the logged-in user in the session.
///
/// The session ID is cycled first so a pre-login session cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(keys::CURRENT_USER, user).await
}

/// Log out: drop the session entirely.
///
/// # Errors
///
/// Returns an error if the session cannot be deleted.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn rejection_body(rejection: AuthRejection) -> (StatusCode, serde_json::Value) {
        let response = rejection.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_rejections_distinguish_store_failure() {
        let (status, body) = rejection_body(AuthRejection::Unauthenticated).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "authentication required");

        let (status, body) = rejection_body(AuthRejection::SessionUnavailable).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "session unavailable");
    }

    fn parts_with(session: Option<Session>) -> Parts {
        let (mut parts, ()) = axum::http::Request::new(()).into_parts();
        if let Some(session) = session {
            parts.extensions.insert(session);
        }
        parts
    }

    fn memory_session() -> Session {
        let store = std::sync::Arc::new(tower_sessions::MemoryStore::default());
        Session::new(None, store, None)
    }

    #[tokio::test]
    async fn test_extractors_read_current_user() {
        let session = memory_session();
        let mut parts = parts_with(Some(session.clone()));

        assert!(matches!(
            RequireAuth::from_request_parts(&mut parts, &()).await,
            Err(AuthRejection::Unauthenticated)
        ));
        let OptionalAuth(anonymous) = OptionalAuth::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert!(anonymous.is_none());

        let user = CurrentUser {
            id: ecomstore_core::UserId::new(),
            email: ecomstore_core::Email::parse("reader@example.com").unwrap(),
            name: None,
        };
        session.insert(keys::CURRENT_USER, &user).await.unwrap();

        let RequireAuth(found) = RequireAuth::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(found.id, user.id);
        let OptionalAuth(found) = OptionalAuth::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(found.map(|u| u.id), Some(user.id));
    }

    #[tokio::test]
    async fn test_missing_session_layer_is_a_server_error() {
        let mut parts = parts_with(None);
        assert!(matches!(
            RequireAuth::from_request_parts(&mut parts, &()).await,
            Err(AuthRejection::SessionUnavailable)
        ));
        let OptionalAuth(user) = OptionalAuth::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert!(user.is_none());
    }
}
