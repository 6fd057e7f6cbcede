//! Account route handlers: register, login, logout and profile.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_sessions::Session;

use ecomstore_core::UserId;

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{JsonBody, RequireAuth, clear_current_user, set_current_user};
use crate::models::CurrentUser;
use crate::services::AuthService;
use crate::services::auth::Registration;
use crate::state::AppState;

/// Login body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Public view of the logged-in user.
#[derive(Debug, Serialize)]
pub struct Profile {
    pub id: UserId,
    pub email: String,
    pub name: Option<String>,
}

async fn start_session(session: &Session, user: &CurrentUser) -> Result<()> {
    set_current_user(session, user).await.map_err(|e| {
        tracing::error!("Failed to set session: {}", e);
        AppError::Internal("session error".to_string())
    })?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}

/// `POST /register`
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    JsonBody(form): JsonBody<Registration>,
) -> Result<(StatusCode, Json<Value>)> {
    let user = AuthService::new(state.pool()).register(&form).await?;

    start_session(&session, &CurrentUser::from(&user)).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "msg": "user registered successfully" })),
    ))
}

/// `POST /login`
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    JsonBody(form): JsonBody<LoginRequest>,
) -> Result<Json<Value>> {
    let user = AuthService::new(state.pool())
        .login(&form.email, &form.password)
        .await
        .inspect_err(|e| tracing::warn!("Login failed: {}", e))?;

    start_session(&session, &CurrentUser::from(&user)).await?;
    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(json!({ "msg": "login successful" })))
}

/// `POST /logout`
pub async fn logout(session: Session) -> Result<Json<Value>> {
    clear_current_user(&session).await.map_err(|e| {
        tracing::error!("Failed to clear session: {}", e);
        AppError::Internal("session error".to_string())
    })?;
    clear_sentry_user();

    Ok(Json(json!({ "msg": "logged out" })))
}

/// `GET /profile`
pub async fn profile(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<Json<Profile>> {
    let user = AuthService::new(state.pool()).get_user(current.id).await?;

    Ok(Json(Profile {
        id: user.id,
        email: user.email.into_inner(),
        name: user.name,
    }))
}
