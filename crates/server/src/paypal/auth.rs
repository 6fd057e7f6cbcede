//! PayPal OAuth2 client-credentials flow.
//!
//! Exchanges the REST app's client ID and secret for a short-lived bearer
//! token via `POST /v1/oauth2/token`.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::instrument;

use super::PayPalError;
use crate::config::PayPalConfig;

/// Bearer token obtained from PayPal.
#[derive(Debug, Clone)]
pub struct AccessToken {
    /// Token sent as `Authorization: Bearer ...`.
    pub access_token: SecretString,
    /// Unix timestamp when the token expires.
    pub expires_at: i64,
}

/// Response from the token endpoint.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    /// Token lifetime in seconds.
    expires_in: i64,
}

/// Error body from the token endpoint.
#[derive(Deserialize)]
struct TokenErrorResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Request a new access token with the configured client credentials.
///
/// # Errors
///
/// Returns `PayPalError::AuthenticationFailed` if PayPal rejects the
/// credentials, or `PayPalError::Http` on network failures.
#[instrument(skip(client, config), fields(api_base = %config.api_base))]
pub async fn fetch_token(
    client: &reqwest::Client,
    config: &PayPalConfig,
) -> Result<AccessToken, PayPalError> {
    let now = chrono::Utc::now().timestamp();

    let response = client
        .post(format!("{}/v1/oauth2/token", config.api_base))
        .basic_auth(&config.client_id, Some(config.client_secret.expose_secret()))
        .form(&[("grant_type", "client_credentials")])
        .send()
        .await?;

    let status = response.status();

    if status.is_success() {
        let token: TokenResponse = response.json().await?;
        tracing::debug!(expires_in = token.expires_in, "Obtained PayPal access token");

        Ok(AccessToken {
            access_token: SecretString::from(token.access_token),
            expires_at: now + token.expires_in,
        })
    } else {
        let error_response: TokenErrorResponse =
            response.json().await.unwrap_or(TokenErrorResponse {
                error: None,
                error_description: None,
            });

        let message = error_response
            .error_description
            .or(error_response.error)
            .unwrap_or_else(|| format!("HTTP {status}"));

        Err(PayPalError::AuthenticationFailed(message))
    }
}

impl AccessToken {
    /// Check if the token has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        let now = chrono::Utc::now().timestamp();
        // Consider expired if less than 60 seconds remaining
        now >= self.expires_at - 60
    }
}
