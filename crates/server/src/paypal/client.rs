//! `PayPal` REST client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::RwLock;
use tracing::instrument;

use ecomstore_core::OrderId;

use super::auth::{AccessToken, fetch_token};
use super::types::{ApiErrorResponse, CreateOrderRequest, OrderResponse};
use super::{CaptureResult, PayPalError, PaymentProcessor, ProcessorOrder};
use crate::config::PayPalConfig;
use crate::models::OrderDraft;

/// `PayPal` Orders v2 client.
///
/// Cheap to clone; clones share the HTTP connection pool and token cache.
#[derive(Clone)]
pub struct PayPalClient {
    inner: Arc<PayPalClientInner>,
}

struct PayPalClientInner {
    client: reqwest::Client,
    config: PayPalConfig,
    /// In-memory token cache
    token: RwLock<Option<AccessToken>>,
}

impl PayPalClient {
    /// Create a client for the configured environment.
    ///
    /// # Errors
    ///
    /// Returns `PayPalError::Http` if the HTTP client cannot be built.
    pub fn new(config: PayPalConfig) -> Result<Self, PayPalError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            inner: Arc::new(PayPalClientInner {
                client,
                config,
                token: RwLock::new(None),
            }),
        })
    }

    /// Return a valid bearer token, fetching a new one if needed.
    async fn access_token(&self) -> Result<String, PayPalError> {
        if let Some(token) = self.inner.token.read().await.as_ref()
            && !token.is_expired()
        {
            return Ok(token.access_token.expose_secret().to_string());
        }

        let mut guard = self.inner.token.write().await;
        // Another task may have refreshed while we waited for the lock
        if let Some(token) = guard.as_ref()
            && !token.is_expired()
        {
            return Ok(token.access_token.expose_secret().to_string());
        }

        let token = fetch_token(&self.inner.client, &self.inner.config).await?;
        let secret = token.access_token.expose_secret().to_string();
        *guard = Some(token);
        Ok(secret)
    }

    /// Clear the cached token.
    async fn clear_token(&self) {
        *self.inner.token.write().await = None;
    }

    /// Send an authenticated request and decode the JSON response.
    async fn send<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&B>,
        request_id: Option<&str>,
    ) -> Result<T, PayPalError> {
        let access_token = self.access_token().await?;

        let mut request = self
            .inner
            .client
            .request(method, format!("{}{path}", self.inner.config.api_base))
            .bearer_auth(access_token)
            .header("Prefer", "return=representation");

        if let Some(request_id) = request_id {
            request = request.header("PayPal-Request-Id", request_id);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return Err(PayPalError::RateLimited(retry_after));
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            self.clear_token().await;
            return Err(PayPalError::AuthenticationFailed(
                "access token rejected".to_string(),
            ));
        }

        let bytes = response.bytes().await?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ApiErrorResponse>(&bytes).map_or_else(
                |_| format!("HTTP {status}"),
                |err| {
                    if let Some(debug_id) = err.debug_id.as_deref() {
                        tracing::warn!(debug_id, "PayPal request failed");
                    }
                    err.summary()
                },
            );
            return Err(PayPalError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl PaymentProcessor for PayPalClient {
    #[instrument(skip(self, draft), fields(order_id = %order_id))]
    async fn create_order(
        &self,
        order_id: OrderId,
        draft: &OrderDraft,
    ) -> Result<ProcessorOrder, PayPalError> {
        let body = CreateOrderRequest::from_draft(order_id, draft, &self.inner.config);
        let request_id = order_id.to_string();

        let order: OrderResponse = self
            .send(
                reqwest::Method::POST,
                "/v2/checkout/orders",
                Some(&body),
                Some(&request_id),
            )
            .await?;

        let approve_link = order
            .approve_link()
            .map(str::to_string)
            .ok_or(PayPalError::MissingApproveLink)?;

        tracing::info!(processor_order_id = %order.id, status = %order.status, "Created PayPal order");

        Ok(ProcessorOrder {
            id: order.id,
            status: order.status,
            approve_link: Some(approve_link),
        })
    }

    #[instrument(skip(self))]
    async fn capture_order(&self, processor_order_id: &str) -> Result<CaptureResult, PayPalError> {
        let order: OrderResponse = self
            .send(
                reqwest::Method::POST,
                &format!("/v2/checkout/orders/{processor_order_id}/capture"),
                Some(&serde_json::json!({})),
                None,
            )
            .await?;

        tracing::info!(status = %order.status, "Captured PayPal order");

        Ok(CaptureResult {
            payer_email: order.payer_email().map(str::to_string),
            payer_id: order.payer_id().map(str::to_string),
            id: order.id,
            status: order.status,
        })
    }

    #[instrument(skip(self))]
    async fn get_order(&self, processor_order_id: &str) -> Result<ProcessorOrder, PayPalError> {
        let order: OrderResponse = self
            .send::<(), _>(
                reqwest::Method::GET,
                &format!("/v2/checkout/orders/{processor_order_id}"),
                None,
                None,
            )
            .await?;

        Ok(ProcessorOrder {
            approve_link: order.approve_link().map(str::to_string),
            id: order.id,
            status: order.status,
        })
    }
}
