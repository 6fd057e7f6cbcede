//! `PayPal` Orders v2 integration.
//!
//! Checkout opens an order at `PayPal`, sends the buyer to the approval link,
//! then captures the payment once they return.
//!
//! # Architecture
//!
//! - OAuth2 client-credentials token, cached in memory until a minute before expiry
//! - Route handlers only see the [`PaymentProcessor`] trait, so tests can
//!   substitute an in-memory processor
//! - Idempotent order creation via the `PayPal-Request-Id` header

pub mod auth;
pub mod client;
pub mod types;

pub use client::PayPalClient;

use async_trait::async_trait;
use thiserror::Error;

use ecomstore_core::OrderId;

use crate::models::OrderDraft;

/// Errors that can occur when talking to `PayPal`.
#[derive(Debug, Error)]
pub enum PayPalError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// `PayPal` answered with a non-success status.
    #[error("PayPal API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Summary of the error body.
        message: String,
    },

    /// Client credentials were rejected or the token was revoked.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Rate limited by `PayPal`.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// A created order came back without a buyer approval link.
    #[error("PayPal order has no approval link")]
    MissingApproveLink,

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// An order as known to the payment processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorOrder {
    /// Processor-side order ID (the `token` query parameter on return).
    pub id: String,
    /// Processor status, e.g. `PAYER_ACTION_REQUIRED`.
    pub status: String,
    /// Where to send the buyer to approve the payment.
    pub approve_link: Option<String>,
}

/// Outcome of a successful capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureResult {
    pub id: String,
    pub status: String,
    pub payer_email: Option<String>,
    pub payer_id: Option<String>,
}

/// Payment processor used by checkout.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Open a processor order for a locally persisted order.
    async fn create_order(
        &self,
        order_id: OrderId,
        draft: &OrderDraft,
    ) -> Result<ProcessorOrder, PayPalError>;

    /// Capture the payment of an approved order.
    async fn capture_order(&self, processor_order_id: &str) -> Result<CaptureResult, PayPalError>;

    /// Fetch the current state of a processor order.
    async fn get_order(&self, processor_order_id: &str) -> Result<ProcessorOrder, PayPalError>;
}

/// In-memory processor for checkout tests.
#[cfg(test)]
pub(crate) mod fake {
    use super::*;

    /// Approves and captures everything unless told to fail.
    #[derive(Debug, Default)]
    pub struct FakeProcessor {
        pub fail_create: bool,
        pub fail_capture: bool,
    }

    #[async_trait]
    impl PaymentProcessor for FakeProcessor {
        async fn create_order(
            &self,
            order_id: OrderId,
            _draft: &OrderDraft,
        ) -> Result<ProcessorOrder, PayPalError> {
            if self.fail_create {
                return Err(PayPalError::Api {
                    status: 500,
                    message: "INTERNAL_SERVICE_ERROR".to_string(),
                });
            }
            let id = format!("FAKE-{}", order_id.as_uuid().simple());
            Ok(ProcessorOrder {
                approve_link: Some(format!(
                    "https://www.sandbox.paypal.com/checkoutnow?token={id}"
                )),
                id,
                status: "PAYER_ACTION_REQUIRED".to_string(),
            })
        }

        async fn capture_order(
            &self,
            processor_order_id: &str,
        ) -> Result<CaptureResult, PayPalError> {
            if self.fail_capture {
                return Err(PayPalError::Api {
                    status: 422,
                    message: "UNPROCESSABLE_ENTITY: ORDER_NOT_APPROVED".to_string(),
                });
            }
            Ok(CaptureResult {
                id: processor_order_id.to_string(),
                status: "COMPLETED".to_string(),
                payer_email: Some("buyer@example.com".to_string()),
                payer_id: Some("FAKEPAYER01".to_string()),
            })
        }

        async fn get_order(&self, processor_order_id: &str) -> Result<ProcessorOrder, PayPalError> {
            Ok(ProcessorOrder {
                id: processor_order_id.to_string(),
                status: "APPROVED".to_string(),
                approve_link: None,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paypal_error_display() {
        let err = PayPalError::Api {
            status: 422,
            message: "UNPROCESSABLE_ENTITY: ORDER_NOT_APPROVED".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "PayPal API error (422): UNPROCESSABLE_ENTITY: ORDER_NOT_APPROVED"
        );
        assert_eq!(
            PayPalError::RateLimited(30).to_string(),
            "Rate limited, retry after 30 seconds"
        );
        assert_eq!(
            PayPalError::MissingApproveLink.to_string(),
            "PayPal order has no approval link"
        );
    }
}
