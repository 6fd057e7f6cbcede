//! PayPal Orders v2 wire types.
//!
//! Only the fields this service sends or reads are modelled; unknown response
//! fields are ignored.

use serde::{Deserialize, Serialize};

use ecomstore_core::{OrderId, Price};

use crate::config::PayPalConfig;
use crate::models::{OrderDraft, OrderLine};

/// PayPal rejects item names and descriptions longer than this.
const MAX_ITEM_TEXT: usize = 127;

// =============================================================================
// Requests
// =============================================================================

/// Body of `POST /v2/checkout/orders`.
#[derive(Debug, Serialize)]
pub struct CreateOrderRequest {
    pub intent: &'static str,
    pub purchase_units: Vec<PurchaseUnit>,
    pub payment_source: PaymentSource,
}

#[derive(Debug, Serialize)]
pub struct PurchaseUnit {
    /// Our order ID, echoed back by PayPal.
    pub reference_id: String,
    pub amount: Amount,
    pub items: Vec<Item>,
}

#[derive(Debug, Serialize)]
pub struct Amount {
    pub currency_code: String,
    pub value: String,
    pub breakdown: Breakdown,
}

#[derive(Debug, Serialize)]
pub struct Breakdown {
    pub item_total: Money,
    pub shipping: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub currency_code: String,
    pub value: String,
}

impl From<Price> for Money {
    fn from(price: Price) -> Self {
        Self {
            currency_code: price.currency_code.as_str().to_string(),
            value: price.processor_value(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Item {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// PayPal wants the quantity as a string.
    pub quantity: String,
    pub unit_amount: Money,
}

impl From<&OrderLine> for Item {
    fn from(line: &OrderLine) -> Self {
        Self {
            name: truncate(&line.name),
            sku: line.sku.clone(),
            description: line.description.as_deref().map(truncate),
            quantity: line.quantity.to_string(),
            unit_amount: Money::from(line.unit_price),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaymentSource {
    pub paypal: PayPalSource,
}

#[derive(Debug, Serialize)]
pub struct PayPalSource {
    pub experience_context: ExperienceContext,
}

/// How the PayPal approval page behaves.
#[derive(Debug, Serialize)]
pub struct ExperienceContext {
    pub brand_name: String,
    pub shipping_preference: &'static str,
    pub landing_page: &'static str,
    pub user_action: &'static str,
    pub payment_method_preference: &'static str,
    pub locale: &'static str,
    pub return_url: String,
    pub cancel_url: String,
}

impl ExperienceContext {
    #[must_use]
    pub fn from_config(config: &PayPalConfig) -> Self {
        Self {
            brand_name: config.brand_name.clone(),
            shipping_preference: "NO_SHIPPING",
            landing_page: "NO_PREFERENCE",
            user_action: "PAY_NOW",
            payment_method_preference: "UNRESTRICTED",
            locale: "en-US",
            return_url: config.return_url.clone(),
            cancel_url: config.cancel_url.clone(),
        }
    }
}

impl CreateOrderRequest {
    /// Build the PayPal request for a locally persisted order.
    #[must_use]
    pub fn from_draft(order_id: OrderId, draft: &OrderDraft, config: &PayPalConfig) -> Self {
        let item_total = draft.product_total();
        let total = draft.order_total();

        Self {
            intent: "CAPTURE",
            purchase_units: vec![PurchaseUnit {
                reference_id: order_id.to_string(),
                amount: Amount {
                    currency_code: total.currency_code.as_str().to_string(),
                    value: total.processor_value(),
                    breakdown: Breakdown {
                        item_total: Money::from(item_total),
                        shipping: Money::from(draft.shipping_price),
                    },
                },
                items: draft.lines.iter().map(Item::from).collect(),
            }],
            payment_source: PaymentSource {
                paypal: PayPalSource {
                    experience_context: ExperienceContext::from_config(config),
                },
            },
        }
    }
}

fn truncate(s: &str) -> String {
    s.chars().take(MAX_ITEM_TEXT).collect()
}

// =============================================================================
// Responses
// =============================================================================

/// An order as returned by create, get and capture.
#[derive(Debug, Deserialize)]
pub struct OrderResponse {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub payer: Option<Payer>,
    /// Newer responses report the payer here instead of `payer`.
    #[serde(default)]
    pub payment_source: Option<ResponsePaymentSource>,
}

impl OrderResponse {
    /// The URL the buyer must visit to approve the payment.
    #[must_use]
    pub fn approve_link(&self) -> Option<&str> {
        self.links
            .iter()
            .find(|l| l.rel == "payer-action" || l.rel == "approve")
            .map(|l| l.href.as_str())
    }

    /// Payer email, from whichever field PayPal filled in.
    #[must_use]
    pub fn payer_email(&self) -> Option<&str> {
        self.payer
            .as_ref()
            .and_then(|p| p.email_address.as_deref())
            .or_else(|| {
                self.payment_source
                    .as_ref()
                    .and_then(|s| s.paypal.as_ref())
                    .and_then(|p| p.email_address.as_deref())
            })
    }

    /// PayPal's ID for the payer account.
    #[must_use]
    pub fn payer_id(&self) -> Option<&str> {
        self.payer
            .as_ref()
            .and_then(|p| p.payer_id.as_deref())
            .or_else(|| {
                self.payment_source
                    .as_ref()
                    .and_then(|s| s.paypal.as_ref())
                    .and_then(|p| p.account_id.as_deref())
            })
    }
}

#[derive(Debug, Deserialize)]
pub struct Link {
    pub href: String,
    pub rel: String,
    #[serde(default)]
    pub method: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Payer {
    #[serde(default)]
    pub email_address: Option<String>,
    #[serde(default)]
    pub payer_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResponsePaymentSource {
    #[serde(default)]
    pub paypal: Option<ResponsePayPalAccount>,
}

#[derive(Debug, Deserialize)]
pub struct ResponsePayPalAccount {
    #[serde(default)]
    pub email_address: Option<String>,
    #[serde(default)]
    pub account_id: Option<String>,
}

/// Error body returned by the REST API.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub debug_id: Option<String>,
    #[serde(default)]
    pub details: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub issue: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ApiErrorResponse {
    /// One-line summary: name, message and the first detail's issue.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        if let Some(name) = self.name.as_deref() {
            parts.push(name);
        }
        if let Some(message) = self.message.as_deref() {
            parts.push(message);
        }
        if let Some(issue) = self.details.first().and_then(|d| d.issue.as_deref()) {
            parts.push(issue);
        }
        if parts.is_empty() {
            "unknown PayPal error".to_string()
        } else {
            parts.join(": ")
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::fixtures::paypal_config;
    use crate::models::product::fixtures::product;
    use ecomstore_core::UserId;
    use rust_decimal::Decimal;

    #[test]
    fn test_create_order_request_shape() {
        let draft =
            OrderDraft::for_product(UserId::new(), &product("12.5", 10), 2, "3".parse().unwrap());
        let order_id = OrderId::new();

        let request = CreateOrderRequest::from_draft(order_id, &draft, &paypal_config());
        let json = serde_json::to_value(request).unwrap();

        assert_eq!(json["intent"], "CAPTURE");
        let unit = &json["purchase_units"][0];
        assert_eq!(unit["reference_id"], order_id.to_string());
        assert_eq!(unit["amount"]["currency_code"], "USD");
        assert_eq!(unit["amount"]["value"], "28.00");
        assert_eq!(unit["amount"]["breakdown"]["item_total"]["value"], "25.00");
        assert_eq!(unit["amount"]["breakdown"]["shipping"]["value"], "3.00");
        assert_eq!(unit["items"][0]["quantity"], "2");
        assert_eq!(unit["items"][0]["unit_amount"]["value"], "12.50");
        assert_eq!(unit["items"][0]["sku"], "GW-ORG-01");

        let ctx = &json["payment_source"]["paypal"]["experience_context"];
        assert_eq!(ctx["brand_name"], "Niche Store");
        assert_eq!(ctx["shipping_preference"], "NO_SHIPPING");
        assert_eq!(ctx["user_action"], "PAY_NOW");
        assert_eq!(ctx["return_url"], "http://localhost:3000/checkout/capture");
    }

    #[test]
    fn test_item_without_sku_omits_field() {
        let line = OrderLine {
            product_id: ecomstore_core::ProductId::new(),
            name: "x".repeat(200),
            sku: None,
            description: None,
            unit_price: Price::usd(Decimal::ONE),
            quantity: 1,
        };
        let json = serde_json::to_value(Item::from(&line)).unwrap();
        assert!(json.get("sku").is_none());
        assert_eq!(json["name"].as_str().unwrap().len(), MAX_ITEM_TEXT);
    }

    #[test]
    fn test_created_order_response() {
        let body = r#"{
            "id": "5O190127TN364715T",
            "status": "PAYER_ACTION_REQUIRED",
            "payment_source": {"paypal": {}},
            "links": [
                {"href": "https://api-m.paypal.com/v2/checkout/orders/5O190127TN364715T", "rel": "self", "method": "GET"},
                {"href": "https://www.paypal.com/checkoutnow?token=5O190127TN364715T", "rel": "payer-action", "method": "GET"}
            ]
        }"#;
        let order: OrderResponse = serde_json::from_str(body).unwrap();
        assert_eq!(order.status, "PAYER_ACTION_REQUIRED");
        assert_eq!(
            order.approve_link(),
            Some("https://www.paypal.com/checkoutnow?token=5O190127TN364715T")
        );
        assert_eq!(order.payer_email(), None);
    }

    #[test]
    fn test_captured_order_response() {
        let body = r#"{
            "id": "5O190127TN364715T",
            "status": "COMPLETED",
            "payer": {
                "name": {"given_name": "John", "surname": "Doe"},
                "email_address": "customer@example.com",
                "payer_id": "QYR5Z8XDVJNXQ"
            },
            "links": []
        }"#;
        let order: OrderResponse = serde_json::from_str(body).unwrap();
        assert_eq!(order.payer_email(), Some("customer@example.com"));
        assert_eq!(order.payer_id(), Some("QYR5Z8XDVJNXQ"));
        assert_eq!(order.approve_link(), None);
    }

    #[test]
    fn test_payer_from_payment_source() {
        let body = r#"{
            "id": "X",
            "status": "COMPLETED",
            "payment_source": {"paypal": {"email_address": "buyer@example.com", "account_id": "ACC123"}}
        }"#;
        let order: OrderResponse = serde_json::from_str(body).unwrap();
        assert_eq!(order.payer_email(), Some("buyer@example.com"));
        assert_eq!(order.payer_id(), Some("ACC123"));
    }

    #[test]
    fn test_error_summary() {
        let body = r#"{
            "name": "UNPROCESSABLE_ENTITY",
            "message": "The requested action could not be performed.",
            "debug_id": "abc",
            "details": [{"issue": "ORDER_NOT_APPROVED", "description": "Payer has not yet approved"}]
        }"#;
        let err: ApiErrorResponse = serde_json::from_str(body).unwrap();
        assert_eq!(
            err.summary(),
            "UNPROCESSABLE_ENTITY: The requested action could not be performed.: ORDER_NOT_APPROVED"
        );
        assert_eq!(
            ApiErrorResponse {
                name: None,
                message: None,
                debug_id: None,
                details: Vec::new()
            }
            .summary(),
            "unknown PayPal error"
        );
    }
}
