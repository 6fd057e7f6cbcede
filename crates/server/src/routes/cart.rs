//! Cart route handlers.

use axum::{Json, extract::State};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use ecomstore_core::ProductId;

use crate::error::{Result, add_breadcrumb};
use crate::middleware::{JsonBody, RequireAuth};
use crate::models::Cart;
use crate::services::CartService;
use crate::state::AppState;

/// Cart with its computed subtotal.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    #[serde(flatten)]
    pub cart: Cart,
    pub subtotal: Decimal,
}

impl From<Cart> for CartResponse {
    fn from(cart: Cart) -> Self {
        Self {
            subtotal: cart.subtotal(),
            cart,
        }
    }
}

/// `POST /cart/add` body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

const fn default_quantity() -> i32 {
    1
}

/// `POST /cart/reduce` and `POST /cart/remove` body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineRequest {
    pub product_id: ProductId,
}

/// `GET /cart`
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CartResponse>> {
    let cart = CartService::new(state.pool()).get_cart(user.id).await?;
    Ok(Json(CartResponse::from(cart)))
}

/// `POST /cart/add`
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    JsonBody(body): JsonBody<AddToCartRequest>,
) -> Result<Json<Value>> {
    let product_id = body.product_id.to_string();
    add_breadcrumb("cart", "Added to cart", Some(&[("product_id", &product_id)]));

    CartService::new(state.pool())
        .add(user.id, body.product_id, body.quantity)
        .await?;
    Ok(Json(json!({ "msg": "item added successfully" })))
}

/// `POST /cart/reduce`
pub async fn reduce(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    JsonBody(body): JsonBody<CartLineRequest>,
) -> Result<Json<Value>> {
    CartService::new(state.pool())
        .reduce(user.id, body.product_id)
        .await?;
    Ok(Json(json!({ "msg": "quantity reduced successfully" })))
}

/// `POST /cart/remove`
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    JsonBody(body): JsonBody<CartLineRequest>,
) -> Result<Json<Value>> {
    CartService::new(state.pool())
        .remove(user.id, body.product_id)
        .await?;
    Ok(Json(json!({ "msg": "item removed successfully" })))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::CartItem;
    use chrono::Utc;
    use ecomstore_core::{CartId, CartStatus, UserId};

    #[test]
    fn test_cart_response_shape() {
        let cart = Cart {
            id: CartId::new(),
            user_id: UserId::new(),
            status: CartStatus::Active,
            items: vec![CartItem {
                product_id: ProductId::new(),
                product_name: "Linen Notebook".to_string(),
                price: "4.50".parse().unwrap(),
                quantity: 3,
                stock: 10,
                is_active: true,
            }],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(CartResponse::from(cart)).unwrap();
        assert_eq!(json["subtotal"], "13.50");
        assert_eq!(json["status"], "active");
        assert_eq!(json["items"][0]["productName"], "Linen Notebook");
        assert_eq!(json["items"][0]["price"], "4.50");
        assert!(json["items"][0].get("stock").is_none());
        assert!(json.get("userId").is_some());
    }

    #[test]
    fn test_add_request_defaults_quantity() {
        let body: AddToCartRequest = serde_json::from_str(&format!(
            r#"{{"productId":"{}"}}"#,
            ProductId::new()
        ))
        .unwrap();
        assert_eq!(body.quantity, 1);
    }
}
