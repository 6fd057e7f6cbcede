//! Checkout and order route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};

use ecomstore_core::{OrderId, ProductId};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{JsonBody, RequireAuth};
use crate::models::Order;
use crate::services::CheckoutService;
use crate::services::checkout::CheckoutResponse;
use crate::state::AppState;

/// `POST /checkout/product` body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCheckoutRequest {
    pub product_id: ProductId,
    #[serde(default)]
    pub quantity: i32,
}

/// Query string the processor appends when sending the buyer back.
#[derive(Debug, Deserialize)]
pub struct ReturnQuery {
    #[serde(default)]
    pub token: String,
}

fn service(state: &AppState) -> CheckoutService<'_> {
    CheckoutService::new(
        state.pool(),
        state.payments(),
        state.config().shipping_price,
    )
}

/// `POST /checkout/product`
pub async fn product(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    JsonBody(body): JsonBody<ProductCheckoutRequest>,
) -> Result<Json<CheckoutResponse>> {
    let product_id = body.product_id.to_string();
    add_breadcrumb(
        "checkout",
        "Started product checkout",
        Some(&[("product_id", &product_id)]),
    );

    Ok(Json(
        service(&state)
            .checkout_product(user.id, body.product_id, body.quantity)
            .await?,
    ))
}

/// `POST /checkout/cart`
pub async fn cart(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CheckoutResponse>> {
    add_breadcrumb("checkout", "Started cart checkout", None);
    Ok(Json(service(&state).checkout_cart(user.id).await?))
}

/// `GET /checkout/capture?token=`
pub async fn capture(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<ReturnQuery>,
) -> Result<Json<Value>> {
    let order_id = service(&state).capture(user.id, &query.token).await?;
    Ok(Json(
        json!({ "msg": "purchase successful", "orderId": order_id }),
    ))
}

/// `GET /checkout/cancel?token=`
pub async fn cancel(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<ReturnQuery>,
) -> Result<Json<Value>> {
    let order_id = service(&state).cancel(user.id, &query.token).await?;
    Ok(Json(json!({ "msg": "order cancelled", "orderId": order_id })))
}

/// `GET /orders`
pub async fn orders(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Order>>> {
    Ok(Json(service(&state).list_orders(user.id).await?))
}

/// `GET /orders/{id}`
pub async fn order(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Result<Json<Order>> {
    let id: OrderId = id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid order ID".to_string()))?;
    Ok(Json(service(&state).get_order(user.id, id).await?))
}
