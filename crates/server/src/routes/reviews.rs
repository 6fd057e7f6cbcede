//! Review route handlers, nested under `/products/{id}/reviews`.

use axum::{Json, extract::State, http::StatusCode};
use serde_json::{Value, json};

use crate::error::Result;
use crate::middleware::{ExistingProduct, JsonBody, RequireAuth};
use crate::models::{ProductReview, Review};
use crate::services::ReviewService;
use crate::services::reviews::ReviewInput;
use crate::state::AppState;

/// `GET /products/{id}/reviews`
pub async fn index(
    State(state): State<AppState>,
    ExistingProduct(product_id): ExistingProduct,
) -> Result<Json<Vec<ProductReview>>> {
    Ok(Json(
        ReviewService::new(state.pool())
            .list_for_product(product_id)
            .await?,
    ))
}

/// `POST /products/{id}/reviews`
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ExistingProduct(product_id): ExistingProduct,
    JsonBody(input): JsonBody<ReviewInput>,
) -> Result<(StatusCode, Json<Review>)> {
    let review = ReviewService::new(state.pool())
        .add(user.id, product_id, &input)
        .await?;
    Ok((StatusCode::CREATED, Json(review)))
}

/// `GET /products/{id}/reviews/me`
pub async fn mine(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ExistingProduct(product_id): ExistingProduct,
) -> Result<Json<Review>> {
    Ok(Json(
        ReviewService::new(state.pool())
            .get_own(user.id, product_id)
            .await?,
    ))
}

/// `PUT /products/{id}/reviews`
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ExistingProduct(product_id): ExistingProduct,
    JsonBody(input): JsonBody<ReviewInput>,
) -> Result<Json<Review>> {
    Ok(Json(
        ReviewService::new(state.pool())
            .update(user.id, product_id, &input)
            .await?,
    ))
}

/// `DELETE /products/{id}/reviews`
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ExistingProduct(product_id): ExistingProduct,
) -> Result<Json<Value>> {
    ReviewService::new(state.pool())
        .delete(user.id, product_id)
        .await?;
    Ok(Json(json!({ "msg": "review deleted successfully" })))
}
