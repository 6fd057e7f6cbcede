//! Catalog route handlers.

use axum::{
    Json,
    extract::{Path, State},
};

use ecomstore_core::{CategoryId, ProductId};

use crate::error::{AppError, Result};
use crate::models::{Category, Product};
use crate::services::CatalogService;
use crate::state::AppState;

fn parse_id<T: std::str::FromStr>(raw: &str, what: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid {what} ID")))
}

/// `GET /products`
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    Ok(Json(CatalogService::new(state.pool()).list_products().await?))
}

/// `GET /products/{id}`
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Product>> {
    let id: ProductId = parse_id(&id, "product")?;
    Ok(Json(CatalogService::new(state.pool()).get_product(id).await?))
}

/// `GET /products/categories`
pub async fn categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(
        CatalogService::new(state.pool()).list_categories().await?,
    ))
}

/// `GET /products/categories/{id}`
pub async fn category_products(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Product>>> {
    let id: CategoryId = parse_id(&id, "category")?;
    Ok(Json(
        CatalogService::new(state.pool())
            .products_in_category(id)
            .await?,
    ))
}
