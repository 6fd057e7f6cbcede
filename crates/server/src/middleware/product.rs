//! Product path extractor for review routes.

use axum::{
    extract::{FromRequestParts, Path},
    http::request::Parts,
};

use ecomstore_core::ProductId;

use crate::db::ProductRepository;
use crate::error::AppError;
use crate::state::AppState;

/// The `{id}` path segment, resolved to an active product.
///
/// Rejects with 400 if the segment is not a UUID and 404 if no active
/// product has that ID.
pub struct ExistingProduct(pub ProductId);

impl FromRequestParts<AppState> for ExistingProduct {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::BadRequest("Invalid product ID".to_string()))?;

        let id: ProductId = raw.parse().map_err(|_| {
            tracing::debug!(product_id = %raw, "Invalid product id");
            AppError::BadRequest("Invalid product ID".to_string())
        })?;

        if !ProductRepository::new(state.pool()).exists(id).await? {
            return Err(AppError::NotFound("Product not found".to_string()));
        }

        Ok(Self(id))
    }
}
