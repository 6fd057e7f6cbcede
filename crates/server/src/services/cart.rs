//! Cart service.
//!
//! Every operation works on the user's active cart, which is created on first
//! use.

use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use ecomstore_core::{ProductId, UserId};

use crate::db::{CartRepository, ProductRepository, RepositoryError};
use crate::models::Cart;

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    #[error("product not found")]
    ProductNotFound,

    #[error("product is not in the cart")]
    ItemNotInCart,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl CartError {
    fn from_missing_line(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => Self::ItemNotInCart,
            other => Self::Repository(other),
        }
    }
}

/// Negative quantities are treated as zero.
#[must_use]
pub const fn normalize_quantity(quantity: i32) -> i32 {
    if quantity < 0 { 0 } else { quantity }
}

/// Cart service.
pub struct CartService<'a> {
    carts: CartRepository<'a>,
    products: ProductRepository<'a>,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            carts: CartRepository::new(pool),
            products: ProductRepository::new(pool),
        }
    }

    /// The user's active cart with its lines.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if a query fails.
    pub async fn get_cart(&self, user_id: UserId) -> Result<Cart, CartError> {
        Ok(self.carts.get_active_with_items(user_id).await?)
    }

    /// Add units of a product to the cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ProductNotFound` if the product does not exist or
    /// is inactive.
    #[instrument(skip(self))]
    pub async fn add(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<(), CartError> {
        if !self.products.exists(product_id).await? {
            return Err(CartError::ProductNotFound);
        }

        let cart_id = self.carts.get_or_create_active(user_id).await?;
        self.carts
            .add_item(cart_id, product_id, normalize_quantity(quantity))
            .await?;

        tracing::debug!(%cart_id, "Added item to cart");
        Ok(())
    }

    /// Take one unit of a product off the cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ItemNotInCart` if the product is not in the cart.
    #[instrument(skip(self))]
    pub async fn reduce(&self, user_id: UserId, product_id: ProductId) -> Result<(), CartError> {
        let cart_id = self.carts.get_or_create_active(user_id).await?;
        self.carts
            .reduce_item(cart_id, product_id)
            .await
            .map_err(CartError::from_missing_line)
    }

    /// Remove a product from the cart entirely.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ItemNotInCart` if the product is not in the cart.
    #[instrument(skip(self))]
    pub async fn remove(&self, user_id: UserId, product_id: ProductId) -> Result<(), CartError> {
        let cart_id = self.carts.get_or_create_active(user_id).await?;
        self.carts
            .remove_item(cart_id, product_id)
            .await
            .map_err(CartError::from_missing_line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_quantity() {
        assert_eq!(normalize_quantity(-3), 0);
        assert_eq!(normalize_quantity(0), 0);
        assert_eq!(normalize_quantity(4), 4);
    }

    #[test]
    fn test_missing_line_maps_to_item_not_in_cart() {
        assert!(matches!(
            CartError::from_missing_line(RepositoryError::NotFound),
            CartError::ItemNotInCart
        ));
        assert!(matches!(
            CartError::from_missing_line(RepositoryError::Conflict("x".into())),
            CartError::Repository(_)
        ));
    }
}
