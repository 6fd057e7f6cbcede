//! Product catalog service.

use sqlx::PgPool;
use thiserror::Error;

use ecomstore_core::{CategoryId, ProductId};

use crate::db::{CategoryRepository, ProductRepository, RepositoryError};
use crate::models::{Category, Product};

/// Errors from catalog lookups.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("product not found")]
    ProductNotFound,

    #[error("category not found")]
    CategoryNotFound,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Read-only access to products and categories.
pub struct CatalogService<'a> {
    products: ProductRepository<'a>,
    categories: CategoryRepository<'a>,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            products: ProductRepository::new(pool),
            categories: CategoryRepository::new(pool),
        }
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the query fails.
    pub async fn list_products(&self) -> Result<Vec<Product>, CatalogError> {
        Ok(self.products.list_active().await?)
    }

    /// Get an active product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ProductNotFound` if there is no such active product.
    pub async fn get_product(&self, id: ProductId) -> Result<Product, CatalogError> {
        self.products
            .get_by_id(id)
            .await?
            .filter(|p| p.is_active)
            .ok_or(CatalogError::ProductNotFound)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the query fails.
    pub async fn list_categories(&self) -> Result<Vec<Category>, CatalogError> {
        Ok(self.categories.list().await?)
    }

    /// Active products in a category.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::CategoryNotFound` for an unknown category.
    pub async fn products_in_category(
        &self,
        category_id: CategoryId,
    ) -> Result<Vec<Product>, CatalogError> {
        if self.categories.get_by_id(category_id).await?.is_none() {
            return Err(CatalogError::CategoryNotFound);
        }
        Ok(self.products.list_by_category(category_id).await?)
    }
}
