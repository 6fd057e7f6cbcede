//! Rows for database-backed tests.

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;
use sqlx::PgPool;

use ecomstore_core::Email;

use super::{ProductRepository, UserRepository};
use crate::models::{NewProduct, Product, User};

/// A customer with a placeholder password hash.
pub async fn user(pool: &PgPool, local: &str) -> User {
    let email = Email::parse(&format!("{local}@example.com")).unwrap();
    UserRepository::new(pool)
        .create(&email, Some(local), "not-a-real-hash")
        .await
        .unwrap()
}

/// A catalog entry priced at 12.50.
pub fn new_product(sku: &str, stock: i32) -> NewProduct {
    NewProduct {
        name: format!("Oak Shelf {sku}"),
        description: None,
        price: Decimal::new(1250, 2),
        brand: Some("Grainworks".to_string()),
        sku: sku.to_string(),
        stock,
        category_id: None,
        image_url: None,
        thumbnail_url: None,
        specifications: None,
        variants: None,
        is_active: true,
    }
}

/// Insert an active product.
pub async fn product(pool: &PgPool, sku: &str, stock: i32) -> Product {
    ProductRepository::new(pool)
        .upsert_by_sku(&new_product(sku, stock))
        .await
        .unwrap()
}
