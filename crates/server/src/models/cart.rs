//! Shopping cart domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use ecomstore_core::{CartId, CartStatus, ProductId, UserId};

/// A user's cart with its lines resolved against the catalog.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    pub status: CartStatus,
    pub items: Vec<CartItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One cart line, joined with the product's current name and price.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub price: Decimal,
    pub quantity: i32,
    /// Stock on hand, used for checkout validation only.
    #[serde(skip)]
    pub stock: i32,
    /// Inactive products stay visible in the cart but cannot be bought.
    #[serde(skip)]
    pub is_active: bool,
}

impl Cart {
    /// Sum of price times quantity over every line.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.items
            .iter()
            .map(|item| item.price * Decimal::from(item.quantity))
            .sum()
    }

    /// Whether the cart has nothing purchasable in it.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.iter().all(|item| item.quantity <= 0)
    }
}
