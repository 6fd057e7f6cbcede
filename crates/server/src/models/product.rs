//! Catalog domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use ecomstore_core::{CategoryId, ProductId};

/// A product in the catalog.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    /// Unit price in USD.
    pub price: Decimal,
    pub brand: Option<String>,
    pub sku: String,
    /// Units on hand.
    pub stock: i32,
    pub category_id: Option<CategoryId>,
    pub image_url: Option<String>,
    pub thumbnail_url: Option<String>,
    /// Free-form specification sheet.
    pub specifications: Option<serde_json::Value>,
    /// Free-form variant list.
    pub variants: Option<serde_json::Value>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Whether `quantity` units can be sold right now.
    #[must_use]
    pub const fn has_stock_for(&self, quantity: i32) -> bool {
        self.is_active && quantity <= self.stock
    }
}

/// A product category.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
}

/// Fields for inserting or updating a product, keyed by SKU.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub brand: Option<String>,
    pub sku: String,
    pub stock: i32,
    pub category_id: Option<CategoryId>,
    pub image_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub specifications: Option<serde_json::Value>,
    pub variants: Option<serde_json::Value>,
    pub is_active: bool,
}


#[cfg(test)]
mod tests {
    use super::fixtures::product;

    #[test]
    fn test_has_stock_for() {
        let mut p = product("12.00", 3);
        assert!(p.has_stock_for(3));
        assert!(!p.has_stock_for(4));
        p.is_active = false;
        assert!(!p.has_stock_for(1));
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(product("12.50", 3)).unwrap_or_default();
        assert_eq!(json["price"], "12.50");
        assert_eq!(json["isActive"], true);
        assert!(json.get("categoryId").is_some());
    }
}
