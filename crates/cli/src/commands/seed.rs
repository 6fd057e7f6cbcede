//! Seed the catalog from a YAML file.
//!
//! The file is parsed and validated before any connection is opened.
//! Categories are upserted by name, products by SKU, so the command can be
//! rerun after editing the file.
//!
//! ```yaml
//! categories:
//!   - name: Stationery
//!     description: Paper goods
//! products:
//!   - name: Linen Notebook
//!     sku: NB-LINEN-A5
//!     price: "12.50"
//!     stock: 40
//!     category: Stationery
//!     specifications:
//!       pages: 192
//! ```

use std::collections::{HashMap, HashSet};
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{error, info};

use ecomstore_core::CategoryId;
use ecomstore_server::db::{CategoryRepository, ProductRepository};
use ecomstore_server::models::NewProduct;

use super::CliError;

/// Top-level catalog file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogFile {
    #[serde(default)]
    pub categories: Vec<CategoryEntry>,
    #[serde(default)]
    pub products: Vec<ProductEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryEntry {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProductEntry {
    pub name: String,
    pub sku: String,
    pub price: Decimal,
    #[serde(default)]
    pub stock: i32,
    pub description: Option<String>,
    pub brand: Option<String>,
    /// Category name; must be listed under `categories`.
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub specifications: Option<serde_json::Value>,
    pub variants: Option<serde_json::Value>,
    #[serde(default = "default_active")]
    pub active: bool,
}

const fn default_active() -> bool {
    true
}

impl ProductEntry {
    fn to_new_product(&self, category_id: Option<CategoryId>) -> NewProduct {
        NewProduct {
            name: self.name.clone(),
            description: self.description.clone(),
            price: self.price,
            brand: self.brand.clone(),
            sku: self.sku.clone(),
            stock: self.stock,
            category_id,
            image_url: self.image_url.clone(),
            thumbnail_url: self.thumbnail_url.clone(),
            specifications: self.specifications.clone(),
            variants: self.variants.clone(),
            is_active: self.active,
        }
    }
}

/// Check the catalog for problems the database would reject or silently
/// accept wrongly. Returns one message per problem.
#[must_use]
pub fn validate_catalog(catalog: &CatalogFile) -> Vec<String> {
    let mut errors = Vec::new();

    let mut category_names = HashSet::new();
    for category in &catalog.categories {
        if category.name.trim().is_empty() {
            errors.push("category with empty name".to_string());
        } else if !category_names.insert(category.name.as_str()) {
            errors.push(format!("duplicate category '{}'", category.name));
        }
    }

    let mut skus = HashSet::new();
    for product in &catalog.products {
        let label = if product.sku.is_empty() {
            product.name.as_str()
        } else {
            product.sku.as_str()
        };

        if product.sku.trim().is_empty() {
            errors.push(format!("product '{}' has no sku", product.name));
        } else if !skus.insert(product.sku.as_str()) {
            errors.push(format!("duplicate sku '{}'", product.sku));
        }
        if product.name.trim().is_empty() {
            errors.push(format!("{label}: empty name"));
        }
        if product.price.is_sign_negative() {
            errors.push(format!("{label}: negative price"));
        }
        if product.stock < 0 {
            errors.push(format!("{label}: negative stock"));
        }
        if let Some(category) = &product.category
            && !category_names.contains(category.as_str())
        {
            errors.push(format!("{label}: unknown category '{category}'"));
        }
    }

    errors
}

/// Parse, validate and upsert a catalog file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, fails validation,
/// or a database write fails.
pub async fn catalog(path: &Path) -> Result<(), CliError> {
    info!(path = %path.display(), "Loading catalog from file");

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CliError::Io {
            path: path.display().to_string(),
            source,
        })?;
    let catalog: CatalogFile = serde_yaml::from_str(&content)?;

    info!(
        categories = catalog.categories.len(),
        products = catalog.products.len(),
        "Parsed catalog"
    );

    let errors = validate_catalog(&catalog);
    if !errors.is_empty() {
        error!("Catalog validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(CliError::InvalidCatalog(errors.len()));
    }

    let pool = super::connect().await?;

    let categories = CategoryRepository::new(&pool);
    let mut category_ids = HashMap::new();
    for entry in &catalog.categories {
        let category = categories
            .upsert(&entry.name, entry.description.as_deref())
            .await?;
        category_ids.insert(entry.name.as_str(), category.id);
    }

    let products = ProductRepository::new(&pool);
    for entry in &catalog.products {
        let category_id = entry
            .category
            .as_deref()
            .and_then(|name| category_ids.get(name).copied());
        products
            .upsert_by_sku(&entry.to_new_product(category_id))
            .await?;
    }

    info!("Seeding complete!");
    info!("  Categories upserted: {}", category_ids.len());
    info!("  Products upserted: {}", catalog.products.len());
    Ok(())
}
