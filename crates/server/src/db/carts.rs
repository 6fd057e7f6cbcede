//! Cart repository.
//!
//! Each user has at most one `active` cart, enforced by a partial unique
//! index. Lines are keyed by `(cart_id, product_id)` so adding a product
//! that is already in the cart bumps its quantity instead of duplicating it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::instrument;

use ecomstore_core::{CartId, CartStatus, ProductId, UserId};

use super::RepositoryError;
use crate::models::{Cart, CartItem};

#[derive(sqlx::FromRow)]
struct CartRow {
    id: CartId,
    user_id: UserId,
    status: CartStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct CartItemRow {
    product_id: ProductId,
    product_name: String,
    price: Decimal,
    quantity: i32,
    stock_quantity: i32,
    is_active: bool,
}

impl From<CartItemRow> for CartItem {
    fn from(row: CartItemRow) -> Self {
        Self {
            product_id: row.product_id,
            product_name: row.product_name,
            price: row.price,
            quantity: row.quantity,
            stock: row.stock_quantity,
            is_active: row.is_active,
        }
    }
}

/// Repository for cart database operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get the user's active cart, creating an empty one if none exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    #[instrument(skip(self))]
    pub async fn get_or_create_active(&self, user_id: UserId) -> Result<CartId, RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO carts (id, user_id, status)
            VALUES ($1, $2, 'active')
            ON CONFLICT (user_id) WHERE status = 'active' DO NOTHING
            ",
        )
        .bind(CartId::new())
        .bind(user_id)
        .execute(self.pool)
        .await?;

        let id: CartId = sqlx::query_scalar(
            "SELECT id FROM carts WHERE user_id = $1 AND status = 'active'",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;

        Ok(id)
    }

    /// Load the user's active cart with every line resolved against the catalog.
    ///
    /// Creates the cart if the user has none.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    #[instrument(skip(self))]
    pub async fn get_active_with_items(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        let cart_id = self.get_or_create_active(user_id).await?;

        let row = sqlx::query_as::<_, CartRow>(
            "SELECT id, user_id, status, created_at, updated_at FROM carts WHERE id = $1",
        )
        .bind(cart_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let items = self.items_with_products(cart_id).await?;

        Ok(Cart {
            id: row.id,
            user_id: row.user_id,
            status: row.status,
            items,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    /// Lines of a cart joined with product name, price, stock and whether the
    /// product is still for sale.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn items_with_products(
        &self,
        cart_id: CartId,
    ) -> Result<Vec<CartItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartItemRow>(
            r"
            SELECT ci.product_id, p.name AS product_name, p.price, ci.quantity,
                   p.stock_quantity, p.is_active
            FROM cart_items ci
            JOIN products p ON p.id = ci.product_id
            WHERE ci.cart_id = $1
            ORDER BY ci.created_at, p.name
            ",
        )
        .bind(cart_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(CartItem::from).collect())
    }

    /// Add `quantity` units of a product, merging with an existing line.
    ///
    /// A merged line saturates at `i32::MAX` units.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"
            INSERT INTO cart_items (cart_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (cart_id, product_id) DO UPDATE SET
                quantity = LEAST(cart_items.quantity::bigint + EXCLUDED.quantity, 2147483647)::int,
                updated_at = NOW()
            ",
        )
        .bind(cart_id)
        .bind(product_id)
        .bind(quantity)
        .execute(&mut *tx)
        .await?;

        touch(&mut tx, cart_id).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Take one unit off a line, dropping the line when it reaches zero.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product is not in the cart.
    /// Returns `RepositoryError::Database` if a query fails.
    #[instrument(skip(self))]
    pub async fn reduce_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let remaining: Option<i32> = sqlx::query_scalar(
            r"
            UPDATE cart_items
            SET quantity = GREATEST(quantity - 1, 0), updated_at = NOW()
            WHERE cart_id = $1 AND product_id = $2
            RETURNING quantity
            ",
        )
        .bind(cart_id)
        .bind(product_id)
        .fetch_optional(&mut *tx)
        .await?;

        match remaining {
            None => return Err(RepositoryError::NotFound),
            Some(q) if q <= 0 => {
                sqlx::query("DELETE FROM cart_items WHERE cart_id = $1 AND product_id = $2")
                    .bind(cart_id)
                    .bind(product_id)
                    .execute(&mut *tx)
                    .await?;
            }
            Some(_) => {}
        }

        touch(&mut tx, cart_id).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Remove a line regardless of its quantity.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product is not in the cart.
    /// Returns `RepositoryError::Database` if a query fails.
    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1 AND product_id = $2")
            .bind(cart_id)
            .bind(product_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        touch(&mut tx, cart_id).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Mark active carts untouched since `cutoff` as abandoned.
    ///
    /// Returns the number of carts changed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn mark_stale_abandoned(&self, cutoff: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE carts
            SET status = 'abandoned', updated_at = NOW()
            WHERE status = 'active' AND updated_at < $1
            ",
        )
        .bind(cutoff)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

async fn touch(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    cart_id: CartId,
) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE carts SET updated_at = NOW() WHERE id = $1")
        .bind(cart_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::db::{ProductRepository, fixtures};

    #[sqlx::test(migrator = "crate::db::MIGRATOR")]
    #[ignore = "requires PostgreSQL (DATABASE_URL)"]
    async fn test_add_item_saturates_quantity(pool: PgPool) {
        let user = fixtures::user(&pool, "saturate").await;
        let product = fixtures::product(&pool, "SAT-01", 5).await;
        let carts = CartRepository::new(&pool);
        let cart_id = carts.get_or_create_active(user.id).await.unwrap();

        carts.add_item(cart_id, product.id, i32::MAX - 1).await.unwrap();
        carts.add_item(cart_id, product.id, 10).await.unwrap();

        let items = carts.items_with_products(cart_id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, i32::MAX);
    }

    #[sqlx::test(migrator = "crate::db::MIGRATOR")]
    #[ignore = "requires PostgreSQL (DATABASE_URL)"]
    async fn test_items_carry_product_active_flag(pool: PgPool) {
        let user = fixtures::user(&pool, "retired").await;
        let product = fixtures::product(&pool, "RET-01", 5).await;
        let carts = CartRepository::new(&pool);
        let cart_id = carts.get_or_create_active(user.id).await.unwrap();
        carts.add_item(cart_id, product.id, 2).await.unwrap();

        assert!(carts.items_with_products(cart_id).await.unwrap()[0].is_active);

        let mut retired = fixtures::new_product("RET-01", 5);
        retired.is_active = false;
        ProductRepository::new(&pool)
            .upsert_by_sku(&retired)
            .await
            .unwrap();

        let items = carts.items_with_products(cart_id).await.unwrap();
        assert!(!items[0].is_active);
        assert_eq!(items[0].quantity, 2);
    }
}
