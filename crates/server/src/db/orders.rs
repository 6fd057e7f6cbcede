//! Order repository.
//!
//! Orders are written in two steps around the payment processor: `create`
//! stores the order and its lines in one transaction, and `complete` records
//! the capture, decrements stock and deletes the source cart in another.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::instrument;

use ecomstore_core::{
    CartId, CurrencyCode, OrderId, OrderItemId, OrderStatus, PaymentMethod, ProductId, UserId,
};

use super::RepositoryError;
use crate::models::{Order, OrderDraft, OrderItem};

const ORDER_COLUMNS: &str = "id, user_id, cart_id, product_total, shipping_price, order_total, \
     currency, status, payment_method, processor_order_id, payment_email, payer_id, \
     created_at, updated_at";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    cart_id: Option<CartId>,
    product_total: Decimal,
    shipping_price: Decimal,
    order_total: Decimal,
    currency: String,
    status: OrderStatus,
    payment_method: String,
    processor_order_id: Option<String>,
    payment_email: Option<String>,
    payer_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Result<Order, RepositoryError> {
        let currency = self.currency.parse::<CurrencyCode>().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid currency in database: {e}"))
        })?;
        let payment_method = self.payment_method.parse::<PaymentMethod>().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid payment method in database: {e}"))
        })?;

        Ok(Order {
            id: self.id,
            user_id: self.user_id,
            cart_id: self.cart_id,
            product_total: self.product_total,
            shipping_price: self.shipping_price,
            order_total: self.order_total,
            currency,
            status: self.status,
            payment_method,
            processor_order_id: self.processor_order_id,
            payment_email: self.payment_email,
            payer_id: self.payer_id,
            items,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: OrderItemId,
    order_id: OrderId,
    product_id: ProductId,
    name: String,
    unit_price: Decimal,
    quantity: i32,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        Self {
            id: row.id,
            product_id: row.product_id,
            name: row.name,
            unit_price: row.unit_price,
            quantity: row.quantity,
        }
    }
}

/// A product whose stock could not cover a completed order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockShortfall {
    pub product_id: ProductId,
    pub requested: i32,
    pub available: i32,
}

/// Result of recording a capture.
#[derive(Debug, Clone)]
pub struct CompletedOrder {
    pub order: Order,
    /// Lines that sold more units than were on hand. Stock was floored at zero.
    pub shortfalls: Vec<StockShortfall>,
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Persist a draft as a `CREATED` order with all of its lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any insert fails; nothing is
    /// written in that case.
    #[instrument(skip(self, draft), fields(user_id = %draft.user_id, lines = draft.lines.len()))]
    pub async fn create(&self, draft: &OrderDraft) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            INSERT INTO orders (
                id, user_id, cart_id, product_total, shipping_price, order_total,
                currency, status, payment_method
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'CREATED', $8)
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(OrderId::new())
        .bind(draft.user_id)
        .bind(draft.cart_id)
        .bind(draft.product_total().amount)
        .bind(draft.shipping_price.amount)
        .bind(draft.order_total().amount)
        .bind(draft.currency().as_str())
        .bind(draft.payment_method.as_str())
        .fetch_one(&mut *tx)
        .await?;

        let mut items = Vec::with_capacity(draft.lines.len());
        for line in &draft.lines {
            let item = sqlx::query_as::<_, OrderItemRow>(
                r"
                INSERT INTO order_items (id, order_id, product_id, name, unit_price, quantity)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING id, order_id, product_id, name, unit_price, quantity
                ",
            )
            .bind(OrderItemId::new())
            .bind(row.id)
            .bind(line.product_id)
            .bind(&line.name)
            .bind(line.unit_price.amount)
            .bind(line.quantity)
            .fetch_one(&mut *tx)
            .await?;
            items.push(OrderItem::from(item));
        }

        tx.commit().await?;
        row.into_order(items)
    }

    /// Record the processor's order ID and the status it reported.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    /// Returns `RepositoryError::Conflict` if the processor ID is already taken.
    #[instrument(skip(self))]
    pub async fn set_processor_order(
        &self,
        id: OrderId,
        processor_order_id: &str,
        status: OrderStatus,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE orders
            SET processor_order_id = $2, status = $3, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(processor_order_id)
        .bind(status)
        .execute(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "processor order id already recorded"))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Get an order with its lines by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    #[instrument(skip(self))]
    pub async fn get_with_items(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(row) => {
                let items = self.items_for(&[row.id]).await?.remove(&row.id);
                row.into_order(items.unwrap_or_default()).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Get an order with its lines by the payment processor's order ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    #[instrument(skip(self))]
    pub async fn get_by_processor_id(
        &self,
        processor_order_id: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        let id: Option<OrderId> =
            sqlx::query_scalar("SELECT id FROM orders WHERE processor_order_id = $1")
                .bind(processor_order_id)
                .fetch_optional(self.pool)
                .await?;

        match id {
            Some(id) => self.get_with_items(id).await,
            None => Ok(None),
        }
    }

    /// All of a user's orders with their lines, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    #[instrument(skip(self))]
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        let ids: Vec<OrderId> = rows.iter().map(|r| r.id).collect();
        let mut items = self.items_for(&ids).await?;

        rows.into_iter()
            .map(|row| {
                let lines = items.remove(&row.id).unwrap_or_default();
                row.into_order(lines)
            })
            .collect()
    }

    /// Record a successful capture.
    ///
    /// In one transaction: marks the order `COMPLETED` with the payer's
    /// details, decrements stock for every line (never below zero), and
    /// deletes the cart the order was built from.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no order has this processor ID.
    /// Returns `RepositoryError::Conflict` unless the order is awaiting
    /// payment.
    #[instrument(skip(self, payer_email, payer_id))]
    pub async fn complete(
        &self,
        processor_order_id: &str,
        payer_email: Option<&str>,
        payer_id: Option<&str>,
    ) -> Result<CompletedOrder, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE processor_order_id = $1 FOR UPDATE"
        ))
        .bind(processor_order_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        if !current.status.can_transition_to(OrderStatus::Completed) {
            return Err(RepositoryError::Conflict(format!(
                "order is already {}",
                current.status
            )));
        }

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            UPDATE orders
            SET status = 'COMPLETED', payment_email = $2, payer_id = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(current.id)
        .bind(payer_email)
        .bind(payer_id)
        .fetch_one(&mut *tx)
        .await?;

        let items: Vec<OrderItem> = sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT id, order_id, product_id, name, unit_price, quantity
            FROM order_items
            WHERE order_id = $1
            ",
        )
        .bind(row.id)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .map(OrderItem::from)
        .collect();

        let mut shortfalls = Vec::new();
        for item in &items {
            let available: Option<i32> = sqlx::query_scalar(
                "SELECT stock_quantity FROM products WHERE id = $1 FOR UPDATE",
            )
            .bind(item.product_id)
            .fetch_optional(&mut *tx)
            .await?;

            let Some(available) = available else {
                shortfalls.push(StockShortfall {
                    product_id: item.product_id,
                    requested: item.quantity,
                    available: 0,
                });
                continue;
            };

            if available < item.quantity {
                shortfalls.push(StockShortfall {
                    product_id: item.product_id,
                    requested: item.quantity,
                    available,
                });
            }

            sqlx::query(
                r"
                UPDATE products
                SET stock_quantity = GREATEST(stock_quantity - $2, 0), updated_at = NOW()
                WHERE id = $1
                ",
            )
            .bind(item.product_id)
            .bind(item.quantity)
            .execute(&mut *tx)
            .await?;
        }

        if let Some(cart_id) = row.cart_id {
            sqlx::query("DELETE FROM carts WHERE id = $1")
                .bind(cart_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(CompletedOrder {
            order: row.into_order(items)?,
            shortfalls,
        })
    }

    /// Mark an open order as cancelled.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no order has this processor ID.
    /// Returns `RepositoryError::Conflict` if the order is already completed
    /// or cancelled.
    #[instrument(skip(self))]
    pub async fn cancel(&self, processor_order_id: &str) -> Result<OrderId, RepositoryError> {
        let id: Option<OrderId> = sqlx::query_scalar(
            r"
            UPDATE orders
            SET status = 'CANCELLED', updated_at = NOW()
            WHERE processor_order_id = $1 AND status IN ('CREATED', 'PAYER_ACTION_REQUIRED')
            RETURNING id
            ",
        )
        .bind(processor_order_id)
        .fetch_optional(self.pool)
        .await?;

        if let Some(id) = id {
            return Ok(id);
        }

        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM orders WHERE processor_order_id = $1)",
        )
        .bind(processor_order_id)
        .fetch_one(self.pool)
        .await?;

        if exists {
            Err(RepositoryError::Conflict("order can no longer be cancelled".to_owned()))
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    async fn items_for(
        &self,
        order_ids: &[OrderId],
    ) -> Result<HashMap<OrderId, Vec<OrderItem>>, RepositoryError> {
        if order_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let uuids: Vec<uuid::Uuid> = order_ids.iter().map(OrderId::as_uuid).collect();
        let rows = sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT id, order_id, product_id, name, unit_price, quantity
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY name
            ",
        )
        .bind(uuids)
        .fetch_all(self.pool)
        .await?;

        let mut grouped: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for row in rows {
            grouped.entry(row.order_id).or_default().push(OrderItem::from(row));
        }
        Ok(grouped)
    }
}
