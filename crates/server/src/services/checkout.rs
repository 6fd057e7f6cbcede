//! Checkout and order service.
//!
//! # Flow
//!
//! 1. Build an [`OrderDraft`] from a single product or the active cart
//! 2. Persist it as `CREATED` (one transaction)
//! 3. Open the order at the payment processor, record its ID and move to
//!    `PAYER_ACTION_REQUIRED`
//! 4. The buyer approves at the processor and returns with `?token=<id>`
//! 5. Capture, then in one transaction mark `COMPLETED`, decrement stock and
//!    delete the source cart
//!
//! Nothing here retries. A processor failure leaves the local order where it
//! was.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use ecomstore_core::{OrderId, OrderStatus, ProductId, UserId};

use crate::db::{CartRepository, OrderRepository, ProductRepository, RepositoryError};
use crate::models::{Cart, Order, OrderDraft};
use crate::paypal::{PayPalError, PaymentProcessor};

/// Errors from checkout and order lookups.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("not enough stock")]
    NotEnoughStock,

    #[error("cart is empty")]
    CartEmpty,

    #[error("product not found")]
    ProductNotFound,

    #[error("order not found")]
    OrderNotFound,

    #[error("order has already been completed")]
    AlreadyCompleted,

    #[error("order has been cancelled")]
    OrderCancelled,

    #[error("order is not awaiting payment")]
    NotAwaitingPayment,

    #[error("missing payment token")]
    MissingToken,

    #[error("payment processor error: {0}")]
    Processor(#[from] PayPalError),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Returned once an order is open at the processor.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub order_id: OrderId,
    pub processor_order_id: String,
    pub status: OrderStatus,
    /// Where the client should send the buyer.
    pub approve_link: String,
}

/// Quantities below one are bumped to one.
#[must_use]
pub const fn checkout_quantity(quantity: i32) -> i32 {
    if quantity < 1 { 1 } else { quantity }
}

/// Check every non-empty cart line against the current catalog.
///
/// # Errors
///
/// Returns `CheckoutError::CartEmpty` if no line has a positive quantity,
/// `CheckoutError::ProductNotFound` if a line's product is no longer for sale
/// and `CheckoutError::NotEnoughStock` if any line asks for more than is on hand.
pub fn check_cart(cart: &Cart) -> Result<(), CheckoutError> {
    if cart.is_empty() {
        return Err(CheckoutError::CartEmpty);
    }
    let lines = || cart.items.iter().filter(|item| item.quantity > 0);
    if lines().any(|item| !item.is_active) {
        return Err(CheckoutError::ProductNotFound);
    }
    if lines().any(|item| item.quantity > item.stock) {
        return Err(CheckoutError::NotEnoughStock);
    }
    Ok(())
}

/// Only an order the buyer was sent to approve can be captured.
///
/// # Errors
///
/// Returns `CheckoutError::AlreadyCompleted` or `CheckoutError::OrderCancelled`
/// for a finished order and `CheckoutError::NotAwaitingPayment` for one that
/// never reached the processor.
pub fn ensure_capturable(status: OrderStatus) -> Result<(), CheckoutError> {
    match status {
        OrderStatus::Completed => Err(CheckoutError::AlreadyCompleted),
        OrderStatus::Cancelled => Err(CheckoutError::OrderCancelled),
        s if s.can_transition_to(OrderStatus::Completed) => Ok(()),
        _ => Err(CheckoutError::NotAwaitingPayment),
    }
}

/// Checkout service.
pub struct CheckoutService<'a> {
    products: ProductRepository<'a>,
    carts: CartRepository<'a>,
    orders: OrderRepository<'a>,
    payments: &'a dyn PaymentProcessor,
    shipping_price: Decimal,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(
        pool: &'a PgPool,
        payments: &'a dyn PaymentProcessor,
        shipping_price: Decimal,
    ) -> Self {
        Self {
            products: ProductRepository::new(pool),
            carts: CartRepository::new(pool),
            orders: OrderRepository::new(pool),
            payments,
            shipping_price,
        }
    }

    /// Buy a single product directly.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::ProductNotFound` for an unknown or inactive
    /// product, `CheckoutError::NotEnoughStock` if the quantity exceeds stock,
    /// and `CheckoutError::Processor` if the processor rejects the order.
    #[instrument(skip(self))]
    pub async fn checkout_product(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<CheckoutResponse, CheckoutError> {
        let quantity = checkout_quantity(quantity);

        let product = self
            .products
            .get_by_id(product_id)
            .await?
            .filter(|p| p.is_active)
            .ok_or(CheckoutError::ProductNotFound)?;

        if !product.has_stock_for(quantity) {
            return Err(CheckoutError::NotEnoughStock);
        }

        let draft = OrderDraft::for_product(user_id, &product, quantity, self.shipping_price);
        self.open(&draft).await
    }

    /// Buy everything in the user's active cart.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::CartEmpty`, `CheckoutError::ProductNotFound` for
    /// a line that is no longer sold, `CheckoutError::NotEnoughStock`, or
    /// `CheckoutError::Processor` if the processor rejects the order.
    #[instrument(skip(self))]
    pub async fn checkout_cart(&self, user_id: UserId) -> Result<CheckoutResponse, CheckoutError> {
        let cart = self.carts.get_active_with_items(user_id).await?;
        check_cart(&cart)?;

        let draft = OrderDraft::for_cart(&cart, self.shipping_price);
        self.open(&draft).await
    }

    /// Persist a draft and open it at the processor.
    async fn open(&self, draft: &OrderDraft) -> Result<CheckoutResponse, CheckoutError> {
        let order = self.orders.create(draft).await?;

        let processor_order = self
            .payments
            .create_order(order.id, draft)
            .await
            .inspect_err(|e| {
                tracing::error!(order_id = %order.id, error = %e, "Failed to create processor order");
            })?;

        let approve_link = processor_order
            .approve_link
            .ok_or(PayPalError::MissingApproveLink)?;

        let status = OrderStatus::PayerActionRequired;
        self.orders
            .set_processor_order(order.id, &processor_order.id, status)
            .await?;

        tracing::info!(
            order_id = %order.id,
            processor_order_id = %processor_order.id,
            total = %draft.order_total(),
            "Order awaiting buyer approval"
        );

        Ok(CheckoutResponse {
            order_id: order.id,
            processor_order_id: processor_order.id,
            status,
            approve_link,
        })
    }

    /// Find the caller's order for a processor token.
    async fn owned_by_token(&self, user_id: UserId, token: &str) -> Result<Order, CheckoutError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(CheckoutError::MissingToken);
        }

        self.orders
            .get_by_processor_id(token)
            .await?
            .filter(|order| order.user_id == user_id)
            .ok_or(CheckoutError::OrderNotFound)
    }

    /// Capture an approved order.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::MissingToken` for a blank token,
    /// `CheckoutError::OrderNotFound` if the caller has no such order,
    /// `CheckoutError::AlreadyCompleted` for a completed order,
    /// `CheckoutError::NotAwaitingPayment` for one not yet opened at the
    /// processor, and `CheckoutError::Processor` if the capture fails.
    #[instrument(skip(self))]
    pub async fn capture(&self, user_id: UserId, token: &str) -> Result<OrderId, CheckoutError> {
        let order = self.owned_by_token(user_id, token).await?;
        ensure_capturable(order.status)?;
        let token = token.trim();

        let capture = self.payments.capture_order(token).await.inspect_err(|e| {
            tracing::error!(order_id = %order.id, error = %e, "Failed to capture processor order");
        })?;

        let completed = self
            .orders
            .complete(
                token,
                capture.payer_email.as_deref(),
                capture.payer_id.as_deref(),
            )
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => CheckoutError::AlreadyCompleted,
                RepositoryError::NotFound => CheckoutError::OrderNotFound,
                other => CheckoutError::Repository(other),
            })?;

        for shortfall in &completed.shortfalls {
            tracing::warn!(
                order_id = %order.id,
                product_id = %shortfall.product_id,
                requested = shortfall.requested,
                available = shortfall.available,
                "Stock ran short at capture"
            );
        }

        tracing::info!(order_id = %order.id, status = %capture.status, "Order completed");
        Ok(completed.order.id)
    }

    /// Cancel an order the buyer abandoned at the processor.
    ///
    /// Cancelling an already cancelled order succeeds.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::OrderNotFound` if the caller has no such order
    /// and `CheckoutError::AlreadyCompleted` if it was paid.
    #[instrument(skip(self))]
    pub async fn cancel(&self, user_id: UserId, token: &str) -> Result<OrderId, CheckoutError> {
        let order = self.owned_by_token(user_id, token).await?;
        match order.status {
            OrderStatus::Completed => Err(CheckoutError::AlreadyCompleted),
            OrderStatus::Cancelled => Ok(order.id),
            OrderStatus::Created | OrderStatus::PayerActionRequired => {
                let id = self.orders.cancel(token.trim()).await.map_err(|e| match e {
                    RepositoryError::Conflict(_) => CheckoutError::AlreadyCompleted,
                    RepositoryError::NotFound => CheckoutError::OrderNotFound,
                    other => CheckoutError::Repository(other),
                })?;
                tracing::info!(order_id = %id, "Order cancelled");
                Ok(id)
            }
        }
    }

    /// The caller's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Repository` if the query fails.
    pub async fn list_orders(&self, user_id: UserId) -> Result<Vec<Order>, CheckoutError> {
        Ok(self.orders.list_for_user(user_id).await?)
    }

    /// One of the caller's orders.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::OrderNotFound` if it does not exist or belongs
    /// to someone else.
    pub async fn get_order(&self, user_id: UserId, id: OrderId) -> Result<Order, CheckoutError> {
        self.orders
            .get_with_items(id)
            .await?
            .filter(|order| order.user_id == user_id)
            .ok_or(CheckoutError::OrderNotFound)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::db::fixtures;
    use crate::models::CartItem;
    use crate::paypal::fake::FakeProcessor;
    use crate::services::CartService;
    use chrono::Utc;
    use ecomstore_core::{CartId, CartStatus};

    fn cart(lines: &[(i32, i32)]) -> Cart {
        Cart {
            id: CartId::new(),
            user_id: UserId::new(),
            status: CartStatus::Active,
            items: lines
                .iter()
                .map(|&(quantity, stock)| CartItem {
                    product_id: ProductId::new(),
                    product_name: "Cedar Pencil Tray".to_string(),
                    price: Decimal::new(1250, 2),
                    quantity,
                    stock,
                    is_active: true,
                })
                .collect(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_checkout_quantity() {
        assert_eq!(checkout_quantity(-2), 1);
        assert_eq!(checkout_quantity(0), 1);
        assert_eq!(checkout_quantity(3), 3);
    }

    #[test]
    fn test_check_cart_empty() {
        assert!(matches!(check_cart(&cart(&[])), Err(CheckoutError::CartEmpty)));
        assert!(matches!(
            check_cart(&cart(&[(0, 5), (0, 1)])),
            Err(CheckoutError::CartEmpty)
        ));
    }

    #[test]
    fn test_check_cart_stock() {
        assert!(check_cart(&cart(&[(2, 2), (1, 10)])).is_ok());
        assert!(matches!(
            check_cart(&cart(&[(2, 2), (3, 2)])),
            Err(CheckoutError::NotEnoughStock)
        ));
        // Zero-quantity lines are ignored even when out of stock
        assert!(check_cart(&cart(&[(1, 1), (0, 0)])).is_ok());
    }

    #[test]
    fn test_check_cart_inactive_product() {
        let mut retired = cart(&[(1, 5), (2, 5)]);
        retired.items[1].is_active = false;
        assert!(matches!(
            check_cart(&retired),
            Err(CheckoutError::ProductNotFound)
        ));

        // A retired product left at zero quantity does not block checkout
        retired.items[1].quantity = 0;
        assert!(check_cart(&retired).is_ok());
    }

    #[test]
    fn test_ensure_capturable() {
        assert!(ensure_capturable(OrderStatus::PayerActionRequired).is_ok());
        assert!(matches!(
            ensure_capturable(OrderStatus::Created),
            Err(CheckoutError::NotAwaitingPayment)
        ));
        assert!(matches!(
            ensure_capturable(OrderStatus::Completed),
            Err(CheckoutError::AlreadyCompleted)
        ));
        assert!(matches!(
            ensure_capturable(OrderStatus::Cancelled),
            Err(CheckoutError::OrderCancelled)
        ));
    }

    #[tokio::test]
    async fn test_blank_token_is_rejected_before_lookup() {
        // Never connects: the token check comes first
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost:1/ecomstore_test")
            .unwrap();
        let payments = FakeProcessor::default();
        let checkout = CheckoutService::new(&pool, &payments, Decimal::ZERO);

        assert!(matches!(
            checkout.capture(UserId::new(), "  ").await,
            Err(CheckoutError::MissingToken)
        ));
        assert!(matches!(
            checkout.cancel(UserId::new(), "").await,
            Err(CheckoutError::MissingToken)
        ));
    }

    #[test]
    fn test_checkout_response_json() {
        let response = CheckoutResponse {
            order_id: OrderId::new(),
            processor_order_id: "5O190127TN364715T".to_string(),
            status: OrderStatus::PayerActionRequired,
            approve_link: "https://www.sandbox.paypal.com/checkoutnow?token=5O190127TN364715T"
                .to_string(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["processorOrderId"], "5O190127TN364715T");
        assert_eq!(json["status"], "PAYER_ACTION_REQUIRED");
        assert!(json["approveLink"].as_str().unwrap().contains("token="));
    }

    async fn stock_of(pool: &PgPool, id: ProductId) -> i32 {
        ProductRepository::new(pool)
            .get_by_id(id)
            .await
            .unwrap()
            .unwrap()
            .stock
    }

    #[sqlx::test(migrator = "crate::db::MIGRATOR")]
    #[ignore = "requires PostgreSQL (DATABASE_URL)"]
    async fn test_cart_checkout_capture_and_replay(pool: PgPool) {
        let buyer = fixtures::user(&pool, "buyer").await;
        let product = fixtures::product(&pool, "CAP-01", 5).await;
        CartService::new(&pool)
            .add(buyer.id, product.id, 2)
            .await
            .unwrap();

        let payments = FakeProcessor::default();
        let checkout = CheckoutService::new(&pool, &payments, Decimal::new(450, 2));

        let opened = checkout.checkout_cart(buyer.id).await.unwrap();
        assert_eq!(opened.status, OrderStatus::PayerActionRequired);
        assert!(opened.approve_link.contains(&opened.processor_order_id));

        let token = opened.processor_order_id.as_str();
        let order_id = checkout.capture(buyer.id, token).await.unwrap();
        assert_eq!(order_id, opened.order_id);

        let order = checkout.get_order(buyer.id, order_id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Completed);
        assert_eq!(order.payment_email.as_deref(), Some("buyer@example.com"));
        assert_eq!(order.order_total, Decimal::new(2950, 2));
        assert_eq!(stock_of(&pool, product.id).await, 3);

        // The paid cart is gone; the buyer starts over with an empty one
        let cart = CartService::new(&pool).get_cart(buyer.id).await.unwrap();
        assert!(cart.items.is_empty());

        assert!(matches!(
            checkout.capture(buyer.id, token).await,
            Err(CheckoutError::AlreadyCompleted)
        ));
        assert!(matches!(
            checkout.cancel(buyer.id, token).await,
            Err(CheckoutError::AlreadyCompleted)
        ));
        assert_eq!(stock_of(&pool, product.id).await, 3);
    }

    #[sqlx::test(migrator = "crate::db::MIGRATOR")]
    #[ignore = "requires PostgreSQL (DATABASE_URL)"]
    async fn test_capture_floors_stock_at_zero(pool: PgPool) {
        let buyer = fixtures::user(&pool, "lastunit").await;
        let product = fixtures::product(&pool, "LAST-01", 2).await;
        let payments = FakeProcessor::default();
        let checkout = CheckoutService::new(&pool, &payments, Decimal::ZERO);

        let opened = checkout
            .checkout_product(buyer.id, product.id, 2)
            .await
            .unwrap();

        // Stock sold elsewhere between approval and capture
        ProductRepository::new(&pool)
            .upsert_by_sku(&fixtures::new_product("LAST-01", 1))
            .await
            .unwrap();

        checkout
            .capture(buyer.id, &opened.processor_order_id)
            .await
            .unwrap();
        assert_eq!(stock_of(&pool, product.id).await, 0);
    }

    #[sqlx::test(migrator = "crate::db::MIGRATOR")]
    #[ignore = "requires PostgreSQL (DATABASE_URL)"]
    async fn test_orders_are_private_to_their_buyer(pool: PgPool) {
        let buyer = fixtures::user(&pool, "owner").await;
        let stranger = fixtures::user(&pool, "stranger").await;
        let product = fixtures::product(&pool, "OWN-01", 5).await;
        let payments = FakeProcessor::default();
        let checkout = CheckoutService::new(&pool, &payments, Decimal::ZERO);

        let opened = checkout
            .checkout_product(buyer.id, product.id, 1)
            .await
            .unwrap();
        let token = opened.processor_order_id.as_str();

        assert!(matches!(
            checkout.capture(stranger.id, token).await,
            Err(CheckoutError::OrderNotFound)
        ));
        assert!(matches!(
            checkout.cancel(stranger.id, token).await,
            Err(CheckoutError::OrderNotFound)
        ));
        assert!(matches!(
            checkout.get_order(stranger.id, opened.order_id).await,
            Err(CheckoutError::OrderNotFound)
        ));
        assert!(matches!(
            checkout.capture(buyer.id, "FAKE-unknown").await,
            Err(CheckoutError::OrderNotFound)
        ));

        // Cancelling twice is fine; capturing a cancelled order is not
        checkout.cancel(buyer.id, token).await.unwrap();
        checkout.cancel(buyer.id, token).await.unwrap();
        assert!(matches!(
            checkout.capture(buyer.id, token).await,
            Err(CheckoutError::OrderCancelled)
        ));
        assert_eq!(stock_of(&pool, product.id).await, 5);
    }

    #[sqlx::test(migrator = "crate::db::MIGRATOR")]
    #[ignore = "requires PostgreSQL (DATABASE_URL)"]
    async fn test_processor_failure_on_create_leaves_order_created(pool: PgPool) {
        let buyer = fixtures::user(&pool, "declined").await;
        let product = fixtures::product(&pool, "DEC-01", 5).await;
        let payments = FakeProcessor {
            fail_create: true,
            ..FakeProcessor::default()
        };
        let checkout = CheckoutService::new(&pool, &payments, Decimal::ZERO);

        let err = checkout
            .checkout_product(buyer.id, product.id, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Processor(_)));
        assert_eq!(
            crate::error::AppError::from(err).status(),
            axum::http::StatusCode::BAD_GATEWAY
        );

        let orders = checkout.list_orders(buyer.id).await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].status, OrderStatus::Created);
        assert!(orders[0].processor_order_id.is_none());
        assert_eq!(stock_of(&pool, product.id).await, 5);
    }

    #[sqlx::test(migrator = "crate::db::MIGRATOR")]
    #[ignore = "requires PostgreSQL (DATABASE_URL)"]
    async fn test_processor_failure_on_capture_keeps_order_open(pool: PgPool) {
        let buyer = fixtures::user(&pool, "unapproved").await;
        let product = fixtures::product(&pool, "UNA-01", 5).await;
        let payments = FakeProcessor {
            fail_capture: true,
            ..FakeProcessor::default()
        };
        let checkout = CheckoutService::new(&pool, &payments, Decimal::ZERO);

        let opened = checkout
            .checkout_product(buyer.id, product.id, 1)
            .await
            .unwrap();
        assert!(matches!(
            checkout.capture(buyer.id, &opened.processor_order_id).await,
            Err(CheckoutError::Processor(_))
        ));

        let order = checkout.get_order(buyer.id, opened.order_id).await.unwrap();
        assert_eq!(order.status, OrderStatus::PayerActionRequired);
        assert_eq!(stock_of(&pool, product.id).await, 5);
    }

    #[sqlx::test(migrator = "crate::db::MIGRATOR")]
    #[ignore = "requires PostgreSQL (DATABASE_URL)"]
    async fn test_cart_with_retired_product_cannot_check_out(pool: PgPool) {
        let buyer = fixtures::user(&pool, "retiredcart").await;
        let product = fixtures::product(&pool, "RET-02", 5).await;
        CartService::new(&pool)
            .add(buyer.id, product.id, 1)
            .await
            .unwrap();

        let mut retired = fixtures::new_product("RET-02", 5);
        retired.is_active = false;
        ProductRepository::new(&pool)
            .upsert_by_sku(&retired)
            .await
            .unwrap();

        let payments = FakeProcessor::default();
        let checkout = CheckoutService::new(&pool, &payments, Decimal::ZERO);
        assert!(matches!(
            checkout.checkout_cart(buyer.id).await,
            Err(CheckoutError::ProductNotFound)
        ));
        assert!(checkout.list_orders(buyer.id).await.unwrap().is_empty());
    }
}
