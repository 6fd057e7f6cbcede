//! Order domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use ecomstore_core::{
    CartId, CurrencyCode, OrderId, OrderItemId, OrderStatus, PaymentMethod, Price, ProductId,
    UserId,
};

use super::{Cart, Product};

/// A persisted order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    /// Cart the order was built from, if any. Single-product orders have none.
    pub cart_id: Option<CartId>,
    pub product_total: Decimal,
    pub shipping_price: Decimal,
    pub order_total: Decimal,
    pub currency: CurrencyCode,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub processor_order_id: Option<String>,
    pub payment_email: Option<String>,
    pub payer_id: Option<String>,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A line of a persisted order. Name and price are captured at order time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: OrderItemId,
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
}

/// One line of an order that has not been saved yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub name: String,
    pub sku: Option<String>,
    pub description: Option<String>,
    pub unit_price: Price,
    pub quantity: i32,
}

impl OrderLine {
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.unit_price.times(self.quantity)
    }
}

/// Everything needed to persist an order and open it at the payment processor.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub user_id: UserId,
    pub cart_id: Option<CartId>,
    pub lines: Vec<OrderLine>,
    pub shipping_price: Price,
    pub payment_method: PaymentMethod,
}

impl OrderDraft {
    /// Draft for `quantity` units of a single product, outside any cart.
    #[must_use]
    pub fn for_product(
        user_id: UserId,
        product: &Product,
        quantity: i32,
        shipping_price: Decimal,
    ) -> Self {
        Self {
            user_id,
            cart_id: None,
            lines: vec![OrderLine {
                product_id: product.id,
                name: product.name.clone(),
                sku: Some(product.sku.clone()),
                description: product.description.clone(),
                unit_price: Price::usd(product.price),
                quantity,
            }],
            shipping_price: Price::usd(shipping_price),
            payment_method: PaymentMethod::Paypal,
        }
    }

    /// Draft covering every non-empty line of `cart`.
    #[must_use]
    pub fn for_cart(cart: &Cart, shipping_price: Decimal) -> Self {
        Self {
            user_id: cart.user_id,
            cart_id: Some(cart.id),
            lines: cart
                .items
                .iter()
                .filter(|item| item.quantity > 0)
                .map(|item| OrderLine {
                    product_id: item.product_id,
                    name: item.product_name.clone(),
                    sku: None,
                    description: None,
                    unit_price: Price::usd(item.price),
                    quantity: item.quantity,
                })
                .collect(),
            shipping_price: Price::usd(shipping_price),
            payment_method: PaymentMethod::Paypal,
        }
    }

    /// Currency every amount in the draft is expressed in.
    #[must_use]
    pub const fn currency(&self) -> CurrencyCode {
        self.shipping_price.currency_code
    }

    /// Sum of all line totals.
    #[must_use]
    pub fn product_total(&self) -> Price {
        self.lines.iter().map(OrderLine::line_total).sum()
    }

    /// Product total plus shipping.
    #[must_use]
    pub fn order_total(&self) -> Price {
        self.product_total() + self.shipping_price
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::CartItem;
    use crate::models::product::fixtures::product;
    use ecomstore_core::CartStatus;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_product_draft_totals() {
        let draft = OrderDraft::for_product(UserId::new(), &product("19.99", 5), 2, dec("4.50"));

        assert!(draft.cart_id.is_none());
        assert_eq!(draft.lines.len(), 1);
        assert_eq!(draft.lines[0].sku.as_deref(), Some("GW-ORG-01"));
        assert_eq!(draft.product_total().amount, dec("39.98"));
        assert_eq!(draft.order_total().amount, dec("44.48"));
        assert_eq!(draft.currency(), CurrencyCode::USD);
    }

    #[test]
    fn test_cart_draft_skips_empty_lines() {
        let line = |price: &str, quantity| CartItem {
            product_id: ProductId::new(),
            product_name: "Thing".to_string(),
            price: dec(price),
            quantity,
            stock: 100,
            is_active: true,
        };
        let cart = Cart {
            id: CartId::new(),
            user_id: UserId::new(),
            status: CartStatus::Active,
            items: vec![line("5.00", 2), line("7.00", 0), line("1.25", 4)],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let draft = OrderDraft::for_cart(&cart, Decimal::ZERO);

        assert_eq!(draft.cart_id, Some(cart.id));
        assert_eq!(draft.user_id, cart.user_id);
        assert_eq!(draft.lines.len(), 2);
        assert_eq!(draft.product_total().amount, dec("15.00"));
        assert_eq!(draft.order_total().processor_value(), "15.00");
    }
}
