//! Status enums for carts and orders.

use serde::{Deserialize, Serialize};

/// Lifecycle of an order.
///
/// Orders start as `Created` when persisted locally, move to
/// `PayerActionRequired` once the payment processor has issued an approval
/// link, and finish as `Completed` after capture. A buyer who backs out at
/// the processor moves the order to `Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Created,
    PayerActionRequired,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Whether moving from `self` to `next` is a legal step.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Created, Self::PayerActionRequired | Self::Cancelled)
                | (
                    Self::PayerActionRequired,
                    Self::Completed | Self::Cancelled
                )
        )
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "CREATED"),
            Self::PayerActionRequired => write!(f, "PAYER_ACTION_REQUIRED"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATED" => Ok(Self::Created),
            "PAYER_ACTION_REQUIRED" => Ok(Self::PayerActionRequired),
            "COMPLETED" => Ok(Self::Completed),
            // PayPal spells it VOIDED
            "CANCELLED" | "VOIDED" => Ok(Self::Cancelled),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

/// Shopping cart status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "cart_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum CartStatus {
    #[default]
    Active,
    Abandoned,
}

/// How an order is paid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Paypal,
}

impl PaymentMethod {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Paypal => "paypal",
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "paypal" => Ok(Self::Paypal),
            _ => Err(format!("invalid payment method: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_progression() {
        use OrderStatus::{Cancelled, Completed, Created, PayerActionRequired};
        assert!(Created.can_transition_to(PayerActionRequired));
        assert!(PayerActionRequired.can_transition_to(Completed));
        assert!(PayerActionRequired.can_transition_to(Cancelled));
        assert!(!Created.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(PayerActionRequired));
    }

    #[test]
    fn test_order_status_wire_format() {
        let json = serde_json::to_string(&OrderStatus::PayerActionRequired).unwrap();
        assert_eq!(json, "\"PAYER_ACTION_REQUIRED\"");
        assert_eq!(
            "COMPLETED".parse::<OrderStatus>().unwrap(),
            OrderStatus::Completed
        );
        assert_eq!(
            "VOIDED".parse::<OrderStatus>().unwrap(),
            OrderStatus::Cancelled
        );
        assert!("APPROVED".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_display_matches_from_str() {
        for status in [
            OrderStatus::Created,
            OrderStatus::PayerActionRequired,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(status.to_string().parse::<OrderStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_payment_method() {
        assert_eq!(PaymentMethod::Paypal.as_str(), "paypal");
        assert_eq!(
            "paypal".parse::<PaymentMethod>().unwrap(),
            PaymentMethod::Paypal
        );
    }
}
