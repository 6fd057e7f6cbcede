//! Business logic services.
//!
//! Services are short-lived, borrow the pool, and are built per request from
//! `AppState`. They translate repository errors into domain errors that
//! `AppError` maps onto HTTP responses.
//!
//! # Services
//!
//! - `auth` - Registration and password login
//! - `catalog` - Products and categories
//! - `cart` - The user's active cart
//! - `reviews` - Product reviews
//! - `checkout` - Orders and the payment processor round trip

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod reviews;

pub use auth::{AuthError, AuthService};
pub use cart::{CartError, CartService};
pub use catalog::{CatalogError, CatalogService};
pub use checkout::{CheckoutError, CheckoutService};
pub use reviews::{ReviewError, ReviewService};
