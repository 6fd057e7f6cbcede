//! Domain models.
//!
//! These are validated domain objects, separate from the database row types
//! private to each repository. Types that leave the API serialize with
//! camelCase field names.

pub mod cart;
pub mod order;
pub mod product;
pub mod review;
pub mod session;
pub mod user;

pub use cart::{Cart, CartItem};
pub use order::{Order, OrderDraft, OrderItem, OrderLine};
pub use product::{Category, NewProduct, Product};
pub use review::{NewReview, ProductReview, Review};
pub use session::CurrentUser;
pub use user::User;
