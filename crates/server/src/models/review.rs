//! Review domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use ecomstore_core::{ProductId, Rating, ReviewId, ReviewTitle, UserId};

/// Display name used for reviews posted anonymously.
pub const ANONYMOUS_AUTHOR: &str = "anonymous";

/// A review as its author sees it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub user_id: UserId,
    pub title: Option<String>,
    pub review_text: Option<String>,
    pub rating: Rating,
    pub anonymous: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A review as shown publicly on a product page.
///
/// The author is reduced to a display name, which is `anonymous` when the
/// review was posted anonymously or the author has no name.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductReview {
    pub id: ReviewId,
    pub title: Option<String>,
    pub review_text: Option<String>,
    pub rating: Rating,
    pub user_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated fields for creating or replacing a review.
#[derive(Debug, Clone)]
pub struct NewReview {
    pub title: ReviewTitle,
    pub review_text: Option<String>,
    pub rating: Rating,
    pub anonymous: bool,
}
