//! Review repository.
//!
//! Reviews are never physically removed; `soft_delete` flips the `deleted`
//! flag and every read filters on it. A partial unique index allows one
//! non-deleted review per user and product.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use ecomstore_core::{ProductId, Rating, ReviewId, UserId};

use super::RepositoryError;
use crate::models::review::ANONYMOUS_AUTHOR;
use crate::models::{NewReview, ProductReview, Review};

const REVIEW_COLUMNS: &str =
    "id, product_id, user_id, title, review_text, rating, anonymous, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: ReviewId,
    product_id: ProductId,
    user_id: UserId,
    title: Option<String>,
    review_text: Option<String>,
    rating: i16,
    anonymous: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn rating(value: i16) -> Result<Rating, RepositoryError> {
    Rating::new(value).map_err(|e| {
        RepositoryError::DataCorruption(format!("invalid rating in database: {e}"))
    })
}

impl TryFrom<ReviewRow> for Review {
    type Error = RepositoryError;

    fn try_from(row: ReviewRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            product_id: row.product_id,
            user_id: row.user_id,
            title: row.title,
            review_text: row.review_text,
            rating: rating(row.rating)?,
            anonymous: row.anonymous,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ProductReviewRow {
    id: ReviewId,
    title: Option<String>,
    review_text: Option<String>,
    rating: i16,
    user_name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductReviewRow> for ProductReview {
    type Error = RepositoryError;

    fn try_from(row: ProductReviewRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            title: row.title,
            review_text: row.review_text,
            rating: rating(row.rating)?,
            user_name: row.user_name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for review database operations.
pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    /// Create a new review repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a review.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the user already has a live
    /// review of this product.
    #[instrument(skip(self, review))]
    pub async fn create(
        &self,
        user_id: UserId,
        product_id: ProductId,
        review: &NewReview,
    ) -> Result<Review, RepositoryError> {
        let row = sqlx::query_as::<_, ReviewRow>(&format!(
            r"
            INSERT INTO reviews (id, user_id, product_id, title, review_text, rating, anonymous)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {REVIEW_COLUMNS}
            "
        ))
        .bind(ReviewId::new())
        .bind(user_id)
        .bind(product_id)
        .bind(review.title.clone().into_option())
        .bind(&review.review_text)
        .bind(review.rating.value())
        .bind(review.anonymous)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "product already reviewed"))?;

        Review::try_from(row)
    }

    /// Whether the user has a live review of the product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn has_user_reviewed(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar(
            r"
            SELECT EXISTS (
                SELECT 1 FROM reviews
                WHERE user_id = $1 AND product_id = $2 AND NOT deleted
            )
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }

    /// Live reviews of a product, newest first, with the author's display name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn list_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<ProductReview>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductReviewRow>(
            r"
            SELECT r.id, r.title, r.review_text, r.rating,
                   CASE
                       WHEN r.anonymous OR COALESCE(u.name, '') = '' THEN $2
                       ELSE u.name
                   END AS user_name,
                   r.created_at, r.updated_at
            FROM reviews r
            JOIN users u ON u.id = r.user_id
            WHERE r.product_id = $1 AND NOT r.deleted
            ORDER BY r.created_at DESC
            ",
        )
        .bind(product_id)
        .bind(ANONYMOUS_AUTHOR)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(ProductReview::try_from).collect()
    }

    /// The user's live review of a product, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn get_for_user(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Option<Review>, RepositoryError> {
        let row = sqlx::query_as::<_, ReviewRow>(&format!(
            r"
            SELECT {REVIEW_COLUMNS}
            FROM reviews
            WHERE user_id = $1 AND product_id = $2 AND NOT deleted
            "
        ))
        .bind(user_id)
        .bind(product_id)
        .fetch_optional(self.pool)
        .await?;

        row.map(Review::try_from).transpose()
    }

    /// Replace the content of the user's live review.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user has no live review.
    #[instrument(skip(self, review))]
    pub async fn update(
        &self,
        user_id: UserId,
        product_id: ProductId,
        review: &NewReview,
    ) -> Result<Review, RepositoryError> {
        let row = sqlx::query_as::<_, ReviewRow>(&format!(
            r"
            UPDATE reviews
            SET title = $3, review_text = $4, rating = $5, anonymous = $6, updated_at = NOW()
            WHERE user_id = $1 AND product_id = $2 AND NOT deleted
            RETURNING {REVIEW_COLUMNS}
            "
        ))
        .bind(user_id)
        .bind(product_id)
        .bind(review.title.clone().into_option())
        .bind(&review.review_text)
        .bind(review.rating.value())
        .bind(review.anonymous)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Review::try_from(row)
    }

    /// Soft-delete the user's live review.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user has no live review.
    #[instrument(skip(self))]
    pub async fn soft_delete(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE reviews
            SET deleted = TRUE, updated_at = NOW()
            WHERE user_id = $1 AND product_id = $2 AND NOT deleted
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
