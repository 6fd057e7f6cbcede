//! Product review service.

use serde::Deserialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use ecomstore_core::{ProductId, Rating, ReviewTitle, UserId, ValidationError};

use crate::db::{RepositoryError, ReviewRepository};
use crate::models::{NewReview, ProductReview, Review};

/// Errors from review operations.
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("user has already reviewed the product")]
    AlreadyReviewed,

    #[error("user has not reviewed the product")]
    NotFound,

    #[error("database error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for ReviewError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => Self::NotFound,
            RepositoryError::Conflict(_) => Self::AlreadyReviewed,
            other => Self::Repository(other),
        }
    }
}

/// Review body as submitted by the client.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub review_text: Option<String>,
    pub rating: i16,
    /// Absent on create means public; absent on update means anonymous.
    #[serde(default)]
    pub anonymous: Option<bool>,
}

impl ReviewInput {
    /// Validate into a review, using `anonymous_default` when the flag is absent.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` for a title over 30 characters or a rating
    /// outside 1 to 5.
    pub fn validate(&self, anonymous_default: bool) -> Result<NewReview, ValidationError> {
        Ok(NewReview {
            title: ReviewTitle::parse(&self.title)?,
            review_text: self
                .review_text
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
            rating: Rating::new(self.rating)?,
            anonymous: self.anonymous.unwrap_or(anonymous_default),
        })
    }
}

/// Review service.
pub struct ReviewService<'a> {
    reviews: ReviewRepository<'a>,
}

impl<'a> ReviewService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            reviews: ReviewRepository::new(pool),
        }
    }

    /// Post a review.
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::Validation` for bad input and
    /// `ReviewError::AlreadyReviewed` if the user has a live review of this product.
    #[instrument(skip(self, input))]
    pub async fn add(
        &self,
        user_id: UserId,
        product_id: ProductId,
        input: &ReviewInput,
    ) -> Result<Review, ReviewError> {
        let review = input.validate(false)?;

        if self.reviews.has_user_reviewed(user_id, product_id).await? {
            return Err(ReviewError::AlreadyReviewed);
        }

        let review = self.reviews.create(user_id, product_id, &review).await?;
        tracing::info!(review_id = %review.id, "Review added");
        Ok(review)
    }

    /// # Errors
    ///
    /// Returns `ReviewError::Repository` if the query fails.
    pub async fn list_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<ProductReview>, ReviewError> {
        Ok(self.reviews.list_for_product(product_id).await?)
    }

    /// The caller's own review of a product.
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::NotFound` if the user has no live review.
    pub async fn get_own(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Review, ReviewError> {
        self.reviews
            .get_for_user(user_id, product_id)
            .await?
            .ok_or(ReviewError::NotFound)
    }

    /// Replace the caller's review.
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::Validation` for bad input and
    /// `ReviewError::NotFound` if the user never reviewed the product.
    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        user_id: UserId,
        product_id: ProductId,
        input: &ReviewInput,
    ) -> Result<Review, ReviewError> {
        let review = input.validate(true)?;
        Ok(self.reviews.update(user_id, product_id, &review).await?)
    }

    /// Soft-delete the caller's review.
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::NotFound` if the user has no live review.
    #[instrument(skip(self))]
    pub async fn delete(&self, user_id: UserId, product_id: ProductId) -> Result<(), ReviewError> {
        self.reviews.soft_delete(user_id, product_id).await?;
        tracing::info!("Review deleted");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input(json: &str) -> ReviewInput {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_anonymous_defaults() {
        let body = input(r#"{"title":"Solid","rating":4}"#);
        assert!(!body.validate(false).unwrap().anonymous);
        assert!(body.validate(true).unwrap().anonymous);

        let explicit = input(r#"{"rating":4,"anonymous":false}"#);
        assert!(!explicit.validate(true).unwrap().anonymous);
    }

    #[test]
    fn test_review_rules() {
        assert!(matches!(
            input(r#"{"rating":0}"#).validate(false),
            Err(ValidationError::RatingOutOfRange { .. })
        ));
        let long_title = format!(r#"{{"title":"{}","rating":3}}"#, "t".repeat(31));
        assert!(matches!(
            input(&long_title).validate(false),
            Err(ValidationError::TitleTooLong { max: 30 })
        ));
    }

    #[test]
    fn test_blank_text_is_dropped() {
        let review = input(r#"{"title":"","reviewText":"   ","rating":5}"#)
            .validate(false)
            .unwrap();
        assert_eq!(review.review_text, None);
        assert_eq!(review.title.into_option(), None);
    }

    #[test]
    fn test_repository_error_mapping() {
        assert!(matches!(
            ReviewError::from(RepositoryError::Conflict("dup".into())),
            ReviewError::AlreadyReviewed
        ));
        assert!(matches!(
            ReviewError::from(RepositoryError::NotFound),
            ReviewError::NotFound
        ));
    }

    #[sqlx::test(migrator = "crate::db::MIGRATOR")]
    #[ignore = "requires PostgreSQL (DATABASE_URL)"]
    async fn test_one_live_review_per_user(pool: PgPool) {
        let reviewer = crate::db::fixtures::user(&pool, "reviewer").await;
        let product = crate::db::fixtures::product(&pool, "REV-01", 3).await;
        let reviews = ReviewService::new(&pool);
        let body = input(r#"{"title":"Sturdy","rating":4}"#);

        reviews.add(reviewer.id, product.id, &body).await.unwrap();
        assert!(matches!(
            reviews.add(reviewer.id, product.id, &body).await,
            Err(ReviewError::AlreadyReviewed)
        ));

        // The partial unique index catches a duplicate that skips the pre-check
        let direct = ReviewRepository::new(&pool)
            .create(reviewer.id, product.id, &body.validate(false).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(
            ReviewError::from(direct),
            ReviewError::AlreadyReviewed
        ));

        reviews.delete(reviewer.id, product.id).await.unwrap();
        assert!(matches!(
            reviews.get_own(reviewer.id, product.id).await,
            Err(ReviewError::NotFound)
        ));
        assert!(matches!(
            reviews.delete(reviewer.id, product.id).await,
            Err(ReviewError::NotFound)
        ));

        let again = input(r#"{"title":"Still sturdy","rating":5}"#);
        let review = reviews.add(reviewer.id, product.id, &again).await.unwrap();
        assert_eq!(review.title.as_deref(), Some("Still sturdy"));
        assert_eq!(reviews.list_for_product(product.id).await.unwrap().len(), 1);
    }
}
