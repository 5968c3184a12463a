//! Review repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use printhub_core::{BuyerId, OrderStatus, ProductId, Rating, ReviewId};

use super::RepositoryError;
use crate::models::{NewReview, Review, ReviewError};

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: i32,
    product_id: i32,
    buyer_id: i32,
    reviewer_name: String,
    rating: i16,
    comment: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<ReviewRow> for Review {
    type Error = RepositoryError;

    fn try_from(r: ReviewRow) -> Result<Self, Self::Error> {
        let rating = Rating::new(i64::from(r.rating))
            .map_err(|e| RepositoryError::DataCorruption(format!("invalid rating: {e}")))?;

        Ok(Self {
            id: ReviewId::new(r.id),
            product_id: ProductId::new(r.product_id),
            buyer_id: BuyerId::new(r.buyer_id),
            reviewer_name: r.reviewer_name,
            rating,
            comment: r.comment,
            created_at: r.created_at,
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

    /// List a product's reviews, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<Review>, RepositoryError> {
        let rows: Vec<ReviewRow> = sqlx::query_as(
            r"
            SELECT r.id, r.product_id, r.buyer_id, b.name AS reviewer_name,
                   r.rating, r.comment, r.created_at
            FROM printhub.review r
            JOIN printhub.buyer b ON b.id = r.buyer_id
            WHERE r.product_id = $1
            ORDER BY r.created_at DESC, r.id DESC
            ",
        )
        .bind(product_id.as_i32())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Review::try_from).collect()
    }

    /// Post a review once the buyer has a delivered item for the product.
    ///
    /// The `(buyer_id, product_id)` unique constraint settles racing
    /// submissions.
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::ProductNotFound`, `NotDelivered` or
    /// `AlreadyReviewed` for rule violations, `Repository` otherwise.
    pub async fn create(
        &self,
        buyer_id: BuyerId,
        product_id: ProductId,
        review: &NewReview,
    ) -> Result<Review, ReviewError> {
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        let product_exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM printhub.product WHERE id = $1)")
                .bind(product_id.as_i32())
                .fetch_one(&mut *tx)
                .await
                .map_err(RepositoryError::from)?;
        if !product_exists {
            return Err(ReviewError::ProductNotFound);
        }

        let delivered: bool = sqlx::query_scalar(
            r"
            SELECT EXISTS (
                SELECT 1
                FROM printhub.order_item i
                JOIN printhub.customer_order o ON o.id = i.order_id
                WHERE o.buyer_id = $1 AND i.product_id = $2 AND i.status = $3
            )
            ",
        )
        .bind(buyer_id.as_i32())
        .bind(product_id.as_i32())
        .bind(OrderStatus::Delivered)
        .fetch_one(&mut *tx)
        .await
        .map_err(RepositoryError::from)?;
        if !delivered {
            return Err(ReviewError::NotDelivered);
        }

        let row: ReviewRow = sqlx::query_as(
            r"
            WITH inserted AS (
                INSERT INTO printhub.review (product_id, buyer_id, rating, comment)
                VALUES ($1, $2, $3, $4)
                RETURNING id, product_id, buyer_id, rating, comment, created_at
            )
            SELECT i.id, i.product_id, i.buyer_id, b.name AS reviewer_name,
                   i.rating, i.comment, i.created_at
            FROM inserted i
            JOIN printhub.buyer b ON b.id = i.buyer_id
            ",
        )
        .bind(product_id.as_i32())
        .bind(buyer_id.as_i32())
        .bind(i16::from(review.rating))
        .bind(review.comment.trim())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            match RepositoryError::unique_or_database(e, "review already exists") {
                RepositoryError::Conflict(_) => ReviewError::AlreadyReviewed,
                other => ReviewError::Repository(other),
            }
        })?;

        tx.commit().await.map_err(RepositoryError::from)?;

        Ok(row.try_into()?)
    }
}
