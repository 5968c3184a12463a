//! Product review domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use printhub_core::{BuyerId, ProductId, Rating, ReviewId};

use crate::db::RepositoryError;

/// A buyer's rating and comment on a product.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub buyer_id: BuyerId,
    /// Buyer display name at read time.
    pub reviewer_name: String,
    pub rating: Rating,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// Input for posting a review.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct NewReview {
    pub rating: Rating,
    #[serde(default)]
    pub comment: String,
}

/// Reasons a review cannot be posted.
#[derive(Debug, Error)]
pub enum ReviewError {
    /// The product does not exist.
    #[error("product not found")]
    ProductNotFound,

    /// The buyer has no delivered order item for this product.
    #[error("reviews open once an order for this product is delivered")]
    NotDelivered,

    /// The buyer already reviewed this product.
    #[error("you have already reviewed this product")]
    AlreadyReviewed,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}
