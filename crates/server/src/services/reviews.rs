//! Product reviews.

use printhub_core::{BuyerId, ProductId};

use crate::db::MarketplaceStore;
use crate::models::{NewReview, Review, ReviewError};

/// Review service.
pub struct ReviewService<'a> {
    store: &'a dyn MarketplaceStore,
}

impl<'a> ReviewService<'a> {
    /// Create a new review service.
    #[must_use]
    pub const fn new(store: &'a dyn MarketplaceStore) -> Self {
        Self { store }
    }

    /// Post a review. The buyer needs a delivered item of the product and
    /// may review it once.
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::NotDelivered` or `AlreadyReviewed` when the
    /// buyer may not review the product.
    pub async fn post(
        &self,
        buyer_id: BuyerId,
        product_id: ProductId,
        review: &NewReview,
    ) -> Result<Review, ReviewError> {
        let review = NewReview {
            rating: review.rating,
            comment: review.comment.trim().to_owned(),
        };
        let posted = self.store.add_review(buyer_id, product_id, &review).await?;

        tracing::info!(
            buyer_id = %buyer_id,
            product_id = %product_id,
            rating = posted.rating.stars(),
            "Review posted"
        );
        Ok(posted)
    }

    /// Reviews of a product, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::Repository` if the store fails.
    pub async fn for_product(&self, product_id: ProductId) -> Result<Vec<Review>, ReviewError> {
        Ok(self.store.list_reviews(product_id).await?)
    }
}
