//! Cart domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use printhub_core::{BuyerId, CartItemId, Money, MoneyError, ProductId, SellerId};

/// A buyer's in-progress selection of one product.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartItem {
    pub id: CartItemId,
    pub buyer_id: BuyerId,
    pub product_id: ProductId,
    pub seller_id: SellerId,
    pub quantity: u32,
    /// Uploaded design image URLs.
    pub design_urls: Vec<String>,
    pub instructions: String,
    /// Unit price captured when the line was added.
    pub unit_price: Money,
    pub added_at: DateTime<Utc>,
}

impl CartItem {
    /// Line total at the captured unit price.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::Overflow` when the total is not storable.
    pub fn total_price(&self) -> Result<Money, MoneyError> {
        self.unit_price.times(self.quantity)
    }
}

/// Input for adding a line to a cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCartItem {
    pub product_id: ProductId,
    pub seller_id: SellerId,
    pub quantity: u32,
    pub design_urls: Vec<String>,
    pub instructions: String,
    pub unit_price: Money,
}
