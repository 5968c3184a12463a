//! Product catalog domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use printhub_core::{Money, ProductId, SellerId};

/// Default page size for product listings.
pub const DEFAULT_PAGE_SIZE: u32 = 24;

/// Largest page a client may request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// A printable product listed by a press.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    pub seller_id: SellerId,
    pub name: String,
    pub description: String,
    /// Price per unit.
    pub price: Money,
    /// Units available for sale. Never negative.
    pub inventory_quantity: u32,
    /// Smallest quantity a buyer may order in one line.
    pub minimum_order_quantity: u32,
    pub category: String,
    pub image_urls: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// First image, used as the thumbnail.
    #[must_use]
    pub fn thumbnail(&self) -> Option<&str> {
        self.image_urls.first().map(String::as_str)
    }

    /// Whether stock has dropped below one minimum order.
    #[must_use]
    pub const fn is_low_stock(&self) -> bool {
        self.inventory_quantity < self.minimum_order_quantity
    }
}

/// Seller-editable product fields, used for both create and update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Money,
    pub inventory_quantity: u32,
    pub minimum_order_quantity: u32,
    pub category: String,
    pub image_urls: Vec<String>,
}

/// Product listing filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub seller_id: Option<SellerId>,
    /// Case-insensitive substring of the product name.
    pub search: Option<String>,
    pub limit: u32,
    pub offset: u32,
}

impl Default for ProductFilter {
    fn default() -> Self {
        Self {
            category: None,
            seller_id: None,
            search: None,
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

impl ProductFilter {
    /// Whether `product` passes the category, seller and search filters.
    ///
    /// Pagination is not applied here.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        self.category
            .as_deref()
            .is_none_or(|c| product.category.eq_ignore_ascii_case(c))
            && self.seller_id.is_none_or(|s| product.seller_id == s)
            && self.search.as_deref().is_none_or(|q| {
                product
                    .name
                    .to_lowercase()
                    .contains(&q.trim().to_lowercase())
            })
    }
}

/// Number of products in a category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryCount {
    pub category: String,
    pub product_count: u32,
}
