//! Catalog browsing, press directory, seller inventory and dashboard.

use chrono::{Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use printhub_core::{Money, OrderStatus, ProductId, RatingSummary, SellerId};

use crate::db::{MarketplaceStore, RepositoryError};
use crate::models::product::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::models::{
    CategoryCount, Product, ProductFilter, ProductInput, Review, Seller, SellerFilter,
    SellerOrder, SellerSummary,
};

/// How many similar products a detail page shows.
const SIMILAR_PRODUCTS: u32 = 3;

/// Days covered by the dashboard sales chart, today included.
pub const SALES_WINDOW_DAYS: u64 = 7;

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("product not found")]
    ProductNotFound,

    #[error("press not found")]
    SellerNotFound,

    /// Product form failed validation.
    #[error("product details are invalid")]
    Invalid(Vec<String>),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Query string for product listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub seller: Option<SellerId>,
    pub q: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty())
}

impl ProductQuery {
    /// Normalize into a filter: blank strings dropped, limit clamped.
    #[must_use]
    pub fn into_filter(self) -> ProductFilter {
        ProductFilter {
            category: non_blank(self.category),
            seller_id: self.seller,
            search: non_blank(self.q),
            limit: self
                .limit
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
            offset: self.offset.unwrap_or(0),
        }
    }
}

/// Query string for the press directory.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PressQuery {
    pub city: Option<String>,
    /// Matches press name, address or city.
    pub q: Option<String>,
}

impl PressQuery {
    /// Normalize into a filter with blank strings dropped.
    #[must_use]
    pub fn into_filter(self) -> SellerFilter {
        SellerFilter {
            city: non_blank(self.city),
            search: non_blank(self.q),
        }
    }
}

/// Query string for one press's page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PressProductQuery {
    /// Matches product names.
    pub q: Option<String>,
}

/// Product page.
#[derive(Debug, Clone, Serialize)]
pub struct ProductDetail {
    pub product: Product,
    pub seller: Option<SellerSummary>,
    pub reviews: Vec<Review>,
    pub rating: RatingSummary,
    pub similar: Vec<Product>,
}

/// Press page.
#[derive(Debug, Clone, Serialize)]
pub struct PressDetail {
    pub seller: SellerSummary,
    pub address: String,
    pub owner_number: String,
    pub products: Vec<Product>,
}

/// Items per status on the dashboard.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub label: &'static str,
    pub color: &'static str,
    pub count: u32,
}

/// Seller dashboard summary.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub press: Seller,
    pub product_count: u32,
    pub units_in_stock: u64,
    pub items_by_status: Vec<StatusCount>,
    /// Value of delivered items.
    pub revenue: Money,
    /// Value of every item not cancelled.
    pub total_sales: Money,
    /// Oldest day first.
    pub sales_last_7_days: Vec<DailySales>,
    pub low_stock: Vec<Product>,
}

/// One point of the dashboard sales chart.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct DailySales {
    pub date: NaiveDate,
    pub total: Money,
}

/// Per-day value of non-cancelled items for the window ending on `today`.
///
/// Days without sales are present with a zero total. Fragments are bucketed
/// by the UTC date they were placed.
#[must_use]
pub fn daily_sales(fragments: &[SellerOrder], today: NaiveDate) -> Vec<DailySales> {
    (0..SALES_WINDOW_DAYS)
        .rev()
        .filter_map(|back| today.checked_sub_days(Days::new(back)))
        .map(|date| DailySales {
            date,
            total: fragments
                .iter()
                .filter(|f| f.placed_at.date_naive() == date)
                .flat_map(|f| &f.items)
                .filter(|i| i.status != OrderStatus::Cancelled)
                .map(|i| i.total_price)
                .sum(),
        })
        .collect()
}

/// Validate and normalize a seller's product form.
///
/// # Errors
///
/// Returns `CatalogError::Invalid` listing every problem.
pub fn validate_product(input: &ProductInput) -> Result<ProductInput, CatalogError> {
    let mut problems = Vec::new();

    let name = input.name.trim();
    if name.is_empty() {
        problems.push("name is required".to_owned());
    }
    let category = input.category.trim();
    if category.is_empty() {
        problems.push("category is required".to_owned());
    }
    if !input.price.is_positive() {
        problems.push("price must be greater than zero".to_owned());
    }
    if !input.price.has_whole_paisa() {
        problems.push("price can have at most 2 decimal places".to_owned());
    }
    if input.price.exceeds_max() {
        problems.push(format!("price must be at most {}", Money::MAX));
    }
    if input.minimum_order_quantity < 1 {
        problems.push("minimum order quantity must be at least 1".to_owned());
    }

    let image_urls: Vec<String> = input
        .image_urls
        .iter()
        .map(|url| url.trim())
        .filter(|url| !url.is_empty())
        .map(str::to_owned)
        .collect();
    if image_urls.is_empty() {
        problems.push("at least one image is required".to_owned());
    }

    if !problems.is_empty() {
        return Err(CatalogError::Invalid(problems));
    }

    Ok(ProductInput {
        name: name.to_owned(),
        description: input.description.trim().to_owned(),
        price: input.price,
        inventory_quantity: input.inventory_quantity,
        minimum_order_quantity: input.minimum_order_quantity,
        category: category.to_owned(),
        image_urls,
    })
}

/// Catalog service.
pub struct CatalogService<'a> {
    store: &'a dyn MarketplaceStore,
}

impl<'a> CatalogService<'a> {
    /// Create a new catalog service.
    #[must_use]
    pub const fn new(store: &'a dyn MarketplaceStore) -> Self {
        Self { store }
    }

    /// A filtered page of products.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn products(&self, query: ProductQuery) -> Result<Vec<Product>, CatalogError> {
        Ok(self.store.list_products(&query.into_filter()).await?)
    }

    /// Product page with reviews and similar products.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ProductNotFound` for unknown products.
    pub async fn product_detail(&self, id: ProductId) -> Result<ProductDetail, CatalogError> {
        let product = self
            .store
            .get_product(id)
            .await?
            .ok_or(CatalogError::ProductNotFound)?;

        let seller = self
            .store
            .get_seller(product.seller_id)
            .await?
            .map(|s| s.summary());
        let reviews = self.store.list_reviews(id).await?;
        let rating = RatingSummary::from_ratings(reviews.iter().map(|r| r.rating));

        let similar_filter = ProductFilter {
            category: Some(product.category.clone()),
            limit: SIMILAR_PRODUCTS + 1,
            ..ProductFilter::default()
        };
        let similar = self
            .store
            .list_products(&similar_filter)
            .await?
            .into_iter()
            .filter(|p| p.id != id)
            .take(SIMILAR_PRODUCTS as usize)
            .collect();

        Ok(ProductDetail {
            product,
            seller,
            reviews,
            rating,
            similar,
        })
    }

    /// Categories with product counts.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn categories(&self) -> Result<Vec<CategoryCount>, CatalogError> {
        Ok(self.store.list_categories().await?)
    }

    /// Press directory.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn presses(&self, query: PressQuery) -> Result<Vec<SellerSummary>, CatalogError> {
        Ok(self
            .store
            .list_sellers(&query.into_filter())
            .await?
            .iter()
            .map(Seller::summary)
            .collect())
    }

    /// Press page with its products, optionally narrowed by product name.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::SellerNotFound` for unknown presses.
    pub async fn press_detail(
        &self,
        id: SellerId,
        query: PressProductQuery,
    ) -> Result<PressDetail, CatalogError> {
        let seller = self
            .store
            .get_seller(id)
            .await?
            .ok_or(CatalogError::SellerNotFound)?;
        let filter = ProductFilter {
            seller_id: Some(id),
            search: non_blank(query.q),
            ..ProductFilter::default()
        };
        let products = self
            .store
            .list_seller_products(id)
            .await?
            .into_iter()
            .filter(|p| filter.matches(p))
            .collect();

        Ok(PressDetail {
            seller: seller.summary(),
            address: seller.address,
            owner_number: seller.owner_number,
            products,
        })
    }

    /// The press's own products.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn inventory(&self, seller_id: SellerId) -> Result<Vec<Product>, CatalogError> {
        Ok(self.store.list_seller_products(seller_id).await?)
    }

    /// List a new product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Invalid` for a bad form.
    pub async fn create_product(
        &self,
        seller_id: SellerId,
        input: &ProductInput,
    ) -> Result<Product, CatalogError> {
        let input = validate_product(input)?;
        let product = self.store.create_product(seller_id, &input).await?;
        tracing::info!(seller_id = %seller_id, product_id = %product.id, "Product created");
        Ok(product)
    }

    /// Overwrite one of the press's products.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Invalid` for a bad form and `ProductNotFound`
    /// when the product is not the press's.
    pub async fn update_product(
        &self,
        seller_id: SellerId,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<Product, CatalogError> {
        let input = validate_product(input)?;
        self.store
            .update_product(seller_id, id, &input)
            .await
            .map_err(product_not_found)
    }

    /// Delete one of the press's products.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ProductNotFound` when the product is not the press's.
    pub async fn delete_product(&self, seller_id: SellerId, id: ProductId) -> Result<(), CatalogError> {
        self.store
            .delete_product(seller_id, id)
            .await
            .map_err(product_not_found)?;
        tracing::info!(seller_id = %seller_id, product_id = %id, "Product deleted");
        Ok(())
    }

    /// Dashboard figures for a press.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::SellerNotFound` for unknown presses.
    pub async fn dashboard(&self, seller_id: SellerId) -> Result<Dashboard, CatalogError> {
        let press = self
            .store
            .get_seller(seller_id)
            .await?
            .ok_or(CatalogError::SellerNotFound)?;
        let products = self.store.list_seller_products(seller_id).await?;
        let fragments = self.store.list_seller_orders(seller_id).await?;

        let items: Vec<_> = fragments.iter().flat_map(|f| f.items.iter()).collect();
        let items_by_status = OrderStatus::ALL
            .iter()
            .map(|status| StatusCount {
                status: *status,
                label: status.label(),
                color: status.color(),
                count: u32::try_from(items.iter().filter(|i| i.status == *status).count())
                    .unwrap_or(u32::MAX),
            })
            .collect();
        let revenue = items
            .iter()
            .filter(|i| i.status == OrderStatus::Delivered)
            .map(|i| i.total_price)
            .sum();
        let total_sales = items
            .iter()
            .filter(|i| i.status != OrderStatus::Cancelled)
            .map(|i| i.total_price)
            .sum();
        let sales_last_7_days = daily_sales(&fragments, Utc::now().date_naive());

        Ok(Dashboard {
            press,
            product_count: u32::try_from(products.len()).unwrap_or(u32::MAX),
            units_in_stock: products.iter().map(|p| u64::from(p.inventory_quantity)).sum(),
            items_by_status,
            revenue,
            total_sales,
            sales_last_7_days,
            low_stock: products.into_iter().filter(Product::is_low_stock).collect(),
        })
    }
}

fn product_not_found(e: RepositoryError) -> CatalogError {
    match e {
        RepositoryError::NotFound => CatalogError::ProductNotFound,
        other => CatalogError::Repository(other),
    }
}
