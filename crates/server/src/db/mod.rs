//! Marketplace storage.
//!
//! # Database: `printhub`
//!
//! All tables live in the `printhub` schema:
//!
//! - `account` - Login email, password hash and role
//! - `buyer` / `seller` - Role-specific profiles keyed by account id
//! - `product` - Catalog, with `inventory_quantity >= 0` enforced by a CHECK
//! - `review` - One row per (buyer, product)
//! - `cart_item` - Open cart lines
//! - `customer_order` / `seller_order` / `order_item` - Placed orders; each
//!   item carries the single status read by both buyer and seller views
//! - `tower_sessions.session` - Session storage
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p printhub-cli -- migrate
//! ```
//!
//! Handlers talk to [`MarketplaceStore`], implemented by [`PgStore`] for
//! production and [`MemoryStore`] for local runs and tests.

pub mod accounts;
pub mod carts;
pub mod memory;
pub mod orders;
pub mod products;
pub mod reviews;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use printhub_core::{
    BuyerId, CartItemId, Email, OrderId, OrderItemId, OrderStatus, ProductId, SellerId,
};

use crate::models::{
    AccountCredentials, Buyer, BuyerProfileUpdate, CartItem, CategoryCount, CheckoutError,
    CheckoutRequest, NewBuyer, NewCartItem, NewReview, NewSeller, Order, PlacedOrder, Product,
    ProductFilter, ProductInput, Review, ReviewError, Seller, SellerFilter, SellerOrder,
    SellerProfileUpdate,
    StatusActor, StatusChange, StatusChangeError,
};

pub use accounts::AccountRepository;
pub use carts::CartRepository;
pub use memory::MemoryStore;
pub use orders::OrderRepository;
pub use products::ProductRepository;
pub use reviews::ReviewRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a unique violation to `Conflict(message)`, anything else to `Database`.
    pub(crate) fn unique_or_database(e: sqlx::Error, message: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return Self::Conflict(message.to_owned());
        }
        Self::Database(e)
    }
}

/// Convert a stored integer quantity into its domain type.
pub(crate) fn quantity_from_db(value: i32, column: &str) -> Result<u32, RepositoryError> {
    u32::try_from(value)
        .map_err(|_| RepositoryError::DataCorruption(format!("negative {column}: {value}")))
}

/// Convert a domain quantity for binding.
pub(crate) fn quantity_to_db(value: u32, column: &str) -> Result<i32, RepositoryError> {
    i32::try_from(value)
        .map_err(|_| RepositoryError::Conflict(format!("{column} is too large: {value}")))
}

/// Parse an email read back from storage.
pub(crate) fn email_from_db(value: &str) -> Result<Email, RepositoryError> {
    Email::parse(value)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid email in database: {e}")))
}

/// Storage port used by every service.
///
/// Multi-record writes (`place_order`, `change_item_status`, `add_review`)
/// are a single unit of work: either every write lands or none does.
#[async_trait]
pub trait MarketplaceStore: Send + Sync + 'static {
    /// Cheap round trip used by the readiness probe.
    async fn ping(&self) -> Result<(), RepositoryError>;

    // Accounts

    /// Create a buyer account. `Conflict` if the email is taken.
    async fn create_buyer(
        &self,
        buyer: &NewBuyer,
        password_hash: &str,
    ) -> Result<Buyer, RepositoryError>;

    /// Create a press account. `Conflict` if the email is taken.
    async fn create_seller(
        &self,
        seller: &NewSeller,
        password_hash: &str,
    ) -> Result<Seller, RepositoryError>;

    /// Login material for an email, either role.
    async fn get_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<AccountCredentials>, RepositoryError>;

    async fn get_buyer(&self, id: BuyerId) -> Result<Option<Buyer>, RepositoryError>;

    async fn update_buyer(
        &self,
        id: BuyerId,
        update: &BuyerProfileUpdate,
    ) -> Result<Buyer, RepositoryError>;

    async fn get_seller(&self, id: SellerId) -> Result<Option<Seller>, RepositoryError>;

    async fn update_seller(
        &self,
        id: SellerId,
        update: &SellerProfileUpdate,
    ) -> Result<Seller, RepositoryError>;

    /// Presses matching `filter`, by press name.
    async fn list_sellers(&self, filter: &SellerFilter) -> Result<Vec<Seller>, RepositoryError>;

    // Catalog

    async fn create_product(
        &self,
        seller_id: SellerId,
        input: &ProductInput,
    ) -> Result<Product, RepositoryError>;

    /// Overwrite a product owned by `seller_id`. `NotFound` otherwise.
    async fn update_product(
        &self,
        seller_id: SellerId,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<Product, RepositoryError>;

    /// Delete a product owned by `seller_id`. `NotFound` otherwise.
    async fn delete_product(&self, seller_id: SellerId, id: ProductId)
    -> Result<(), RepositoryError>;

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Products for a set of ids; missing ids are skipped.
    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError>;

    /// Filtered page of products, newest first.
    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError>;

    /// Every product of one press, newest first.
    async fn list_seller_products(
        &self,
        seller_id: SellerId,
    ) -> Result<Vec<Product>, RepositoryError>;

    async fn list_categories(&self) -> Result<Vec<CategoryCount>, RepositoryError>;

    // Reviews

    /// Reviews of a product, newest first.
    async fn list_reviews(&self, product_id: ProductId) -> Result<Vec<Review>, RepositoryError>;

    /// Post a review after checking the buyer has a delivered item.
    async fn add_review(
        &self,
        buyer_id: BuyerId,
        product_id: ProductId,
        review: &NewReview,
    ) -> Result<Review, ReviewError>;

    // Cart

    /// Cart lines in the order they were added.
    async fn get_cart(&self, buyer_id: BuyerId) -> Result<Vec<CartItem>, RepositoryError>;

    async fn add_cart_item(
        &self,
        buyer_id: BuyerId,
        item: &NewCartItem,
    ) -> Result<CartItem, RepositoryError>;

    /// `NotFound` unless the line belongs to `buyer_id`.
    async fn update_cart_item_quantity(
        &self,
        buyer_id: BuyerId,
        id: CartItemId,
        quantity: u32,
    ) -> Result<CartItem, RepositoryError>;

    /// `NotFound` unless the line belongs to `buyer_id`.
    async fn remove_cart_item(&self, buyer_id: BuyerId, id: CartItemId)
    -> Result<(), RepositoryError>;

    // Orders

    /// Run the checkout orchestrator as one unit of work.
    async fn place_order(&self, request: &CheckoutRequest) -> Result<PlacedOrder, CheckoutError>;

    /// A buyer's orders, newest first.
    async fn list_buyer_orders(&self, buyer_id: BuyerId) -> Result<Vec<Order>, RepositoryError>;

    async fn get_buyer_order(
        &self,
        buyer_id: BuyerId,
        order_id: OrderId,
    ) -> Result<Option<Order>, RepositoryError>;

    /// A press's order fragments, newest first.
    async fn list_seller_orders(
        &self,
        seller_id: SellerId,
    ) -> Result<Vec<SellerOrder>, RepositoryError>;

    /// Apply a status change with compare-and-swap on the current status.
    /// Cancelling returns the item's units to product inventory.
    async fn change_item_status(
        &self,
        actor: StatusActor,
        item_id: OrderItemId,
        next: OrderStatus,
    ) -> Result<StatusChange, StatusChangeError>;
}

/// `PostgreSQL`-backed store.
///
/// Thin delegation to the per-table repositories so each keeps the
/// borrowed-pool shape.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Underlying pool, for the session store.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl MarketplaceStore for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn create_buyer(
        &self,
        buyer: &NewBuyer,
        password_hash: &str,
    ) -> Result<Buyer, RepositoryError> {
        AccountRepository::new(&self.pool)
            .create_buyer(buyer, password_hash)
            .await
    }

    async fn create_seller(
        &self,
        seller: &NewSeller,
        password_hash: &str,
    ) -> Result<Seller, RepositoryError> {
        AccountRepository::new(&self.pool)
            .create_seller(seller, password_hash)
            .await
    }

    async fn get_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<AccountCredentials>, RepositoryError> {
        AccountRepository::new(&self.pool).get_credentials(email).await
    }

    async fn get_buyer(&self, id: BuyerId) -> Result<Option<Buyer>, RepositoryError> {
        AccountRepository::new(&self.pool).get_buyer(id).await
    }

    async fn update_buyer(
        &self,
        id: BuyerId,
        update: &BuyerProfileUpdate,
    ) -> Result<Buyer, RepositoryError> {
        AccountRepository::new(&self.pool)
            .update_buyer(id, update)
            .await
    }

    async fn get_seller(&self, id: SellerId) -> Result<Option<Seller>, RepositoryError> {
        AccountRepository::new(&self.pool).get_seller(id).await
    }

    async fn update_seller(
        &self,
        id: SellerId,
        update: &SellerProfileUpdate,
    ) -> Result<Seller, RepositoryError> {
        AccountRepository::new(&self.pool)
            .update_seller(id, update)
            .await
    }

    async fn list_sellers(&self, filter: &SellerFilter) -> Result<Vec<Seller>, RepositoryError> {
        AccountRepository::new(&self.pool).list_sellers(filter).await
    }

    async fn create_product(
        &self,
        seller_id: SellerId,
        input: &ProductInput,
    ) -> Result<Product, RepositoryError> {
        ProductRepository::new(&self.pool)
            .create(seller_id, input)
            .await
    }

    async fn update_product(
        &self,
        seller_id: SellerId,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<Product, RepositoryError> {
        ProductRepository::new(&self.pool)
            .update(seller_id, id, input)
            .await
    }

    async fn delete_product(
        &self,
        seller_id: SellerId,
        id: ProductId,
    ) -> Result<(), RepositoryError> {
        ProductRepository::new(&self.pool)
            .delete(seller_id, id)
            .await
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        ProductRepository::new(&self.pool).get_by_id(id).await
    }

    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        ProductRepository::new(&self.pool).get_by_ids(ids).await
    }

    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        ProductRepository::new(&self.pool).list(filter).await
    }

    async fn list_seller_products(
        &self,
        seller_id: SellerId,
    ) -> Result<Vec<Product>, RepositoryError> {
        ProductRepository::new(&self.pool)
            .list_for_seller(seller_id)
            .await
    }

    async fn list_categories(&self) -> Result<Vec<CategoryCount>, RepositoryError> {
        ProductRepository::new(&self.pool).categories().await
    }

    async fn list_reviews(&self, product_id: ProductId) -> Result<Vec<Review>, RepositoryError> {
        ReviewRepository::new(&self.pool)
            .list_for_product(product_id)
            .await
    }

    async fn add_review(
        &self,
        buyer_id: BuyerId,
        product_id: ProductId,
        review: &NewReview,
    ) -> Result<Review, ReviewError> {
        ReviewRepository::new(&self.pool)
            .create(buyer_id, product_id, review)
            .await
    }

    async fn get_cart(&self, buyer_id: BuyerId) -> Result<Vec<CartItem>, RepositoryError> {
        CartRepository::new(&self.pool).list(buyer_id).await
    }

    async fn add_cart_item(
        &self,
        buyer_id: BuyerId,
        item: &NewCartItem,
    ) -> Result<CartItem, RepositoryError> {
        CartRepository::new(&self.pool).add(buyer_id, item).await
    }

    async fn update_cart_item_quantity(
        &self,
        buyer_id: BuyerId,
        id: CartItemId,
        quantity: u32,
    ) -> Result<CartItem, RepositoryError> {
        CartRepository::new(&self.pool)
            .update_quantity(buyer_id, id, quantity)
            .await
    }

    async fn remove_cart_item(
        &self,
        buyer_id: BuyerId,
        id: CartItemId,
    ) -> Result<(), RepositoryError> {
        CartRepository::new(&self.pool).remove(buyer_id, id).await
    }

    async fn place_order(&self, request: &CheckoutRequest) -> Result<PlacedOrder, CheckoutError> {
        OrderRepository::new(&self.pool).place(request).await
    }

    async fn list_buyer_orders(&self, buyer_id: BuyerId) -> Result<Vec<Order>, RepositoryError> {
        OrderRepository::new(&self.pool)
            .list_for_buyer(buyer_id)
            .await
    }

    async fn get_buyer_order(
        &self,
        buyer_id: BuyerId,
        order_id: OrderId,
    ) -> Result<Option<Order>, RepositoryError> {
        OrderRepository::new(&self.pool)
            .get_for_buyer(buyer_id, order_id)
            .await
    }

    async fn list_seller_orders(
        &self,
        seller_id: SellerId,
    ) -> Result<Vec<SellerOrder>, RepositoryError> {
        OrderRepository::new(&self.pool)
            .list_for_seller(seller_id)
            .await
    }

    async fn change_item_status(
        &self,
        actor: StatusActor,
        item_id: OrderItemId,
        next: OrderStatus,
    ) -> Result<StatusChange, StatusChangeError> {
        OrderRepository::new(&self.pool)
            .change_status(actor, item_id, next)
            .await
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantity_from_db_rejects_negative() {
        assert!(matches!(
            quantity_from_db(-1, "inventory_quantity"),
            Err(RepositoryError::DataCorruption(_))
        ));
        assert!(matches!(quantity_from_db(7, "quantity"), Ok(7)));
    }

    #[test]
    fn test_quantity_to_db_rejects_overflow() {
        assert!(matches!(
            quantity_to_db(u32::MAX, "quantity"),
            Err(RepositoryError::Conflict(_))
        ));
    }
}
