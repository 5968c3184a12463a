//! Cart rules and the enriched cart view.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use printhub_core::{BuyerId, CartItemId, Money, MoneyError, ProductId};

use crate::db::{MarketplaceStore, RepositoryError};
use crate::models::{CartItem, NewCartItem, Product};

/// Shown for lines whose product has been deleted.
pub const UNKNOWN_PRODUCT: &str = "Unknown Product";

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    #[error("product not found")]
    ProductNotFound,

    #[error("cart item not found")]
    ItemNotFound,

    #[error("quantity must be at least {minimum}")]
    QuantityBelowMinimum { minimum: u32 },

    #[error("printing instructions are required")]
    MissingInstructions,

    #[error("upload at least one design")]
    MissingDesign,

    #[error("cart total is too large: {0}")]
    TotalTooLarge(#[from] MoneyError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Add-to-cart form.
#[derive(Debug, Clone, Deserialize)]
pub struct AddToCart {
    pub product_id: ProductId,
    pub quantity: u32,
    #[serde(default)]
    pub design_urls: Vec<String>,
    #[serde(default)]
    pub instructions: String,
}

/// A cart line as shown to the buyer.
#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    #[serde(flatten)]
    pub item: CartItem,
    pub product_name: String,
    pub thumbnail: Option<String>,
    pub total_price: Money,
}

/// The buyer's cart with a subtotal for the current selection.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub lines: Vec<CartLine>,
    /// Selected ids that are actually in the cart.
    pub selected: Vec<CartItemId>,
    /// Total of the selected lines; zero when nothing is selected.
    pub subtotal: Money,
}

/// Check a quantity against a product's minimum order.
///
/// # Errors
///
/// Returns `CartError::QuantityBelowMinimum` when the quantity is too small.
pub fn validate_quantity(product: &Product, quantity: u32) -> Result<(), CartError> {
    let minimum = product.minimum_order_quantity.max(1);
    if quantity < minimum {
        return Err(CartError::QuantityBelowMinimum { minimum });
    }
    Ok(())
}

/// Build a cart line from the form and the live product.
///
/// # Errors
///
/// Returns a `CartError` when quantity, instructions or designs are invalid.
pub fn validate_line(product: &Product, form: &AddToCart) -> Result<NewCartItem, CartError> {
    validate_quantity(product, form.quantity)?;
    product.price.times(form.quantity)?;

    let instructions = form.instructions.trim();
    if instructions.is_empty() {
        return Err(CartError::MissingInstructions);
    }

    let design_urls: Vec<String> = form
        .design_urls
        .iter()
        .map(|url| url.trim())
        .filter(|url| !url.is_empty())
        .map(str::to_owned)
        .collect();
    if design_urls.is_empty() {
        return Err(CartError::MissingDesign);
    }

    Ok(NewCartItem {
        product_id: product.id,
        seller_id: product.seller_id,
        quantity: form.quantity,
        design_urls,
        instructions: instructions.to_owned(),
        unit_price: product.price,
    })
}

/// Cart service.
pub struct CartService<'a> {
    store: &'a dyn MarketplaceStore,
}

impl<'a> CartService<'a> {
    /// Create a new cart service.
    #[must_use]
    pub const fn new(store: &'a dyn MarketplaceStore) -> Self {
        Self { store }
    }

    /// The buyer's cart, with a subtotal over `selected`.
    ///
    /// # Errors
    ///
    /// Returns `CartError::TotalTooLarge` when a line or the subtotal is
    /// not storable and `CartError::Repository` if the store fails.
    pub async fn view(
        &self,
        buyer_id: BuyerId,
        selected: &[CartItemId],
    ) -> Result<CartView, CartError> {
        let items = self.store.get_cart(buyer_id).await?;

        let product_ids: Vec<ProductId> = items.iter().map(|i| i.product_id).collect();
        let products: HashMap<ProductId, Product> = self
            .store
            .get_products(&product_ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let mut view = CartView {
            lines: Vec::with_capacity(items.len()),
            selected: Vec::new(),
            subtotal: Money::ZERO,
        };
        for item in items {
            let product = products.get(&item.product_id);
            let total_price = item.total_price()?;
            if selected.contains(&item.id) {
                view.selected.push(item.id);
                view.subtotal = view.subtotal.checked_add(total_price)?;
            }
            view.lines.push(CartLine {
                product_name: product.map_or_else(|| UNKNOWN_PRODUCT.to_owned(), |p| p.name.clone()),
                thumbnail: product.and_then(Product::thumbnail).map(str::to_owned),
                total_price,
                item,
            });
        }

        Ok(view)
    }

    /// Add a line to the buyer's cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ProductNotFound` for unknown products and the
    /// validation errors of [`validate_line`].
    pub async fn add(&self, buyer_id: BuyerId, form: &AddToCart) -> Result<CartItem, CartError> {
        let product = self
            .store
            .get_product(form.product_id)
            .await?
            .ok_or(CartError::ProductNotFound)?;

        let line = validate_line(&product, form)?;
        let item = self.store.add_cart_item(buyer_id, &line).await?;

        tracing::info!(
            buyer_id = %buyer_id,
            product_id = %product.id,
            quantity = item.quantity,
            "Added item to cart"
        );
        Ok(item)
    }

    /// Change a line's quantity.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ItemNotFound` if the line is not in this cart,
    /// `ProductNotFound` if its product was deleted, and
    /// `QuantityBelowMinimum` for too small a quantity and `TotalTooLarge`
    /// when the new line total is not storable.
    pub async fn update_quantity(
        &self,
        buyer_id: BuyerId,
        id: CartItemId,
        quantity: u32,
    ) -> Result<CartItem, CartError> {
        let item = self
            .store
            .get_cart(buyer_id)
            .await?
            .into_iter()
            .find(|item| item.id == id)
            .ok_or(CartError::ItemNotFound)?;

        let product = self
            .store
            .get_product(item.product_id)
            .await?
            .ok_or(CartError::ProductNotFound)?;
        validate_quantity(&product, quantity)?;
        item.unit_price.times(quantity)?;

        self.store
            .update_cart_item_quantity(buyer_id, id, quantity)
            .await
            .map_err(not_found_as_item)
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ItemNotFound` if the line is not in this cart.
    pub async fn remove(&self, buyer_id: BuyerId, id: CartItemId) -> Result<(), CartError> {
        self.store
            .remove_cart_item(buyer_id, id)
            .await
            .map_err(not_found_as_item)
    }
}

fn not_found_as_item(e: RepositoryError) -> CartError {
    match e {
        RepositoryError::NotFound => CartError::ItemNotFound,
        other => CartError::Repository(other),
    }
}
