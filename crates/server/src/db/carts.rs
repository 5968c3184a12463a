//! Cart repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use printhub_core::{BuyerId, CartItemId, Money, ProductId, SellerId};

use super::{RepositoryError, quantity_from_db, quantity_to_db};
use crate::models::{CartItem, NewCartItem};

#[derive(sqlx::FromRow)]
pub(crate) struct CartItemRow {
    id: i32,
    buyer_id: i32,
    product_id: i32,
    seller_id: i32,
    quantity: i32,
    design_urls: Vec<String>,
    instructions: String,
    unit_price: Decimal,
    added_at: DateTime<Utc>,
}

impl TryFrom<CartItemRow> for CartItem {
    type Error = RepositoryError;

    fn try_from(r: CartItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: CartItemId::new(r.id),
            buyer_id: BuyerId::new(r.buyer_id),
            product_id: ProductId::new(r.product_id),
            seller_id: SellerId::new(r.seller_id),
            quantity: quantity_from_db(r.quantity, "quantity")?,
            design_urls: r.design_urls,
            instructions: r.instructions,
            unit_price: Money::new(r.unit_price),
            added_at: r.added_at,
        })
    }
}

pub(crate) const CART_COLUMNS: &str = "id, buyer_id, product_id, seller_id, quantity, \
     design_urls, instructions, unit_price, added_at";

/// Repository for cart database operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List a buyer's cart lines in the order they were added.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, buyer_id: BuyerId) -> Result<Vec<CartItem>, RepositoryError> {
        let rows: Vec<CartItemRow> = sqlx::query_as(&format!(
            "SELECT {CART_COLUMNS} FROM printhub.cart_item WHERE buyer_id = $1 ORDER BY id"
        ))
        .bind(buyer_id.as_i32())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(CartItem::try_from).collect()
    }

    /// Add a line to a buyer's cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn add(
        &self,
        buyer_id: BuyerId,
        item: &NewCartItem,
    ) -> Result<CartItem, RepositoryError> {
        let row: CartItemRow = sqlx::query_as(&format!(
            r"
            INSERT INTO printhub.cart_item
                (buyer_id, product_id, seller_id, quantity, design_urls, instructions, unit_price)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {CART_COLUMNS}
            "
        ))
        .bind(buyer_id.as_i32())
        .bind(item.product_id.as_i32())
        .bind(item.seller_id.as_i32())
        .bind(quantity_to_db(item.quantity, "quantity")?)
        .bind(&item.design_urls)
        .bind(&item.instructions)
        .bind(item.unit_price)
        .fetch_one(self.pool)
        .await?;

        row.try_into()
    }

    /// Change the quantity of one of the buyer's lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line is not in this cart.
    pub async fn update_quantity(
        &self,
        buyer_id: BuyerId,
        id: CartItemId,
        quantity: u32,
    ) -> Result<CartItem, RepositoryError> {
        let row: Option<CartItemRow> = sqlx::query_as(&format!(
            r"
            UPDATE printhub.cart_item SET quantity = $3
            WHERE id = $1 AND buyer_id = $2
            RETURNING {CART_COLUMNS}
            "
        ))
        .bind(id.as_i32())
        .bind(buyer_id.as_i32())
        .bind(quantity_to_db(quantity, "quantity")?)
        .fetch_optional(self.pool)
        .await?;

        row.ok_or(RepositoryError::NotFound)?.try_into()
    }

    /// Remove one of the buyer's lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line is not in this cart.
    pub async fn remove(&self, buyer_id: BuyerId, id: CartItemId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM printhub.cart_item WHERE id = $1 AND buyer_id = $2")
            .bind(id.as_i32())
            .bind(buyer_id.as_i32())
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
