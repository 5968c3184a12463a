//! Product repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use printhub_core::{Money, ProductId, SellerId};

use super::{RepositoryError, quantity_from_db, quantity_to_db};
use crate::models::{CategoryCount, Product, ProductFilter, ProductInput};

#[derive(sqlx::FromRow)]
pub(crate) struct ProductRow {
    id: i32,
    seller_id: i32,
    name: String,
    description: String,
    price: Decimal,
    inventory_quantity: i32,
    minimum_order_quantity: i32,
    category: String,
    image_urls: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(r: ProductRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ProductId::new(r.id),
            seller_id: SellerId::new(r.seller_id),
            name: r.name,
            description: r.description,
            price: Money::new(r.price),
            inventory_quantity: quantity_from_db(r.inventory_quantity, "inventory_quantity")?,
            minimum_order_quantity: quantity_from_db(
                r.minimum_order_quantity,
                "minimum_order_quantity",
            )?,
            category: r.category,
            image_urls: r.image_urls,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

pub(crate) const PRODUCT_COLUMNS: &str = "id, seller_id, name, description, price, \
     inventory_quantity, minimum_order_quantity, category, image_urls, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct CategoryRow {
    category: String,
    product_count: i64,
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a product for a press.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        seller_id: SellerId,
        input: &ProductInput,
    ) -> Result<Product, RepositoryError> {
        let row: ProductRow = sqlx::query_as(&format!(
            r"
            INSERT INTO printhub.product
                (seller_id, name, description, price, inventory_quantity,
                 minimum_order_quantity, category, image_urls)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(seller_id.as_i32())
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.price)
        .bind(quantity_to_db(input.inventory_quantity, "inventory_quantity")?)
        .bind(quantity_to_db(
            input.minimum_order_quantity,
            "minimum_order_quantity",
        )?)
        .bind(&input.category)
        .bind(&input.image_urls)
        .fetch_one(self.pool)
        .await?;

        row.try_into()
    }

    /// Overwrite a product owned by `seller_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist or
    /// belongs to another press.
    pub async fn update(
        &self,
        seller_id: SellerId,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<Product, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            r"
            UPDATE printhub.product
            SET name = $3, description = $4, price = $5, inventory_quantity = $6,
                minimum_order_quantity = $7, category = $8, image_urls = $9,
                updated_at = now()
            WHERE id = $1 AND seller_id = $2
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id.as_i32())
        .bind(seller_id.as_i32())
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.price)
        .bind(quantity_to_db(input.inventory_quantity, "inventory_quantity")?)
        .bind(quantity_to_db(
            input.minimum_order_quantity,
            "minimum_order_quantity",
        )?)
        .bind(&input.category)
        .bind(&input.image_urls)
        .fetch_optional(self.pool)
        .await?;

        row.ok_or(RepositoryError::NotFound)?.try_into()
    }

    /// Delete a product owned by `seller_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist or
    /// belongs to another press.
    pub async fn delete(&self, seller_id: SellerId, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM printhub.product WHERE id = $1 AND seller_id = $2")
            .bind(id.as_i32())
            .bind(seller_id.as_i32())
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM printhub.product WHERE id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        row.map(Product::try_from).transpose()
    }

    /// Get the products for a set of IDs, skipping missing ones.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let ids: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM printhub.product WHERE id = ANY($1) ORDER BY id"
        ))
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    /// List a filtered page of products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let search = filter
            .search
            .as_deref()
            .map(|q| format!("%{}%", escape_like(q.trim())));

        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            r"
            SELECT {PRODUCT_COLUMNS}
            FROM printhub.product
            WHERE ($1::text IS NULL OR lower(category) = lower($1))
              AND ($2::int IS NULL OR seller_id = $2)
              AND ($3::text IS NULL OR name ILIKE $3)
            ORDER BY created_at DESC, id DESC
            LIMIT $4 OFFSET $5
            "
        ))
        .bind(filter.category.as_deref())
        .bind(filter.seller_id.map(|s| s.as_i32()))
        .bind(search)
        .bind(i64::from(filter.limit))
        .bind(i64::from(filter.offset))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    /// List every product of one press, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_seller(
        &self,
        seller_id: SellerId,
    ) -> Result<Vec<Product>, RepositoryError> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            r"
            SELECT {PRODUCT_COLUMNS}
            FROM printhub.product
            WHERE seller_id = $1
            ORDER BY created_at DESC, id DESC
            "
        ))
        .bind(seller_id.as_i32())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    /// Distinct categories with product counts, alphabetically.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn categories(&self) -> Result<Vec<CategoryCount>, RepositoryError> {
        let rows: Vec<CategoryRow> = sqlx::query_as(
            r"
            SELECT category, COUNT(*) AS product_count
            FROM printhub.product
            GROUP BY category
            ORDER BY category
            ",
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                Ok(CategoryCount {
                    category: r.category,
                    product_count: u32::try_from(r.product_count).map_err(|_| {
                        RepositoryError::DataCorruption(format!(
                            "category count out of range: {}",
                            r.product_count
                        ))
                    })?,
                })
            })
            .collect()
    }
}

/// Escape `%`, `_` and `\` for use inside a LIKE pattern.
pub(super) fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50% off_now"), "50\\% off\\_now");
        assert_eq!(escape_like("cards"), "cards");
    }
}
