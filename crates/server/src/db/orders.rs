//! Order repository, including the transactional checkout.
//!
//! Checkout runs in one transaction. Selected cart lines and their products
//! are locked with `SELECT ... FOR UPDATE` (products in id order so
//! concurrent checkouts cannot deadlock), the plan is computed against the
//! locked rows, and inventory is decremented with a guarded update so the
//! `inventory_quantity >= 0` invariant holds even without the lock.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use printhub_core::{
    BuyerId, CartItemId, Money, OrderId, OrderItemId, OrderStatus, PaymentMethod, ProductId,
    SellerId, SellerOrderId,
};

use super::carts::{CART_COLUMNS, CartItemRow};
use super::products::{PRODUCT_COLUMNS, ProductRow};
use super::{RepositoryError, quantity_from_db, quantity_to_db};
use crate::models::{
    CartItem, CheckoutError, CheckoutRequest, DeliveryDetails, Order, OrderItem, PlacedOrder,
    Product, SellerOrder, StatusActor, StatusChange, StatusChangeError, authorize_status_change,
    plan_checkout,
};

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: i32,
    order_id: i32,
    seller_order_id: i32,
    product_id: i32,
    seller_id: i32,
    product_name: String,
    quantity: i32,
    unit_price: Decimal,
    total_price: Decimal,
    design_urls: Vec<String>,
    instructions: String,
    status: OrderStatus,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = RepositoryError;

    fn try_from(r: OrderItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: OrderItemId::new(r.id),
            order_id: OrderId::new(r.order_id),
            seller_order_id: SellerOrderId::new(r.seller_order_id),
            product_id: ProductId::new(r.product_id),
            seller_id: SellerId::new(r.seller_id),
            product_name: r.product_name,
            quantity: quantity_from_db(r.quantity, "quantity")?,
            unit_price: Money::new(r.unit_price),
            total_price: Money::new(r.total_price),
            design_urls: r.design_urls,
            instructions: r.instructions,
            status: r.status,
            updated_at: r.updated_at,
        })
    }
}

const ITEM_COLUMNS: &str = "id, order_id, seller_order_id, product_id, seller_id, product_name, \
     quantity, unit_price, total_price, design_urls, instructions, status, updated_at";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i32,
    buyer_id: i32,
    delivery_name: String,
    delivery_phone: String,
    delivery_city: String,
    delivery_postal_code: String,
    delivery_address: String,
    payment_method: PaymentMethod,
    total_price: Decimal,
    placed_at: DateTime<Utc>,
}

impl OrderRow {
    fn delivery(&self) -> DeliveryDetails {
        DeliveryDetails {
            name: self.delivery_name.clone(),
            phone: self.delivery_phone.clone(),
            city: self.delivery_city.clone(),
            postal_code: self.delivery_postal_code.clone(),
            address: self.delivery_address.clone(),
            payment_method: self.payment_method,
        }
    }
}

const ORDER_COLUMNS: &str = "o.id, o.buyer_id, o.delivery_name, o.delivery_phone, \
     o.delivery_city, o.delivery_postal_code, o.delivery_address, o.payment_method, \
     o.total_price, o.placed_at";

#[derive(sqlx::FromRow)]
struct SellerOrderRow {
    seller_order_id: i32,
    seller_id: i32,
    #[sqlx(flatten)]
    order: OrderRow,
}

#[derive(sqlx::FromRow)]
struct StatusTargetRow {
    #[sqlx(flatten)]
    item: OrderItemRow,
    buyer_id: i32,
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Place an order from the selected cart lines.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::UnknownCartItems` when a selected line is not
    /// in the buyer's cart, `CheckoutError::OutOfStock` with every violation
    /// when stock is short, and `CheckoutError::Repository` on database
    /// failure. Nothing is written in any error case.
    pub async fn place(&self, request: &CheckoutRequest) -> Result<PlacedOrder, CheckoutError> {
        if request.cart_item_ids.is_empty() {
            return Err(CheckoutError::EmptySelection);
        }

        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        let items = lock_cart_items(&mut tx, request.buyer_id, &request.cart_item_ids).await?;
        let unknown: Vec<CartItemId> = request
            .cart_item_ids
            .iter()
            .filter(|id| !items.iter().any(|item| item.id == **id))
            .copied()
            .collect();
        if !unknown.is_empty() {
            return Err(CheckoutError::UnknownCartItems(unknown));
        }

        let products = lock_products(&mut tx, &items).await?;
        let plan = plan_checkout(&items, &products)?;

        let delivery = &request.delivery;
        let order_row: OrderRow = sqlx::query_as(&format!(
            r"
            INSERT INTO printhub.customer_order AS o
                (buyer_id, delivery_name, delivery_phone, delivery_city,
                 delivery_postal_code, delivery_address, payment_method, total_price)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(request.buyer_id.as_i32())
        .bind(&delivery.name)
        .bind(&delivery.phone)
        .bind(&delivery.city)
        .bind(&delivery.postal_code)
        .bind(&delivery.address)
        .bind(delivery.payment_method)
        .bind(plan.total)
        .fetch_one(&mut *tx)
        .await
        .map_err(RepositoryError::from)?;
        let order_id = OrderId::new(order_row.id);

        let mut all_items = Vec::new();
        let mut seller_orders = Vec::with_capacity(plan.by_seller.len());
        for (seller_id, planned) in &plan.by_seller {
            let seller_order_id: i32 = sqlx::query_scalar(
                "INSERT INTO printhub.seller_order (order_id, seller_id) VALUES ($1, $2) RETURNING id",
            )
            .bind(order_id.as_i32())
            .bind(seller_id.as_i32())
            .fetch_one(&mut *tx)
            .await
            .map_err(RepositoryError::from)?;

            let mut fragment_items = Vec::with_capacity(planned.len());
            for line in planned {
                let item = &line.cart_item;
                let row: OrderItemRow = sqlx::query_as(&format!(
                    r"
                    INSERT INTO printhub.order_item
                        (order_id, seller_order_id, product_id, seller_id, product_name,
                         quantity, unit_price, total_price, design_urls, instructions, status)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                    RETURNING {ITEM_COLUMNS}
                    "
                ))
                .bind(order_id.as_i32())
                .bind(seller_order_id)
                .bind(item.product_id.as_i32())
                .bind(seller_id.as_i32())
                .bind(&line.product_name)
                .bind(quantity_to_db(item.quantity, "quantity")?)
                .bind(item.unit_price)
                .bind(line.total_price)
                .bind(&item.design_urls)
                .bind(&item.instructions)
                .bind(OrderStatus::Pending)
                .fetch_one(&mut *tx)
                .await
                .map_err(RepositoryError::from)?;
                fragment_items.push(OrderItem::try_from(row)?);
            }

            all_items.extend(fragment_items.iter().cloned());
            seller_orders.push(SellerOrder {
                id: SellerOrderId::new(seller_order_id),
                order_id,
                seller_id: *seller_id,
                buyer_id: request.buyer_id,
                delivery: order_row.delivery(),
                items: fragment_items,
                placed_at: order_row.placed_at,
            });
        }

        for (product_id, quantity) in &plan.decrements {
            let result = sqlx::query(
                r"
                UPDATE printhub.product
                SET inventory_quantity = inventory_quantity - $1, updated_at = now()
                WHERE id = $2 AND inventory_quantity >= $1
                ",
            )
            .bind(quantity_to_db(*quantity, "quantity")?)
            .bind(product_id.as_i32())
            .execute(&mut *tx)
            .await
            .map_err(RepositoryError::from)?;

            if result.rows_affected() == 0 {
                return Err(RepositoryError::Conflict(format!(
                    "inventory of product {product_id} changed during checkout"
                ))
                .into());
            }
        }

        let purchased: Vec<i32> = plan.cart_item_ids().map(|id| id.as_i32()).collect();
        sqlx::query("DELETE FROM printhub.cart_item WHERE buyer_id = $1 AND id = ANY($2)")
            .bind(request.buyer_id.as_i32())
            .bind(&purchased)
            .execute(&mut *tx)
            .await
            .map_err(RepositoryError::from)?;

        tx.commit().await.map_err(RepositoryError::from)?;

        all_items.sort_by_key(|item| item.id);
        Ok(PlacedOrder {
            order: Order {
                id: order_id,
                buyer_id: request.buyer_id,
                delivery: order_row.delivery(),
                items: all_items,
                total_price: Money::new(order_row.total_price),
                placed_at: order_row.placed_at,
            },
            seller_orders,
        })
    }

    /// List a buyer's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_buyer(&self, buyer_id: BuyerId) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            r"
            SELECT {ORDER_COLUMNS}
            FROM printhub.customer_order o
            WHERE o.buyer_id = $1
            ORDER BY o.placed_at DESC, o.id DESC
            "
        ))
        .bind(buyer_id.as_i32())
        .fetch_all(self.pool)
        .await?;

        let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
        let mut items = self.items_by("order_id", &ids).await?;

        rows.into_iter()
            .map(|row| {
                let items = items.remove(&row.id).unwrap_or_default();
                Ok(assemble_order(row, items))
            })
            .collect()
    }

    /// Get one of a buyer's orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_for_buyer(
        &self,
        buyer_id: BuyerId,
        order_id: OrderId,
    ) -> Result<Option<Order>, RepositoryError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM printhub.customer_order o WHERE o.id = $1 AND o.buyer_id = $2"
        ))
        .bind(order_id.as_i32())
        .bind(buyer_id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut items = self.items_by("order_id", &[row.id]).await?;
        let items = items.remove(&row.id).unwrap_or_default();
        Ok(Some(assemble_order(row, items)))
    }

    /// List a press's order fragments, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_seller(
        &self,
        seller_id: SellerId,
    ) -> Result<Vec<SellerOrder>, RepositoryError> {
        let rows: Vec<SellerOrderRow> = sqlx::query_as(&format!(
            r"
            SELECT so.id AS seller_order_id, so.seller_id, {ORDER_COLUMNS}
            FROM printhub.seller_order so
            JOIN printhub.customer_order o ON o.id = so.order_id
            WHERE so.seller_id = $1
            ORDER BY o.placed_at DESC, so.id DESC
            "
        ))
        .bind(seller_id.as_i32())
        .fetch_all(self.pool)
        .await?;

        let ids: Vec<i32> = rows.iter().map(|r| r.seller_order_id).collect();
        let mut items = self.items_by("seller_order_id", &ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| SellerOrder {
                id: SellerOrderId::new(row.seller_order_id),
                order_id: OrderId::new(row.order.id),
                seller_id: SellerId::new(row.seller_id),
                buyer_id: BuyerId::new(row.order.buyer_id),
                delivery: row.order.delivery(),
                items: items.remove(&row.seller_order_id).unwrap_or_default(),
                placed_at: row.order.placed_at,
            })
            .collect())
    }

    /// Apply a status change to one item.
    ///
    /// The update is conditional on the status read at the start, so two
    /// racing changes cannot both apply. Cancelling restocks the product if
    /// it still exists.
    ///
    /// # Errors
    ///
    /// Returns `StatusChangeError::NotFound` when the item is not visible to
    /// `actor`, `NotPermitted`/`Transition` for rule violations, and `Stale`
    /// when the item changed concurrently.
    pub async fn change_status(
        &self,
        actor: StatusActor,
        item_id: OrderItemId,
        next: OrderStatus,
    ) -> Result<StatusChange, StatusChangeError> {
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        let target: Option<StatusTargetRow> = sqlx::query_as(
            r"
            SELECT i.id, i.order_id, i.seller_order_id, i.product_id, i.seller_id,
                   i.product_name, i.quantity, i.unit_price, i.total_price,
                   i.design_urls, i.instructions, i.status, i.updated_at, o.buyer_id
            FROM printhub.order_item i
            JOIN printhub.customer_order o ON o.id = i.order_id
            WHERE i.id = $1
            ",
        )
        .bind(item_id.as_i32())
        .fetch_optional(&mut *tx)
        .await
        .map_err(RepositoryError::from)?;

        let Some(target) = target else {
            return Err(StatusChangeError::NotFound);
        };
        if let StatusActor::Buyer(buyer_id) = actor
            && buyer_id.as_i32() != target.buyer_id
        {
            return Err(StatusChangeError::NotFound);
        }

        let item = OrderItem::try_from(target.item)?;
        let next = authorize_status_change(actor, &item, next)?;

        let updated: Option<OrderItemRow> = sqlx::query_as(&format!(
            r"
            UPDATE printhub.order_item
            SET status = $2, updated_at = now()
            WHERE id = $1 AND status = $3
            RETURNING {ITEM_COLUMNS}
            "
        ))
        .bind(item.id.as_i32())
        .bind(next)
        .bind(item.status)
        .fetch_optional(&mut *tx)
        .await
        .map_err(RepositoryError::from)?;

        let Some(updated) = updated else {
            return Err(StatusChangeError::Stale);
        };

        let mut restocked = 0;
        if next == OrderStatus::Cancelled {
            let result = sqlx::query(
                r"
                UPDATE printhub.product
                SET inventory_quantity = inventory_quantity + $1, updated_at = now()
                WHERE id = $2
                ",
            )
            .bind(quantity_to_db(item.quantity, "quantity")?)
            .bind(item.product_id.as_i32())
            .execute(&mut *tx)
            .await
            .map_err(RepositoryError::from)?;

            if result.rows_affected() > 0 {
                restocked = item.quantity;
            }
        }

        tx.commit().await.map_err(RepositoryError::from)?;

        Ok(StatusChange {
            item: updated.try_into()?,
            previous: item.status,
            restocked,
        })
    }

    /// Load items grouped by `order_id` or `seller_order_id`.
    async fn items_by(
        &self,
        column: &'static str,
        ids: &[i32],
    ) -> Result<HashMap<i32, Vec<OrderItem>>, RepositoryError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<OrderItemRow> = sqlx::query_as(&format!(
            "SELECT {ITEM_COLUMNS} FROM printhub.order_item WHERE {column} = ANY($1) ORDER BY id"
        ))
        .bind(ids)
        .fetch_all(self.pool)
        .await?;

        let mut grouped: HashMap<i32, Vec<OrderItem>> = HashMap::new();
        for row in rows {
            let key = if column == "seller_order_id" {
                row.seller_order_id
            } else {
                row.order_id
            };
            grouped.entry(key).or_default().push(row.try_into()?);
        }
        Ok(grouped)
    }
}

fn assemble_order(row: OrderRow, items: Vec<OrderItem>) -> Order {
    Order {
        id: OrderId::new(row.id),
        buyer_id: BuyerId::new(row.buyer_id),
        delivery: row.delivery(),
        items,
        total_price: Money::new(row.total_price),
        placed_at: row.placed_at,
    }
}

/// Lock the selected lines of one buyer's cart.
async fn lock_cart_items(
    conn: &mut PgConnection,
    buyer_id: BuyerId,
    ids: &[CartItemId],
) -> Result<Vec<CartItem>, RepositoryError> {
    let ids: Vec<i32> = ids.iter().map(CartItemId::as_i32).collect();
    let rows: Vec<CartItemRow> = sqlx::query_as(&format!(
        r"
        SELECT {CART_COLUMNS}
        FROM printhub.cart_item
        WHERE buyer_id = $1 AND id = ANY($2)
        ORDER BY id
        FOR UPDATE
        "
    ))
    .bind(buyer_id.as_i32())
    .bind(&ids)
    .fetch_all(conn)
    .await?;

    rows.into_iter().map(CartItem::try_from).collect()
}

/// Lock the products behind `items`, in id order.
async fn lock_products(
    conn: &mut PgConnection,
    items: &[CartItem],
) -> Result<HashMap<ProductId, Product>, RepositoryError> {
    let ids: Vec<i32> = items
        .iter()
        .map(|item| item.product_id.as_i32())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let rows: Vec<ProductRow> = sqlx::query_as(&format!(
        r"
        SELECT {PRODUCT_COLUMNS}
        FROM printhub.product
        WHERE id = ANY($1)
        ORDER BY id
        FOR UPDATE
        "
    ))
    .bind(&ids)
    .fetch_all(conn)
    .await?;

    rows.into_iter()
        .map(|row| Product::try_from(row).map(|p| (p.id, p)))
        .collect()
}
