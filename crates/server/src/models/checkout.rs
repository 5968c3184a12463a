//! Checkout planning.
//!
//! [`plan_checkout`] is the pure half of the checkout orchestrator: given the
//! selected cart lines and a fresh read of their products it either collects
//! every stock violation or produces the exact writes the store must apply.
//! Stores call it while holding their product locks, so the plan is checked
//! against the same inventory it decrements.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use printhub_core::{BuyerId, CartItemId, Money, MoneyError, ProductId, SellerId};

use super::cart::CartItem;
use super::order::DeliveryDetails;
use super::product::Product;
use crate::db::RepositoryError;

/// A validated request to turn cart lines into an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub buyer_id: BuyerId,
    /// Selected cart lines, deduplicated.
    pub cart_item_ids: Vec<CartItemId>,
    /// Trimmed delivery details.
    pub delivery: DeliveryDetails,
}

/// Why a selected line cannot be bought.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StockViolationReason {
    /// The product has been removed from the catalog.
    ProductNotFound,
    /// The product has no units left.
    OutOfStock,
    /// Fewer units remain than the line asks for.
    InsufficientStock,
}

impl StockViolationReason {
    /// Message shown next to the offending line.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ProductNotFound => "product is no longer available",
            Self::OutOfStock => "product is out of stock",
            Self::InsufficientStock => "not enough stock for the requested quantity",
        }
    }
}

/// One offending cart line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StockViolation {
    pub cart_item_id: CartItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub requested: u32,
    /// Units left for this line after earlier lines of the same product.
    pub available: u32,
    pub reason: StockViolationReason,
}

/// A line that passed the stock check, with the product name snapshotted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedItem {
    pub cart_item: CartItem,
    pub product_name: String,
    pub total_price: Money,
}

/// Everything a store writes for one checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutPlan {
    /// Lines grouped by owning press, in seller id order.
    pub by_seller: BTreeMap<SellerId, Vec<PlannedItem>>,
    /// Units to take from each product.
    pub decrements: BTreeMap<ProductId, u32>,
    pub total: Money,
}

impl CheckoutPlan {
    /// Cart lines consumed by this plan.
    pub fn cart_item_ids(&self) -> impl Iterator<Item = CartItemId> + '_ {
        self.by_seller
            .values()
            .flatten()
            .map(|planned| planned.cart_item.id)
    }
}

/// Reasons a checkout is refused.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Delivery form has blank fields.
    #[error("delivery details are incomplete")]
    InvalidDelivery(Vec<String>),

    /// No cart lines were selected.
    #[error("select at least one cart item to check out")]
    EmptySelection,

    /// Some selected ids are not lines in the buyer's cart.
    #[error("some selected items are not in your cart")]
    UnknownCartItems(Vec<CartItemId>),

    /// Stock check failed for one or more lines.
    #[error("some items cannot be ordered")]
    OutOfStock(Vec<StockViolation>),

    /// A line or the order total does not fit a stored amount.
    #[error("order total is too large: {0}")]
    TotalTooLarge(#[from] MoneyError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Check every selected line against live inventory and build the writes.
///
/// Lines for the same product draw from one running stock figure, so two
/// lines of 3 against 5 units fail on the second line. Every violation is
/// collected before returning.
///
/// # Errors
///
/// Returns `CheckoutError::OutOfStock` with the full list of violations when
/// any line cannot be met, and `CheckoutError::TotalTooLarge` when a line or
/// the order total is not storable.
pub fn plan_checkout(
    items: &[CartItem],
    products: &HashMap<ProductId, Product>,
) -> Result<CheckoutPlan, CheckoutError> {
    let mut remaining: HashMap<ProductId, u32> = products
        .iter()
        .map(|(id, product)| (*id, product.inventory_quantity))
        .collect();
    let mut violations = Vec::new();
    let mut by_seller: BTreeMap<SellerId, Vec<PlannedItem>> = BTreeMap::new();
    let mut decrements: BTreeMap<ProductId, u32> = BTreeMap::new();
    let mut total = Money::ZERO;

    for item in items {
        let Some(product) = products.get(&item.product_id) else {
            violations.push(StockViolation {
                cart_item_id: item.id,
                product_id: item.product_id,
                product_name: "Unknown Product".to_owned(),
                requested: item.quantity,
                available: 0,
                reason: StockViolationReason::ProductNotFound,
            });
            continue;
        };

        let left = remaining.get(&item.product_id).copied().unwrap_or(0);
        let reason = if left == 0 {
            Some(StockViolationReason::OutOfStock)
        } else if left < item.quantity {
            Some(StockViolationReason::InsufficientStock)
        } else {
            None
        };

        if let Some(reason) = reason {
            violations.push(StockViolation {
                cart_item_id: item.id,
                product_id: item.product_id,
                product_name: product.name.clone(),
                requested: item.quantity,
                available: left,
                reason,
            });
            continue;
        }

        let total_price = item.total_price()?;
        total = total.checked_add(total_price)?;
        remaining.insert(item.product_id, left - item.quantity);
        *decrements.entry(item.product_id).or_default() += item.quantity;
        by_seller
            .entry(product.seller_id)
            .or_default()
            .push(PlannedItem {
                cart_item: item.clone(),
                product_name: product.name.clone(),
                total_price,
            });
    }

    if violations.is_empty() {
        Ok(CheckoutPlan {
            by_seller,
            decrements,
            total,
        })
    } else {
        Err(CheckoutError::OutOfStock(violations))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn product(id: i32, seller: i32, stock: u32) -> Product {
        Product {
            id: ProductId::new(id),
            seller_id: SellerId::new(seller),
            name: format!("Product {id}"),
            description: String::new(),
            price: Money::from_rupees(50),
            inventory_quantity: stock,
            minimum_order_quantity: 1,
            category: "Flyers".to_owned(),
            image_urls: vec!["https://img.example/p.png".to_owned()],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn line(id: i32, product: &Product, quantity: u32) -> CartItem {
        CartItem {
            id: CartItemId::new(id),
            buyer_id: BuyerId::new(1),
            product_id: product.id,
            seller_id: product.seller_id,
            quantity,
            design_urls: vec!["https://img.example/d.png".to_owned()],
            instructions: "Glossy".to_owned(),
            unit_price: product.price,
            added_at: Utc::now(),
        }
    }

    fn catalog(products: &[Product]) -> HashMap<ProductId, Product> {
        products.iter().map(|p| (p.id, p.clone())).collect()
    }

    fn violations(result: Result<CheckoutPlan, CheckoutError>) -> Vec<StockViolation> {
        match result {
            Err(CheckoutError::OutOfStock(violations)) => violations,
            other => panic!("expected stock violations, got {other:?}"),
        }
    }

    #[test]
    fn test_plan_groups_by_seller_and_totals() {
        let a = product(1, 10, 5);
        let b = product(2, 20, 5);
        let items = vec![line(1, &a, 2), line(2, &b, 3)];
        let plan = plan_checkout(&items, &catalog(&[a, b])).unwrap();

        assert_eq!(plan.by_seller.len(), 2);
        assert_eq!(plan.by_seller[&SellerId::new(10)].len(), 1);
        assert_eq!(plan.by_seller[&SellerId::new(20)].len(), 1);
        assert_eq!(plan.total, Money::from_rupees(250));
        assert_eq!(plan.decrements[&ProductId::new(1)], 2);
        assert_eq!(plan.cart_item_ids().count(), 2);
    }

    #[test]
    fn test_plan_collects_every_violation() {
        let a = product(1, 10, 0);
        let b = product(2, 10, 2);
        let gone = product(3, 10, 9);
        let items = vec![line(1, &a, 1), line(2, &b, 3), line(3, &gone, 1)];
        let violations = violations(plan_checkout(&items, &catalog(&[a, b])));

        let reasons: Vec<_> = violations.iter().map(|v| v.reason).collect();
        assert_eq!(
            reasons,
            vec![
                StockViolationReason::OutOfStock,
                StockViolationReason::InsufficientStock,
                StockViolationReason::ProductNotFound,
            ]
        );
        assert_eq!(violations[1].available, 2);
        assert_eq!(violations[2].product_name, "Unknown Product");
    }

    #[test]
    fn test_lines_of_same_product_share_stock() {
        let a = product(1, 10, 5);
        let items = vec![line(1, &a, 3), line(2, &a, 3)];
        let violations = violations(plan_checkout(&items, &catalog(&[a])));

        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].cart_item_id, CartItemId::new(2));
        assert_eq!(violations[0].available, 2);
    }

    #[test]
    fn test_exact_stock_is_allowed() {
        let a = product(1, 10, 4);
        let items = vec![line(1, &a, 4)];
        let plan = plan_checkout(&items, &catalog(&[a])).unwrap();
        assert_eq!(plan.decrements[&ProductId::new(1)], 4);
    }

    #[test]
    fn test_unstorable_total_is_refused() {
        let mut a = product(1, 10, 10);
        a.price = Money::from_rupees(6_000_000_000);
        let b = product(2, 20, 10);

        let plan = plan_checkout(&[line(1, &a, 1)], &catalog(&[a.clone()])).unwrap();
        assert_eq!(plan.by_seller[&SellerId::new(10)][0].total_price, a.price);

        let items = vec![line(1, &a, 1), line(2, &b, 1), line(3, &a, 1)];
        assert!(matches!(
            plan_checkout(&items, &catalog(&[a.clone(), b])),
            Err(CheckoutError::TotalTooLarge(MoneyError::Overflow))
        ));
        assert!(matches!(
            plan_checkout(&[line(1, &a, 2)], &catalog(&[a])),
            Err(CheckoutError::TotalTooLarge(_))
        ));
    }
}
