//! Order domain types and status-change rules.
//!
//! One order is written per checkout. Its items are split into one
//! [`SellerOrder`] fragment per press. Each [`OrderItem`] has a single stored
//! status that both the buyer's order and the seller's fragment read, so the
//! two views cannot drift apart.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use printhub_core::{
    BuyerId, Money, OrderId, OrderItemId, OrderStatus, PaymentMethod, ProductId, SellerId,
    SellerOrderId, StatusTransitionError,
};

use crate::db::RepositoryError;

/// Buyer contact and delivery details captured at checkout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeliveryDetails {
    pub name: String,
    pub phone: String,
    pub city: String,
    pub postal_code: String,
    pub address: String,
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

impl DeliveryDetails {
    /// Names of the fields that are blank after trimming.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("name", &self.name),
            ("phone", &self.phone),
            ("city", &self.city),
            ("postal_code", &self.postal_code),
            ("address", &self.address),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect()
    }

    /// Copy with surrounding whitespace removed from every field.
    #[must_use]
    pub fn trimmed(&self) -> Self {
        Self {
            name: self.name.trim().to_owned(),
            phone: self.phone.trim().to_owned(),
            city: self.city.trim().to_owned(),
            postal_code: self.postal_code.trim().to_owned(),
            address: self.address.trim().to_owned(),
            payment_method: self.payment_method,
        }
    }
}

/// One purchased line, snapshotted from the cart at checkout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub seller_order_id: SellerOrderId,
    pub product_id: ProductId,
    pub seller_id: SellerId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub total_price: Money,
    pub design_urls: Vec<String>,
    pub instructions: String,
    pub status: OrderStatus,
    pub updated_at: DateTime<Utc>,
}

/// Buyer-facing order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Order {
    pub id: OrderId,
    pub buyer_id: BuyerId,
    pub delivery: DeliveryDetails,
    pub items: Vec<OrderItem>,
    pub total_price: Money,
    pub placed_at: DateTime<Utc>,
}

impl Order {
    /// Combined status of all items.
    #[must_use]
    pub fn status(&self) -> OrderStatus {
        let statuses: Vec<OrderStatus> = self.items.iter().map(|i| i.status).collect();
        OrderStatus::aggregate(&statuses)
    }
}

/// The part of an order that one press fulfils.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SellerOrder {
    pub id: SellerOrderId,
    pub order_id: OrderId,
    pub seller_id: SellerId,
    pub buyer_id: BuyerId,
    pub delivery: DeliveryDetails,
    pub items: Vec<OrderItem>,
    pub placed_at: DateTime<Utc>,
}

impl SellerOrder {
    /// Total of this press's items.
    #[must_use]
    pub fn total_price(&self) -> Money {
        self.items.iter().map(|i| i.total_price).sum()
    }
}

/// Result of a successful checkout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlacedOrder {
    pub order: Order,
    pub seller_orders: Vec<SellerOrder>,
}

/// Who is asking for a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusActor {
    Buyer(BuyerId),
    Seller(SellerId),
}

/// Outcome of an applied status change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusChange {
    pub item: OrderItem,
    pub previous: OrderStatus,
    /// Units returned to product inventory by a cancellation.
    pub restocked: u32,
}

/// Reasons a status change is refused.
#[derive(Debug, Error)]
pub enum StatusChangeError {
    /// No such item visible to the actor.
    #[error("order item not found")]
    NotFound,

    /// Buyers may only cancel, and only while the item is pending.
    #[error("buyers can only cancel items that are still pending")]
    NotPermitted,

    /// The status machine rejects the move.
    #[error(transparent)]
    Transition(#[from] StatusTransitionError),

    /// The item changed between read and write.
    #[error("order item was updated concurrently, reload and retry")]
    Stale,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Decide whether `actor` may move `item` to `next`.
///
/// Sellers may apply any valid transition to their own items. Buyers may only
/// cancel their own pending items; the caller has already checked that the
/// item belongs to the buyer's order.
///
/// # Errors
///
/// Returns `StatusChangeError::NotFound` when a seller targets another
/// press's item, `NotPermitted` for disallowed buyer actions, and
/// `Transition` when the status machine refuses the move.
pub fn authorize_status_change(
    actor: StatusActor,
    item: &OrderItem,
    next: OrderStatus,
) -> Result<OrderStatus, StatusChangeError> {
    match actor {
        StatusActor::Seller(seller_id) if seller_id != item.seller_id => {
            Err(StatusChangeError::NotFound)
        }
        StatusActor::Seller(_) => Ok(item.status.transition_to(next)?),
        StatusActor::Buyer(_) => {
            if next != OrderStatus::Cancelled || item.status != OrderStatus::Pending {
                return Err(StatusChangeError::NotPermitted);
            }
            Ok(item.status.transition_to(next)?)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(status: OrderStatus) -> OrderItem {
        OrderItem {
            id: OrderItemId::new(1),
            order_id: OrderId::new(1),
            seller_order_id: SellerOrderId::new(1),
            product_id: ProductId::new(1),
            seller_id: SellerId::new(10),
            product_name: "Visiting Cards".to_owned(),
            quantity: 100,
            unit_price: Money::from_rupees(5),
            total_price: Money::from_rupees(500),
            design_urls: vec![],
            instructions: "Matte finish".to_owned(),
            status,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_missing_fields_reports_blank_values() {
        let details = DeliveryDetails {
            name: "Ayesha".to_owned(),
            phone: "  ".to_owned(),
            city: "Lahore".to_owned(),
            postal_code: String::new(),
            address: "12 Mall Road".to_owned(),
            payment_method: PaymentMethod::CashOnDelivery,
        };
        assert_eq!(details.missing_fields(), vec!["phone", "postal_code"]);
    }

    #[test]
    fn test_seller_moves_own_item_forward() {
        let next = authorize_status_change(
            StatusActor::Seller(SellerId::new(10)),
            &item(OrderStatus::Pending),
            OrderStatus::Processing,
        )
        .unwrap();
        assert_eq!(next, OrderStatus::Processing);
    }

    #[test]
    fn test_seller_cannot_touch_other_press_item() {
        let result = authorize_status_change(
            StatusActor::Seller(SellerId::new(11)),
            &item(OrderStatus::Pending),
            OrderStatus::Processing,
        );
        assert!(matches!(result, Err(StatusChangeError::NotFound)));
    }

    #[test]
    fn test_seller_cannot_move_backwards() {
        let result = authorize_status_change(
            StatusActor::Seller(SellerId::new(10)),
            &item(OrderStatus::OutForDelivery),
            OrderStatus::Pending,
        );
        assert!(matches!(result, Err(StatusChangeError::Transition(_))));
    }

    #[test]
    fn test_buyer_may_only_cancel_pending() {
        let buyer = StatusActor::Buyer(BuyerId::new(3));
        assert!(
            authorize_status_change(buyer, &item(OrderStatus::Pending), OrderStatus::Cancelled)
                .is_ok()
        );
        assert!(matches!(
            authorize_status_change(buyer, &item(OrderStatus::Processing), OrderStatus::Cancelled),
            Err(StatusChangeError::NotPermitted)
        ));
        assert!(matches!(
            authorize_status_change(buyer, &item(OrderStatus::Pending), OrderStatus::Delivered),
            Err(StatusChangeError::NotPermitted)
        ));
    }

    #[test]
    fn test_order_status_aggregates_items() {
        let mut first = item(OrderStatus::Delivered);
        first.id = OrderItemId::new(2);
        let order = Order {
            id: OrderId::new(1),
            buyer_id: BuyerId::new(3),
            delivery: DeliveryDetails {
                name: "A".to_owned(),
                phone: "1".to_owned(),
                city: "C".to_owned(),
                postal_code: "5".to_owned(),
                address: "X".to_owned(),
                payment_method: PaymentMethod::CashOnDelivery,
            },
            items: vec![first, item(OrderStatus::Processing)],
            total_price: Money::from_rupees(1000),
            placed_at: Utc::now(),
        };
        assert_eq!(order.status(), OrderStatus::Processing);
    }
}
