//! Order history and fulfilment status changes.

use thiserror::Error;

use printhub_core::{BuyerId, OrderId, OrderItemId, OrderStatus, SellerId};

use crate::db::{MarketplaceStore, RepositoryError};
use crate::models::{Order, SellerOrder, StatusActor, StatusChange, StatusChangeError};

/// Errors from order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("order not found")]
    NotFound,

    #[error(transparent)]
    Status(#[from] StatusChangeError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Order service for both marketplace sides.
pub struct OrderService<'a> {
    store: &'a dyn MarketplaceStore,
}

impl<'a> OrderService<'a> {
    /// Create a new order service.
    #[must_use]
    pub const fn new(store: &'a dyn MarketplaceStore) -> Self {
        Self { store }
    }

    /// A buyer's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the store fails.
    pub async fn buyer_orders(&self, buyer_id: BuyerId) -> Result<Vec<Order>, OrderError> {
        Ok(self.store.list_buyer_orders(buyer_id).await?)
    }

    /// One of a buyer's orders.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if the order is not the buyer's.
    pub async fn buyer_order(&self, buyer_id: BuyerId, order_id: OrderId) -> Result<Order, OrderError> {
        self.store
            .get_buyer_order(buyer_id, order_id)
            .await?
            .ok_or(OrderError::NotFound)
    }

    /// Cancel one pending item of a buyer's order.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if the item is not in this order and
    /// `OrderError::Status` when the item can no longer be cancelled.
    #[tracing::instrument(skip(self), fields(buyer_id = %buyer_id, order_id = %order_id, item_id = %item_id))]
    pub async fn cancel_item(
        &self,
        buyer_id: BuyerId,
        order_id: OrderId,
        item_id: OrderItemId,
    ) -> Result<StatusChange, OrderError> {
        let order = self.buyer_order(buyer_id, order_id).await?;
        if !order.items.iter().any(|item| item.id == item_id) {
            return Err(OrderError::NotFound);
        }

        let change = self
            .store
            .change_item_status(StatusActor::Buyer(buyer_id), item_id, OrderStatus::Cancelled)
            .await?;

        tracing::info!(restocked = change.restocked, "Buyer cancelled order item");
        Ok(change)
    }

    /// A press's order fragments, newest first.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the store fails.
    pub async fn seller_orders(&self, seller_id: SellerId) -> Result<Vec<SellerOrder>, OrderError> {
        Ok(self.store.list_seller_orders(seller_id).await?)
    }

    /// Move one of the press's items to `next`.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Status` for unknown items, invalid transitions
    /// and lost races.
    #[tracing::instrument(skip(self), fields(seller_id = %seller_id, item_id = %item_id, next = %next))]
    pub async fn update_item_status(
        &self,
        seller_id: SellerId,
        item_id: OrderItemId,
        next: OrderStatus,
    ) -> Result<StatusChange, OrderError> {
        let change = self
            .store
            .change_item_status(StatusActor::Seller(seller_id), item_id, next)
            .await?;

        tracing::info!(
            previous = %change.previous,
            restocked = change.restocked,
            "Order item status changed"
        );
        Ok(change)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use printhub_core::{Email, Money, PaymentMethod};

    use super::*;
    use crate::db::MemoryStore;
    use crate::models::{
        CheckoutRequest, DeliveryDetails, NewBuyer, NewCartItem, NewSeller, PlacedOrder,
        ProductInput,
    };

    struct Fixture {
        store: MemoryStore,
        seller: SellerId,
        buyer: BuyerId,
        placed: PlacedOrder,
    }

    async fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let seller = store
            .create_seller(
                &NewSeller {
                    email: Email::parse("press@example.com").unwrap(),
                    press_name: "Press".to_owned(),
                    owner_number: "1".to_owned(),
                    city: "Quetta".to_owned(),
                    address: "Jinnah Road".to_owned(),
                },
                "hash",
            )
            .await
            .unwrap();
        let buyer = store
            .create_buyer(
                &NewBuyer {
                    email: Email::parse("buyer@example.com").unwrap(),
                    name: "Omar".to_owned(),
                    phone: String::new(),
                },
                "hash",
            )
            .await
            .unwrap();
        let product = store
            .create_product(
                seller.id,
                &ProductInput {
                    name: "Banner".to_owned(),
                    description: String::new(),
                    price: Money::from_rupees(900),
                    inventory_quantity: 4,
                    minimum_order_quantity: 1,
                    category: "Banners".to_owned(),
                    image_urls: vec!["https://img.example/b.png".to_owned()],
                },
            )
            .await
            .unwrap();
        let line = store
            .add_cart_item(
                buyer.id,
                &NewCartItem {
                    product_id: product.id,
                    seller_id: seller.id,
                    quantity: 2,
                    design_urls: vec!["https://img.example/d.png".to_owned()],
                    instructions: "Vinyl".to_owned(),
                    unit_price: product.price,
                },
            )
            .await
            .unwrap();
        let placed = store
            .place_order(&CheckoutRequest {
                buyer_id: buyer.id,
                cart_item_ids: vec![line.id],
                delivery: DeliveryDetails {
                    name: "Omar".to_owned(),
                    phone: "0333".to_owned(),
                    city: "Quetta".to_owned(),
                    postal_code: "87300".to_owned(),
                    address: "Zarghoon Road".to_owned(),
                    payment_method: PaymentMethod::CashOnDelivery,
                },
            })
            .await
            .unwrap();

        Fixture {
            store,
            seller: seller.id,
            buyer: buyer.id,
            placed,
        }
    }

    #[tokio::test]
    async fn test_buyer_cancels_pending_item() {
        let f = fixture().await;
        let service = OrderService::new(&f.store);
        let item = f.placed.order.items[0].id;

        let change = service
            .cancel_item(f.buyer, f.placed.order.id, item)
            .await
            .unwrap();
        assert_eq!(change.item.status, OrderStatus::Cancelled);
        assert_eq!(change.restocked, 2);

        let fragments = service.seller_orders(f.seller).await.unwrap();
        assert_eq!(fragments[0].items[0].status, OrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_cancel_item_from_other_order_is_not_found() {
        let f = fixture().await;
        let service = OrderService::new(&f.store);
        let item = f.placed.order.items[0].id;

        assert!(matches!(
            service
                .cancel_item(f.buyer, OrderId::new(999), item)
                .await,
            Err(OrderError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_seller_status_walk_freezes_at_delivered() {
        let f = fixture().await;
        let service = OrderService::new(&f.store);
        let item = f.placed.order.items[0].id;

        service
            .update_item_status(f.seller, item, OrderStatus::OutForDelivery)
            .await
            .unwrap();
        assert!(matches!(
            service
                .update_item_status(f.seller, item, OrderStatus::Processing)
                .await,
            Err(OrderError::Status(StatusChangeError::Transition(_)))
        ));
        service
            .update_item_status(f.seller, item, OrderStatus::Delivered)
            .await
            .unwrap();
        assert!(matches!(
            service
                .update_item_status(f.seller, item, OrderStatus::Cancelled)
                .await,
            Err(OrderError::Status(StatusChangeError::Transition(_)))
        ));

        let order = service.buyer_order(f.buyer, f.placed.order.id).await.unwrap();
        assert_eq!(order.status(), OrderStatus::Delivered);
    }
}
