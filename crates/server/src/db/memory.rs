//! In-process marketplace store.
//!
//! The whole state sits behind one `tokio::sync::RwLock`; every write takes
//! the write lock for its full duration, which makes checkout, status
//! changes and review posting atomic. Used with `PRINTHUB_STORE=memory` and
//! by the test suites.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use printhub_core::{
    AccountId, AccountRole, BuyerId, CartItemId, Email, OrderId, OrderItemId, OrderStatus,
    ProductId, Rating, ReviewId, SellerId, SellerOrderId,
};

use super::{MarketplaceStore, RepositoryError};
use crate::models::{
    AccountCredentials, Buyer, BuyerProfileUpdate, CartItem, CategoryCount, CheckoutError,
    CheckoutRequest, NewBuyer, NewCartItem, NewReview, NewSeller, Order, OrderItem, PlacedOrder,
    Product, ProductFilter, ProductInput, Review, ReviewError, Seller, SellerFilter, SellerOrder,
    SellerProfileUpdate, StatusActor, StatusChange, StatusChangeError, authorize_status_change,
    plan_checkout,
};

#[derive(Debug, Default)]
struct Sequences {
    account: i32,
    product: i32,
    review: i32,
    cart_item: i32,
    order: i32,
    seller_order: i32,
    order_item: i32,
}

fn next(counter: &mut i32) -> i32 {
    *counter += 1;
    *counter
}

#[derive(Debug, Clone, Copy)]
struct SellerOrderHeader {
    order_id: OrderId,
    seller_id: SellerId,
}

#[derive(Debug, Clone)]
struct StoredReview {
    id: ReviewId,
    product_id: ProductId,
    buyer_id: BuyerId,
    rating: Rating,
    comment: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct State {
    seq: Sequences,
    credentials: BTreeMap<AccountId, AccountCredentials>,
    buyers: BTreeMap<BuyerId, Buyer>,
    sellers: BTreeMap<SellerId, Seller>,
    products: BTreeMap<ProductId, Product>,
    reviews: Vec<StoredReview>,
    cart: BTreeMap<CartItemId, CartItem>,
    /// Order headers; `items` is left empty and filled on read.
    orders: BTreeMap<OrderId, Order>,
    seller_orders: BTreeMap<SellerOrderId, SellerOrderHeader>,
    items: BTreeMap<OrderItemId, OrderItem>,
}

impl State {
    fn email_taken(&self, email: &Email) -> bool {
        self.credentials.values().any(|c| &c.email == email)
    }

    fn insert_account(
        &mut self,
        email: &Email,
        password_hash: &str,
        role: AccountRole,
    ) -> Result<AccountId, RepositoryError> {
        if self.email_taken(email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }
        let id = AccountId::new(next(&mut self.seq.account));
        self.credentials.insert(
            id,
            AccountCredentials {
                id,
                email: email.clone(),
                role,
                password_hash: password_hash.to_owned(),
            },
        );
        Ok(id)
    }

    fn order(&self, id: OrderId) -> Option<Order> {
        let mut order = self.orders.get(&id)?.clone();
        order.items = self
            .items
            .values()
            .filter(|item| item.order_id == id)
            .cloned()
            .collect();
        Some(order)
    }

    fn seller_order(&self, id: SellerOrderId, header: SellerOrderHeader) -> Option<SellerOrder> {
        let order = self.orders.get(&header.order_id)?;
        Some(SellerOrder {
            id,
            order_id: header.order_id,
            seller_id: header.seller_id,
            buyer_id: order.buyer_id,
            delivery: order.delivery.clone(),
            items: self
                .items
                .values()
                .filter(|item| item.seller_order_id == id)
                .cloned()
                .collect(),
            placed_at: order.placed_at,
        })
    }

    fn review(&self, stored: &StoredReview) -> Review {
        Review {
            id: stored.id,
            product_id: stored.product_id,
            buyer_id: stored.buyer_id,
            reviewer_name: self
                .buyers
                .get(&stored.buyer_id)
                .map(|b| b.name.clone())
                .unwrap_or_default(),
            rating: stored.rating,
            comment: stored.comment.clone(),
            created_at: stored.created_at,
        }
    }
}

/// Marketplace store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MarketplaceStore for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn create_buyer(
        &self,
        buyer: &NewBuyer,
        password_hash: &str,
    ) -> Result<Buyer, RepositoryError> {
        let mut state = self.state.write().await;
        let id = state.insert_account(&buyer.email, password_hash, AccountRole::Buyer)?;
        let buyer = Buyer {
            id: BuyerId::new(id.as_i32()),
            email: buyer.email.clone(),
            name: buyer.name.clone(),
            phone: buyer.phone.clone(),
            created_at: Utc::now(),
        };
        state.buyers.insert(buyer.id, buyer.clone());
        Ok(buyer)
    }

    async fn create_seller(
        &self,
        seller: &NewSeller,
        password_hash: &str,
    ) -> Result<Seller, RepositoryError> {
        let mut state = self.state.write().await;
        let id = state.insert_account(&seller.email, password_hash, AccountRole::Seller)?;
        let seller = Seller {
            id: SellerId::new(id.as_i32()),
            email: seller.email.clone(),
            press_name: seller.press_name.clone(),
            owner_number: seller.owner_number.clone(),
            city: seller.city.clone(),
            address: seller.address.clone(),
            created_at: Utc::now(),
        };
        state.sellers.insert(seller.id, seller.clone());
        Ok(seller)
    }

    async fn get_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<AccountCredentials>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .credentials
            .values()
            .find(|c| &c.email == email)
            .cloned())
    }

    async fn get_buyer(&self, id: BuyerId) -> Result<Option<Buyer>, RepositoryError> {
        Ok(self.state.read().await.buyers.get(&id).cloned())
    }

    async fn update_buyer(
        &self,
        id: BuyerId,
        update: &BuyerProfileUpdate,
    ) -> Result<Buyer, RepositoryError> {
        let mut state = self.state.write().await;
        let buyer = state.buyers.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        buyer.name.clone_from(&update.name);
        buyer.phone.clone_from(&update.phone);
        Ok(buyer.clone())
    }

    async fn get_seller(&self, id: SellerId) -> Result<Option<Seller>, RepositoryError> {
        Ok(self.state.read().await.sellers.get(&id).cloned())
    }

    async fn update_seller(
        &self,
        id: SellerId,
        update: &SellerProfileUpdate,
    ) -> Result<Seller, RepositoryError> {
        let mut state = self.state.write().await;
        let seller = state
            .sellers
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        seller.press_name.clone_from(&update.press_name);
        seller.owner_number.clone_from(&update.owner_number);
        seller.city.clone_from(&update.city);
        seller.address.clone_from(&update.address);
        Ok(seller.clone())
    }

    async fn list_sellers(&self, filter: &SellerFilter) -> Result<Vec<Seller>, RepositoryError> {
        let state = self.state.read().await;
        let mut sellers: Vec<Seller> = state
            .sellers
            .values()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect();
        sellers.sort_by(|a, b| a.press_name.cmp(&b.press_name));
        Ok(sellers)
    }

    async fn create_product(
        &self,
        seller_id: SellerId,
        input: &ProductInput,
    ) -> Result<Product, RepositoryError> {
        let mut state = self.state.write().await;
        let now = Utc::now();
        let product = Product {
            id: ProductId::new(next(&mut state.seq.product)),
            seller_id,
            name: input.name.clone(),
            description: input.description.clone(),
            price: input.price,
            inventory_quantity: input.inventory_quantity,
            minimum_order_quantity: input.minimum_order_quantity,
            category: input.category.clone(),
            image_urls: input.image_urls.clone(),
            created_at: now,
            updated_at: now,
        };
        state.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn update_product(
        &self,
        seller_id: SellerId,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<Product, RepositoryError> {
        let mut state = self.state.write().await;
        let product = state
            .products
            .get_mut(&id)
            .filter(|p| p.seller_id == seller_id)
            .ok_or(RepositoryError::NotFound)?;
        product.name.clone_from(&input.name);
        product.description.clone_from(&input.description);
        product.price = input.price;
        product.inventory_quantity = input.inventory_quantity;
        product.minimum_order_quantity = input.minimum_order_quantity;
        product.category.clone_from(&input.category);
        product.image_urls.clone_from(&input.image_urls);
        product.updated_at = Utc::now();
        Ok(product.clone())
    }

    async fn delete_product(
        &self,
        seller_id: SellerId,
        id: ProductId,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        if !state
            .products
            .get(&id)
            .is_some_and(|p| p.seller_id == seller_id)
        {
            return Err(RepositoryError::NotFound);
        }
        state.products.remove(&id);
        state.reviews.retain(|r| r.product_id != id);
        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.state.read().await.products.get(&id).cloned())
    }

    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .products
            .values()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .products
            .values()
            .rev()
            .filter(|p| filter.matches(p))
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .cloned()
            .collect())
    }

    async fn list_seller_products(
        &self,
        seller_id: SellerId,
    ) -> Result<Vec<Product>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .products
            .values()
            .rev()
            .filter(|p| p.seller_id == seller_id)
            .cloned()
            .collect())
    }

    async fn list_categories(&self) -> Result<Vec<CategoryCount>, RepositoryError> {
        let state = self.state.read().await;
        let mut counts: BTreeMap<&str, u32> = BTreeMap::new();
        for product in state.products.values() {
            *counts.entry(product.category.as_str()).or_default() += 1;
        }
        Ok(counts
            .into_iter()
            .map(|(category, product_count)| CategoryCount {
                category: category.to_owned(),
                product_count,
            })
            .collect())
    }

    async fn list_reviews(&self, product_id: ProductId) -> Result<Vec<Review>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .reviews
            .iter()
            .rev()
            .filter(|r| r.product_id == product_id)
            .map(|r| state.review(r))
            .collect())
    }

    async fn add_review(
        &self,
        buyer_id: BuyerId,
        product_id: ProductId,
        review: &NewReview,
    ) -> Result<Review, ReviewError> {
        let mut state = self.state.write().await;

        if !state.products.contains_key(&product_id) {
            return Err(ReviewError::ProductNotFound);
        }

        let delivered = state.items.values().any(|item| {
            item.product_id == product_id
                && item.status == OrderStatus::Delivered
                && state
                    .orders
                    .get(&item.order_id)
                    .is_some_and(|o| o.buyer_id == buyer_id)
        });
        if !delivered {
            return Err(ReviewError::NotDelivered);
        }

        if state
            .reviews
            .iter()
            .any(|r| r.buyer_id == buyer_id && r.product_id == product_id)
        {
            return Err(ReviewError::AlreadyReviewed);
        }

        let stored = StoredReview {
            id: ReviewId::new(next(&mut state.seq.review)),
            product_id,
            buyer_id,
            rating: review.rating,
            comment: review.comment.trim().to_owned(),
            created_at: Utc::now(),
        };
        let created = state.review(&stored);
        state.reviews.push(stored);
        Ok(created)
    }

    async fn get_cart(&self, buyer_id: BuyerId) -> Result<Vec<CartItem>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .cart
            .values()
            .filter(|item| item.buyer_id == buyer_id)
            .cloned()
            .collect())
    }

    async fn add_cart_item(
        &self,
        buyer_id: BuyerId,
        item: &NewCartItem,
    ) -> Result<CartItem, RepositoryError> {
        let mut state = self.state.write().await;
        let item = CartItem {
            id: CartItemId::new(next(&mut state.seq.cart_item)),
            buyer_id,
            product_id: item.product_id,
            seller_id: item.seller_id,
            quantity: item.quantity,
            design_urls: item.design_urls.clone(),
            instructions: item.instructions.clone(),
            unit_price: item.unit_price,
            added_at: Utc::now(),
        };
        state.cart.insert(item.id, item.clone());
        Ok(item)
    }

    async fn update_cart_item_quantity(
        &self,
        buyer_id: BuyerId,
        id: CartItemId,
        quantity: u32,
    ) -> Result<CartItem, RepositoryError> {
        let mut state = self.state.write().await;
        let item = state
            .cart
            .get_mut(&id)
            .filter(|item| item.buyer_id == buyer_id)
            .ok_or(RepositoryError::NotFound)?;
        item.quantity = quantity;
        Ok(item.clone())
    }

    async fn remove_cart_item(
        &self,
        buyer_id: BuyerId,
        id: CartItemId,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        if !state
            .cart
            .get(&id)
            .is_some_and(|item| item.buyer_id == buyer_id)
        {
            return Err(RepositoryError::NotFound);
        }
        state.cart.remove(&id);
        Ok(())
    }

    async fn place_order(&self, request: &CheckoutRequest) -> Result<PlacedOrder, CheckoutError> {
        if request.cart_item_ids.is_empty() {
            return Err(CheckoutError::EmptySelection);
        }

        let mut state = self.state.write().await;

        let items: Vec<CartItem> = state
            .cart
            .values()
            .filter(|item| {
                item.buyer_id == request.buyer_id && request.cart_item_ids.contains(&item.id)
            })
            .cloned()
            .collect();
        let unknown: Vec<CartItemId> = request
            .cart_item_ids
            .iter()
            .filter(|id| !items.iter().any(|item| item.id == **id))
            .copied()
            .collect();
        if !unknown.is_empty() {
            return Err(CheckoutError::UnknownCartItems(unknown));
        }

        let products: HashMap<ProductId, Product> = items
            .iter()
            .filter_map(|item| state.products.get(&item.product_id))
            .map(|p| (p.id, p.clone()))
            .collect();
        let plan = plan_checkout(&items, &products)?;

        // Every check has passed; from here on nothing can fail.
        let now = Utc::now();
        let order_id = OrderId::new(next(&mut state.seq.order));
        let mut order = Order {
            id: order_id,
            buyer_id: request.buyer_id,
            delivery: request.delivery.clone(),
            items: Vec::new(),
            total_price: plan.total,
            placed_at: now,
        };

        let mut seller_orders = Vec::with_capacity(plan.by_seller.len());
        for (seller_id, planned) in &plan.by_seller {
            let seller_order_id = SellerOrderId::new(next(&mut state.seq.seller_order));
            let mut fragment_items = Vec::with_capacity(planned.len());
            for line in planned {
                let item = &line.cart_item;
                let order_item = OrderItem {
                    id: OrderItemId::new(next(&mut state.seq.order_item)),
                    order_id,
                    seller_order_id,
                    product_id: item.product_id,
                    seller_id: *seller_id,
                    product_name: line.product_name.clone(),
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    total_price: line.total_price,
                    design_urls: item.design_urls.clone(),
                    instructions: item.instructions.clone(),
                    status: OrderStatus::Pending,
                    updated_at: now,
                };
                state.items.insert(order_item.id, order_item.clone());
                fragment_items.push(order_item);
            }

            state.seller_orders.insert(
                seller_order_id,
                SellerOrderHeader {
                    order_id,
                    seller_id: *seller_id,
                },
            );
            order.items.extend(fragment_items.iter().cloned());
            seller_orders.push(SellerOrder {
                id: seller_order_id,
                order_id,
                seller_id: *seller_id,
                buyer_id: request.buyer_id,
                delivery: request.delivery.clone(),
                items: fragment_items,
                placed_at: now,
            });
        }

        for (product_id, quantity) in &plan.decrements {
            if let Some(product) = state.products.get_mut(product_id) {
                product.inventory_quantity = product.inventory_quantity.saturating_sub(*quantity);
                product.updated_at = now;
            }
        }

        for id in plan.cart_item_ids() {
            state.cart.remove(&id);
        }

        order.items.sort_by_key(|item| item.id);
        state.orders.insert(
            order_id,
            Order {
                items: Vec::new(),
                ..order.clone()
            },
        );

        Ok(PlacedOrder {
            order,
            seller_orders,
        })
    }

    async fn list_buyer_orders(&self, buyer_id: BuyerId) -> Result<Vec<Order>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .orders
            .iter()
            .rev()
            .filter(|(_, header)| header.buyer_id == buyer_id)
            .filter_map(|(id, _)| state.order(*id))
            .collect())
    }

    async fn get_buyer_order(
        &self,
        buyer_id: BuyerId,
        order_id: OrderId,
    ) -> Result<Option<Order>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.order(order_id).filter(|o| o.buyer_id == buyer_id))
    }

    async fn list_seller_orders(
        &self,
        seller_id: SellerId,
    ) -> Result<Vec<SellerOrder>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .seller_orders
            .iter()
            .rev()
            .filter(|(_, header)| header.seller_id == seller_id)
            .filter_map(|(id, header)| state.seller_order(*id, *header))
            .collect())
    }

    async fn change_item_status(
        &self,
        actor: StatusActor,
        item_id: OrderItemId,
        next: OrderStatus,
    ) -> Result<StatusChange, StatusChangeError> {
        let mut state = self.state.write().await;

        let item = state
            .items
            .get(&item_id)
            .cloned()
            .ok_or(StatusChangeError::NotFound)?;
        if let StatusActor::Buyer(buyer_id) = actor {
            let owns = state
                .orders
                .get(&item.order_id)
                .is_some_and(|o| o.buyer_id == buyer_id);
            if !owns {
                return Err(StatusChangeError::NotFound);
            }
        }

        let next = authorize_status_change(actor, &item, next)?;

        let now = Utc::now();
        let stored = state
            .items
            .get_mut(&item_id)
            .filter(|stored| stored.status == item.status)
            .ok_or(StatusChangeError::Stale)?;
        stored.status = next;
        stored.updated_at = now;
        let updated = stored.clone();

        let mut restocked = 0;
        if next == OrderStatus::Cancelled
            && let Some(product) = state.products.get_mut(&item.product_id)
        {
            product.inventory_quantity = product.inventory_quantity.saturating_add(item.quantity);
            product.updated_at = now;
            restocked = item.quantity;
        }

        Ok(StatusChange {
            item: updated,
            previous: item.status,
            restocked,
        })
    }
}
