//! Domain models for the marketplace.
//!
//! These types are validated domain objects, separate from database row
//! types. The checkout and order modules also carry the pure rules that both
//! store implementations apply inside their unit of work.

pub mod account;
pub mod cart;
pub mod checkout;
pub mod order;
pub mod product;
pub mod review;
pub mod session;

pub use account::{
    AccountCredentials, Buyer, BuyerProfileUpdate, NewBuyer, NewSeller, Seller,
    SellerFilter, SellerProfileUpdate, SellerSummary,
};
pub use cart::{CartItem, NewCartItem};
pub use checkout::{
    CheckoutError, CheckoutPlan, CheckoutRequest, PlannedItem, StockViolation,
    StockViolationReason, plan_checkout,
};
pub use order::{
    DeliveryDetails, Order, OrderItem, PlacedOrder, SellerOrder, StatusActor, StatusChange,
    StatusChangeError, authorize_status_change,
};
pub use product::{CategoryCount, Product, ProductFilter, ProductInput};
pub use review::{NewReview, Review, ReviewError};
pub use session::{CurrentAccount, keys as session_keys};
