//! Business logic services.
//!
//! Each service borrows the [`MarketplaceStore`](crate::db::MarketplaceStore)
//! from application state for the duration of one request.
//!
//! # Services
//!
//! - `auth` - Buyer sign-up, press registration and password login
//! - `cart` - Cart lines and the selected subtotal
//! - `catalog` - Product browsing, press directory, inventory and dashboard
//! - `checkout` - Turns selected cart lines into an order
//! - `orders` - Order history and item status changes
//! - `profile` - Buyer and press profiles
//! - `reviews` - Delivered-only product reviews

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod orders;
pub mod profile;
pub mod reviews;
