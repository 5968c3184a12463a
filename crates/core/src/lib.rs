//! PrintHub Core - Shared domain types.
//!
//! This crate provides the types used across all PrintHub components:
//! - `server` - Marketplace HTTP API for buyers and printing presses
//! - `cli` - Command-line tools for migrations and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure rules - no I/O, no database
//! access, no HTTP. The optional `postgres` feature adds `sqlx` encoding for
//! the newtypes so repositories can bind them directly.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, money, emails, ratings, and the order status machine

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
