//! Press account management.
//!
//! # Usage
//!
//! ```bash
//! PRINTHUB_SELLER_PASSWORD=... printhub-cli seller create \
//!     -e owner@press.pk -n "Al-Noor Press" -o 0300-1234567 -c Lahore -a "Urdu Bazaar"
//! ```
//!
//! # Environment Variables
//!
//! - `PRINTHUB_DATABASE_URL` - `PostgreSQL` connection string
//! - `PRINTHUB_SELLER_PASSWORD` - Initial password for the press account

use printhub_core::SellerId;
use printhub_server::db::PgStore;
use printhub_server::services::auth::{AuthError, AuthService, SellerRegistration};
use thiserror::Error;

use super::{ConnectError, connect};

/// Errors that can occur while creating a press.
#[derive(Debug, Error)]
pub enum SellerError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Press details from the command line.
#[derive(Debug)]
pub struct NewPress {
    pub email: String,
    pub press_name: String,
    pub owner_number: String,
    pub city: String,
    pub address: String,
}

/// Create a press account.
///
/// # Returns
///
/// The ID of the created press.
///
/// # Errors
///
/// Returns `SellerError` for a missing password, invalid details, or a
/// taken email.
pub async fn create(press: NewPress) -> Result<SellerId, SellerError> {
    dotenvy::dotenv().ok();

    let password = std::env::var("PRINTHUB_SELLER_PASSWORD")
        .map_err(|_| SellerError::MissingEnvVar("PRINTHUB_SELLER_PASSWORD"))?;

    let store = PgStore::new(connect().await?);
    tracing::info!("Creating press: {} ({})", press.press_name, press.email);

    let seller = AuthService::new(&store)
        .register_seller(&SellerRegistration {
            email: press.email,
            password: password.clone(),
            password_confirmation: password,
            press_name: press.press_name,
            owner_number: press.owner_number,
            city: press.city,
            address: press.address,
        })
        .await?;

    tracing::info!(
        "Press created successfully! ID: {}, Email: {}, City: {}",
        seller.id,
        seller.email,
        seller.city
    );
    Ok(seller.id)
}
