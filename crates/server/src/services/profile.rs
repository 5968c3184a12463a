//! Buyer and press profiles.

use thiserror::Error;

use printhub_core::{BuyerId, SellerId};

use crate::db::{MarketplaceStore, RepositoryError};
use crate::models::{Buyer, BuyerProfileUpdate, Seller, SellerProfileUpdate};

/// Errors from profile operations.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("profile not found")]
    NotFound,

    #[error("{0} is required")]
    MissingField(&'static str),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Profile service.
pub struct ProfileService<'a> {
    store: &'a dyn MarketplaceStore,
}

impl<'a> ProfileService<'a> {
    /// Create a new profile service.
    #[must_use]
    pub const fn new(store: &'a dyn MarketplaceStore) -> Self {
        Self { store }
    }

    /// # Errors
    ///
    /// Returns `ProfileError::NotFound` if the buyer does not exist.
    pub async fn buyer(&self, id: BuyerId) -> Result<Buyer, ProfileError> {
        self.store.get_buyer(id).await?.ok_or(ProfileError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `ProfileError::MissingField` for a blank name.
    pub async fn update_buyer(
        &self,
        id: BuyerId,
        update: &BuyerProfileUpdate,
    ) -> Result<Buyer, ProfileError> {
        let update = BuyerProfileUpdate {
            name: required(&update.name, "name")?,
            phone: update.phone.trim().to_owned(),
        };
        self.store
            .update_buyer(id, &update)
            .await
            .map_err(not_found)
    }

    /// # Errors
    ///
    /// Returns `ProfileError::NotFound` if the press does not exist.
    pub async fn seller(&self, id: SellerId) -> Result<Seller, ProfileError> {
        self.store.get_seller(id).await?.ok_or(ProfileError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `ProfileError::MissingField` for any blank field.
    pub async fn update_seller(
        &self,
        id: SellerId,
        update: &SellerProfileUpdate,
    ) -> Result<Seller, ProfileError> {
        let update = SellerProfileUpdate {
            press_name: required(&update.press_name, "press_name")?,
            owner_number: required(&update.owner_number, "owner_number")?,
            city: required(&update.city, "city")?,
            address: required(&update.address, "address")?,
        };
        self.store
            .update_seller(id, &update)
            .await
            .map_err(not_found)
    }
}

fn required(value: &str, field: &'static str) -> Result<String, ProfileError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ProfileError::MissingField(field));
    }
    Ok(value.to_owned())
}

fn not_found(e: RepositoryError) -> ProfileError {
    match e {
        RepositoryError::NotFound => ProfileError::NotFound,
        other => ProfileError::Repository(other),
    }
}
