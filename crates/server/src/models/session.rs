//! Session-related types.
//!
//! Types stored in the session for authentication state. The current
//! account is read from the session on every request and handed to
//! services explicitly.

use serde::{Deserialize, Serialize};

use printhub_core::{AccountId, AccountRole, BuyerId, Email, SellerId};

/// Session-stored account identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CurrentAccount {
    /// Account's database ID.
    pub id: AccountId,
    /// Account's email address.
    pub email: Email,
    /// Marketplace side of the account.
    pub role: AccountRole,
}

impl CurrentAccount {
    /// The buyer ID, if this account is a buyer.
    #[must_use]
    pub const fn buyer_id(&self) -> Option<BuyerId> {
        match self.role {
            AccountRole::Buyer => Some(BuyerId::new(self.id.as_i32())),
            AccountRole::Seller => None,
        }
    }

    /// The seller ID, if this account is a seller.
    #[must_use]
    pub const fn seller_id(&self) -> Option<SellerId> {
        match self.role {
            AccountRole::Seller => Some(SellerId::new(self.id.as_i32())),
            AccountRole::Buyer => None,
        }
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the current logged-in account.
    pub const CURRENT_ACCOUNT: &str = "current_account";
}
