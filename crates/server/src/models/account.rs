//! Account domain types.
//!
//! Every buyer and seller is backed by one account row holding the login
//! email and password hash; the role-specific profile lives beside it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use printhub_core::{AccountId, AccountRole, BuyerId, Email, SellerId};

/// Login material for an account (never serialized).
#[derive(Debug, Clone)]
pub struct AccountCredentials {
    pub id: AccountId,
    pub email: Email,
    pub role: AccountRole,
    /// Argon2id PHC string.
    pub password_hash: String,
}

impl AccountCredentials {
    /// The seller ID, if this account is a press.
    #[must_use]
    pub const fn seller_id(&self) -> Option<SellerId> {
        match self.role {
            AccountRole::Seller => Some(SellerId::new(self.id.as_i32())),
            AccountRole::Buyer => None,
        }
    }
}

/// A buyer profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Buyer {
    pub id: BuyerId,
    pub email: Email,
    pub name: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
}

/// A printing press profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Seller {
    pub id: SellerId,
    pub email: Email,
    pub press_name: String,
    pub owner_number: String,
    pub city: String,
    pub address: String,
    pub created_at: DateTime<Utc>,
}

impl Seller {
    /// Public card shown next to products.
    #[must_use]
    pub fn summary(&self) -> SellerSummary {
        SellerSummary {
            id: self.id,
            press_name: self.press_name.clone(),
            city: self.city.clone(),
        }
    }
}

/// Press directory filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SellerFilter {
    /// Exact city, case-insensitive.
    pub city: Option<String>,
    /// Case-insensitive substring of the press name, address or city.
    pub search: Option<String>,
}

impl SellerFilter {
    /// Whether `seller` passes the city and search filters.
    #[must_use]
    pub fn matches(&self, seller: &Seller) -> bool {
        self.city
            .as_deref()
            .is_none_or(|c| seller.city.eq_ignore_ascii_case(c))
            && self.search.as_deref().is_none_or(|q| {
                let q = q.trim().to_lowercase();
                [&seller.press_name, &seller.address, &seller.city]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&q))
            })
    }
}

/// Seller details safe to show to any visitor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SellerSummary {
    pub id: SellerId,
    pub press_name: String,
    pub city: String,
}

/// Input for creating a buyer.
#[derive(Debug, Clone)]
pub struct NewBuyer {
    pub email: Email,
    pub name: String,
    pub phone: String,
}

/// Input for registering a press.
#[derive(Debug, Clone)]
pub struct NewSeller {
    pub email: Email,
    pub press_name: String,
    pub owner_number: String,
    pub city: String,
    pub address: String,
}

/// Editable buyer profile fields.
#[derive(Debug, Clone, Deserialize)]
pub struct BuyerProfileUpdate {
    pub name: String,
    pub phone: String,
}

/// Editable press profile fields.
#[derive(Debug, Clone, Deserialize)]
pub struct SellerProfileUpdate {
    pub press_name: String,
    pub owner_number: String,
    pub city: String,
    pub address: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn seller(press_name: &str, city: &str, address: &str) -> Seller {
        Seller {
            id: SellerId::new(1),
            email: Email::parse("press@example.com").unwrap(),
            press_name: press_name.to_owned(),
            owner_number: "0300".to_owned(),
            city: city.to_owned(),
            address: address.to_owned(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_seller_filter_searches_name_address_and_city() {
        let press = seller("Rehman Printers", "Peshawar", "Khyber Bazaar");
        let search = |q: &str| SellerFilter {
            search: Some(q.to_owned()),
            ..SellerFilter::default()
        };

        assert!(SellerFilter::default().matches(&press));
        assert!(search("printers").matches(&press));
        assert!(search(" KHYBER ").matches(&press));
        assert!(search("shawar").matches(&press));
        assert!(!search("lahore").matches(&press));

        let in_city = SellerFilter {
            city: Some("PESHAWAR".to_owned()),
            search: Some("bazaar".to_owned()),
        };
        assert!(in_city.matches(&press));
        let elsewhere = SellerFilter {
            city: Some("Peshawar Cantt".to_owned()),
            ..SellerFilter::default()
        };
        assert!(!elsewhere.matches(&press));
    }
}
