//! Authentication service.
//!
//! Password sign-up and login for both buyers and presses.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use serde::Deserialize;

use printhub_core::Email;

use crate::db::{MarketplaceStore, RepositoryError};
use crate::models::{Buyer, CurrentAccount, NewBuyer, NewSeller, Seller};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Buyer sign-up form.
#[derive(Debug, Clone, Deserialize)]
pub struct BuyerSignup {
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
    pub name: String,
    #[serde(default)]
    pub phone: String,
}

/// Press registration form.
#[derive(Debug, Clone, Deserialize)]
pub struct SellerRegistration {
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
    pub press_name: String,
    pub owner_number: String,
    pub city: String,
    pub address: String,
}

/// Authentication service.
///
/// Handles account registration and login for both marketplace roles.
pub struct AuthService<'a> {
    store: &'a dyn MarketplaceStore,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(store: &'a dyn MarketplaceStore) -> Self {
        Self { store }
    }

    /// Register a buyer.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` or `PasswordMismatch` for bad passwords.
    /// Returns `AuthError::MissingField` if the name is blank.
    /// Returns `AuthError::AccountAlreadyExists` if the email is already registered.
    pub async fn register_buyer(&self, form: &BuyerSignup) -> Result<Buyer, AuthError> {
        let email = Email::parse(&form.email)?;
        validate_password(&form.password, &form.password_confirmation)?;
        let name = required(&form.name, "name")?;

        let password_hash = hash_password(&form.password)?;
        let buyer = NewBuyer {
            email,
            name,
            phone: form.phone.trim().to_owned(),
        };

        self.store
            .create_buyer(&buyer, &password_hash)
            .await
            .map_err(map_conflict)
    }

    /// Register a press.
    ///
    /// # Errors
    ///
    /// Same as [`Self::register_buyer`], with every press field required.
    pub async fn register_seller(&self, form: &SellerRegistration) -> Result<Seller, AuthError> {
        let email = Email::parse(&form.email)?;
        validate_password(&form.password, &form.password_confirmation)?;

        let seller = NewSeller {
            email,
            press_name: required(&form.press_name, "press_name")?,
            owner_number: required(&form.owner_number, "owner_number")?,
            city: required(&form.city, "city")?,
            address: required(&form.address, "address")?,
        };
        let password_hash = hash_password(&form.password)?;

        self.store
            .create_seller(&seller, &password_hash)
            .await
            .map_err(map_conflict)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<CurrentAccount, AuthError> {
        let email = Email::parse(email)?;

        let credentials = self
            .store
            .get_credentials(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &credentials.password_hash)?;

        Ok(CurrentAccount {
            id: credentials.id,
            email: credentials.email,
            role: credentials.role,
        })
    }
}

fn map_conflict(e: RepositoryError) -> AuthError {
    match e {
        RepositoryError::Conflict(_) => AuthError::AccountAlreadyExists,
        other => AuthError::Repository(other),
    }
}

fn required(value: &str, field: &'static str) -> Result<String, AuthError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AuthError::MissingField(field));
    }
    Ok(value.to_owned())
}

/// Validate password meets requirements.
fn validate_password(password: &str, confirmation: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    if password != confirmation {
        return Err(AuthError::PasswordMismatch);
    }

    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use printhub_core::AccountRole;

    use super::*;
    use crate::db::MemoryStore;

    fn signup(email: &str, password: &str, confirmation: &str) -> BuyerSignup {
        BuyerSignup {
            email: email.to_owned(),
            password: password.to_owned(),
            password_confirmation: confirmation.to_owned(),
            name: "Bilal".to_owned(),
            phone: "0300".to_owned(),
        }
    }

    #[test]
    fn test_hash_then_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_validate_password() {
        assert!(matches!(
            validate_password("short", "short"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(matches!(
            validate_password("long enough", "long enougH"),
            Err(AuthError::PasswordMismatch)
        ));
        assert!(validate_password("long enough", "long enough").is_ok());
    }

    #[tokio::test]
    async fn test_register_and_login_buyer() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);

        let buyer = auth
            .register_buyer(&signup("Bilal@Example.com", "password123", "password123"))
            .await
            .unwrap();
        assert_eq!(buyer.email.as_str(), "bilal@example.com");

        let account = auth.login("bilal@example.com", "password123").await.unwrap();
        assert_eq!(account.role, AccountRole::Buyer);
        assert_eq!(account.buyer_id(), Some(buyer.id));

        assert!(matches!(
            auth.login("bilal@example.com", "password124").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("nobody@example.com", "password123").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_registration() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);
        let form = signup("dup@example.com", "password123", "password123");

        auth.register_buyer(&form).await.unwrap();
        assert!(matches!(
            auth.register_buyer(&form).await,
            Err(AuthError::AccountAlreadyExists)
        ));
    }

    #[tokio::test]
    async fn test_seller_registration_requires_fields() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);
        let form = SellerRegistration {
            email: "press@example.com".to_owned(),
            password: "password123".to_owned(),
            password_confirmation: "password123".to_owned(),
            press_name: "Al-Noor Press".to_owned(),
            owner_number: "0300".to_owned(),
            city: "  ".to_owned(),
            address: "Urdu Bazaar".to_owned(),
        };

        assert!(matches!(
            auth.register_seller(&form).await,
            Err(AuthError::MissingField("city"))
        ));
    }
}
