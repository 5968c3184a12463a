//! Account repository: login credentials plus buyer and press profiles.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use printhub_core::{AccountId, AccountRole, BuyerId, Email, SellerId};

use super::products::escape_like;
use super::{RepositoryError, email_from_db};
use crate::models::{
    AccountCredentials, Buyer, BuyerProfileUpdate, NewBuyer, NewSeller, Seller, SellerFilter,
    SellerProfileUpdate,
};

#[derive(sqlx::FromRow)]
struct CredentialsRow {
    id: i32,
    email: String,
    role: AccountRole,
    password_hash: String,
}

#[derive(sqlx::FromRow)]
struct BuyerRow {
    id: i32,
    email: String,
    name: String,
    phone: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<BuyerRow> for Buyer {
    type Error = RepositoryError;

    fn try_from(r: BuyerRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: BuyerId::new(r.id),
            email: email_from_db(&r.email)?,
            name: r.name,
            phone: r.phone,
            created_at: r.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SellerRow {
    id: i32,
    email: String,
    press_name: String,
    owner_number: String,
    city: String,
    address: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<SellerRow> for Seller {
    type Error = RepositoryError;

    fn try_from(r: SellerRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: SellerId::new(r.id),
            email: email_from_db(&r.email)?,
            press_name: r.press_name,
            owner_number: r.owner_number,
            city: r.city,
            address: r.address,
            created_at: r.created_at,
        })
    }
}

const BUYER_SELECT: &str = r"
    SELECT a.id, a.email, b.name, b.phone, a.created_at
    FROM printhub.account a
    JOIN printhub.buyer b ON b.id = a.id
";

const SELLER_SELECT: &str = r"
    SELECT a.id, a.email, s.press_name, s.owner_number, s.city, s.address, a.created_at
    FROM printhub.account a
    JOIN printhub.seller s ON s.id = a.id
";

/// Repository for account database operations.
pub struct AccountRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AccountRepository<'a> {
    /// Create a new account repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    async fn insert_account(
        tx: &mut sqlx::PgConnection,
        email: &Email,
        password_hash: &str,
        role: AccountRole,
    ) -> Result<(AccountId, DateTime<Utc>), RepositoryError> {
        let (id, created_at): (i32, DateTime<Utc>) = sqlx::query_as(
            r"
            INSERT INTO printhub.account (email, password_hash, role)
            VALUES ($1, $2, $3)
            RETURNING id, created_at
            ",
        )
        .bind(email.as_str())
        .bind(password_hash)
        .bind(role)
        .fetch_one(tx)
        .await
        .map_err(|e| RepositoryError::unique_or_database(e, "email already exists"))?;

        Ok((AccountId::new(id), created_at))
    }

    /// Create a buyer account and profile.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create_buyer(
        &self,
        buyer: &NewBuyer,
        password_hash: &str,
    ) -> Result<Buyer, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let (id, created_at) =
            Self::insert_account(&mut tx, &buyer.email, password_hash, AccountRole::Buyer).await?;

        sqlx::query("INSERT INTO printhub.buyer (id, name, phone) VALUES ($1, $2, $3)")
            .bind(id.as_i32())
            .bind(&buyer.name)
            .bind(&buyer.phone)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Buyer {
            id: BuyerId::new(id.as_i32()),
            email: buyer.email.clone(),
            name: buyer.name.clone(),
            phone: buyer.phone.clone(),
            created_at,
        })
    }

    /// Create a press account and profile.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create_seller(
        &self,
        seller: &NewSeller,
        password_hash: &str,
    ) -> Result<Seller, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let (id, created_at) =
            Self::insert_account(&mut tx, &seller.email, password_hash, AccountRole::Seller)
                .await?;

        sqlx::query(
            r"
            INSERT INTO printhub.seller (id, press_name, owner_number, city, address)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(id.as_i32())
        .bind(&seller.press_name)
        .bind(&seller.owner_number)
        .bind(&seller.city)
        .bind(&seller.address)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Seller {
            id: SellerId::new(id.as_i32()),
            email: seller.email.clone(),
            press_name: seller.press_name.clone(),
            owner_number: seller.owner_number.clone(),
            city: seller.city.clone(),
            address: seller.address.clone(),
            created_at,
        })
    }

    /// Get login credentials by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored email is invalid.
    pub async fn get_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<AccountCredentials>, RepositoryError> {
        let row: Option<CredentialsRow> = sqlx::query_as(
            "SELECT id, email, role, password_hash FROM printhub.account WHERE email = $1",
        )
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(|r| {
            Ok(AccountCredentials {
                id: AccountId::new(r.id),
                email: email_from_db(&r.email)?,
                role: r.role,
                password_hash: r.password_hash,
            })
        })
        .transpose()
    }

    /// Get a buyer profile.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_buyer(&self, id: BuyerId) -> Result<Option<Buyer>, RepositoryError> {
        let row: Option<BuyerRow> = sqlx::query_as(&format!("{BUYER_SELECT} WHERE a.id = $1"))
            .bind(id.as_i32())
            .fetch_optional(self.pool)
            .await?;
        row.map(Buyer::try_from).transpose()
    }

    /// Overwrite a buyer's name and phone.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the buyer does not exist.
    pub async fn update_buyer(
        &self,
        id: BuyerId,
        update: &BuyerProfileUpdate,
    ) -> Result<Buyer, RepositoryError> {
        let result = sqlx::query("UPDATE printhub.buyer SET name = $2, phone = $3 WHERE id = $1")
            .bind(id.as_i32())
            .bind(&update.name)
            .bind(&update.phone)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        self.get_buyer(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Get a press profile.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_seller(&self, id: SellerId) -> Result<Option<Seller>, RepositoryError> {
        let row: Option<SellerRow> = sqlx::query_as(&format!("{SELLER_SELECT} WHERE a.id = $1"))
            .bind(id.as_i32())
            .fetch_optional(self.pool)
            .await?;
        row.map(Seller::try_from).transpose()
    }

    /// Overwrite a press's editable fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the press does not exist.
    pub async fn update_seller(
        &self,
        id: SellerId,
        update: &SellerProfileUpdate,
    ) -> Result<Seller, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE printhub.seller
            SET press_name = $2, owner_number = $3, city = $4, address = $5
            WHERE id = $1
            ",
        )
        .bind(id.as_i32())
        .bind(&update.press_name)
        .bind(&update.owner_number)
        .bind(&update.city)
        .bind(&update.address)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        self.get_seller(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// List presses matching the city and search filters.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_sellers(&self, filter: &SellerFilter) -> Result<Vec<Seller>, RepositoryError> {
        let search = filter
            .search
            .as_deref()
            .map(|q| format!("%{}%", escape_like(q.trim())));
        let rows: Vec<SellerRow> = sqlx::query_as(&format!(
            r"
            {SELLER_SELECT}
            WHERE ($1::text IS NULL OR lower(s.city) = lower($1))
              AND ($2::text IS NULL
                   OR s.press_name ILIKE $2 OR s.address ILIKE $2 OR s.city ILIKE $2)
            ORDER BY s.press_name
            "
        ))
        .bind(filter.city.as_deref())
        .bind(search)
        .fetch_all(self.pool)
        .await?;
        rows.into_iter().map(Seller::try_from).collect()
    }
}
