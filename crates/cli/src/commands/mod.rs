//! CLI subcommands.

pub mod migrate;
pub mod seed;
pub mod seller;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

/// Errors shared by commands that need the database.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// Neither `PRINTHUB_DATABASE_URL` nor `DATABASE_URL` is set.
    #[error("Missing environment variable: PRINTHUB_DATABASE_URL")]
    MissingDatabaseUrl,

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Connect to the marketplace database named by the environment.
///
/// # Errors
///
/// Returns `ConnectError` if no URL is configured or the connection fails.
pub async fn connect() -> Result<PgPool, ConnectError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("PRINTHUB_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| ConnectError::MissingDatabaseUrl)?;

    tracing::info!("Connecting to database...");
    Ok(printhub_server::db::create_pool(&database_url).await?)
}
