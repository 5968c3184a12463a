//! Seed the database with a demo press, a demo buyer and a small catalog.
//!
//! Safe to re-run: existing demo accounts are reused and the catalog is only
//! created for a press with no products.

use printhub_core::{Email, Money, SellerId};
use printhub_server::db::{MarketplaceStore, PgStore};
use printhub_server::models::ProductInput;
use printhub_server::services::auth::{AuthError, AuthService, BuyerSignup, SellerRegistration};
use printhub_server::services::catalog::CatalogService;

use super::connect;

const DEMO_PRESS_EMAIL: &str = "press@printhub.test";
const DEMO_BUYER_EMAIL: &str = "buyer@printhub.test";

/// (name, category, price in rupees, stock, minimum order)
const DEMO_PRODUCTS: &[(&str, &str, i64, u32, u32)] = &[
    ("Visiting Cards (Matte)", "Business Cards", 3, 5000, 100),
    ("Visiting Cards (Glossy)", "Business Cards", 4, 5000, 100),
    ("A5 Flyers", "Flyers", 6, 10_000, 250),
    ("Vinyl Banner 3x6 ft", "Banners", 1800, 40, 1),
    ("Letterhead A4", "Stationery", 5, 3000, 100),
    ("Custom Mug", "Merchandise", 650, 120, 6),
];

/// Seed demo data.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a write fails.
pub async fn run(password: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = PgStore::new(connect().await?);
    let auth = AuthService::new(&store);

    let press = auth
        .register_seller(&SellerRegistration {
            email: DEMO_PRESS_EMAIL.to_owned(),
            password: password.to_owned(),
            password_confirmation: password.to_owned(),
            press_name: "Demo Printing Press".to_owned(),
            owner_number: "0300-0000000".to_owned(),
            city: "Lahore".to_owned(),
            address: "Urdu Bazaar".to_owned(),
        })
        .await;
    let press_id = match press {
        Ok(seller) => {
            tracing::info!(seller_id = %seller.id, "Created demo press");
            seller.id
        }
        Err(AuthError::AccountAlreadyExists) => existing_seller(&store).await?,
        Err(e) => return Err(e.into()),
    };

    match auth
        .register_buyer(&BuyerSignup {
            email: DEMO_BUYER_EMAIL.to_owned(),
            password: password.to_owned(),
            password_confirmation: password.to_owned(),
            name: "Demo Buyer".to_owned(),
            phone: "0311-0000000".to_owned(),
        })
        .await
    {
        Ok(buyer) => tracing::info!(buyer_id = %buyer.id, "Created demo buyer"),
        Err(AuthError::AccountAlreadyExists) => tracing::info!("Demo buyer already exists"),
        Err(e) => return Err(e.into()),
    }

    if !store.list_seller_products(press_id).await?.is_empty() {
        tracing::info!("Demo catalog already present, skipping products");
        return Ok(());
    }

    let catalog = CatalogService::new(&store);
    for (name, category, rupees, stock, minimum) in DEMO_PRODUCTS {
        let slug = name.to_lowercase().replace(' ', "-");
        catalog
            .create_product(
                press_id,
                &ProductInput {
                    name: (*name).to_owned(),
                    description: format!("{name}, printed to order."),
                    price: Money::from_rupees(*rupees),
                    inventory_quantity: *stock,
                    minimum_order_quantity: *minimum,
                    category: (*category).to_owned(),
                    image_urls: vec![format!("https://images.printhub.test/{slug}.jpg")],
                },
            )
            .await?;
    }

    tracing::info!(products = DEMO_PRODUCTS.len(), "Seeding complete!");
    tracing::info!("  Press login: {DEMO_PRESS_EMAIL}");
    tracing::info!("  Buyer login: {DEMO_BUYER_EMAIL}");
    Ok(())
}

async fn existing_seller(store: &PgStore) -> Result<SellerId, Box<dyn std::error::Error>> {
    let email = Email::parse(DEMO_PRESS_EMAIL)?;
    let credentials = store
        .get_credentials(&email)
        .await?
        .ok_or("demo press email exists but has no account")?;
    let seller_id = credentials
        .seller_id()
        .ok_or("demo press email belongs to a buyer account")?;
    tracing::info!(seller_id = %seller_id, "Demo press already exists");
    Ok(seller_id)
}
