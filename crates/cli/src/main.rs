//! PrintHub CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply database migrations
//! printhub-cli migrate
//!
//! # Seed a demo press, buyer and catalog
//! printhub-cli seed --password 'local-dev-only'
//!
//! # Create a press account (password from PRINTHUB_SELLER_PASSWORD)
//! printhub-cli seller create -e owner@press.pk -n "Al-Noor Press" -o 0300-1234567 -c Lahore -a "Urdu Bazaar"
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed` - Seed demo data
//! - `seller create` - Create press accounts

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "printhub-cli")]
#[command(author, version, about = "PrintHub CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed a demo press, buyer and catalog
    Seed {
        /// Password for both demo accounts (min 8 characters)
        #[arg(short, long)]
        password: String,
    },
    /// Manage press accounts
    Seller {
        #[command(subcommand)]
        action: SellerAction,
    },
}

#[derive(Subcommand)]
enum SellerAction {
    /// Create a new press account
    Create {
        /// Login email address
        #[arg(short, long)]
        email: String,

        /// Press name shown to buyers
        #[arg(short = 'n', long)]
        press_name: String,

        /// Owner contact number
        #[arg(short, long)]
        owner_number: String,

        #[arg(short, long)]
        city: String,

        #[arg(short, long)]
        address: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { password } => commands::seed::run(&password).await?,
        Commands::Seller { action } => match action {
            SellerAction::Create {
                email,
                press_name,
                owner_number,
                city,
                address,
            } => {
                commands::seller::create(commands::seller::NewPress {
                    email,
                    press_name,
                    owner_number,
                    city,
                    address,
                })
                .await?;
            }
        },
    }
    Ok(())
}
