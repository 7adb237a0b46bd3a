//! RocketShoes CLI - inspect and edit the persisted cart from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Show the cart with totals
//! cart show
//!
//! # Add one unit of product 5
//! cart add 5
//!
//! # Set product 5 to three units
//! cart update 5 3
//!
//! # Remove product 5
//! cart remove 5
//!
//! # Ask the inventory how many units of product 5 exist
//! cart stock 5
//! ```
//!
//! Configuration comes from the environment (see `rocketshoes_cart::config`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand, ValueEnum};
use rocketshoes_core::{CurrencyCode, ProductId};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "cart")]
#[command(author, version, about = "RocketShoes cart tools")]
struct Cli {
    /// Currency used when printing prices
    #[arg(long, value_enum, default_value_t = Currency::Usd, global = true)]
    currency: Currency,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the cart contents and totals
    Show,
    /// Add one unit of a product
    Add {
        /// Product identifier
        product_id: ProductId,
    },
    /// Remove a product from the cart
    Remove {
        /// Product identifier
        product_id: ProductId,
    },
    /// Set the quantity of a product already in the cart
    Update {
        /// Product identifier
        product_id: ProductId,

        /// New quantity (values below 1 are ignored)
        #[arg(allow_negative_numbers = true)]
        amount: i64,
    },
    /// Show current stock for a product
    Stock {
        /// Product identifier
        product_id: ProductId,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Currency {
    Usd,
    Brl,
    Eur,
    Gbp,
    Cad,
}

impl From<Currency> for CurrencyCode {
    fn from(currency: Currency) -> Self {
        match currency {
            Currency::Usd => Self::USD,
            Currency::Brl => Self::BRL,
            Currency::Eur => Self::EUR,
            Currency::Gbp => Self::GBP,
            Currency::Cad => Self::CAD,
        }
    }
}

#[tokio::main]
async fn main() {
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "rocketshoes_cart=info,cart=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    let currency = CurrencyCode::from(cli.currency);
    let session = commands::Session::open()?;

    match cli.command {
        Commands::Show => commands::cart::show(&session.store, currency),
        Commands::Add { product_id } => {
            session.store.add_product(product_id).await?;
            commands::cart::show(&session.store, currency);
        }
        Commands::Remove { product_id } => {
            session.store.remove_product(product_id).await?;
            commands::cart::show(&session.store, currency);
        }
        Commands::Update { product_id, amount } => {
            session
                .store
                .update_product_amount(product_id, amount)
                .await?;
            commands::cart::show(&session.store, currency);
        }
        Commands::Stock { product_id } => {
            commands::cart::stock(&session, product_id).await?;
        }
    }
    Ok(())
}
