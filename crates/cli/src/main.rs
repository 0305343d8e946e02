//! Stockroom CLI - migrations, seeding, and fulfilment tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply storefront migrations
//! sr-cli migrate
//!
//! # Insert demo products
//! sr-cli seed products
//!
//! # Show current stock levels
//! sr-cli stock list
//!
//! # Move an order forward (processing, shipped, delivered)
//! sr-cli order advance --id 42 --to shipped
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

use stockroom_core::{OrderId, OrderStatus};

mod commands;

use commands::CliError;

#[derive(Parser)]
#[command(name = "sr-cli")]
#[command(author, version, about = "Stockroom CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Seed the database
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Inspect stock levels
    Stock {
        #[command(subcommand)]
        action: StockAction,
    },
    /// Order fulfilment
    Order {
        #[command(subcommand)]
        action: OrderAction,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Insert the demo product catalogue
    Products {
        /// Seed even if products already exist
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum StockAction {
    /// List products with their available units
    List,
}

#[derive(Subcommand)]
enum OrderAction {
    /// Move an order to its next fulfilment status
    Advance {
        /// Order ID
        #[arg(long)]
        id: i64,

        /// Target status (`processing`, `shipped`, `delivered`)
        #[arg(long, value_parser = parse_status)]
        to: OrderStatus,
    },
}

fn parse_status(raw: &str) -> Result<OrderStatus, String> {
    raw.parse()
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed {
            target: SeedTarget::Products { force },
        } => commands::seed::products(force).await?,
        Commands::Stock {
            action: StockAction::List,
        } => commands::stock::list().await?,
        Commands::Order {
            action: OrderAction::Advance { id, to },
        } => commands::order::advance(OrderId::new(id), to).await?,
    }
    Ok(())
}
