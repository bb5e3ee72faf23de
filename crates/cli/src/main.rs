//! Fernmart CLI - admin console for the commerce API.
//!
//! # Usage
//!
//! ```bash
//! # Log in (token is persisted to FERNMART_TOKEN_FILE)
//! fernmart login -e admin@fernmart.dev
//!
//! # Product management
//! fernmart product list --category beauty
//! fernmart product add --name "Shea Butter" --price 25.50 --category beauty
//! fernmart product delete 664a01
//!
//! # Inventory
//! fernmart inventory set 664a01 40
//! fernmart inventory report
//!
//! # Reports
//! fernmart report sales
//! fernmart report stats
//! ```
//!
//! Configuration comes from the environment (`FERNMART_API_BASE_URL` at
//! minimum); see the storefront crate's config module.

#![cfg_attr(not(test), forbid(unsafe_code))]
// This is a terminal tool; stdout is the product.
#![allow(clippy::print_stdout)]

use clap::{Parser, Subcommand};
use fernmart_storefront::{Storefront, StorefrontConfig};

mod commands;

#[derive(Parser)]
#[command(name = "fernmart")]
#[command(author, version, about = "Fernmart admin console")]
struct Cli {
    /// Override the API base URL from the environment
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and persist the session token
    Login {
        /// Account email
        #[arg(short, long)]
        email: String,

        /// Account password (falls back to FERNMART_PASSWORD)
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Log out and drop the persisted token
    Logout,
    /// Check connectivity to the API
    Ping,
    /// Manage catalog products
    Product {
        #[command(subcommand)]
        action: commands::product::ProductAction,
    },
    /// Manage inventory
    Inventory {
        #[command(subcommand)]
        action: commands::inventory::InventoryAction,
    },
    /// Reporting
    Report {
        #[command(subcommand)]
        kind: commands::report::ReportKind,
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
    let config = match &cli.api_url {
        Some(url) => StorefrontConfig::for_base_url(url)?,
        None => StorefrontConfig::from_env()?,
    };
    let storefront = Storefront::new(&config)?;

    match cli.command {
        Commands::Login { email, password } => {
            commands::session::login(&storefront, email, password).await?;
        }
        Commands::Logout => commands::session::logout(&storefront).await,
        Commands::Ping => commands::session::ping(&storefront).await?,
        Commands::Product { action } => commands::product::run(&storefront, action).await?,
        Commands::Inventory { action } => commands::inventory::run(&storefront, action).await?,
        Commands::Report { kind } => commands::report::run(&storefront, kind).await?,
    }

    Ok(())
}
