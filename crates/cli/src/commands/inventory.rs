//! Inventory commands.

use clap::Subcommand;
use fernmart_core::{ProductRef, StockStatus};
use fernmart_storefront::Storefront;

#[derive(Subcommand)]
pub enum InventoryAction {
    /// Set a product's stock quantity
    Set {
        /// Product id
        id: String,

        /// New stock quantity
        quantity: u64,
    },
    /// Show stock levels for the whole catalog
    Report,
}

pub async fn run(
    storefront: &Storefront,
    action: InventoryAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        InventoryAction::Set { id, quantity } => {
            storefront
                .api()
                .admin_set_inventory(&ProductRef::new(&*id), quantity)
                .await?;
            println!("Set {id} to {quantity} units");
        }
        InventoryAction::Report => {
            let products = storefront.api().admin_inventory_report().await?;
            for product in &products {
                let marker = match product.stock_status {
                    StockStatus::OutOfStock => "!!",
                    StockStatus::LowStock => " !",
                    StockStatus::InStock | StockStatus::Unknown => "  ",
                };
                println!(
                    "{marker} {}  {:<32} {:>6}",
                    product.id,
                    product.name,
                    product
                        .stock_quantity
                        .map_or_else(|| "-".to_owned(), |q| q.to_string()),
                );
            }
            println!("{} products", products.len());
        }
    }

    Ok(())
}
