//! Product CRUD commands.

use std::path::PathBuf;
use std::str::FromStr;

use clap::Subcommand;
use fernmart_core::ProductRef;
use fernmart_storefront::{ImageUpload, ProductForm, ProductQuery, Storefront};
use rust_decimal::Decimal;

#[derive(Subcommand)]
pub enum ProductAction {
    /// List products (admin view, includes unpublished)
    List {
        /// Filter by category
        #[arg(long)]
        category: Option<String>,

        /// Page number
        #[arg(long)]
        page: Option<u32>,
    },
    /// Show one product
    Show {
        /// Product id
        id: String,
    },
    /// Create a product
    Add {
        #[arg(long)]
        name: String,

        /// Price, e.g. 25.50
        #[arg(long)]
        price: String,

        #[arg(long)]
        category: String,

        #[arg(long)]
        description: Option<String>,

        /// Initial stock quantity
        #[arg(long)]
        quantity: Option<u64>,

        /// Image file to upload
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Update a product (only the given fields change)
    Update {
        /// Product id
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        price: Option<String>,

        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Delete a product
    Delete {
        /// Product id
        id: String,
    },
}

pub async fn run(
    storefront: &Storefront,
    action: ProductAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ProductAction::List { category, page } => {
            let query = ProductQuery {
                category,
                sort_by: None,
                page,
            };
            let listing = storefront.api().admin_products(&query).await?;
            for product in &listing.products {
                println!(
                    "{}  {:<32} {:>10}  {}",
                    product.id,
                    product.name,
                    product.price,
                    product.category.as_deref().unwrap_or("-"),
                );
            }
            println!("{} of {} products", listing.products.len(), listing.total);
        }
        ProductAction::Show { id } => {
            let product = storefront.api().product(&ProductRef::new(id)).await?;
            println!("{product:#?}");
        }
        ProductAction::Add {
            name,
            price,
            category,
            description,
            quantity,
            image,
        } => {
            let form = ProductForm {
                name: Some(name),
                description,
                price: Some(parse_price(&price)?),
                category: Some(category),
                stock_quantity: quantity,
                image: image.map(load_image).transpose()?,
            };
            let product = storefront.api().admin_create_product(form).await?;
            println!("Created {} ({})", product.name, product.id);
        }
        ProductAction::Update {
            id,
            name,
            price,
            category,
            description,
            image,
        } => {
            let form = ProductForm {
                name,
                description,
                price: price.as_deref().map(parse_price).transpose()?,
                category,
                stock_quantity: None,
                image: image.map(load_image).transpose()?,
            };
            let product = storefront
                .api()
                .admin_update_product(&ProductRef::new(id), form)
                .await?;
            println!("Updated {} ({})", product.name, product.id);
        }
        ProductAction::Delete { id } => {
            storefront
                .api()
                .admin_delete_product(&ProductRef::new(&*id))
                .await?;
            println!("Deleted {id}");
        }
    }

    Ok(())
}

fn parse_price(raw: &str) -> Result<Decimal, Box<dyn std::error::Error>> {
    Decimal::from_str(raw).map_err(|e| format!("invalid price {raw:?}: {e}").into())
}

fn load_image(path: PathBuf) -> Result<ImageUpload, Box<dyn std::error::Error>> {
    let bytes = std::fs::read(&path)?;

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_owned());

    let mime_type = match path.extension().and_then(|ext| ext.to_str()) {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
    .to_owned();

    Ok(ImageUpload {
        file_name,
        mime_type,
        bytes,
    })
}
