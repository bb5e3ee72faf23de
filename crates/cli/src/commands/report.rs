//! Reporting commands.

use clap::Subcommand;
use fernmart_storefront::Storefront;

#[derive(Subcommand)]
pub enum ReportKind {
    /// Sales summary
    Sales,
    /// Dashboard statistics
    Stats,
}

pub async fn run(
    storefront: &Storefront,
    kind: ReportKind,
) -> Result<(), Box<dyn std::error::Error>> {
    match kind {
        ReportKind::Sales => {
            let report = storefront.api().admin_sales_report().await?;
            println!("Orders:  {}", report.order_count);
            println!("Revenue: {}", report.total_revenue);
        }
        ReportKind::Stats => {
            let stats = storefront.api().admin_dashboard_stats().await;
            println!("Products: {}", stats.total_products);
            println!("Orders:   {}", stats.total_orders);
            println!("Users:    {}", stats.total_users);
            println!("Revenue:  {}", stats.total_revenue);
        }
    }

    Ok(())
}
