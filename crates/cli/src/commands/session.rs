//! Session commands: login, logout, ping.

use fernmart_storefront::{Credentials, Storefront};

/// Log in and persist the session token.
pub async fn login(
    storefront: &Storefront,
    email: String,
    password: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let password = match password.or_else(|| std::env::var("FERNMART_PASSWORD").ok()) {
        Some(password) => password,
        None => return Err("no password given (use --password or FERNMART_PASSWORD)".into()),
    };

    let identity = storefront.login(&Credentials { email, password }).await?;

    match identity.user {
        Some(user) => {
            let name = user.name.or(user.email).unwrap_or_else(|| "account".to_owned());
            println!("Logged in as {name}");
            if !user.is_admin {
                println!("Note: this account has no admin role; admin commands will be rejected");
            }
        }
        None => println!("Logged in (profile not yet available)"),
    }

    Ok(())
}

/// Log out and drop the persisted token.
pub async fn logout(storefront: &Storefront) {
    storefront.logout().await;
    println!("Logged out");
}

/// Check connectivity by asking for the product count.
pub async fn ping(storefront: &Storefront) -> Result<(), Box<dyn std::error::Error>> {
    let count = storefront.api().product_count().await?;
    println!("API reachable; {count} products in catalog");
    Ok(())
}
