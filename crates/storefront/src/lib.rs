//! Fernmart Storefront - client engine for the Fernmart commerce API.
//!
//! # Architecture
//!
//! The upstream REST service returns JSON of uncertain and evolving shape;
//! this crate's job is to tolerate that and hand collaborators canonical
//! state:
//!
//! - [`api`] - `reqwest` transport with bearer-token attachment and the
//!   endpoint families (auth, cart, catalog, orders, admin)
//! - [`cart`] - normalizer, reconciler, and the owning [`CartStore`]
//! - [`identity`] - token + profile state with single-flight refresh
//! - [`checkout`] - the identity & validation gate in front of order
//!   submission
//! - [`token`] - persisted bearer token storage
//!
//! # Example
//!
//! ```rust,ignore
//! use fernmart_storefront::{Storefront, StorefrontConfig};
//!
//! let storefront = Storefront::new(&StorefrontConfig::from_env()?)?;
//!
//! storefront.login(&credentials).await?;
//! storefront.add_to_cart(&product_ref, 2).await?;
//! let receipt = storefront.submit_checkout(&form).await?;
//! let session = storefront.api().initialize_payment(&receipt.order_id).await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod error;
pub mod identity;
pub mod token;

pub use api::ApiClient;
pub use api::admin::{DashboardStats, ImageUpload, ProductForm, SalesReport};
pub use api::orders::{Order, PaymentSession, PaymentVerification};
pub use api::products::{Product, ProductPage, ProductQuery};
pub use cart::{Cart, CartLine, CartOperation, CartStore};
pub use checkout::{CheckoutFailure, CheckoutFlow, CheckoutForm, CheckoutReceipt};
pub use config::{ConfigError, StorefrontConfig};
pub use error::{FieldError, StoreError};
pub use identity::{Credentials, Identity, IdentityStore, Registration, UserProfile};
pub use token::TokenStore;

use fernmart_core::{OrderRef, ProductRef};
use serde_json::Value;

/// The wired-up storefront session: configuration, transport, and stores.
///
/// Holds the one [`TokenStore`] (seeded from disk at startup, so a
/// restarted process comes back authenticated), the [`ApiClient`] over it,
/// and the cart/identity stores over the client.
pub struct Storefront {
    api: ApiClient,
    cart: CartStore<ApiClient>,
    identity: IdentityStore<ApiClient>,
}

impl Storefront {
    /// Wire up a storefront session from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &StorefrontConfig) -> Result<Self, StoreError> {
        let tokens = TokenStore::new(config.token_file.clone());
        let api = ApiClient::new(config, tokens.clone())?;

        Ok(Self {
            cart: CartStore::new(api.clone()),
            identity: IdentityStore::new(api.clone(), tokens),
            api,
        })
    }

    /// Direct access to the API client (catalog, orders, admin).
    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// The cart store.
    #[must_use]
    pub fn cart_store(&self) -> &CartStore<ApiClient> {
        &self.cart
    }

    /// The identity store.
    #[must_use]
    pub fn identity_store(&self) -> &IdentityStore<ApiClient> {
        &self.identity
    }

    // =========================================================================
    // Cart surface
    // =========================================================================

    /// Snapshot of the current canonical cart.
    pub async fn cart(&self) -> Cart {
        self.cart.cart().await
    }

    /// Fetch the cart from the server and reconcile it in.
    ///
    /// # Errors
    ///
    /// See [`CartStore::fetch`].
    pub async fn fetch_cart(&self) -> Result<Cart, StoreError> {
        self.cart.fetch().await
    }

    /// Add a product to the cart.
    ///
    /// # Errors
    ///
    /// See [`CartStore::add`].
    pub async fn add_to_cart(&self, product: &ProductRef, quantity: u32) -> Result<Cart, StoreError> {
        self.cart.add(product, quantity).await
    }

    /// Change a cart line's quantity.
    ///
    /// # Errors
    ///
    /// See [`CartStore::update_quantity`].
    pub async fn update_quantity(&self, item_id: &str, quantity: u32) -> Result<Cart, StoreError> {
        self.cart.update_quantity(item_id, quantity).await
    }

    /// Remove a cart line; the id may name it through any identity field.
    ///
    /// # Errors
    ///
    /// See [`CartStore::remove`].
    pub async fn remove_line(&self, item_id: &str) -> Result<Cart, StoreError> {
        self.cart.remove(item_id).await
    }

    /// Clear the cart.
    ///
    /// # Errors
    ///
    /// See [`CartStore::clear`].
    pub async fn clear_cart(&self) -> Result<Cart, StoreError> {
        self.cart.clear().await
    }

    /// Interpret an already-received cart payload and reconcile it in.
    ///
    /// # Errors
    ///
    /// See [`CartStore::apply_response`].
    pub async fn apply_cart_response(
        &self,
        payload: &Value,
        operation: CartOperation,
    ) -> Result<Cart, StoreError> {
        self.cart.apply_response(payload, operation).await
    }

    // =========================================================================
    // Identity surface
    // =========================================================================

    /// Snapshot of the current identity.
    #[must_use]
    pub fn identity(&self) -> Identity {
        self.identity.identity()
    }

    /// Log in and adopt the session.
    ///
    /// # Errors
    ///
    /// See [`IdentityStore::login`].
    pub async fn login(&self, credentials: &Credentials) -> Result<Identity, StoreError> {
        self.identity.login(credentials).await
    }

    /// Register and adopt the session.
    ///
    /// # Errors
    ///
    /// See [`IdentityStore::register`].
    pub async fn register(&self, registration: &Registration) -> Result<Identity, StoreError> {
        self.identity.register(registration).await
    }

    /// Log out and drop all session-scoped state, including the local
    /// cart.
    pub async fn logout(&self) {
        self.identity.logout().await;
        self.cart.reset().await;
    }

    // =========================================================================
    // Checkout surface
    // =========================================================================

    /// Run the checkout gate and submit an order.
    ///
    /// On success the cart has been cleared and the returned receipt
    /// carries the order id for payment initialization.
    ///
    /// # Errors
    ///
    /// Returns a [`CheckoutFailure`] naming which stage refused the
    /// attempt.
    pub async fn submit_checkout(
        &self,
        form: &CheckoutForm,
    ) -> Result<CheckoutReceipt, CheckoutFailure> {
        CheckoutFlow::new(&self.identity, &self.cart, &self.api)
            .submit(form)
            .await
    }

    /// Submit an order and immediately initialize payment for it.
    ///
    /// # Errors
    ///
    /// Checkout failures pass through; a payment-initialization failure
    /// after a placed order surfaces as
    /// [`CheckoutFailure::Submission`] with the order already created.
    pub async fn submit_checkout_and_pay(
        &self,
        form: &CheckoutForm,
    ) -> Result<(CheckoutReceipt, PaymentSession), CheckoutFailure> {
        let receipt = self.submit_checkout(form).await?;
        let session = self
            .api
            .initialize_payment(&receipt.order_id)
            .await
            .map_err(|error| CheckoutFailure::Submission(error.user_message()))?;
        Ok((receipt, session))
    }

    /// Verify a payment and report whether the order settled.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure.
    pub async fn verify_payment(
        &self,
        reference: &str,
    ) -> Result<PaymentVerification, StoreError> {
        self.api.verify_payment(reference).await
    }

    /// Order history for the current user.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure.
    pub async fn orders(&self) -> Result<Vec<Order>, StoreError> {
        self.api.orders().await
    }

    /// One order by id.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or an unknown order.
    pub async fn order(&self, id: &OrderRef) -> Result<Order, StoreError> {
        self.api.order(id).await
    }
}
