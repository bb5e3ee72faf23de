//! Test support for driving the storefront engine without a network.
//!
//! [`FakeBackend`] implements every backend trait the engine consumes and
//! replays scripted responses per endpoint, with optional per-endpoint
//! delays for concurrency tests. One instance is shared (`Arc` inner)
//! between the cart store, the identity store, and the checkout flow, the
//! same way the real `ApiClient` is.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use fernmart_core::{LineId, ProductRef};
use fernmart_storefront::cart::store::CartBackend;
use fernmart_storefront::checkout::{DraftOrder, OrderBackend};
use fernmart_storefront::error::{Result, StoreError};
use fernmart_storefront::identity::{AuthBackend, Credentials, Registration};
use serde_json::{Value, json};

/// Which endpoint a scripted response belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    FetchCart,
    AddLine,
    UpdateLine,
    RemoveLine,
    ClearCart,
    Login,
    Profile,
    SubmitOrder,
}

/// One scripted response.
#[derive(Debug, Clone)]
pub enum Scripted {
    Ok(Value),
    NotFound,
    Unauthorized,
    Unprocessable(Value),
    Server(u16),
}

impl Scripted {
    fn into_result(self, context: &str) -> Result<Value> {
        match self {
            Self::Ok(value) => Ok(value),
            Self::NotFound => Err(StoreError::ItemNotFound(context.to_owned())),
            Self::Unauthorized => Err(StoreError::AuthRequired),
            Self::Unprocessable(body) => Err(StoreError::ValidationFailed(
                fernmart_storefront::error::FieldError::parse_envelope(&body),
            )),
            Self::Server(status) => Err(StoreError::ServerError(status)),
        }
    }
}

#[derive(Default)]
struct FakeState {
    queues: Mutex<std::collections::HashMap<Endpoint, VecDeque<Scripted>>>,
    delays: Mutex<std::collections::HashMap<Endpoint, Duration>>,
    calls: Mutex<Vec<Endpoint>>,
    profile_calls: AtomicUsize,
    order_calls: AtomicUsize,
    submitted_orders: Mutex<Vec<Value>>,
}

/// Scripted in-memory replacement for the API client.
#[derive(Clone, Default)]
pub struct FakeBackend {
    state: Arc<FakeState>,
}

impl FakeBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for an endpoint.
    pub fn script(&self, endpoint: Endpoint, response: Scripted) {
        if let Ok(mut queues) = self.state.queues.lock() {
            queues.entry(endpoint).or_default().push_back(response);
        }
    }

    /// Delay every call to an endpoint; used to force interleavings.
    pub fn delay(&self, endpoint: Endpoint, duration: Duration) {
        if let Ok(mut delays) = self.state.delays.lock() {
            delays.insert(endpoint, duration);
        }
    }

    /// Every endpoint call so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Endpoint> {
        self.state.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    /// How many times the profile endpoint was hit.
    #[must_use]
    pub fn profile_calls(&self) -> usize {
        self.state.profile_calls.load(Ordering::SeqCst)
    }

    /// How many times the order endpoint was hit.
    #[must_use]
    pub fn order_calls(&self) -> usize {
        self.state.order_calls.load(Ordering::SeqCst)
    }

    /// Every submitted order body, in order.
    #[must_use]
    pub fn submitted_orders(&self) -> Vec<Value> {
        self.state
            .submitted_orders
            .lock()
            .map(|orders| orders.clone())
            .unwrap_or_default()
    }

    async fn take(&self, endpoint: Endpoint, context: &str) -> Result<Value> {
        if let Ok(mut calls) = self.state.calls.lock() {
            calls.push(endpoint);
        }

        // Pop before sleeping so the guard never crosses an await point.
        let scripted = self
            .state
            .queues
            .lock()
            .ok()
            .and_then(|mut queues| queues.get_mut(&endpoint).and_then(VecDeque::pop_front));

        let delay = self
            .state
            .delays
            .lock()
            .ok()
            .and_then(|delays| delays.get(&endpoint).copied());
        if let Some(duration) = delay {
            tokio::time::sleep(duration).await;
        }

        match scripted {
            Some(response) => response.into_result(context),
            None => Ok(default_payload(endpoint)),
        }
    }
}

fn default_payload(endpoint: Endpoint) -> Value {
    match endpoint {
        Endpoint::FetchCart => json!({"cart": [], "totalPrice": 0}),
        Endpoint::Login => json!({"token": "fake-token", "user": {"_id": "user-1"}}),
        Endpoint::Profile => json!({"_id": "user-1", "email": "fake@example.com"}),
        Endpoint::SubmitOrder => json!({"_id": "order-1", "status": "Pending"}),
        Endpoint::AddLine | Endpoint::UpdateLine | Endpoint::RemoveLine | Endpoint::ClearCart => {
            json!({"message": "ok", "cart": []})
        }
    }
}

impl CartBackend for FakeBackend {
    async fn fetch_cart(&self) -> Result<Value> {
        self.take(Endpoint::FetchCart, "/cart").await
    }

    async fn add_line(&self, product: &ProductRef, _quantity: u32) -> Result<Value> {
        self.take(Endpoint::AddLine, product.as_str()).await
    }

    async fn update_line(&self, item: &LineId, _quantity: u32) -> Result<Value> {
        self.take(Endpoint::UpdateLine, item.as_str()).await
    }

    async fn remove_line(&self, item: &LineId) -> Result<Value> {
        self.take(Endpoint::RemoveLine, item.as_str()).await
    }

    async fn clear_cart(&self) -> Result<Value> {
        self.take(Endpoint::ClearCart, "/cart").await
    }
}

impl AuthBackend for FakeBackend {
    async fn login(&self, _credentials: &Credentials) -> Result<Value> {
        self.take(Endpoint::Login, "/users/login").await
    }

    async fn register(&self, _registration: &Registration) -> Result<Value> {
        self.take(Endpoint::Login, "/users/signUp").await
    }

    async fn logout(&self) -> Result<()> {
        Ok(())
    }

    async fn fetch_profile(&self) -> Result<Value> {
        self.state.profile_calls.fetch_add(1, Ordering::SeqCst);
        self.take(Endpoint::Profile, "/users/me").await
    }
}

impl OrderBackend for FakeBackend {
    async fn submit_order(&self, order: &DraftOrder) -> Result<Value> {
        self.state.order_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(body) = serde_json::to_value(order)
            && let Ok(mut submitted) = self.state.submitted_orders.lock()
        {
            submitted.push(body);
        }
        self.take(Endpoint::SubmitOrder, "/orders").await
    }
}
