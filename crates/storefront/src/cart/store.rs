//! The owning cart store.
//!
//! Serializes all mutations against one canonical [`Cart`]: network calls
//! run outside the lock, reconciliation runs inside it, in response-arrival
//! order (last applied wins; the API exposes no sequence numbers to do
//! better). An epoch counter stamps each dispatched mutation so a response
//! that outlives its cart (cleared mid-flight, identity torn down) is
//! discarded instead of resurrecting stale lines.

use fernmart_core::{LineId, ProductRef};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::identity::validate_item_id;
use super::normalize::normalize;
use super::reconcile::{CartOperation, reconcile};
use super::Cart;
use crate::error::{Result, StoreError};

/// Raw cart endpoints, as exposed by the transport.
///
/// Implementations return the payload uninterpreted; shape handling belongs
/// to the normalizer alone.
#[allow(async_fn_in_trait)]
pub trait CartBackend {
    async fn fetch_cart(&self) -> Result<Value>;
    async fn add_line(&self, product: &ProductRef, quantity: u32) -> Result<Value>;
    async fn update_line(&self, item: &LineId, quantity: u32) -> Result<Value>;
    async fn remove_line(&self, item: &LineId) -> Result<Value>;
    async fn clear_cart(&self) -> Result<Value>;
}

/// The owning store for canonical cart state.
pub struct CartStore<B> {
    backend: B,
    state: Mutex<CartState>,
}

struct CartState {
    cart: Cart,
    epoch: u64,
}

impl<B: CartBackend> CartStore<B> {
    /// Create an empty store over the given backend.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            state: Mutex::new(CartState {
                cart: Cart::empty(),
                epoch: 0,
            }),
        }
    }

    /// Snapshot of the current canonical cart.
    pub async fn cart(&self) -> Cart {
        self.state.lock().await.cart.clone()
    }

    /// Fetch the cart from the server and reconcile it in.
    pub async fn fetch(&self) -> Result<Cart> {
        let epoch = self.current_epoch().await;
        let payload = self.backend.fetch_cart().await?;
        self.apply(epoch, CartOperation::Fetch, &payload, None).await
    }

    /// Add a product to the cart.
    ///
    /// # Errors
    ///
    /// Rejects a zero quantity locally ([`StoreError::InvalidQuantity`])
    /// before any network call.
    pub async fn add(&self, product: &ProductRef, quantity: u32) -> Result<Cart> {
        validate_quantity(quantity)?;
        let epoch = self.current_epoch().await;
        let payload = self.backend.add_line(product, quantity).await?;
        self.apply(epoch, CartOperation::Add, &payload, None).await
    }

    /// Change a line's quantity.
    ///
    /// # Errors
    ///
    /// Rejects an unusable item id or zero quantity locally before any
    /// network call. A 404 triggers a resync fetch before the error is
    /// returned.
    pub async fn update_quantity(&self, item_id: &str, quantity: u32) -> Result<Cart> {
        let target = validate_item_id(item_id)?;
        validate_quantity(quantity)?;

        let epoch = self.current_epoch().await;
        let payload = match self.backend.update_line(&target, quantity).await {
            Ok(payload) => payload,
            Err(error) => return self.fail_with_resync(error).await,
        };
        self.apply(epoch, CartOperation::Update, &payload, Some(&target))
            .await
    }

    /// Remove a line from the cart.
    ///
    /// The id may name the line through any identity field, including its
    /// nested product id.
    ///
    /// # Errors
    ///
    /// Rejects an unusable item id locally before any network call. A 404
    /// triggers a resync fetch before the error is returned.
    pub async fn remove(&self, item_id: &str) -> Result<Cart> {
        let target = validate_item_id(item_id)?;

        let epoch = self.current_epoch().await;
        let payload = match self.backend.remove_line(&target).await {
            Ok(payload) => payload,
            Err(error) => return self.fail_with_resync(error).await,
        };
        self.apply(epoch, CartOperation::Remove, &payload, Some(&target))
            .await
    }

    /// Clear the cart.
    ///
    /// A direct transition: the server response is advisory and never goes
    /// through the normalizer. Bumps the epoch so any mutation still in
    /// flight cannot resurrect the old lines.
    pub async fn clear(&self) -> Result<Cart> {
        let advisory = self.backend.clear_cart().await?;
        debug!(?advisory, "cart cleared server-side");

        let mut state = self.state.lock().await;
        state.epoch += 1;
        state.cart = Cart::empty();
        Ok(state.cart.clone())
    }

    /// Drop local cart state without talking to the server.
    ///
    /// Used on logout and auth teardown, where the server-side cart no
    /// longer belongs to us.
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        state.epoch += 1;
        state.cart = Cart::empty();
    }

    /// Interpret an already-received payload and reconcile it in.
    ///
    /// This is the seam UI collaborators use when they hold a response the
    /// store did not dispatch itself.
    pub async fn apply_response(&self, payload: &Value, operation: CartOperation) -> Result<Cart> {
        let epoch = self.current_epoch().await;
        self.apply(epoch, operation, payload, None).await
    }

    async fn current_epoch(&self) -> u64 {
        self.state.lock().await.epoch
    }

    async fn apply(
        &self,
        dispatched_epoch: u64,
        operation: CartOperation,
        payload: &Value,
        requested: Option<&LineId>,
    ) -> Result<Cart> {
        let normalized = normalize(payload)?;

        let mut state = self.state.lock().await;
        if state.epoch != dispatched_epoch {
            debug!(
                dispatched_epoch,
                current_epoch = state.epoch,
                "discarding response for a cart we no longer own"
            );
            return Ok(state.cart.clone());
        }

        state.cart = reconcile(&state.cart, normalized, operation, requested);
        Ok(state.cart.clone())
    }

    /// On a resync-worthy failure, refetch before surfacing the error so
    /// the local cart stops disagreeing with the server.
    async fn fail_with_resync(&self, error: StoreError) -> Result<Cart> {
        if error.needs_resync() {
            warn!(%error, "cart out of sync, refetching");
            if let Err(refetch_error) = self.fetch().await {
                warn!(%refetch_error, "resync fetch failed");
            }
        }
        Err(error)
    }
}

fn validate_quantity(quantity: u32) -> Result<()> {
    if quantity == 0 {
        return Err(StoreError::InvalidQuantity(quantity));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use serde_json::json;
    use std::sync::Mutex as StdMutex;

    /// Scripted backend: each endpoint pops its next canned payload.
    #[derive(Default)]
    struct Scripted {
        fetches: StdMutex<Vec<Value>>,
        adds: StdMutex<Vec<Value>>,
        updates: StdMutex<Vec<Value>>,
        removes: StdMutex<Vec<Value>>,
        not_found: bool,
        calls: StdMutex<Vec<&'static str>>,
    }

    impl Scripted {
        fn push(queue: &StdMutex<Vec<Value>>, payload: Value) {
            queue.lock().unwrap().push(payload);
        }

        fn pop(&self, name: &'static str, queue: &StdMutex<Vec<Value>>) -> Result<Value> {
            self.calls.lock().unwrap().push(name);
            if self.not_found {
                return Err(StoreError::ItemNotFound(name.to_owned()));
            }
            let mut queue = queue.lock().unwrap();
            if queue.is_empty() {
                return Ok(json!({"cart": []}));
            }
            Ok(queue.remove(0))
        }
    }

    impl CartBackend for &Scripted {
        async fn fetch_cart(&self) -> Result<Value> {
            self.pop("fetch", &self.fetches)
        }

        async fn add_line(&self, _product: &ProductRef, _quantity: u32) -> Result<Value> {
            self.pop("add", &self.adds)
        }

        async fn update_line(&self, _item: &LineId, _quantity: u32) -> Result<Value> {
            self.pop("update", &self.updates)
        }

        async fn remove_line(&self, _item: &LineId) -> Result<Value> {
            self.pop("remove", &self.removes)
        }

        async fn clear_cart(&self) -> Result<Value> {
            self.calls.lock().unwrap().push("clear");
            Ok(json!({"message": "cart cleared"}))
        }
    }

    fn raw_line(id: &str, product: &str, price: f64, quantity: u32) -> Value {
        json!({
            "_id": id,
            "product": {"_id": product, "price": price},
            "quantity": quantity,
        })
    }

    #[tokio::test]
    async fn test_fetch_then_patch_update() {
        let backend = Scripted::default();
        Scripted::push(
            &backend.fetches,
            json!({"cart": [raw_line("a", "p1", 10.0, 2), raw_line("b", "p2", 5.0, 1)]}),
        );
        Scripted::push(
            &backend.updates,
            json!({"cart": raw_line("a", "p1", 10.0, 3), "totalPrice": 30}),
        );

        let store = CartStore::new(&backend);
        store.fetch().await.unwrap();

        let cart = store.update_quantity("a", 3).await.unwrap();
        assert_eq!(cart.lines.len(), 2);
        assert_eq!(cart.lines[0].quantity, 3);
        // 3x10 + 5x1, not the echoed 30
        assert_eq!(cart.total, Decimal::new(35, 0));
    }

    #[tokio::test]
    async fn test_invalid_id_never_reaches_the_network() {
        let backend = Scripted::default();
        let store = CartStore::new(&backend);

        let error = store.remove("   ").await.unwrap_err();
        assert!(matches!(error, StoreError::InvalidItemId(_)));
        assert!(backend.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_zero_quantity_never_reaches_the_network() {
        let backend = Scripted::default();
        let store = CartStore::new(&backend);

        let error = store.update_quantity("a", 0).await.unwrap_err();
        assert!(matches!(error, StoreError::InvalidQuantity(0)));
        assert!(backend.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_by_nested_product_id() {
        let backend = Scripted::default();
        Scripted::push(
            &backend.fetches,
            json!([raw_line("a", "p1", 10.0, 1), raw_line("b", "p2", 5.0, 1)]),
        );
        // Server acks the removal by echoing the removed record.
        Scripted::push(&backend.removes, raw_line("a", "p1", 10.0, 1));

        let store = CartStore::new(&backend);
        store.fetch().await.unwrap();

        let cart = store.remove("p1").await.unwrap();
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.lines[0].line_id.as_str(), "b");
        assert_eq!(cart.total, Decimal::new(5, 0));
    }

    #[tokio::test]
    async fn test_clear_is_direct() {
        let backend = Scripted::default();
        Scripted::push(&backend.fetches, json!([raw_line("a", "p1", 10.0, 1)]));

        let store = CartStore::new(&backend);
        store.fetch().await.unwrap();

        let cart = store.clear().await.unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.total, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_not_found_triggers_resync_fetch() {
        let backend = Scripted {
            not_found: true,
            ..Scripted::default()
        };

        let store = CartStore::new(&backend);
        let error = store.update_quantity("a", 2).await.unwrap_err();
        assert!(matches!(error, StoreError::ItemNotFound(_)));

        let calls = backend.calls.lock().unwrap().clone();
        assert_eq!(calls, vec!["update", "fetch"]);
    }

    #[tokio::test]
    async fn test_malformed_payload_leaves_state_untouched() {
        let backend = Scripted::default();
        Scripted::push(&backend.fetches, json!([raw_line("a", "p1", 10.0, 1)]));
        Scripted::push(&backend.updates, json!("ok"));

        let store = CartStore::new(&backend);
        store.fetch().await.unwrap();

        let error = store.update_quantity("a", 2).await.unwrap_err();
        assert!(matches!(error, StoreError::MalformedResponse(_)));

        let cart = store.cart().await;
        assert_eq!(cart.lines[0].quantity, 1);
    }

    #[tokio::test]
    async fn test_apply_response_drives_the_same_pipeline() {
        let backend = Scripted::default();
        let store = CartStore::new(&backend);

        let cart = store
            .apply_response(
                &json!({"cart": [raw_line("a", "p1", 2.5, 2)]}),
                CartOperation::Fetch,
            )
            .await
            .unwrap();

        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.total, Decimal::new(5, 0));
    }
}
