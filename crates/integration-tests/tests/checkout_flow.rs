//! End-to-end checkout gate flows against the scripted backend.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use fernmart_integration_tests::{Endpoint, FakeBackend, Scripted};
use fernmart_storefront::checkout::CheckoutFlow;
use fernmart_storefront::{
    CartStore, CheckoutFailure, CheckoutForm, IdentityStore, TokenStore,
};
use serde_json::{Value, json};

fn raw_line(id: &str, product: &str, price: f64, quantity: u32) -> Value {
    json!({
        "_id": id,
        "product": {"_id": product, "price": price, "productName": format!("Product {product}")},
        "quantity": quantity,
    })
}

fn valid_form() -> CheckoutForm {
    CheckoutForm {
        street: "12 Harbor Rd".to_owned(),
        city: "Accra".to_owned(),
        state: "Greater Accra".to_owned(),
        phone: "0244123456".to_owned(),
        email: "ama@example.com".to_owned(),
        notes: None,
    }
}

/// Session with a persisted token but no profile yet: the state a
/// restarted process wakes up in.
fn token_only_session(backend: &FakeBackend) -> IdentityStore<FakeBackend> {
    let tokens = TokenStore::in_memory();
    tokens.set("persisted-token");
    IdentityStore::new(backend.clone(), tokens)
}

#[tokio::test]
async fn checkout_repairs_missing_identity_and_submits() {
    let backend = FakeBackend::new();
    backend.script(Endpoint::Profile, Scripted::Ok(json!({"_id": "u1"})));
    backend.script(
        Endpoint::FetchCart,
        Scripted::Ok(json!({"cart": [raw_line("a", "p1", 10.0, 2)], "totalPrice": 20})),
    );
    backend.script(
        Endpoint::SubmitOrder,
        Scripted::Ok(json!({"_id": "order-7", "status": "Pending"})),
    );

    let identity = token_only_session(&backend);
    let cart = CartStore::new(backend.clone());
    cart.fetch().await.unwrap();

    let receipt = CheckoutFlow::new(&identity, &cart, &backend)
        .submit(&valid_form())
        .await
        .unwrap();

    assert_eq!(receipt.order_id.as_str(), "order-7");
    assert_eq!(backend.profile_calls(), 1);
    assert_eq!(backend.order_calls(), 1);

    // Success clears the cart.
    assert!(cart.cart().await.is_empty());

    // The submitted body carries the wire field names.
    let submitted = backend.submitted_orders();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0]["user"], "u1");
    assert_eq!(submitted[0]["products"][0]["product"], "p1");
    assert_eq!(submitted[0]["products"][0]["quantity"], 2);
    assert!(submitted[0].get("totalPrice").is_some());
    assert_eq!(submitted[0]["shippingAddress"]["city"], "Accra");
}

#[tokio::test]
async fn checkout_fails_auth_when_refresh_cannot_repair() {
    let backend = FakeBackend::new();
    backend.script(Endpoint::Profile, Scripted::Unauthorized);
    backend.script(
        Endpoint::FetchCart,
        Scripted::Ok(json!({"cart": [raw_line("a", "p1", 10.0, 1)]})),
    );

    let identity = token_only_session(&backend);
    let cart = CartStore::new(backend.clone());
    cart.fetch().await.unwrap();

    let failure = CheckoutFlow::new(&identity, &cart, &backend)
        .submit(&valid_form())
        .await
        .unwrap_err();

    assert!(matches!(failure, CheckoutFailure::Auth));
    assert_eq!(backend.order_calls(), 0);
    // The dead session is gone entirely.
    assert!(!identity.identity().authenticated);
}

#[tokio::test]
async fn checkout_refreshes_identity_at_most_once() {
    let backend = FakeBackend::new();
    // Profile answers with a record that still has no stable id, so the
    // single refresh completes but cannot repair identity.
    backend.script(Endpoint::Profile, Scripted::Ok(json!({"email": "a@b.co"})));
    backend.script(Endpoint::Profile, Scripted::Ok(json!({"email": "a@b.co"})));

    let identity = token_only_session(&backend);
    let cart = CartStore::new(backend.clone());

    let failure = CheckoutFlow::new(&identity, &cart, &backend)
        .submit(&valid_form())
        .await
        .unwrap_err();

    assert!(matches!(failure, CheckoutFailure::Auth));
    assert_eq!(backend.profile_calls(), 1, "no retry loop");
    assert_eq!(backend.order_calls(), 0);
}

#[tokio::test]
async fn concurrent_refreshes_share_one_flight() {
    let backend = FakeBackend::new();
    backend.script(Endpoint::Profile, Scripted::Ok(json!({"_id": "u1"})));
    backend.delay(Endpoint::Profile, Duration::from_millis(60));

    let identity = Arc::new(token_only_session(&backend));

    let first = {
        let identity = Arc::clone(&identity);
        tokio::spawn(async move { identity.ensure_usable().await })
    };
    let second = {
        let identity = Arc::clone(&identity);
        tokio::spawn(async move { identity.ensure_usable().await })
    };

    let (first, second) = (first.await.unwrap(), second.await.unwrap());
    assert_eq!(first.unwrap().as_str(), "u1");
    assert_eq!(second.unwrap().as_str(), "u1");
    assert_eq!(backend.profile_calls(), 1, "refresh must be single-flight");
}

#[tokio::test]
async fn invalid_form_collects_every_violation_before_any_network_call() {
    let backend = FakeBackend::new();
    backend.script(Endpoint::Profile, Scripted::Ok(json!({"_id": "u1"})));
    backend.script(
        Endpoint::FetchCart,
        Scripted::Ok(json!({"cart": [raw_line("a", "p1", 10.0, 1)]})),
    );

    let identity = token_only_session(&backend);
    let cart = CartStore::new(backend.clone());
    cart.fetch().await.unwrap();

    let form = CheckoutForm {
        street: String::new(),
        city: String::new(),
        phone: "12".to_owned(),
        ..valid_form()
    };

    let failure = CheckoutFlow::new(&identity, &cart, &backend)
        .submit(&form)
        .await
        .unwrap_err();

    let CheckoutFailure::Validation(violations) = failure else {
        panic!("expected validation failure");
    };
    let fields: Vec<&str> = violations.iter().map(|v| v.field).collect();
    assert_eq!(fields, ["street", "city", "phone"]);
    assert_eq!(backend.order_calls(), 0);
}

#[tokio::test]
async fn zero_quantity_line_aborts_before_any_network_call() {
    let backend = FakeBackend::new();
    backend.script(Endpoint::Profile, Scripted::Ok(json!({"_id": "u1"})));
    backend.script(
        Endpoint::FetchCart,
        Scripted::Ok(json!({"cart": [
            raw_line("a", "p1", 10.0, 2),
            raw_line("b", "p2", 5.0, 0),
        ]})),
    );

    let identity = token_only_session(&backend);
    let cart = CartStore::new(backend.clone());
    cart.fetch().await.unwrap();

    let failure = CheckoutFlow::new(&identity, &cart, &backend)
        .submit(&valid_form())
        .await
        .unwrap_err();

    assert!(matches!(failure, CheckoutFailure::Validation(_)));
    assert_eq!(backend.order_calls(), 0);
}

#[tokio::test]
async fn line_without_product_ref_aborts_the_whole_submission() {
    let backend = FakeBackend::new();
    backend.script(Endpoint::Profile, Scripted::Ok(json!({"_id": "u1"})));
    backend.script(
        Endpoint::FetchCart,
        Scripted::Ok(json!({"cart": [
            raw_line("a", "p1", 10.0, 2),
            {"_id": "orphan", "quantity": 1},
        ]})),
    );

    let identity = token_only_session(&backend);
    let cart = CartStore::new(backend.clone());
    cart.fetch().await.unwrap();

    let failure = CheckoutFlow::new(&identity, &cart, &backend)
        .submit(&valid_form())
        .await
        .unwrap_err();

    assert!(matches!(failure, CheckoutFailure::Validation(_)));
    assert_eq!(backend.order_calls(), 0);
}

#[tokio::test]
async fn empty_cart_cannot_check_out() {
    let backend = FakeBackend::new();
    backend.script(Endpoint::Profile, Scripted::Ok(json!({"_id": "u1"})));

    let identity = token_only_session(&backend);
    let cart = CartStore::new(backend.clone());

    let failure = CheckoutFlow::new(&identity, &cart, &backend)
        .submit(&valid_form())
        .await
        .unwrap_err();

    let CheckoutFailure::Validation(violations) = failure else {
        panic!("expected validation failure");
    };
    assert_eq!(violations[0].field, "items");
    assert_eq!(backend.order_calls(), 0);
}

#[tokio::test]
async fn server_rejection_surfaces_per_field_messages() {
    let backend = FakeBackend::new();
    backend.script(Endpoint::Profile, Scripted::Ok(json!({"_id": "u1"})));
    backend.script(
        Endpoint::FetchCart,
        Scripted::Ok(json!({"cart": [raw_line("a", "p1", 10.0, 1)]})),
    );
    backend.script(
        Endpoint::SubmitOrder,
        Scripted::Unprocessable(json!({
            "errors": [
                {"field": "shippingAddress.phone", "message": "Phone is invalid"},
                {"path": "totalPrice", "msg": "Total mismatch"},
            ]
        })),
    );

    let identity = token_only_session(&backend);
    let cart = CartStore::new(backend.clone());
    cart.fetch().await.unwrap();

    let failure = CheckoutFlow::new(&identity, &cart, &backend)
        .submit(&valid_form())
        .await
        .unwrap_err();

    let CheckoutFailure::Rejected(fields) = failure else {
        panic!("expected per-field rejection");
    };
    assert_eq!(fields.len(), 2);
    assert_eq!(fields[0].field.as_deref(), Some("shippingAddress.phone"));
    assert_eq!(fields[1].message, "Total mismatch");

    // A rejected submission does not clear the cart.
    assert!(!cart.cart().await.is_empty());
}

#[tokio::test]
async fn transport_failure_is_one_generic_message() {
    let backend = FakeBackend::new();
    backend.script(Endpoint::Profile, Scripted::Ok(json!({"_id": "u1"})));
    backend.script(
        Endpoint::FetchCart,
        Scripted::Ok(json!({"cart": [raw_line("a", "p1", 10.0, 1)]})),
    );
    backend.script(Endpoint::SubmitOrder, Scripted::Server(502));

    let identity = token_only_session(&backend);
    let cart = CartStore::new(backend.clone());
    cart.fetch().await.unwrap();

    let failure = CheckoutFlow::new(&identity, &cart, &backend)
        .submit(&valid_form())
        .await
        .unwrap_err();

    let CheckoutFailure::Submission(message) = failure else {
        panic!("expected generic submission failure");
    };
    assert_eq!(message, "Server error. Please try again later.");
}
