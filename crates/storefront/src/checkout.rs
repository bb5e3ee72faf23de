//! The checkout gate.
//!
//! One rule: an order is never submitted with missing identity, incomplete
//! shipping data, or unresolvable product/price references. The gate walks
//! a fixed sequence per attempt: identity check (with at most one awaited
//! profile refresh), then form validation (all violations collected, not
//! fail-fast), then draft assembly with per-line checks, then submission.
//! Every failure is terminal for the attempt but recoverable for the
//! session.

use fernmart_core::{Email, OrderRef, Phone, ProductRef, UserStableId};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::cart::identity::coerce_id;
use crate::cart::store::{CartBackend, CartStore};
use crate::cart::Cart;
use crate::error::{FieldError, Result, StoreError};
use crate::identity::{AuthBackend, IdentityStore};

/// Raw checkout form fields, exactly as the UI collected them.
#[derive(Debug, Clone, Default)]
pub struct CheckoutForm {
    pub street: String,
    pub city: String,
    pub state: String,
    pub phone: String,
    pub email: String,
    pub notes: Option<String>,
}

/// One violated form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: &'static str,
    pub message: String,
}

impl FieldViolation {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Why a checkout attempt failed.
#[derive(Debug)]
pub enum CheckoutFailure {
    /// Identity could not be made usable, even after one refresh.
    Auth,
    /// Local validation failed before any network call.
    Validation(Vec<FieldViolation>),
    /// The server rejected the order with per-field messages (422).
    Rejected(Vec<FieldError>),
    /// Transport or server failure; one generic message.
    Submission(String),
}

/// A successfully placed order, ready for payment initialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutReceipt {
    pub order_id: OrderRef,
}

/// Validated shipping address, as submitted to the API.
#[derive(Debug, Clone, Serialize)]
pub struct ShippingAddress {
    pub street: String,
    pub city: String,
    pub state: String,
    pub phone: Phone,
    pub email: Email,
}

/// The order submission body. Built once per attempt, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct DraftOrder {
    pub user: UserStableId,
    pub products: Vec<DraftLine>,
    #[serde(rename = "totalPrice")]
    pub total_price: Decimal,
    #[serde(rename = "shippingAddress")]
    pub shipping_address: ShippingAddress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// One order line on the wire.
#[derive(Debug, Clone, Serialize)]
pub struct DraftLine {
    pub product: ProductRef,
    pub quantity: u32,
}

/// Order submission endpoint, as exposed by the transport.
#[allow(async_fn_in_trait)]
pub trait OrderBackend {
    async fn submit_order(&self, order: &DraftOrder) -> Result<Value>;
}

/// One checkout attempt over the session's stores.
pub struct CheckoutFlow<'a, A, C, O> {
    identity: &'a IdentityStore<A>,
    cart: &'a CartStore<C>,
    orders: &'a O,
}

impl<'a, A, C, O> CheckoutFlow<'a, A, C, O>
where
    A: AuthBackend,
    C: CartBackend,
    O: OrderBackend,
{
    pub fn new(identity: &'a IdentityStore<A>, cart: &'a CartStore<C>, orders: &'a O) -> Self {
        Self {
            identity,
            cart,
            orders,
        }
    }

    /// Run the gate and submit.
    ///
    /// On success the cart is cleared (direct transition; a failed clear is
    /// logged and swallowed, since the order exists either way) and the new
    /// order's id is returned for payment initialization.
    ///
    /// # Errors
    ///
    /// Returns a [`CheckoutFailure`] naming which stage refused the
    /// attempt.
    pub async fn submit(
        &self,
        form: &CheckoutForm,
    ) -> std::result::Result<CheckoutReceipt, CheckoutFailure> {
        // Identity first: refreshing the profile mid-form would be too late
        // to matter and too early to bill.
        let user = self
            .identity
            .ensure_usable()
            .await
            .map_err(|_| CheckoutFailure::Auth)?;

        let address = validate_form(form).map_err(CheckoutFailure::Validation)?;

        let cart = self.cart.cart().await;
        let draft = build_draft(&user, &cart, address, form.notes.clone())
            .map_err(CheckoutFailure::Validation)?;

        debug!(
            user = %draft.user,
            lines = draft.products.len(),
            total = %draft.total_price,
            "submitting order"
        );

        let response = self
            .orders
            .submit_order(&draft)
            .await
            .map_err(submission_failure)?;

        let order_id = extract_order_id(&response).ok_or_else(|| {
            submission_failure(StoreError::MalformedResponse(
                "order confirmation carried no id".to_owned(),
            ))
        })?;

        if let Err(error) = self.cart.clear().await {
            warn!(%error, "cart clear after checkout failed");
        }

        Ok(CheckoutReceipt { order_id })
    }
}

fn submission_failure(error: StoreError) -> CheckoutFailure {
    match error {
        StoreError::AuthRequired => CheckoutFailure::Auth,
        StoreError::ValidationFailed(fields) => CheckoutFailure::Rejected(fields),
        other => CheckoutFailure::Submission(other.user_message()),
    }
}

/// Validate the shipping form, collecting every violation.
///
/// Field order is fixed (street, city, state, phone, email) so the UI can
/// rely on the first violation being the topmost field.
///
/// # Errors
///
/// Returns all violations together.
pub fn validate_form(form: &CheckoutForm) -> std::result::Result<ShippingAddress, Vec<FieldViolation>> {
    let mut violations = Vec::new();

    let street = form.street.trim();
    if street.is_empty() {
        violations.push(FieldViolation::new("street", "This field is required"));
    }

    let city = form.city.trim();
    if city.is_empty() {
        violations.push(FieldViolation::new("city", "This field is required"));
    }

    let state = form.state.trim();
    if state.is_empty() {
        violations.push(FieldViolation::new("state", "This field is required"));
    }

    let phone = if form.phone.trim().is_empty() {
        violations.push(FieldViolation::new("phone", "This field is required"));
        None
    } else {
        match Phone::parse(&form.phone) {
            Ok(phone) => Some(phone),
            Err(_) => {
                violations.push(FieldViolation::new(
                    "phone",
                    "Phone number must be 10-15 digits",
                ));
                None
            }
        }
    };

    let email = if form.email.trim().is_empty() {
        violations.push(FieldViolation::new("email", "This field is required"));
        None
    } else {
        match Email::parse(form.email.trim()) {
            Ok(email) => Some(email),
            Err(_) => {
                violations.push(FieldViolation::new("email", "Email is invalid"));
                None
            }
        }
    };

    match (phone, email) {
        (Some(phone), Some(email)) if violations.is_empty() => Ok(ShippingAddress {
            street: street.to_owned(),
            city: city.to_owned(),
            state: state.to_owned(),
            phone,
            email,
        }),
        _ => Err(violations),
    }
}

/// Assemble the draft order from cart state.
///
/// Every line must resolve a product reference and carry a positive
/// quantity and price; the cart total must be positive. Any miss aborts the
/// whole submission before a single byte goes out.
///
/// # Errors
///
/// Returns all line/total violations together.
pub fn build_draft(
    user: &UserStableId,
    cart: &Cart,
    shipping_address: ShippingAddress,
    notes: Option<String>,
) -> std::result::Result<DraftOrder, Vec<FieldViolation>> {
    if cart.is_empty() {
        return Err(vec![FieldViolation::new("items", "Your cart is empty")]);
    }

    let mut violations = Vec::new();
    let mut products = Vec::with_capacity(cart.lines.len());

    for line in &cart.lines {
        let label = line
            .snapshot
            .name
            .clone()
            .unwrap_or_else(|| line.line_id.to_string());

        let Some(product_ref) = line.product_ref.clone() else {
            violations.push(FieldViolation::new(
                "items",
                format!("{label} has no product reference"),
            ));
            continue;
        };

        if line.quantity < 1 {
            violations.push(FieldViolation::new(
                "items",
                format!("Quantity must be at least 1 for {label}"),
            ));
            continue;
        }

        if !line.snapshot.price.is_some_and(|price| price > Decimal::ZERO) {
            violations.push(FieldViolation::new(
                "items",
                format!("{label} has no valid price"),
            ));
            continue;
        }

        products.push(DraftLine {
            product: product_ref,
            quantity: line.quantity,
        });
    }

    if cart.total <= Decimal::ZERO {
        violations.push(FieldViolation::new(
            "total",
            "Total price must be greater than 0",
        ));
    }

    if !violations.is_empty() {
        return Err(violations);
    }

    Ok(DraftOrder {
        user: user.clone(),
        products,
        total_price: cart.total,
        shipping_address,
        notes,
    })
}

/// Pull the new order's id out of a creation response.
///
/// Accepts `_id`/`id` at the top level or nested under `order`.
#[must_use]
pub fn extract_order_id(response: &Value) -> Option<OrderRef> {
    let direct = response
        .get("_id")
        .or_else(|| response.get("id"))
        .and_then(coerce_id);

    let nested = || {
        response.get("order").and_then(|order| {
            order
                .get("_id")
                .or_else(|| order.get("id"))
                .and_then(coerce_id)
        })
    };

    direct.or_else(nested).map(OrderRef::from)
}
