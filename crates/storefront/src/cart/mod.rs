//! Canonical cart state and the reconciliation engine.
//!
//! # Architecture
//!
//! The commerce API answers cart requests in four shapes: an enveloped line
//! list, an enveloped single line, a bare line list, and a bare single line.
//! Everything downstream of the wire works on one canonical [`Cart`]
//! instead:
//!
//! - [`normalize`](normalize::normalize) classifies a raw payload into a
//!   [`NormalizedCart`](normalize::NormalizedCart) (full replacement or
//!   single-line patch) and parses lines into [`CartLine`]s.
//! - [`reconcile`](reconcile::reconcile) merges that result into the
//!   previous cart, resolving line identity across inconsistent id fields.
//! - [`CartStore`](store::CartStore) owns the current cart, serializes
//!   mutations, and discards responses that outlived their cart.

pub mod identity;
pub mod normalize;
pub mod reconcile;
pub mod store;

pub use identity::{LineIdentity, validate_item_id};
pub use normalize::{NormalizedCart, normalize};
pub use reconcile::{CartOperation, reconcile};
pub use store::{CartBackend, CartStore};

use fernmart_core::{LineId, ProductRef, price};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

/// Denormalized product fields carried on a cart line for display.
///
/// Everything here reflects the product at last fetch; the server's price
/// stays authoritative at order time.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProductSnapshot {
    pub name: Option<String>,
    pub image: Option<String>,
    pub price: Option<Decimal>,
    pub category: Option<String>,
}

impl ProductSnapshot {
    fn from_product_object(product: &Value) -> Self {
        Self {
            name: product
                .get("productName")
                .or_else(|| product.get("name"))
                .and_then(Value::as_str)
                .map(str::to_owned),
            image: product.get("image").and_then(Value::as_str).map(str::to_owned),
            price: product.get("price").and_then(price::json_decimal),
            category: product
                .get("category")
                .and_then(Value::as_str)
                .map(str::to_owned),
        }
    }
}

/// One product line in the cart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartLine {
    /// Canonical identifier, resolved at ingest; never absent.
    pub line_id: LineId,
    /// Every raw identity candidate, kept for cross-field matching.
    pub identity: LineIdentity,
    /// Stable product reference, when the server line carried one.
    pub product_ref: Option<ProductRef>,
    /// Display fields at last-known-fetch time.
    pub snapshot: ProductSnapshot,
    /// Requested quantity. Defaults to 1 when the server omits it.
    pub quantity: u32,
}

impl CartLine {
    /// Parse a raw line object.
    ///
    /// Returns `None` when the object is not recognizably a cart line: it
    /// must yield at least one identity candidate or product reference.
    #[must_use]
    pub fn from_value(raw: &Value) -> Option<Self> {
        if !raw.is_object() {
            return None;
        }

        let identity = LineIdentity::from_value(raw);
        let line_id = identity.canonical()?;

        let (product_ref, snapshot) = match raw.get("product") {
            Some(product @ Value::Object(_)) => {
                let product_ref = product
                    .get("_id")
                    .or_else(|| product.get("id"))
                    .and_then(identity::coerce_id)
                    .map(ProductRef::from);
                (product_ref, ProductSnapshot::from_product_object(product))
            }
            Some(bare @ (Value::String(_) | Value::Number(_))) => (
                identity::coerce_id(bare).map(ProductRef::from),
                ProductSnapshot::default(),
            ),
            _ => (None, ProductSnapshot::default()),
        };

        let quantity = raw
            .get("quantity")
            .and_then(Value::as_u64)
            .and_then(|q| u32::try_from(q).ok())
            .unwrap_or(1);

        Some(Self {
            line_id,
            identity,
            product_ref,
            snapshot,
            quantity,
        })
    }

    /// Whether `target` names this line through any identity field.
    #[must_use]
    pub fn matches_id(&self, target: &str) -> bool {
        self.identity.matches(target)
    }

    /// This line's contribution to the cart total.
    ///
    /// A missing snapshot price contributes zero rather than poisoning the
    /// whole total.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.snapshot.price.unwrap_or(Decimal::ZERO) * Decimal::from(self.quantity)
    }
}

/// The canonical cart: an ordered line set plus its total.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Cart {
    pub lines: Vec<CartLine>,
    pub total: Decimal,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Find a line by id, matching across every identity field.
    #[must_use]
    pub fn find_line(&self, target: &str) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.matches_id(target))
    }

    /// Total item count across lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }
}
