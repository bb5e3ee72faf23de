//! Cart line identity resolution.
//!
//! The API is not consistent about where a cart line's identifier lives: a
//! line may carry `_id`, `id`, a populated `product` object with its own
//! `_id`, or just a product id string. One mutation's response can address
//! the same line through a different field than the previous one did, so a
//! single canonical id is not enough for matching. [`LineIdentity`] keeps
//! every candidate it saw and matches a target against all of them.

use fernmart_core::LineId;
use serde::Serialize;
use serde_json::Value;

use crate::error::StoreError;

/// Every identifier candidate found on a raw line object.
///
/// Candidates are string-coerced at extraction: the API has sent numeric
/// ids in older payloads and string ids in newer ones, and the two must
/// compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LineIdentity {
    /// Top-level `_id`.
    pub primary: Option<String>,
    /// Top-level `id` (legacy spelling).
    pub alternate: Option<String>,
    /// `product._id` / `product.id`, or the bare `product` string itself.
    pub product: Option<String>,
}

impl LineIdentity {
    /// Extract all identity candidates from a raw line object.
    #[must_use]
    pub fn from_value(raw: &Value) -> Self {
        let product = match raw.get("product") {
            Some(Value::Object(product)) => product
                .get("_id")
                .or_else(|| product.get("id"))
                .and_then(coerce_id),
            Some(bare @ (Value::String(_) | Value::Number(_))) => coerce_id(bare),
            _ => None,
        };

        Self {
            primary: raw.get("_id").and_then(coerce_id),
            alternate: raw.get("id").and_then(coerce_id),
            product,
        }
    }

    /// The canonical line id: first candidate in `_id` → `id` →
    /// product-reference priority order.
    #[must_use]
    pub fn canonical(&self) -> Option<LineId> {
        self.primary
            .as_deref()
            .or(self.alternate.as_deref())
            .or(self.product.as_deref())
            .map(LineId::from)
    }

    /// Whether any candidate was found at all.
    #[must_use]
    pub const fn is_resolvable(&self) -> bool {
        self.primary.is_some() || self.alternate.is_some() || self.product.is_some()
    }

    /// Whether `target` names this line through any candidate field.
    #[must_use]
    pub fn matches(&self, target: &str) -> bool {
        [&self.primary, &self.alternate, &self.product]
            .into_iter()
            .flatten()
            .any(|candidate| candidate == target)
    }
}

/// String-coerce a JSON id candidate.
///
/// Strings are trimmed; numbers are rendered; everything else (null,
/// booleans, containers) is not an id.
#[must_use]
pub fn coerce_id(value: &Value) -> Option<String> {
    let coerced = match value {
        Value::String(s) => s.trim().to_owned(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!coerced.is_empty()).then_some(coerced)
}

/// Validate a caller-supplied item id before any network dispatch.
///
/// A request carrying an unusable id is guaranteed to fail server-side, so
/// it is cheaper and clearer to refuse it here.
///
/// # Errors
///
/// Returns [`StoreError::InvalidItemId`] when the id trims to nothing.
pub fn validate_item_id(raw: &str) -> Result<LineId, StoreError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(StoreError::InvalidItemId(raw.to_owned()));
    }
    Ok(LineId::from(trimmed))
}
