//! Cart payload classification.
//!
//! The API has two response conventions in production (an enveloped
//! `{cart, totalPrice}` object and a legacy bare payload), and each of them
//! may carry either the whole line list or just the single mutated line.
//! This module is the only place that looks at the raw shape; every call
//! site gets a [`NormalizedCart`] instead.

use rust_decimal::Decimal;
use serde_json::Value;
use tracing::debug;

use fernmart_core::price;

use super::CartLine;
use crate::error::StoreError;

/// A cart payload reduced to one of two canonical forms.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedCart {
    /// The payload carried the entire line set.
    Full {
        lines: Vec<CartLine>,
        /// Server-supplied total when present, otherwise computed from the
        /// lines.
        total: Decimal,
    },
    /// The payload echoed only the single affected line.
    Patch {
        line: CartLine,
        /// Total as echoed by the server. It describes the patched line,
        /// not the cart, so the reconciler ignores it for the aggregate;
        /// it is kept because a disagreement is the best available signal
        /// that local price snapshots have drifted.
        server_total: Option<Decimal>,
    },
}

/// Classify a raw cart payload.
///
/// Shape priority:
/// 1. `{cart: [...]}`: full, with optional `totalPrice`
/// 2. `{cart: {...}}`: patch, with optional `totalPrice`
/// 3. `[...]`: full, legacy bare list (no server total exists)
/// 4. `{...}`: patch, legacy bare line
///
/// # Errors
///
/// Returns [`StoreError::MalformedResponse`] for `null`, scalars, an
/// envelope whose `cart` is neither list nor object, or any element that is
/// not recognizably a cart line.
pub fn normalize(payload: &Value) -> Result<NormalizedCart, StoreError> {
    match payload {
        Value::Object(map) if map.contains_key("cart") => {
            let server_total = map.get("totalPrice").and_then(price::json_decimal);

            match map.get("cart") {
                Some(Value::Array(items)) => {
                    let lines = parse_lines(items)?;
                    let total = server_total.unwrap_or_else(|| compute_total(&lines));
                    Ok(NormalizedCart::Full { lines, total })
                }
                Some(single @ Value::Object(_)) => {
                    debug!("cart field is a single object, treating as patch");
                    Ok(NormalizedCart::Patch {
                        line: parse_line(single)?,
                        server_total,
                    })
                }
                other => Err(malformed(format!(
                    "cart field is {}",
                    json_kind(other.unwrap_or(&Value::Null))
                ))),
            }
        }
        Value::Array(items) => {
            debug!("bare list payload, computing total locally");
            let lines = parse_lines(items)?;
            let total = compute_total(&lines);
            Ok(NormalizedCart::Full { lines, total })
        }
        Value::Object(_) => {
            debug!("bare object payload, treating as patch");
            Ok(NormalizedCart::Patch {
                line: parse_line(payload)?,
                server_total: None,
            })
        }
        other => Err(malformed(format!("payload is {}", json_kind(other)))),
    }
}

/// Sum of `price × quantity` across lines.
#[must_use]
pub fn compute_total(lines: &[CartLine]) -> Decimal {
    lines.iter().map(CartLine::line_total).sum()
}

fn parse_lines(items: &[Value]) -> Result<Vec<CartLine>, StoreError> {
    items.iter().map(parse_line).collect()
}

fn parse_line(raw: &Value) -> Result<CartLine, StoreError> {
    CartLine::from_value(raw)
        .ok_or_else(|| malformed(format!("element is not a cart line: {}", json_kind(raw))))
}

fn malformed(detail: String) -> StoreError {
    StoreError::MalformedResponse(detail)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn line(id: &str, product: &str, price: f64, quantity: u32) -> Value {
        json!({
            "_id": id,
            "product": {"_id": product, "price": price},
            "quantity": quantity,
        })
    }

    #[test]
    fn test_enveloped_list() {
        let payload = json!({
            "cart": [line("a", "p1", 10.0, 2), line("b", "p2", 5.0, 1)],
            "totalPrice": 25,
            "itemCount": 3,
        });

        let NormalizedCart::Full { lines, total } = normalize(&payload).unwrap() else {
            panic!("expected full result");
        };
        assert_eq!(lines.len(), 2);
        assert_eq!(total, Decimal::new(25, 0));
    }

    #[test]
    fn test_enveloped_list_without_total_computes_locally() {
        let payload = json!({"cart": [line("a", "p1", 10.0, 2), line("b", "p2", 5.0, 1)]});

        let NormalizedCart::Full { total, .. } = normalize(&payload).unwrap() else {
            panic!("expected full result");
        };
        assert_eq!(total, Decimal::new(25, 0));
    }

    #[test]
    fn test_enveloped_single_object_is_patch() {
        let payload = json!({"cart": line("a", "p1", 10.0, 3), "totalPrice": 30});

        let NormalizedCart::Patch { line, server_total } = normalize(&payload).unwrap() else {
            panic!("expected patch result");
        };
        assert_eq!(line.line_id.as_str(), "a");
        assert_eq!(line.quantity, 3);
        assert_eq!(server_total, Some(Decimal::new(30, 0)));
    }

    #[test]
    fn test_bare_list_computes_total() {
        let payload = json!([line("a", "p1", 12.5, 2)]);

        let NormalizedCart::Full { lines, total } = normalize(&payload).unwrap() else {
            panic!("expected full result");
        };
        assert_eq!(lines.len(), 1);
        assert_eq!(total, Decimal::new(25, 0));
    }

    #[test]
    fn test_bare_list_length_matches_payload() {
        let payload = json!([
            line("a", "p1", 1.0, 1),
            line("b", "p2", 2.0, 1),
            line("c", "p3", 3.0, 1),
        ]);

        let NormalizedCart::Full { lines, .. } = normalize(&payload).unwrap() else {
            panic!("expected full result");
        };
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_bare_object_is_patch_without_total() {
        let payload = line("a", "p1", 10.0, 2);

        let NormalizedCart::Patch { server_total, .. } = normalize(&payload).unwrap() else {
            panic!("expected patch result");
        };
        assert_eq!(server_total, None);
    }

    #[test]
    fn test_missing_quantity_defaults_to_one() {
        let payload = json!([{"_id": "a", "product": {"_id": "p1", "price": 7.0}}]);

        let NormalizedCart::Full { lines, total } = normalize(&payload).unwrap() else {
            panic!("expected full result");
        };
        assert_eq!(lines[0].quantity, 1);
        assert_eq!(total, Decimal::new(7, 0));
    }

    #[test]
    fn test_null_payload_is_malformed() {
        assert!(matches!(
            normalize(&json!(null)),
            Err(StoreError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_scalar_payload_is_malformed() {
        assert!(matches!(
            normalize(&json!("ok")),
            Err(StoreError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_envelope_with_scalar_cart_is_malformed() {
        assert!(matches!(
            normalize(&json!({"cart": "empty"})),
            Err(StoreError::MalformedResponse(_))
        ));
        assert!(matches!(
            normalize(&json!({"cart": null})),
            Err(StoreError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_list_with_unrecognizable_element_is_malformed() {
        let payload = json!([line("a", "p1", 1.0, 1), {"note": "free sample"}]);
        assert!(matches!(
            normalize(&payload),
            Err(StoreError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_object_without_line_shape_is_malformed() {
        // An envelope-less ack like {"message": "ok"} must not be mistaken
        // for a cart line.
        assert!(matches!(
            normalize(&json!({"message": "ok"})),
            Err(StoreError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_empty_enveloped_cart() {
        let NormalizedCart::Full { lines, total } =
            normalize(&json!({"cart": [], "totalPrice": 0})).unwrap()
        else {
            panic!("expected full result");
        };
        assert!(lines.is_empty());
        assert_eq!(total, Decimal::ZERO);
    }
}
