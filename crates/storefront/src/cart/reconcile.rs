//! Cart reconciliation.
//!
//! Applies a [`NormalizedCart`] to the previous cart state and returns the
//! new canonical [`Cart`]. Pure: same inputs, same output, no hidden state.

use fernmart_core::LineId;
use tracing::debug;

use super::normalize::{NormalizedCart, compute_total};
use super::{Cart, CartLine};

/// Which cart operation produced the payload being reconciled.
///
/// The distinction only matters for patch responses: a remove echo deletes
/// the target line, everything else upserts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartOperation {
    Fetch,
    Add,
    Update,
    Remove,
}

/// Merge a normalized result into the previous cart.
///
/// - A full result replaces the line set outright; its total is trusted.
/// - A patch result upserts the echoed line: an existing line matching the
///   incoming line's id (across every identity field) is replaced in place,
///   otherwise the line is appended. The total is recomputed over the whole
///   line set; the server-echoed total of a patch reflects only the
///   patched line.
/// - A patch result for [`CartOperation::Remove`] deletes every line
///   matching `requested` (falling back to the echoed line's own id when
///   the caller has no target), then recomputes.
#[must_use]
pub fn reconcile(
    prev: &Cart,
    result: NormalizedCart,
    operation: CartOperation,
    requested: Option<&LineId>,
) -> Cart {
    match result {
        NormalizedCart::Full { lines, total } => Cart { lines, total },
        NormalizedCart::Patch { line, server_total } => {
            let lines = if operation == CartOperation::Remove {
                let target = requested.cloned().unwrap_or_else(|| line.line_id.clone());
                remove_line(prev, target.as_str())
            } else {
                upsert_line(prev, line)
            };

            let total = compute_total(&lines);
            if let Some(echoed) = server_total
                && echoed != total
            {
                debug!(%echoed, %total, "ignoring patch-echo total; local snapshots may be stale");
            }

            Cart { lines, total }
        }
    }
}

/// Replace the matching line in place, preserving order, or append.
fn upsert_line(prev: &Cart, incoming: CartLine) -> Vec<CartLine> {
    let mut lines = prev.lines.clone();

    let position = lines
        .iter()
        .position(|existing| existing.matches_id(incoming.line_id.as_str()));

    match position {
        Some(index) => {
            if let Some(slot) = lines.get_mut(index) {
                *slot = incoming;
            }
        }
        None => lines.push(incoming),
    }

    lines
}

/// Drop every line matching the target, across all identity fields.
fn remove_line(prev: &Cart, target: &str) -> Vec<CartLine> {
    prev.lines
        .iter()
        .filter(|line| !line.matches_id(target))
        .cloned()
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cart::normalize::normalize;
    use rust_decimal::Decimal;
    use serde_json::{Value, json};

    fn raw_line(id: &str, product: &str, price: f64, quantity: u32) -> Value {
        json!({
            "_id": id,
            "product": {"_id": product, "price": price},
            "quantity": quantity,
        })
    }

    fn cart_of(raw: Value) -> Cart {
        let normalized = normalize(&raw).unwrap();
        reconcile(&Cart::empty(), normalized, CartOperation::Fetch, None)
    }

    #[test]
    fn test_full_replaces_outright() {
        let prev = cart_of(json!([raw_line("a", "p1", 10.0, 1)]));
        let normalized = normalize(&json!({
            "cart": [raw_line("b", "p2", 4.0, 2)],
            "totalPrice": 8,
        }))
        .unwrap();

        let next = reconcile(&prev, normalized, CartOperation::Fetch, None);
        assert_eq!(next.lines.len(), 1);
        assert_eq!(next.lines[0].line_id.as_str(), "b");
        assert_eq!(next.total, Decimal::new(8, 0));
    }

    #[test]
    fn test_patch_replaces_in_place_preserving_order_and_length() {
        let prev = cart_of(json!([
            raw_line("a", "p1", 10.0, 2),
            raw_line("b", "p2", 5.0, 1),
            raw_line("c", "p3", 2.0, 1),
        ]));

        let normalized = normalize(&json!({"cart": raw_line("b", "p2", 5.0, 4)})).unwrap();
        let next = reconcile(&prev, normalized, CartOperation::Update, None);

        assert_eq!(next.lines.len(), 3);
        let ids: Vec<&str> = next.lines.iter().map(|l| l.line_id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert_eq!(next.lines[1].quantity, 4);
    }

    #[test]
    fn test_patch_appends_unknown_line() {
        let prev = cart_of(json!([raw_line("a", "p1", 10.0, 1)]));

        let normalized = normalize(&raw_line("z", "p9", 3.0, 2)).unwrap();
        let next = reconcile(&prev, normalized, CartOperation::Add, None);

        assert_eq!(next.lines.len(), prev.lines.len() + 1);
        assert_eq!(next.lines[1].line_id.as_str(), "z");
    }

    #[test]
    fn test_patch_total_recomputed_over_whole_cart() {
        // Two lines; the server echoes the patched line's own total (30).
        // The cart total must be 3x10 + 5x1 = 35, not 30.
        let prev = cart_of(json!([
            raw_line("a", "p1", 10.0, 2),
            raw_line("b", "p2", 5.0, 1),
        ]));

        let normalized = normalize(&json!({
            "cart": {"_id": "a", "product": {"_id": "p1", "price": 10.0}, "quantity": 3},
            "totalPrice": 30,
        }))
        .unwrap();

        let next = reconcile(&prev, normalized, CartOperation::Update, None);
        assert_eq!(next.total, Decimal::new(35, 0));
    }

    #[test]
    fn test_patch_total_matches_server_when_cart_has_one_line() {
        let prev = cart_of(json!([raw_line("a", "p1", 10.0, 2)]));

        let normalized = normalize(&json!({
            "cart": {"_id": "a", "product": {"_id": "p1", "price": 10.0}, "quantity": 3},
            "totalPrice": 30,
        }))
        .unwrap();

        let next = reconcile(&prev, normalized, CartOperation::Update, None);
        assert_eq!(next.total, Decimal::new(30, 0));
    }

    #[test]
    fn test_patch_matches_across_identity_fields() {
        // Stored line only carries a nested product id; the echo addresses
        // it by that id at the top level.
        let prev = cart_of(json!([{"product": {"_id": "p1", "price": 6.0}, "quantity": 1}]));

        let normalized = normalize(&json!({"_id": "p1", "quantity": 5})).unwrap();
        let next = reconcile(&prev, normalized, CartOperation::Update, None);

        assert_eq!(next.lines.len(), 1);
        assert_eq!(next.lines[0].quantity, 5);
    }

    #[test]
    fn test_remove_patch_deletes_requested_line() {
        let prev = cart_of(json!([
            raw_line("a", "p1", 10.0, 1),
            raw_line("b", "p2", 5.0, 2),
        ]));

        // Mutation endpoints ack removals by echoing the removed record.
        let normalized = normalize(&json!({"cart": raw_line("a", "p1", 10.0, 1)})).unwrap();
        let target = LineId::from("a");
        let next = reconcile(&prev, normalized, CartOperation::Remove, Some(&target));

        assert_eq!(next.lines.len(), 1);
        assert_eq!(next.lines[0].line_id.as_str(), "b");
        assert_eq!(next.total, Decimal::new(10, 0));
    }

    #[test]
    fn test_remove_by_product_id_only() {
        // The caller removes by product id while the stored line's
        // canonical id is its top-level _id.
        let prev = cart_of(json!([
            raw_line("a", "p1", 10.0, 1),
            raw_line("b", "p2", 5.0, 1),
        ]));

        let normalized = normalize(&json!({"message": "removed", "_id": "a"})).unwrap();
        let target = LineId::from("p1");
        let next = reconcile(&prev, normalized, CartOperation::Remove, Some(&target));

        assert_eq!(next.lines.len(), 1);
        assert_eq!(next.lines[0].line_id.as_str(), "b");
    }

    #[test]
    fn test_remove_ignores_echoed_total() {
        let prev = cart_of(json!([
            raw_line("a", "p1", 10.0, 1),
            raw_line("b", "p2", 5.0, 2),
        ]));

        let normalized = normalize(&json!({
            "cart": raw_line("a", "p1", 10.0, 1),
            "totalPrice": 10,
        }))
        .unwrap();
        let target = LineId::from("a");
        let next = reconcile(&prev, normalized, CartOperation::Remove, Some(&target));

        assert_eq!(next.total, Decimal::new(10, 0)); // 5 x 2, not the echoed 10
    }

    #[test]
    fn test_full_is_idempotent() {
        let payload = json!({
            "cart": [raw_line("a", "p1", 10.0, 2), raw_line("b", "p2", 5.0, 1)],
            "totalPrice": 25,
        });

        let once = reconcile(
            &Cart::empty(),
            normalize(&payload).unwrap(),
            CartOperation::Fetch,
            None,
        );
        let twice = reconcile(
            &once,
            normalize(&payload).unwrap(),
            CartOperation::Fetch,
            None,
        );

        assert_eq!(once, twice);
    }

    #[test]
    fn test_reconcile_is_pure() {
        let prev = cart_of(json!([raw_line("a", "p1", 10.0, 1)]));
        let payload = json!({"cart": raw_line("a", "p1", 10.0, 3)});

        let first = reconcile(
            &prev,
            normalize(&payload).unwrap(),
            CartOperation::Update,
            None,
        );
        let second = reconcile(
            &prev,
            normalize(&payload).unwrap(),
            CartOperation::Update,
            None,
        );

        assert_eq!(first, second);
        // prev untouched
        assert_eq!(prev.lines[0].quantity, 1);
    }
}
