//! Order and payment endpoints.

use fernmart_core::{OrderRef, OrderStatus, PaymentStatus, ProductRef, price};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::warn;

use crate::cart::identity::coerce_id;
use crate::checkout::{DraftOrder, OrderBackend};
use crate::error::{Result, StoreError};

use super::ApiClient;

/// One order as the history endpoints describe it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    pub id: OrderRef,
    pub status: OrderStatus,
    pub total_price: Decimal,
    pub lines: Vec<OrderLine>,
    /// Creation timestamp, passed through as the API sent it.
    pub created_at: Option<String>,
}

/// One product line on an order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderLine {
    pub product: Option<ProductRef>,
    pub quantity: u32,
}

impl Order {
    /// Parse a raw order object. `None` when no id can be resolved.
    #[must_use]
    pub fn from_value(raw: &Value) -> Option<Self> {
        let object = raw.as_object()?;

        let id = object
            .get("_id")
            .or_else(|| object.get("id"))
            .and_then(coerce_id)
            .map(OrderRef::from)?;

        let status = object
            .get("status")
            .and_then(|status| serde_json::from_value(status.clone()).ok())
            .unwrap_or_default();

        let lines = object
            .get("products")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(OrderLine::from_value).collect())
            .unwrap_or_default();

        Some(Self {
            id,
            status,
            total_price: price::json_decimal_or_zero(object.get("totalPrice")),
            lines,
            created_at: object
                .get("createdAt")
                .and_then(Value::as_str)
                .map(str::to_owned),
        })
    }
}

impl OrderLine {
    fn from_value(raw: &Value) -> Self {
        let product = match raw.get("product") {
            Some(product @ Value::Object(_)) => product
                .get("_id")
                .or_else(|| product.get("id"))
                .and_then(coerce_id)
                .map(ProductRef::from),
            Some(bare) => coerce_id(bare).map(ProductRef::from),
            None => None,
        };

        Self {
            product,
            quantity: raw
                .get("quantity")
                .and_then(Value::as_u64)
                .and_then(|q| u32::try_from(q).ok())
                .unwrap_or(1),
        }
    }
}

/// A payment session handed back by the payment-initialization endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentSession {
    /// Provider redirect URL, when the provider uses one.
    pub authorization_url: Option<String>,
    /// Reference to verify the payment with later.
    pub reference: String,
}

/// Outcome of a payment verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentVerification {
    pub status: PaymentStatus,
    pub order_id: Option<OrderRef>,
}

impl OrderBackend for ApiClient {
    async fn submit_order(&self, order: &DraftOrder) -> Result<Value> {
        let body = serde_json::to_value(order)
            .map_err(|e| StoreError::MalformedResponse(format!("order did not serialize: {e}")))?;
        self.post("/orders", &body).await
    }
}

impl ApiClient {
    /// List the current user's orders.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or an unrecognizable list
    /// shape.
    pub async fn orders(&self) -> Result<Vec<Order>> {
        let payload = self.get("/orders").await?;

        let items = match &payload {
            Value::Array(items) => items,
            Value::Object(map) => map.get("orders").and_then(Value::as_array).ok_or_else(|| {
                StoreError::MalformedResponse("order list has no orders field".to_owned())
            })?,
            _ => {
                return Err(StoreError::MalformedResponse(
                    "order list is not a list".to_owned(),
                ));
            }
        };

        Ok(items
            .iter()
            .filter_map(|item| {
                let parsed = Order::from_value(item);
                if parsed.is_none() {
                    warn!("skipping unrecognizable order record");
                }
                parsed
            })
            .collect())
    }

    /// Fetch one order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ItemNotFound`] when the API has no such order
    /// and [`StoreError::MalformedResponse`] when the record does not
    /// parse.
    pub async fn order(&self, id: &OrderRef) -> Result<Order> {
        let payload = self.get(&format!("/orders/{id}")).await?;
        Order::from_value(&payload)
            .ok_or_else(|| StoreError::MalformedResponse(format!("order {id} did not parse")))
    }

    /// Cancel an order.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or when the order cannot be
    /// cancelled.
    pub async fn cancel_order(&self, id: &OrderRef, reason: Option<&str>) -> Result<Order> {
        let body = json!({ "reason": reason });
        let payload = self.post(&format!("/orders/{id}/cancel"), &body).await?;
        Order::from_value(&payload)
            .ok_or_else(|| StoreError::MalformedResponse(format!("order {id} did not parse")))
    }

    /// Start payment for an order; hand the result to the payment provider
    /// collaborator.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MalformedResponse`] when the session payload
    /// carries no reference.
    pub async fn initialize_payment(&self, id: &OrderRef) -> Result<PaymentSession> {
        let payload = self.post(&format!("/orders/{id}/payment"), &Value::Null).await?;

        let reference = payload
            .get("reference")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| {
                StoreError::MalformedResponse("payment session carried no reference".to_owned())
            })?;

        Ok(PaymentSession {
            authorization_url: payload
                .get("authorizationUrl")
                .or_else(|| payload.get("authorization_url"))
                .and_then(Value::as_str)
                .map(str::to_owned),
            reference,
        })
    }

    /// Verify a payment by its provider reference.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure; an unrecognized status parses
    /// as [`PaymentStatus::Unknown`] rather than failing.
    pub async fn verify_payment(&self, reference: &str) -> Result<PaymentVerification> {
        let payload = self.get(&format!("/payments/verify/{reference}")).await?;

        let status = payload
            .get("status")
            .and_then(|status| serde_json::from_value(status.clone()).ok())
            .unwrap_or_default();

        Ok(PaymentVerification {
            status,
            order_id: payload
                .get("orderId")
                .or_else(|| payload.get("order_id"))
                .and_then(coerce_id)
                .map(OrderRef::from),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_order_parse() {
        let order = Order::from_value(&json!({
            "_id": "o1",
            "status": "Paid",
            "totalPrice": 35.5,
            "products": [
                {"product": {"_id": "p1"}, "quantity": 2},
                {"product": "p2", "quantity": 1},
            ],
            "createdAt": "2026-07-01T10:15:00Z",
        }))
        .unwrap();

        assert_eq!(order.id.as_str(), "o1");
        assert_eq!(order.status, OrderStatus::Paid);
        assert_eq!(order.total_price, Decimal::new(355, 1));
        assert_eq!(order.lines.len(), 2);
        assert_eq!(order.lines[0].product.as_ref().unwrap().as_str(), "p1");
        assert_eq!(order.lines[1].product.as_ref().unwrap().as_str(), "p2");
    }

    #[test]
    fn test_order_defaults() {
        let order = Order::from_value(&json!({"id": "o2"})).unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_price, Decimal::ZERO);
        assert!(order.lines.is_empty());
    }

    #[test]
    fn test_order_unknown_status() {
        let order = Order::from_value(&json!({"_id": "o3", "status": "Refunded"})).unwrap();
        assert_eq!(order.status, OrderStatus::Unknown);
    }

    #[test]
    fn test_order_without_id() {
        assert!(Order::from_value(&json!({"status": "Pending"})).is_none());
    }
}
