//! Cart endpoints.
//!
//! Payloads pass through uninterpreted: the fetch endpoint and the three
//! mutation endpoints disagree about response shape in production, and
//! deciding what a payload means is the normalizer's job.

use fernmart_core::{LineId, ProductRef};
use serde_json::{Value, json};

use crate::cart::store::CartBackend;
use crate::error::Result;

use super::ApiClient;

impl CartBackend for ApiClient {
    async fn fetch_cart(&self) -> Result<Value> {
        self.get("/cart").await
    }

    async fn add_line(&self, product: &ProductRef, quantity: u32) -> Result<Value> {
        let body = json!({ "product": product, "quantity": quantity });
        self.post("/cart", &body).await
    }

    async fn update_line(&self, item: &LineId, quantity: u32) -> Result<Value> {
        let body = json!({ "quantity": quantity });
        self.put(&format!("/cart/{item}"), &body).await
    }

    async fn remove_line(&self, item: &LineId) -> Result<Value> {
        self.delete(&format!("/cart/{item}")).await
    }

    async fn clear_cart(&self) -> Result<Value> {
        self.delete("/cart").await
    }
}
