//! Catalog endpoints.
//!
//! Product payloads come in two spellings (`_id`/`productName` from the
//! current API, `id`/`name` from the legacy one), and the list endpoint
//! returns either a bare array or a `{products, total}` page. Parsing is
//! tolerant: an element that is not recognizably a product is skipped with
//! a warning instead of failing the whole page; the catalog must render
//! even when one record is junk.

use fernmart_core::{ProductRef, StockStatus, price};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::cart::identity::coerce_id;
use crate::error::{Result, StoreError};

use super::ApiClient;

/// One catalog product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub id: ProductRef,
    pub name: String,
    pub price: Decimal,
    pub image: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    /// Units in stock, when the API reports it.
    pub stock_quantity: Option<u64>,
    pub stock_status: StockStatus,
}

impl Product {
    /// Parse a raw product object. `None` when no id or name can be
    /// resolved.
    #[must_use]
    pub fn from_value(raw: &Value) -> Option<Self> {
        let object = raw.as_object()?;

        let id = object
            .get("_id")
            .or_else(|| object.get("id"))
            .and_then(coerce_id)
            .map(ProductRef::from)?;

        let name = object
            .get("productName")
            .or_else(|| object.get("name"))
            .and_then(Value::as_str)?
            .to_owned();

        let stock_status = object
            .get("stockStatus")
            .and_then(|status| serde_json::from_value(status.clone()).ok())
            .unwrap_or_default();

        Some(Self {
            id,
            name,
            price: price::json_decimal_or_zero(object.get("price")),
            image: object.get("image").and_then(Value::as_str).map(str::to_owned),
            category: object
                .get("category")
                .and_then(Value::as_str)
                .map(str::to_owned),
            description: object
                .get("description")
                .and_then(Value::as_str)
                .map(str::to_owned),
            stock_quantity: object.get("quantity").and_then(Value::as_u64),
            stock_status,
        })
    }
}

/// One page of catalog results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductPage {
    pub products: Vec<Product>,
    /// Total matching products server-side; falls back to the page length
    /// when the API omits it.
    pub total: u64,
}

impl ProductPage {
    /// Parse a list response: either a bare array or `{products, total}`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MalformedResponse`] when neither shape fits.
    pub fn from_value(raw: &Value) -> Result<Self> {
        let items = match raw {
            Value::Array(items) => items,
            Value::Object(map) => map
                .get("products")
                .and_then(Value::as_array)
                .ok_or_else(|| {
                    StoreError::MalformedResponse("product list has no products field".to_owned())
                })?,
            _ => {
                return Err(StoreError::MalformedResponse(
                    "product list is neither a list nor a page object".to_owned(),
                ));
            }
        };

        let products: Vec<Product> = items
            .iter()
            .filter_map(|item| {
                let parsed = Product::from_value(item);
                if parsed.is_none() {
                    warn!("skipping unrecognizable product record");
                }
                parsed
            })
            .collect();

        let total = raw
            .get("total")
            .and_then(Value::as_u64)
            .unwrap_or(products.len() as u64);

        Ok(Self { products, total })
    }
}

/// Catalog list filters, mapped straight onto query parameters.
#[derive(Debug, Clone, Default)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub sort_by: Option<String>,
    pub page: Option<u32>,
}

impl ProductQuery {
    fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(category) = &self.category {
            params.push(("category", category.clone()));
        }
        if let Some(sort_by) = &self.sort_by {
            params.push(("sortBy", sort_by.clone()));
        }
        if let Some(page) = self.page {
            params.push(("page", page.to_string()));
        }
        params
    }
}

impl ApiClient {
    /// List catalog products.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or an unrecognizable list
    /// shape.
    pub async fn products(&self, query: &ProductQuery) -> Result<ProductPage> {
        let payload = self
            .get_with_query("/products", &query.to_params())
            .await?;
        ProductPage::from_value(&payload)
    }

    /// Fetch one product, through the detail cache.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidItemId`] for a blank id before any
    /// network call, [`StoreError::ItemNotFound`] when the API has no such
    /// product, and [`StoreError::MalformedResponse`] when the record does
    /// not parse.
    pub async fn product(&self, id: &ProductRef) -> Result<Product> {
        if id.as_str().trim().is_empty() {
            return Err(StoreError::InvalidItemId(id.as_str().to_owned()));
        }

        let cache = self.product_cache();
        if let Some(cached) = cache.get(id.as_str()).await {
            debug!(%id, "product cache hit");
            return Ok(cached);
        }

        let payload = self.get(&format!("/products/{id}")).await?;
        let product = Product::from_value(&payload).ok_or_else(|| {
            StoreError::MalformedResponse(format!("product {id} did not parse"))
        })?;

        cache.insert(id.as_str().to_owned(), product.clone()).await;
        Ok(product)
    }

    /// Total product count.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a countless payload.
    pub async fn product_count(&self) -> Result<u64> {
        let payload = self.get("/products/count").await?;
        payload
            .as_u64()
            .or_else(|| payload.get("count").and_then(Value::as_u64))
            .ok_or_else(|| {
                StoreError::MalformedResponse("product count is not a number".to_owned())
            })
    }
}
