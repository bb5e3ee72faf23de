//! Fernmart commerce API client.
//!
//! # Architecture
//!
//! - One [`ApiClient`] per process, cheap to clone (`Arc` inner)
//! - Bearer token read from the shared [`TokenStore`] on every request;
//!   a 401 anywhere clears it, and the next request goes out anonymous
//! - Response payloads are returned as raw `serde_json::Value`; shape
//!   interpretation belongs to the normalizer and model parsers, not the
//!   transport
//! - Product detail lookups are cached via `moka` (TTL from configuration)
//!
//! # Endpoint families
//!
//! - [`auth`] - login, registration, profile
//! - [`cart`] - cart fetch and mutations
//! - [`products`] - catalog reads
//! - [`orders`] - order submission, history, payment init/verify
//! - [`admin`] - product/inventory CRUD and reports

pub mod admin;
pub mod auth;
pub mod cart;
pub mod orders;
pub mod products;

use std::sync::Arc;

use moka::future::Cache;
use reqwest::header::AUTHORIZATION;
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::{error, warn};

use crate::config::StorefrontConfig;
use crate::error::{FieldError, Result, StoreError};
use crate::token::TokenStore;

use products::Product;

/// Client for the Fernmart commerce API.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    http: reqwest::Client,
    /// Base URL with any trailing slash trimmed; paths are appended as-is.
    base: String,
    tokens: TokenStore,
    product_cache: Cache<String, Product>,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client fails to build.
    pub fn new(config: &StorefrontConfig, tokens: TokenStore) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        let product_cache = Cache::builder()
            .max_capacity(config.product_cache_capacity)
            .time_to_live(config.product_cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                http,
                base: config.api_base_url.as_str().trim_end_matches('/').to_owned(),
                tokens,
                product_cache,
            }),
        })
    }

    /// The shared token store this client authenticates from.
    #[must_use]
    pub fn tokens(&self) -> &TokenStore {
        &self.inner.tokens
    }

    // =========================================================================
    // Request plumbing
    // =========================================================================

    pub(crate) async fn get(&self, path: &str) -> Result<Value> {
        self.request(Method::GET, path, None).await
    }

    pub(crate) async fn get_with_query(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Value> {
        let builder = self.builder(Method::GET, path).query(query);
        self.dispatch(path, builder).await
    }

    pub(crate) async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        self.request(Method::POST, path, Some(body)).await
    }

    pub(crate) async fn put(&self, path: &str, body: &Value) -> Result<Value> {
        self.request(Method::PUT, path, Some(body)).await
    }

    pub(crate) async fn patch(&self, path: &str, body: &Value) -> Result<Value> {
        self.request(Method::PATCH, path, Some(body)).await
    }

    pub(crate) async fn delete(&self, path: &str) -> Result<Value> {
        self.request(Method::DELETE, path, None).await
    }

    pub(crate) async fn send_multipart(
        &self,
        method: Method,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<Value> {
        let builder = self.builder(method, path).multipart(form);
        self.dispatch(path, builder).await
    }

    async fn request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        let mut builder = self.builder(method, path);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        self.dispatch(path, builder).await
    }

    fn builder(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{path}", self.inner.base);
        let mut builder = self.inner.http.request(method, url);
        if let Some(bearer) = self.inner.tokens.bearer() {
            builder = builder.header(AUTHORIZATION, bearer);
        }
        builder
    }

    async fn dispatch(&self, path: &str, builder: reqwest::RequestBuilder) -> Result<Value> {
        let response = builder.send().await?;
        let status = response.status();
        // Body text first: error bodies are sometimes HTML, and the
        // diagnostics are worthless once the body is gone.
        let text = response.text().await?;

        if !status.is_success() {
            return Err(self.error_for(status, path, &text));
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text).map_err(|e| {
            error!(
                path,
                error = %e,
                body = %text.chars().take(500).collect::<String>(),
                "API returned unparseable success body"
            );
            StoreError::MalformedResponse(format!("invalid JSON from {path}"))
        })
    }

    fn error_for(&self, status: StatusCode, path: &str, body: &str) -> StoreError {
        match status.as_u16() {
            401 => {
                // A rejected token is dead for every caller; drop it here
                // so the next request goes out anonymous.
                warn!(path, "API rejected the session token");
                self.inner.tokens.clear();
                StoreError::AuthRequired
            }
            404 => StoreError::ItemNotFound(path.to_owned()),
            422 => {
                let parsed: Value = serde_json::from_str(body).unwrap_or(Value::Null);
                StoreError::ValidationFailed(FieldError::parse_envelope(&parsed))
            }
            code => {
                error!(
                    path,
                    status = code,
                    body = %body.chars().take(500).collect::<String>(),
                    "API returned non-success status"
                );
                StoreError::ServerError(code)
            }
        }
    }

    /// Cached product detail lookup; see [`products`].
    pub(crate) fn product_cache(&self) -> &Cache<String, Product> {
        &self.inner.product_cache
    }
}
