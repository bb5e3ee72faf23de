//! Authentication endpoints.
//!
//! Login and registration may deliver the bearer token in the response
//! body (`token` or `accessToken`) or in an `Authorization` response
//! header depending on the API deployment. The header case is folded into
//! the payload here so the identity store only ever sees one shape.

use reqwest::Method;
use reqwest::header::AUTHORIZATION;
use serde_json::Value;
use tracing::warn;

use crate::error::{Result, StoreError};
use crate::identity::{AuthBackend, Credentials, Registration};

use super::ApiClient;

impl ApiClient {
    /// POST an auth request and merge a header-delivered token into the
    /// payload when the body carries none.
    async fn post_auth(&self, path: &str, body: &Value) -> Result<Value> {
        let builder = self.builder(Method::POST, path).json(body);
        let response = builder.send().await?;

        let header_token = response
            .headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(self.error_for(status, path, &text));
        }

        let mut payload: Value = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).map_err(|_| {
                StoreError::MalformedResponse(format!("invalid JSON from {path}"))
            })?
        };

        if let Some(token) = header_token {
            let body_has_token = payload.get("token").is_some() || payload.get("accessToken").is_some();
            if !body_has_token {
                warn!(path, "auth token arrived via response header");
                match payload.as_object_mut() {
                    Some(object) => {
                        object.insert("token".to_owned(), Value::String(token));
                    }
                    None => {
                        payload = serde_json::json!({ "token": token });
                    }
                }
            }
        }

        Ok(payload)
    }
}

impl AuthBackend for ApiClient {
    async fn login(&self, credentials: &Credentials) -> Result<Value> {
        let body = serde_json::json!({
            "email": credentials.email,
            "password": credentials.password,
        });
        self.post_auth("/users/login", &body).await
    }

    async fn register(&self, registration: &Registration) -> Result<Value> {
        let body = serde_json::json!({
            "name": registration.name,
            "email": registration.email,
            "password": registration.password,
        });
        self.post_auth("/users/signUp", &body).await
    }

    async fn logout(&self) -> Result<()> {
        self.post("/users/logout", &Value::Null).await?;
        Ok(())
    }

    async fn fetch_profile(&self) -> Result<Value> {
        self.get("/users/me").await
    }
}
