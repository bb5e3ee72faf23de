//! Unified error handling for storefront operations.
//!
//! Every failure an operation can hit maps onto one [`StoreError`] variant,
//! and every variant maps onto one stable user-facing message via
//! [`StoreError::user_message`]. Errors are recovered at the operation that
//! triggered them; nothing here is meant to escape as a panic.

use serde_json::Value;
use thiserror::Error;

/// Application-level error type for the storefront engine.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The API returned a payload shape the normalizer cannot interpret.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// A cart item identifier failed local validation before dispatch.
    #[error("invalid item id: {0:?}")]
    InvalidItemId(String),

    /// A quantity failed local validation before dispatch.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(u32),

    /// The API rejected the request as unauthenticated (401).
    #[error("authentication required")]
    AuthRequired,

    /// The API could not find the addressed resource (404).
    #[error("not found: {0}")]
    ItemNotFound(String),

    /// The API rejected a submission with per-field messages (422).
    #[error("validation failed: {}", format_field_errors(.0))]
    ValidationFailed(Vec<FieldError>),

    /// The API answered with a non-success status not covered above.
    #[error("server error (HTTP {0})")]
    ServerError(u16),

    /// The request never completed (connect, timeout, body read).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl StoreError {
    /// The message shown to the person behind the screen.
    ///
    /// Field-level details for [`StoreError::ValidationFailed`] are joined
    /// the way the checkout form expects to split them back apart.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::MalformedResponse(_) => {
                "The server returned unexpected data. Please try again.".to_owned()
            }
            Self::InvalidItemId(_) => "Invalid item ID".to_owned(),
            Self::InvalidQuantity(_) => "Quantity must be at least 1".to_owned(),
            Self::AuthRequired => "Authentication required. Please log in again.".to_owned(),
            Self::ItemNotFound(_) => {
                "Item not found in cart. It may have already been removed.".to_owned()
            }
            Self::ValidationFailed(fields) => format_field_errors(fields),
            Self::ServerError(_) => "Server error. Please try again later.".to_owned(),
            Self::Transport(_) => {
                "Network error. Please check your connection and try again.".to_owned()
            }
        }
    }

    /// Whether the failure means the local cart should be refetched to
    /// resync with the server.
    #[must_use]
    pub const fn needs_resync(&self) -> bool {
        matches!(self, Self::ItemNotFound(_))
    }
}

/// One field-level message from a 422 response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Offending field, when the API names one.
    pub field: Option<String>,
    /// Human-readable message.
    pub message: String,
}

impl FieldError {
    /// Build a message-only error with no field attribution.
    #[must_use]
    pub fn message_only(message: impl Into<String>) -> Self {
        Self {
            field: None,
            message: message.into(),
        }
    }

    /// Extract field errors from a 422 response body.
    ///
    /// The API has shipped at least three envelope shapes:
    /// `{errors: [{field|path, message|msg}]}`, `{details: string | [...]}`,
    /// and a bare `{message}`. Anything unrecognized collapses to one
    /// generic entry so the caller always has something to show.
    #[must_use]
    pub fn parse_envelope(body: &Value) -> Vec<Self> {
        if let Some(errors) = body.get("errors").and_then(Value::as_array) {
            let parsed: Vec<Self> = errors.iter().filter_map(Self::from_entry).collect();
            if !parsed.is_empty() {
                return parsed;
            }
        }

        if let Some(details) = body.get("details") {
            match details {
                Value::String(s) => return vec![Self::message_only(s.clone())],
                Value::Array(entries) => {
                    let parsed: Vec<Self> = entries
                        .iter()
                        .filter_map(|entry| match entry {
                            Value::String(s) => Some(Self::message_only(s.clone())),
                            other => Self::from_entry(other),
                        })
                        .collect();
                    if !parsed.is_empty() {
                        return parsed;
                    }
                }
                _ => {}
            }
        }

        if let Some(message) = body.get("message").and_then(Value::as_str) {
            return vec![Self::message_only(message)];
        }

        vec![Self::message_only(
            "Validation error. Please check your order details.",
        )]
    }

    fn from_entry(entry: &Value) -> Option<Self> {
        let field = entry
            .get("field")
            .or_else(|| entry.get("path"))
            .and_then(Value::as_str)
            .map(str::to_owned);
        let message = entry
            .get("message")
            .or_else(|| entry.get("msg"))
            .and_then(Value::as_str)?
            .to_owned();
        Some(Self { field, message })
    }
}

fn format_field_errors(errors: &[FieldError]) -> String {
    if errors.is_empty() {
        return "Validation error. Please check your order details.".to_owned();
    }

    errors
        .iter()
        .map(|e| e.message.clone())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type alias for `StoreError`.
pub type Result<T> = std::result::Result<T, StoreError>;
