//! Status enums for catalog and order entities.

use serde::{Deserialize, Serialize};

/// Stock availability for a product.
///
/// Maps to the API's `stockStatus` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    #[default]
    InStock,
    LowStock,
    OutOfStock,
    /// Anything the API starts sending that we do not know yet.
    #[serde(other)]
    Unknown,
}

/// Order lifecycle status.
///
/// The API spells these capitalized (`"Pending"`, `"Paid"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Paid,
    #[serde(other)]
    Unknown,
}

/// Payment verification status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    #[serde(other)]
    Unknown,
}

impl PaymentStatus {
    /// Whether this status settles the order as paid.
    #[must_use]
    pub const fn is_paid(self) -> bool {
        matches!(self, Self::Paid)
    }
}
