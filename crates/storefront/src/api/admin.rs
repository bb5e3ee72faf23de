//! Admin console endpoints: product/inventory CRUD and reporting.
//!
//! Product create/update go up as multipart form data because they can
//! carry an image upload alongside the field values.

use fernmart_core::{ProductRef, price};
use reqwest::Method;
use reqwest::multipart::{Form, Part};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::warn;

use crate::error::{Result, StoreError};
use crate::identity::UserProfile;

use super::ApiClient;
use super::products::{Product, ProductPage, ProductQuery};

/// An image attached to a product form.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Fields for creating or updating a product.
///
/// On update, `None` fields are omitted and left unchanged server-side.
#[derive(Debug, Clone, Default)]
pub struct ProductForm {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub category: Option<String>,
    pub stock_quantity: Option<u64>,
    pub image: Option<ImageUpload>,
}

impl ProductForm {
    fn into_multipart(self) -> Result<Form> {
        let mut form = Form::new();

        if let Some(name) = self.name {
            form = form.text("productName", name);
        }
        if let Some(description) = self.description {
            form = form.text("description", description);
        }
        if let Some(price) = self.price {
            form = form.text("price", price.to_string());
        }
        if let Some(category) = self.category {
            form = form.text("category", category);
        }
        if let Some(quantity) = self.stock_quantity {
            form = form.text("quantity", quantity.to_string());
        }
        if let Some(image) = self.image {
            let part = Part::bytes(image.bytes)
                .file_name(image.file_name)
                .mime_str(&image.mime_type)?;
            form = form.part("image", part);
        }

        Ok(form)
    }
}

/// Aggregate dashboard statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct DashboardStats {
    pub total_products: u64,
    pub total_orders: u64,
    pub total_users: u64,
    pub total_revenue: Decimal,
}

impl DashboardStats {
    fn from_value(raw: &Value) -> Self {
        Self {
            total_products: raw.get("totalProducts").and_then(Value::as_u64).unwrap_or(0),
            total_orders: raw.get("totalOrders").and_then(Value::as_u64).unwrap_or(0),
            total_users: raw.get("totalUsers").and_then(Value::as_u64).unwrap_or(0),
            total_revenue: price::json_decimal_or_zero(raw.get("totalRevenue")),
        }
    }
}

/// A sales report over an optional date window.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct SalesReport {
    pub order_count: u64,
    pub total_revenue: Decimal,
}

impl ApiClient {
    /// List products through the admin endpoint (includes unpublished
    /// records).
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or an unrecognizable list
    /// shape.
    pub async fn admin_products(&self, query: &ProductQuery) -> Result<ProductPage> {
        let mut params = Vec::new();
        if let Some(category) = &query.category {
            params.push(("category", category.clone()));
        }
        if let Some(page) = query.page {
            params.push(("page", page.to_string()));
        }

        let payload = self.get_with_query("/admin/products", &params).await?;
        ProductPage::from_value(&payload)
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ValidationFailed`] when the API rejects the
    /// fields, [`StoreError::MalformedResponse`] when the created record
    /// does not parse.
    pub async fn admin_create_product(&self, form: ProductForm) -> Result<Product> {
        let multipart = form.into_multipart()?;
        let payload = self
            .send_multipart(Method::POST, "/admin/products", multipart)
            .await?;
        Product::from_value(&payload).ok_or_else(|| {
            StoreError::MalformedResponse("created product did not parse".to_owned())
        })
    }

    /// Update a product's fields; `None` fields are left unchanged.
    ///
    /// # Errors
    ///
    /// As for [`admin_create_product`](Self::admin_create_product), plus
    /// [`StoreError::ItemNotFound`] for an unknown product.
    pub async fn admin_update_product(
        &self,
        id: &ProductRef,
        form: ProductForm,
    ) -> Result<Product> {
        let multipart = form.into_multipart()?;
        let payload = self
            .send_multipart(Method::PATCH, &format!("/admin/products/{id}"), multipart)
            .await?;
        Product::from_value(&payload).ok_or_else(|| {
            StoreError::MalformedResponse("updated product did not parse".to_owned())
        })
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ItemNotFound`] for an unknown product.
    pub async fn admin_delete_product(&self, id: &ProductRef) -> Result<()> {
        self.delete(&format!("/admin/products/{id}")).await?;
        Ok(())
    }

    /// Set a product's stock quantity.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ItemNotFound`] for an unknown product.
    pub async fn admin_set_inventory(&self, id: &ProductRef, quantity: u64) -> Result<()> {
        let body = json!({ "quantity": quantity });
        self.patch(&format!("/admin/products/{id}/inventory"), &body)
            .await?;
        Ok(())
    }

    /// Inventory report: every product with its stock level.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or an unrecognizable list
    /// shape.
    pub async fn admin_inventory_report(&self) -> Result<Vec<Product>> {
        let payload = self.get("/admin/reports/inventory").await?;
        Ok(ProductPage::from_value(&payload)?.products)
    }

    /// Sales report.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure.
    pub async fn admin_sales_report(&self) -> Result<SalesReport> {
        let payload = self.get("/admin/reports/sales").await?;
        Ok(SalesReport {
            order_count: payload
                .get("orderCount")
                .or_else(|| payload.get("totalOrders"))
                .and_then(Value::as_u64)
                .unwrap_or(0),
            total_revenue: price::json_decimal_or_zero(
                payload
                    .get("totalRevenue")
                    .or_else(|| payload.get("revenue")),
            ),
        })
    }

    /// List user accounts.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or an unrecognizable list
    /// shape.
    pub async fn admin_users(&self) -> Result<Vec<UserProfile>> {
        let payload = self.get("/admin/users").await?;

        let items = match &payload {
            Value::Array(items) => items,
            Value::Object(map) => map.get("users").and_then(Value::as_array).ok_or_else(|| {
                StoreError::MalformedResponse("user list has no users field".to_owned())
            })?,
            _ => {
                return Err(StoreError::MalformedResponse(
                    "user list is not a list".to_owned(),
                ));
            }
        };

        Ok(items.iter().filter_map(UserProfile::from_value).collect())
    }

    /// Dashboard statistics.
    ///
    /// Deployments without the stats endpoint get zeroed statistics rather
    /// than a dead dashboard.
    pub async fn admin_dashboard_stats(&self) -> DashboardStats {
        match self.get("/admin/dashboard/stats").await {
            Ok(payload) => DashboardStats::from_value(&payload),
            Err(error) => {
                warn!(%error, "dashboard stats endpoint unavailable, using zeros");
                DashboardStats::default()
            }
        }
    }
}
