//! # Domain Types
//!
//! Core domain types used throughout Dhaba POS.
//!
//! ## Dual-Key Identity Pattern
//! An order has two identifiers with very different trust levels:
//! - `id`: generated client-side from the wall clock; NOT trusted as unique
//!   (the same id resurfaces when a client retries a submission)
//! - `bill_number`: assigned exactly once by the server, enforced unique by
//!   the database, never reassigned
//!
//! The submission payload ([`OrderPayload`]) and the persisted entity
//! ([`Order`]) are separate types: a payload may carry a `TEMP-` placeholder
//! bill number and an untrusted id, while an `Order` always has a durable
//! server-assigned bill number.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::DEFAULT_GST_RATE;

// =============================================================================
// Order Status
// =============================================================================

/// The status of an order.
///
/// Transitions are one-way: pending → completed. A completed order is never
/// reopened, only deleted (by an admin).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Order is saved but not yet settled.
    Pending,
    /// Order has been billed and settled.
    Completed,
}

impl OrderStatus {
    /// Stable string form, matching the TEXT column values.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Completed => "completed",
        }
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

// =============================================================================
// Order Origin
// =============================================================================

/// Which interface produced the order (the `generated_by` column).
///
/// Part of the duplicate-detection key: a cashier bill and an admin-entered
/// bill with identical content are NOT the same logical submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum OrderOrigin {
    /// Created from the cashier billing screen.
    Cashier,
    /// Entered by an admin (e.g., backdated bills).
    Admin,
    /// Imported from an external dataset.
    Import,
}

impl OrderOrigin {
    /// Stable string form, matching the TEXT column values.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderOrigin::Cashier => "cashier",
            OrderOrigin::Admin => "admin",
            OrderOrigin::Import => "import",
        }
    }
}

impl Default for OrderOrigin {
    fn default() -> Self {
        OrderOrigin::Cashier
    }
}

// =============================================================================
// Order Item
// =============================================================================

/// A line item on an order.
///
/// Menu data is snapshotted at billing time: `name` and `price` are frozen
/// copies, so later menu edits do not rewrite history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Item name as shown on the bill.
    pub name: String,
    /// Unit price at time of sale.
    pub price: f64,
    /// Quantity ordered.
    pub quantity: i64,
    /// Line total (price × quantity).
    pub total: f64,
}

impl OrderItem {
    /// Line total recomputed from price and quantity.
    #[inline]
    pub fn computed_total(&self) -> f64 {
        self.price * self.quantity as f64
    }
}

// =============================================================================
// Order (persisted entity)
// =============================================================================

/// A persisted order.
///
/// `items` is stored as a JSON string column in SQLite and materialized to
/// a `Vec<OrderItem>` by the repository layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Database row id (autoincrement).
    pub id: i64,
    /// Server-assigned unique bill number.
    pub bill_number: String,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub table_number: String,
    pub items: Vec<OrderItem>,
    pub subtotal: f64,
    pub gst_rate: f64,
    pub tax_amount: f64,
    pub total: f64,
    pub payment_mode: String,
    pub cashier_id: Option<i64>,
    pub cashier_name: Option<String>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    /// Calendar date of the bill (YYYY-MM-DD), used for daily reporting.
    pub date: String,
    pub generated_by: OrderOrigin,
}

// =============================================================================
// Order Payload (submission input)
// =============================================================================

/// An order as submitted by a client, before the server has accepted it.
///
/// Wire naming quirk: the client-side bill number travels as `billNumber`
/// while every other field is snake_case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPayload {
    /// Client-generated id (milliseconds since epoch). Untrusted.
    #[serde(default)]
    pub id: Option<i64>,

    /// Client bill number: absent, a `TEMP-` placeholder, or an explicit
    /// number the client insists on (e.g., re-imported data).
    #[serde(default, rename = "billNumber", alias = "bill_number")]
    pub bill_number: Option<String>,

    #[serde(default)]
    pub customer_name: Option<String>,

    #[serde(default)]
    pub customer_phone: Option<String>,

    pub table_number: String,

    pub items: Vec<OrderItem>,

    pub subtotal: f64,

    #[serde(default = "default_gst_rate")]
    pub gst_rate: f64,

    pub tax_amount: f64,

    pub total: f64,

    pub payment_mode: String,

    #[serde(default)]
    pub cashier_id: Option<i64>,

    #[serde(default)]
    pub cashier_name: Option<String>,

    /// Client-claimed status. The normal submission path forces
    /// `completed` regardless of what is claimed here.
    #[serde(default)]
    pub status: Option<OrderStatus>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub date: Option<String>,

    #[serde(default)]
    pub generated_by: OrderOrigin,
}

fn default_gst_rate() -> f64 {
    DEFAULT_GST_RATE
}

impl OrderPayload {
    /// Sum of line totals, for consistency checks against `subtotal`.
    pub fn items_total(&self) -> f64 {
        self.items.iter().map(|i| i.total).sum()
    }

    /// True when the client supplied an explicit, non-placeholder bill
    /// number that must not be silently renumbered.
    pub fn has_explicit_bill_number(&self) -> bool {
        match self.bill_number.as_deref() {
            Some(bn) => !bn.is_empty() && !crate::is_temp_bill_number(bn),
            None => false,
        }
    }
}

// =============================================================================
// Menu
// =============================================================================

/// A menu item available for billing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct MenuItem {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub price: f64,
    pub available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating or updating a menu item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItemInput {
    pub name: String,
    pub category: String,
    pub price: f64,
    #[serde(default = "default_true")]
    pub available: bool,
}

fn default_true() -> bool {
    true
}

// =============================================================================
// Users
// =============================================================================

/// A POS user (admin or cashier).
///
/// Credentials are a plain match against this record; there is no hashing
/// in this system and the full user list ships to the client on bootstrap.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password: String,
    pub role: String,
    pub name: String,
    pub phone: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
    /// Comma-separated permission flags.
    pub permissions: Option<String>,
}

/// Input for creating a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInput {
    pub username: String,
    pub password: String,
    pub role: String,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub permissions: Option<String>,
}

// =============================================================================
// Restaurant Settings
// =============================================================================

/// The restaurant profile used on bills and for tax defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct RestaurantSettings {
    pub id: i64,
    pub name: String,
    pub address: Option<String>,
    pub gstin: Option<String>,
    pub fssai: Option<String>,
    pub phone: Option<String>,
    pub gst_rate: f64,
    pub upi_id: Option<String>,
    pub merchant_name: Option<String>,
    pub logo: Option<String>,
}

/// Partial update of restaurant settings; only provided fields change.
///
/// The wire format is camelCase (`gstRate`, `upiId`, ...), matching the
/// admin screen's payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantSettingsUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub gstin: Option<String>,
    #[serde(default)]
    pub fssai: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub gst_rate: Option<f64>,
    #[serde(default)]
    pub upi_id: Option<String>,
    #[serde(default)]
    pub merchant_name: Option<String>,
    #[serde(default)]
    pub logo: Option<String>,
}

// =============================================================================
// QR Configuration
// =============================================================================

/// UPI QR configuration shown on printed bills.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct QrConfig {
    /// Row id; database-only, never on the wire.
    #[serde(skip)]
    pub id: i64,
    pub upi_id: Option<String>,
    pub merchant_name: Option<String>,
    pub enabled: bool,
    pub fixed_amount: bool,
    /// Base64-encoded image uploaded by the admin, if any.
    pub uploaded_image: Option<String>,
}

/// Upsert payload for QR configuration (camelCase wire format).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrConfigUpdate {
    #[serde(default)]
    pub upi_id: Option<String>,
    #[serde(default)]
    pub merchant_name: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub fixed_amount: bool,
    #[serde(default)]
    pub uploaded_image: Option<String>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_default() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
        assert_eq!(OrderStatus::Completed.as_str(), "completed");
    }

    #[test]
    fn test_order_origin_default() {
        assert_eq!(OrderOrigin::default(), OrderOrigin::Cashier);
        assert_eq!(OrderOrigin::Admin.as_str(), "admin");
    }

    #[test]
    fn test_item_computed_total() {
        let item = OrderItem {
            name: "Masala Chai".to_string(),
            price: 25.0,
            quantity: 2,
            total: 50.0,
        };
        assert!((item.computed_total() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_payload_accepts_camel_and_snake_bill_number() {
        let camel: OrderPayload = serde_json::from_str(
            r#"{"billNumber":"TEMP-1","table_number":"5","items":[],
                "subtotal":0,"tax_amount":0,"total":0,"payment_mode":"Cash"}"#,
        )
        .unwrap();
        assert_eq!(camel.bill_number.as_deref(), Some("TEMP-1"));
        assert!(!camel.has_explicit_bill_number());

        let snake: OrderPayload = serde_json::from_str(
            r#"{"bill_number":"172345678901","table_number":"5","items":[],
                "subtotal":0,"tax_amount":0,"total":0,"payment_mode":"Cash"}"#,
        )
        .unwrap();
        assert!(snake.has_explicit_bill_number());
    }

    #[test]
    fn test_payload_gst_rate_defaults() {
        let payload: OrderPayload = serde_json::from_str(
            r#"{"table_number":"5","items":[],
                "subtotal":0,"tax_amount":0,"total":0,"payment_mode":"Cash"}"#,
        )
        .unwrap();
        assert!((payload.gst_rate - 5.0).abs() < f64::EPSILON);
        assert_eq!(payload.generated_by, OrderOrigin::Cashier);
    }
}
