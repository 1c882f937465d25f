//! # Validation Module
//!
//! Business rule validation for incoming order payloads.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Client (submission guard)                                    │
//! │  ├── Blocks resubmission of an in-flight fingerprint                   │
//! │  └── Immediate cashier feedback                                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Server handler (Rust)                                        │
//! │  ├── Type validation (deserialization)                                 │
//! │  └── THIS MODULE: required fields + totals, BEFORE any lock            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL constraints                                              │
//! │  └── UNIQUE(bill_number) — final duplicate authority                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A payload that fails here is rejected with 400 before any lock is
//! acquired, so validation failures never leave guard state behind.

use crate::error::ValidationError;
use crate::types::{OrderPayload, OrderStatus};
use crate::TOTALS_TOLERANCE;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Order Validation
// =============================================================================

/// Validates an order payload before submission processing.
///
/// ## Rules
/// - `table_number` and `payment_mode` must be non-empty
/// - at least one item; every item needs a name and positive quantity,
///   non-negative price
/// - amounts must be coherent: line totals, subtotal, tax, and grand total
///   all within [`TOTALS_TOLERANCE`] of their recomputed values
pub fn validate_order(order: &OrderPayload) -> ValidationResult<()> {
    if order.table_number.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "table_number".to_string(),
        });
    }

    if order.payment_mode.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "payment_mode".to_string(),
        });
    }

    if order.items.is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    for item in &order.items {
        if item.name.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "item.name".to_string(),
            });
        }
        if item.quantity <= 0 {
            return Err(ValidationError::MustBePositive {
                field: format!("quantity of '{}'", item.name),
            });
        }
        if item.price < 0.0 {
            return Err(ValidationError::MustBePositive {
                field: format!("price of '{}'", item.name),
            });
        }
    }

    validate_totals(order)
}

/// Checks the arithmetic invariants of an order payload.
///
/// `total = subtotal + tax_amount = subtotal × (1 + gst_rate/100)` and
/// `item.total = price × quantity`, each within tolerance.
pub fn validate_totals(order: &OrderPayload) -> ValidationResult<()> {
    for item in &order.items {
        if (item.total - item.computed_total()).abs() > TOTALS_TOLERANCE {
            return Err(ValidationError::TotalsMismatch {
                reason: format!(
                    "line total {:.2} of '{}' does not match {:.2} × {}",
                    item.total, item.name, item.price, item.quantity
                ),
            });
        }
    }

    let items_total = order.items_total();
    if (order.subtotal - items_total).abs() > TOTALS_TOLERANCE {
        return Err(ValidationError::TotalsMismatch {
            reason: format!(
                "subtotal {:.2} does not match item sum {:.2}",
                order.subtotal, items_total
            ),
        });
    }

    let expected_tax = order.subtotal * order.gst_rate / 100.0;
    if (order.tax_amount - expected_tax).abs() > TOTALS_TOLERANCE {
        return Err(ValidationError::TotalsMismatch {
            reason: format!(
                "tax {:.2} does not match {:.2}% of {:.2}",
                order.tax_amount, order.gst_rate, order.subtotal
            ),
        });
    }

    let expected_total = order.subtotal + order.tax_amount;
    if (order.total - expected_total).abs() > TOTALS_TOLERANCE {
        return Err(ValidationError::TotalsMismatch {
            reason: format!(
                "total {:.2} does not match subtotal {:.2} + tax {:.2}",
                order.total, order.subtotal, order.tax_amount
            ),
        });
    }

    Ok(())
}

// =============================================================================
// Status Validation
// =============================================================================

/// Parses a status string from a status-update request.
///
/// Only "pending" and "completed" are accepted.
pub fn validate_status(status: &str) -> ValidationResult<OrderStatus> {
    match status {
        "pending" => Ok(OrderStatus::Pending),
        "completed" => Ok(OrderStatus::Completed),
        _ => Err(ValidationError::NotAllowed {
            field: "status".to_string(),
            allowed: vec!["pending".to_string(), "completed".to_string()],
        }),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
