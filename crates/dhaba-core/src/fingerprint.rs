//! # Order Fingerprinting
//!
//! A fingerprint is a deterministic hash over the business-relevant content
//! of an order. Two submissions of the same logical order — even when the
//! client regenerated its temporary id, the timestamp moved, or a different
//! cashier display name is attached — produce the same fingerprint. That is
//! what lets both the client guard and the server lock table recognize "this
//! bill was already submitted".
//!
//! ## Normalization Rules
//! - strings: trimmed; name-like fields also lower-cased
//! - items: mapped to {name, price, quantity, total} with money fields as
//!   fixed 2-decimal strings, then sorted ascending by normalized name
//! - order money fields: fixed 2-decimal strings
//! - excluded entirely: id, bill number, timestamps, cashier id/name
//!
//! The canonical object is serialized with a stable field order and hashed
//! with SHA-256. Hashing must never fail the submission path: if
//! serialization errors, a simpler shift-add digest over a manually
//! composed canonical string is used instead, so deduplication degrades
//! rather than disappearing.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::types::{OrderItem, OrderPayload};

// =============================================================================
// Canonical Projection
// =============================================================================

/// Item projection entering the hash. Money fields are pre-formatted to two
/// decimals so 25.0 and 25.00 cannot hash differently.
#[derive(Debug, Serialize)]
struct CanonicalItem {
    name: String,
    price: String,
    quantity: i64,
    total: String,
}

/// Order projection entering the hash. Field declaration order IS the
/// serialization order; do not reorder fields without understanding that
/// every in-flight fingerprint changes.
#[derive(Debug, Serialize)]
struct CanonicalOrder {
    customer_name: String,
    customer_phone: String,
    table_number: String,
    items: Vec<CanonicalItem>,
    subtotal: String,
    gst_rate: String,
    tax_amount: String,
    total: String,
    payment_mode: String,
    generated_by: String,
}

fn normalize_name(value: &str) -> String {
    value.trim().to_lowercase()
}

fn money(value: f64) -> String {
    format!("{:.2}", value)
}

fn canonicalize(order: &OrderPayload) -> CanonicalOrder {
    let mut items: Vec<CanonicalItem> = order
        .items
        .iter()
        .map(|item: &OrderItem| CanonicalItem {
            name: normalize_name(&item.name),
            price: money(item.price),
            quantity: item.quantity,
            total: money(item.total),
        })
        .collect();
    items.sort_by(|a, b| a.name.cmp(&b.name));

    CanonicalOrder {
        customer_name: normalize_name(order.customer_name.as_deref().unwrap_or("")),
        // Phone numbers are trimmed but not case-folded; they carry no case
        customer_phone: order
            .customer_phone
            .as_deref()
            .unwrap_or("")
            .trim()
            .to_string(),
        table_number: normalize_name(&order.table_number),
        items,
        subtotal: money(order.subtotal),
        gst_rate: money(order.gst_rate),
        tax_amount: money(order.tax_amount),
        total: money(order.total),
        payment_mode: normalize_name(&order.payment_mode),
        generated_by: order.generated_by.as_str().to_string(),
    }
}

// =============================================================================
// Digests
// =============================================================================

/// Computes the content fingerprint of an order payload.
///
/// Pure and deterministic; never panics. See the module docs for the
/// normalization rules and the fallback behavior.
pub fn fingerprint(order: &OrderPayload) -> String {
    let canonical = canonicalize(order);

    match serde_json::to_vec(&canonical) {
        Ok(bytes) => {
            let mut hasher = Sha256::new();
            hasher.update(&bytes);
            hex::encode(hasher.finalize())
        }
        // serde_json cannot realistically fail on this shape, but the guard
        // must keep functioning even if it somehow does
        Err(_) => fallback_digest(&canonical_string(&canonical)),
    }
}

/// Manually composed canonical string for the fallback digest.
fn canonical_string(canonical: &CanonicalOrder) -> String {
    let items: Vec<String> = canonical
        .items
        .iter()
        .map(|i| format!("{}:{}x{}={}", i.name, i.price, i.quantity, i.total))
        .collect();
    format!(
        "{}|{}|{}|{}|{}|{}|{}|{}|{}|{}",
        canonical.customer_name,
        canonical.customer_phone,
        canonical.table_number,
        items.join(";"),
        canonical.subtotal,
        canonical.gst_rate,
        canonical.tax_amount,
        canonical.total,
        canonical.payment_mode,
        canonical.generated_by,
    )
}

/// 32-bit shift-add digest (h = h*31 + c), hex-encoded.
///
/// Weakly mixed but deterministic and infallible; only used when the
/// primary digest path is unavailable.
fn fallback_digest(input: &str) -> String {
    let mut h: i32 = 0;
    for c in input.chars() {
        h = h.wrapping_shl(5).wrapping_sub(h).wrapping_add(c as i32);
    }
    format!("{:x}", h.unsigned_abs())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OrderOrigin, OrderStatus};
    use chrono::Utc;

    fn tea_order() -> OrderPayload {
        OrderPayload {
            id: Some(1_723_456_789_012),
            bill_number: Some("TEMP-17234567890123".to_string()),
            customer_name: Some("Ravi".to_string()),
            customer_phone: Some("+91 9876543211".to_string()),
            table_number: "5".to_string(),
            items: vec![
                OrderItem {
                    name: "Masala Chai".to_string(),
                    price: 25.0,
                    quantity: 2,
                    total: 50.0,
                },
                OrderItem {
                    name: "Gulab Jamun".to_string(),
                    price: 12.0,
                    quantity: 1,
                    total: 12.0,
                },
            ],
            subtotal: 62.0,
            gst_rate: 5.0,
            tax_amount: 3.1,
            total: 65.1,
            payment_mode: "Cash".to_string(),
            cashier_id: Some(2),
            cashier_name: Some("DIPANJOLI".to_string()),
            status: Some(OrderStatus::Pending),
            created_at: Some(Utc::now()),
            date: Some("2026-08-07".to_string()),
            generated_by: OrderOrigin::Cashier,
        }
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let order = tea_order();
        assert_eq!(fingerprint(&order), fingerprint(&order));
        // SHA-256 hex
        assert_eq!(fingerprint(&order).len(), 64);
    }

    #[test]
    fn test_fingerprint_ignores_identity_fields() {
        let first = tea_order();
        let mut retry = tea_order();
        // A retried submission regenerates all of these
        retry.id = Some(1_723_456_999_999);
        retry.bill_number = Some("TEMP-9999".to_string());
        retry.created_at = Some(Utc::now() + chrono::Duration::seconds(42));
        retry.cashier_id = Some(3);
        retry.cashier_name = Some("Lina".to_string());
        retry.status = Some(OrderStatus::Completed);
        retry.date = Some("2026-08-08".to_string());

        assert_eq!(fingerprint(&first), fingerprint(&retry));
    }

    #[test]
    fn test_fingerprint_ignores_item_order() {
        let first = tea_order();
        let mut shuffled = tea_order();
        shuffled.items.reverse();

        assert_eq!(fingerprint(&first), fingerprint(&shuffled));
    }

    #[test]
    fn test_fingerprint_normalizes_case_and_whitespace() {
        let first = tea_order();
        let mut noisy = tea_order();
        noisy.customer_name = Some("  RAVI ".to_string());
        noisy.table_number = " 5 ".to_string();
        noisy.payment_mode = "CASH".to_string();
        noisy.items[0].name = "  MASALA CHAI ".to_string();

        assert_eq!(fingerprint(&first), fingerprint(&noisy));
    }

    #[test]
    fn test_fingerprint_distinguishes_content() {
        let first = tea_order();

        let mut other_table = tea_order();
        other_table.table_number = "6".to_string();
        assert_ne!(fingerprint(&first), fingerprint(&other_table));

        let mut other_quantity = tea_order();
        other_quantity.items[0].quantity = 3;
        assert_ne!(fingerprint(&first), fingerprint(&other_quantity));

        let mut other_origin = tea_order();
        other_origin.generated_by = OrderOrigin::Admin;
        assert_ne!(fingerprint(&first), fingerprint(&other_origin));
    }

    #[test]
    fn test_fallback_digest_is_stable() {
        let order = tea_order();
        let canonical = canonicalize(&order);
        let s = canonical_string(&canonical);
        assert_eq!(fallback_digest(&s), fallback_digest(&s));
        assert!(!fallback_digest(&s).is_empty());
    }
}
