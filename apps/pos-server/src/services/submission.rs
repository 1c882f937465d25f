//! # Order Submission Service
//!
//! The detect → allocate → persist pipeline behind `POST /api/orders`.
//!
//! ## Layered Duplicate Checks
//! ```text
//! 1. Request lock    catches near-simultaneous duplicates before either
//!                    reaches the database
//! 2. Id match        catches client retries that reuse the same temporary
//!                    id
//! 3. Content match   catches retries that regenerated id/timestamp but are
//!                    otherwise identical (page reload + resubmit)
//! 4. UNIQUE(bill_number)  the persistence-layer backstop for any race the
//!                    advisory layers miss
//! ```
//!
//! Within a single fingerprint the lock serializes the whole sequence;
//! different fingerprints proceed fully in parallel. Detector lookups that
//! themselves fail degrade to "not duplicate" — a missed duplicate is
//! recoverable through the UNIQUE constraint, a blocked submission is not.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use thiserror::Error;
use tracing::{debug, info, warn};

use dhaba_core::{
    fingerprint, is_temp_bill_number, validate_order, Clock, Order, OrderItem, OrderPayload,
    OrderStatus, RequestLockTable, ValidationError,
};
use dhaba_db::{Database, DbError, NewOrder};

use crate::metrics::{DetectionKind, DetectionMetrics};
use crate::state::AppState;

// =============================================================================
// Bill Number Source
// =============================================================================

/// Produces candidate bill numbers. Candidates are NOT unique by
/// construction; the allocation loop checks and retries.
pub trait BillNumberSource: Send + Sync {
    /// Returns a fresh candidate bill number.
    fn allocate(&self) -> String;
}

/// Production source: milliseconds since epoch plus a random suffix,
/// truncated to the last 12 digits.
pub struct SystemBillNumbers {
    clock: Arc<dyn Clock>,
}

impl SystemBillNumbers {
    /// Creates a source reading time from the given clock.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        SystemBillNumbers { clock }
    }
}

impl BillNumberSource for SystemBillNumbers {
    fn allocate(&self) -> String {
        let millis = self.clock.now().timestamp_millis();
        let noise: u32 = rand::thread_rng().gen_range(0..1_000_000);
        let raw = format!("{millis}{noise}");
        // Keep the low-order digits: they move fastest
        raw[raw.len().saturating_sub(12)..].to_string()
    }
}

// =============================================================================
// Errors and Results
// =============================================================================

/// Why a submission was judged a duplicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateReason {
    /// Another submission of the same fingerprint is in progress.
    RequestInProgress,
    /// A persisted order already carries the submitted client id.
    IdMatch,
    /// A content-identical order exists within the freshness window.
    ContentMatch,
    /// The client-specified bill number is already taken.
    BillNumberExists,
}

/// Submission pipeline errors.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The order is a duplicate; the conflict response carries the existing
    /// bill number when one is known.
    #[error("duplicate order ({reason:?})")]
    Duplicate {
        reason: DuplicateReason,
        existing_bill_number: Option<String>,
        existing_order_id: Option<i64>,
    },

    /// Every allocation attempt collided; fatal for this submission. A
    /// fresh submission (new fingerprint reservation) may retry.
    #[error("bill number allocation exhausted")]
    AllocationExhausted,

    /// Rejected before any lock was acquired.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Transient persistence failure; guard and lock are released so a
    /// legitimate retry is not blocked.
    #[error(transparent)]
    Db(#[from] DbError),
}

/// The accepted-order response data.
#[derive(Debug, Clone)]
pub struct SubmissionReceipt {
    /// Persisted row id.
    pub id: i64,
    /// Server-assigned bill number (never a `TEMP-` placeholder).
    pub bill_number: String,
}

// =============================================================================
// Submission Service
// =============================================================================

/// Owns one submission attempt end to end.
pub struct SubmissionService {
    db: Database,
    locks: Arc<RequestLockTable>,
    metrics: Arc<DetectionMetrics>,
    clock: Arc<dyn Clock>,
    bill_numbers: Arc<dyn BillNumberSource>,
    content_window: Duration,
    allocation_retries: u32,
}

impl SubmissionService {
    /// Builds the service from shared state with the production bill
    /// number source.
    pub fn new(state: &AppState) -> Self {
        let source = Arc::new(SystemBillNumbers::new(state.clock.clone()));
        Self::with_bill_source(state, source)
    }

    /// Builds the service with an injected bill number source (tests use a
    /// colliding source to exercise the retry bound).
    pub fn with_bill_source(state: &AppState, bill_numbers: Arc<dyn BillNumberSource>) -> Self {
        SubmissionService {
            db: state.db.clone(),
            locks: state.locks.clone(),
            metrics: state.metrics.clone(),
            clock: state.clock.clone(),
            bill_numbers,
            content_window: Duration::seconds(state.config.content_match_window_secs as i64),
            allocation_retries: state.config.bill_allocation_retries,
        }
    }

    /// Runs one submission attempt.
    ///
    /// Validation happens before the lock, so rejects leave no state
    /// behind. Once the lock is acquired it is released on EVERY exit path
    /// — success, duplicate, or error.
    pub async fn submit(&self, payload: &OrderPayload) -> Result<SubmissionReceipt, SubmitError> {
        validate_order(payload)?;

        let fp = fingerprint(payload);
        self.metrics.record_check();

        if !self.locks.acquire(&fp) {
            self.metrics.record_duplicate(DetectionKind::LockActive);
            let fp_prefix = &fp[..16.min(fp.len())];
            debug!(fingerprint = %fp_prefix, "Request lock active, rejecting as duplicate");
            // The lock is held by someone else: do NOT release it here
            return Err(SubmitError::Duplicate {
                reason: DuplicateReason::RequestInProgress,
                existing_bill_number: None,
                existing_order_id: None,
            });
        }

        let result = self.detect_and_persist(payload).await;
        self.locks.release(&fp);
        result
    }

    async fn detect_and_persist(
        &self,
        payload: &OrderPayload,
    ) -> Result<SubmissionReceipt, SubmitError> {
        if let Some((kind, existing)) = self.detect_duplicate(payload).await {
            self.metrics.record_duplicate(kind);
            info!(
                existing_bill = %existing.bill_number,
                ?kind,
                "Duplicate order detected"
            );
            let reason = match kind {
                DetectionKind::IdMatch => DuplicateReason::IdMatch,
                DetectionKind::ContentMatch => DuplicateReason::ContentMatch,
                DetectionKind::LockActive => DuplicateReason::RequestInProgress,
            };
            return Err(SubmitError::Duplicate {
                reason,
                existing_bill_number: Some(existing.bill_number),
                existing_order_id: Some(existing.id),
            });
        }

        self.allocate_and_insert(payload).await
    }

    /// Persisted-state duplicate checks: by exact id, then by content.
    async fn detect_duplicate(&self, payload: &OrderPayload) -> Option<(DetectionKind, Order)> {
        if let Some(id) = payload.id {
            match self.db.orders().get_by_id(id).await {
                Ok(Some(existing)) => return Some((DetectionKind::IdMatch, existing)),
                Ok(None) => {}
                Err(e) => {
                    // Fail open: the UNIQUE constraint backstops a missed
                    // duplicate, a blocked submission has no backstop
                    warn!(error = %e, "Id lookup failed, degrading to not-duplicate");
                }
            }
        }

        let window_start = self.clock.now() - self.content_window;
        let customer_name = payload.customer_name.clone().unwrap_or_default();
        match self
            .db
            .orders()
            .recent_matching(
                window_start,
                &customer_name,
                &payload.table_number,
                payload.total,
                payload.generated_by,
            )
            .await
        {
            Ok(candidates) => {
                for candidate in candidates {
                    if same_items(&payload.items, &candidate.items) {
                        return Some((DetectionKind::ContentMatch, candidate));
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Content lookup failed, degrading to not-duplicate");
            }
        }

        None
    }

    /// Bill number allocation plus the insert, as one step repeated on
    /// collision.
    async fn allocate_and_insert(
        &self,
        payload: &OrderPayload,
    ) -> Result<SubmissionReceipt, SubmitError> {
        if payload.has_explicit_bill_number() {
            // The payload type guarantees presence here
            let bill_number = payload.bill_number.clone().unwrap_or_default();
            return self.insert_with_explicit_number(payload, &bill_number).await;
        }

        for attempt in 1..=self.allocation_retries {
            let candidate = self.bill_numbers.allocate();

            if self.db.orders().bill_number_exists(&candidate).await? {
                debug!(attempt, candidate = %candidate, "Bill number collision, regenerating");
                continue;
            }

            match self.db.orders().insert(&build_order(payload, &candidate, self.clock.now())).await
            {
                Ok(id) => {
                    info!(id, bill_number = %candidate, "Order persisted");
                    return Ok(SubmissionReceipt {
                        id,
                        bill_number: candidate,
                    });
                }
                Err(e) if e.is_unique_violation_on("orders.bill_number") => {
                    // Lost a race outside the advisory lock's coverage;
                    // counts as a collision against the retry bound
                    debug!(attempt, candidate = %candidate, "Insert collided, regenerating");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }

        warn!(
            retries = self.allocation_retries,
            "Exhausted bill number allocation attempts"
        );
        Err(SubmitError::AllocationExhausted)
    }

    /// An explicit client bill number is never silently renumbered: any
    /// collision is a conflict.
    async fn insert_with_explicit_number(
        &self,
        payload: &OrderPayload,
        bill_number: &str,
    ) -> Result<SubmissionReceipt, SubmitError> {
        match self.db.orders().get_by_bill_number(bill_number).await {
            Ok(Some(existing)) => {
                return Err(SubmitError::Duplicate {
                    reason: DuplicateReason::BillNumberExists,
                    existing_bill_number: Some(existing.bill_number),
                    existing_order_id: Some(existing.id),
                });
            }
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "Bill number pre-check failed, relying on UNIQUE constraint");
            }
        }

        match self
            .db
            .orders()
            .insert(&build_order(payload, bill_number, self.clock.now()))
            .await
        {
            Ok(id) => {
                info!(id, %bill_number, "Order persisted with explicit bill number");
                Ok(SubmissionReceipt {
                    id,
                    bill_number: bill_number.to_string(),
                })
            }
            Err(e) if e.is_unique_violation_on("orders.bill_number") => {
                Err(SubmitError::Duplicate {
                    reason: DuplicateReason::BillNumberExists,
                    existing_bill_number: Some(bill_number.to_string()),
                    existing_order_id: None,
                })
            }
            Err(e) => Err(e.into()),
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Element-wise item comparison after sorting both sides by name. Exact
/// equality of name, quantity, and unit price is required at every
/// position.
pub fn same_items(a: &[OrderItem], b: &[OrderItem]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut left: Vec<&OrderItem> = a.iter().collect();
    let mut right: Vec<&OrderItem> = b.iter().collect();
    left.sort_by(|x, y| x.name.cmp(&y.name));
    right.sort_by(|x, y| x.name.cmp(&y.name));

    left.iter().zip(right.iter()).all(|(x, y)| {
        x.name == y.name && x.quantity == y.quantity && x.price == y.price
    })
}

/// Resolves the payload into an insertable row. Status is forced to
/// `completed`: an order arriving through the submission endpoint is being
/// billed, whatever the client believed. The bill number here is always
/// server-approved, never a `TEMP-` placeholder.
fn build_order(payload: &OrderPayload, bill_number: &str, now: DateTime<Utc>) -> NewOrder {
    debug_assert!(!is_temp_bill_number(bill_number));

    let created_at = payload.created_at.unwrap_or(now);
    let date = payload
        .date
        .clone()
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| created_at.format("%Y-%m-%d").to_string());

    NewOrder {
        bill_number: bill_number.to_string(),
        customer_name: payload.customer_name.clone(),
        customer_phone: payload.customer_phone.clone(),
        table_number: payload.table_number.clone(),
        items: payload.items.clone(),
        subtotal: payload.subtotal,
        gst_rate: payload.gst_rate,
        tax_amount: payload.tax_amount,
        total: payload.total,
        payment_mode: payload.payment_mode.clone(),
        cashier_id: payload.cashier_id,
        cashier_name: payload.cashier_name.clone(),
        status: OrderStatus::Completed,
        created_at,
        date,
        generated_by: payload.generated_by,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use dhaba_core::ManualClock;
    use dhaba_db::DbConfig;

    /// A source that always returns the same candidate, to exercise the
    /// collision retry bound.
    struct FixedBillNumbers(String);

    impl BillNumberSource for FixedBillNumbers {
        fn allocate(&self) -> String {
            self.0.clone()
        }
    }

    async fn state_with_manual_clock() -> (AppState, Arc<ManualClock>) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let state = AppState::with_clock(db, ServerConfig::default(), clock.clone());
        (state, clock)
    }

    fn tea_payload() -> OrderPayload {
        OrderPayload {
            id: Some(1_723_456_789_012),
            bill_number: Some("TEMP-17234567890123".to_string()),
            customer_name: None,
            customer_phone: None,
            table_number: "5".to_string(),
            items: vec![OrderItem {
                name: "Tea".to_string(),
                price: 25.0,
                quantity: 2,
                total: 50.0,
            }],
            subtotal: 50.0,
            gst_rate: 5.0,
            tax_amount: 2.5,
            total: 52.5,
            payment_mode: "Cash".to_string(),
            cashier_id: None,
            cashier_name: Some("DIPANJOLI".to_string()),
            status: Some(OrderStatus::Pending),
            created_at: None,
            date: None,
            generated_by: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_accepted_order_replaces_temp_number_and_completes() {
        let (state, _clock) = state_with_manual_clock().await;
        let service = SubmissionService::new(&state);

        let receipt = service.submit(&tea_payload()).await.unwrap();

        assert!(!is_temp_bill_number(&receipt.bill_number));
        assert_eq!(receipt.bill_number.len(), 12);

        let order = state
            .db
            .orders()
            .get_by_id(receipt.id)
            .await
            .unwrap()
            .unwrap();
        // Client claimed pending; the submission path forces completed
        assert_eq!(order.status, OrderStatus::Completed);
        assert_eq!(order.bill_number, receipt.bill_number);
        // The lock never outlives its submission
        assert!(state.locks.is_empty());
    }

    #[tokio::test]
    async fn test_resubmission_is_content_match_conflict() {
        let (state, _clock) = state_with_manual_clock().await;
        let service = SubmissionService::new(&state);

        let receipt = service.submit(&tea_payload()).await.unwrap();

        // Page-reload retry: fresh id and placeholder, same content
        let mut retry = tea_payload();
        retry.id = Some(1_723_456_999_999);
        retry.bill_number = Some("TEMP-999".to_string());

        let err = service.submit(&retry).await.unwrap_err();
        match err {
            SubmitError::Duplicate {
                reason,
                existing_bill_number,
                ..
            } => {
                assert_eq!(reason, DuplicateReason::ContentMatch);
                assert_eq!(existing_bill_number.as_deref(), Some(receipt.bill_number.as_str()));
            }
            other => panic!("expected duplicate, got {other:?}"),
        }

        assert_eq!(state.db.orders().list_all().await.unwrap().len(), 1);
        assert!(state.locks.is_empty());
    }

    #[tokio::test]
    async fn test_reused_client_id_is_id_match_conflict() {
        let (state, _clock) = state_with_manual_clock().await;
        let service = SubmissionService::new(&state);

        let receipt = service.submit(&tea_payload()).await.unwrap();

        // Different content, but the client resent an id that now exists
        // as a persisted row
        let mut retry = tea_payload();
        retry.id = Some(receipt.id);
        retry.table_number = "9".to_string();

        let err = service.submit(&retry).await.unwrap_err();
        assert!(matches!(
            err,
            SubmitError::Duplicate {
                reason: DuplicateReason::IdMatch,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_rapid_double_submit_persists_exactly_once() {
        let (state, _clock) = state_with_manual_clock().await;
        let service = Arc::new(SubmissionService::new(&state));

        let a = {
            let service = service.clone();
            tokio::spawn(async move { service.submit(&tea_payload()).await })
        };
        let b = {
            let service = service.clone();
            tokio::spawn(async move { service.submit(&tea_payload()).await })
        };

        let (a, b) = (a.await.unwrap(), b.await.unwrap());
        let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
        let duplicates = [&a, &b]
            .iter()
            .filter(|r| matches!(r, Err(SubmitError::Duplicate { .. })))
            .count();

        assert_eq!(successes, 1);
        assert_eq!(duplicates, 1);
        assert_eq!(state.db.orders().list_all().await.unwrap().len(), 1);
        assert!(state.locks.is_empty());
    }

    #[tokio::test]
    async fn test_explicit_bill_number_is_never_renumbered() {
        let (state, _clock) = state_with_manual_clock().await;
        let service = SubmissionService::new(&state);

        let mut first = tea_payload();
        first.bill_number = Some("500100200300".to_string());
        let receipt = service.submit(&first).await.unwrap();
        assert_eq!(receipt.bill_number, "500100200300");

        // Same explicit number on different content: conflict, not renumber
        let mut second = tea_payload();
        second.bill_number = Some("500100200300".to_string());
        second.table_number = "7".to_string();

        let err = service.submit(&second).await.unwrap_err();
        match err {
            SubmitError::Duplicate {
                reason,
                existing_bill_number,
                ..
            } => {
                assert_eq!(reason, DuplicateReason::BillNumberExists);
                assert_eq!(existing_bill_number.as_deref(), Some("500100200300"));
            }
            other => panic!("expected duplicate, got {other:?}"),
        }
        assert_eq!(state.db.orders().list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_allocation_exhaustion_after_bounded_retries() {
        let (state, clock) = state_with_manual_clock().await;

        // Occupy the only number the source will ever produce, with content
        // far outside the match window so only allocation can fail
        let service =
            SubmissionService::with_bill_source(&state, Arc::new(FixedBillNumbers("777".into())));
        let mut blocker = tea_payload();
        blocker.table_number = "1".to_string();
        blocker.created_at = Some(clock.now() - Duration::hours(6));
        service.submit(&blocker).await.unwrap();

        let err = service.submit(&tea_payload()).await.unwrap_err();
        assert!(matches!(err, SubmitError::AllocationExhausted));

        // No second row was inserted, and the lock was released
        assert_eq!(state.db.orders().list_all().await.unwrap().len(), 1);
        assert!(state.locks.is_empty());
    }

    #[tokio::test]
    async fn test_lock_expires_and_fingerprint_is_reusable() {
        let (state, clock) = state_with_manual_clock().await;
        let service = SubmissionService::new(&state);

        // Simulate an abandoned in-flight submission holding the lock
        let fp = fingerprint(&tea_payload());
        assert!(state.locks.acquire(&fp));

        let err = service.submit(&tea_payload()).await.unwrap_err();
        assert!(matches!(
            err,
            SubmitError::Duplicate {
                reason: DuplicateReason::RequestInProgress,
                existing_bill_number: None,
                ..
            }
        ));

        // After the timeout the sweep clears it and submission proceeds
        clock.advance(Duration::seconds(31));
        state.locks.sweep();
        assert!(service.submit(&tea_payload()).await.is_ok());
    }

    #[tokio::test]
    async fn test_failed_insert_releases_lock() {
        let (state, _clock) = state_with_manual_clock().await;
        let service = SubmissionService::new(&state);

        // cashier_id referencing a missing user trips the FK constraint
        let mut payload = tea_payload();
        payload.cashier_id = Some(424242);

        let err = service.submit(&payload).await.unwrap_err();
        assert!(matches!(err, SubmitError::Db(_)));
        assert!(state.locks.is_empty());

        // A legitimate retry is not blocked
        payload.cashier_id = None;
        assert!(service.submit(&payload).await.is_ok());
    }

    #[tokio::test]
    async fn test_validation_rejects_before_any_lock() {
        let (state, _clock) = state_with_manual_clock().await;
        let service = SubmissionService::new(&state);

        let mut payload = tea_payload();
        payload.table_number = String::new();

        let err = service.submit(&payload).await.unwrap_err();
        assert!(matches!(err, SubmitError::Validation(_)));
        assert!(state.locks.is_empty());
        assert_eq!(state.metrics.snapshot().total_checks, 0);
    }

    #[test]
    fn test_same_items_ignores_order_but_not_content() {
        let a = vec![
            OrderItem {
                name: "Tea".into(),
                price: 25.0,
                quantity: 2,
                total: 50.0,
            },
            OrderItem {
                name: "Samosa".into(),
                price: 15.0,
                quantity: 1,
                total: 15.0,
            },
        ];
        let mut b = a.clone();
        b.reverse();
        assert!(same_items(&a, &b));

        b[0].quantity = 3;
        assert!(!same_items(&a, &b));

        let shorter = &a[..1];
        assert!(!same_items(&a, shorter));
    }
}
