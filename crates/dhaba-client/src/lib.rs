//! # dhaba-client: Cashier-Side API Client
//!
//! The client half of the order-submission protocol.
//!
//! ## Submission Flow
//! ```text
//! build payload ──► fingerprint ──► guard.reserve ──┬── already reserved?
//!                                                   │    surface "already
//!                                                   │    in progress",
//!                                                   │    send NOTHING
//!                                                   ▼
//!                                        POST /api/orders
//!                                                   │
//!                     release guard (ALWAYS) ◄──────┤
//!                                                   │
//!              200 → Accepted{billNumber}   409 → Duplicate{existing}
//! ```
//!
//! The guard release is unconditional — success, duplicate, transport
//! error — so a reservation never survives its request. Reservations that
//! somehow escape (process pause, dropped future) are cleared by the
//! background sweeper after the expiration window.

pub mod error;

use std::sync::Arc;

use rand::Rng;
use serde::Deserialize;
use tracing::{debug, info, warn};

use dhaba_core::{
    fingerprint, Clock, GuardConfig, MenuItem, Order, OrderPayload, QrConfig, RestaurantSettings,
    SubmissionGuard, SystemClock, User, TEMP_BILL_PREFIX,
};

pub use error::ClientError;

/// Default cadence of the background guard sweep.
pub const DEFAULT_GUARD_SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(30);

// =============================================================================
// Outcomes
// =============================================================================

/// How a submission attempt settled.
#[derive(Debug, Clone)]
pub enum SubmissionOutcome {
    /// The server accepted the order and assigned a durable bill number.
    Accepted { id: i64, bill_number: String },

    /// The server recognized the order as a duplicate. Informational — the
    /// bill already exists; do NOT retry with the same content.
    Duplicate {
        message: String,
        existing_bill_number: Option<String>,
    },

    /// The local guard already holds this fingerprint: an identical
    /// submission is in flight. Nothing was transmitted.
    AlreadyInFlight,
}

/// The consolidated dataset fetched on client initialization.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapData {
    pub restaurant: Option<RestaurantSettings>,
    pub users: Vec<User>,
    pub menu_categories: Vec<String>,
    pub menu_items: Vec<MenuItem>,
    pub payment_modes: Vec<String>,
    pub orders: Vec<Order>,
    pub qr_config: Option<QrConfig>,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[allow(dead_code)]
    success: bool,
    id: i64,
    #[serde(rename = "billNumber")]
    bill_number: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(rename = "existingBillNumber", default)]
    existing_bill_number: Option<String>,
}

// =============================================================================
// Client
// =============================================================================

/// HTTP client for the POS server, owning the submission guard.
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    guard: Arc<SubmissionGuard>,
    clock: Arc<dyn Clock>,
}

impl ApiClient {
    /// Creates a client with the default guard configuration and system
    /// clock.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_clock(base_url, Arc::new(SystemClock))
    }

    /// Creates a client with an injected clock (tests drive guard expiry
    /// without real delays).
    pub fn with_clock(base_url: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        ApiClient {
            base_url,
            http: reqwest::Client::new(),
            guard: Arc::new(SubmissionGuard::with_config(
                clock.clone(),
                GuardConfig::default(),
            )),
            clock,
        }
    }

    /// The submission guard, for sharing with [`spawn_guard_sweeper`].
    pub fn guard(&self) -> Arc<SubmissionGuard> {
        self.guard.clone()
    }

    /// Generates a temporary bill number for display while the submission
    /// is in flight. The server always replaces it.
    pub fn temp_bill_number(&self) -> String {
        let noise: u16 = rand::thread_rng().gen_range(0..1000);
        format!(
            "{}{}{}",
            TEMP_BILL_PREFIX,
            self.clock.now().timestamp_millis(),
            noise
        )
    }

    /// Submits an order, guarding against duplicate in-flight submissions.
    ///
    /// Returns `AlreadyInFlight` without any network traffic when the
    /// fingerprint is already reserved. Otherwise the reservation is held
    /// for the duration of the request and released unconditionally.
    pub async fn submit_order(
        &self,
        payload: &OrderPayload,
    ) -> Result<SubmissionOutcome, ClientError> {
        let fp = fingerprint(payload);

        if !self.guard.reserve(&fp) {
            info!("Submission already in progress for this order");
            return Ok(SubmissionOutcome::AlreadyInFlight);
        }

        let result = self.post_order(payload).await;
        // Unconditional: a reservation never survives its request
        self.guard.release(&fp);

        result
    }

    async fn post_order(&self, payload: &OrderPayload) -> Result<SubmissionOutcome, ClientError> {
        let response = self
            .http
            .post(format!("{}/api/orders", self.base_url))
            .json(payload)
            .send()
            .await?;

        let status = response.status();

        if status.is_success() {
            let accepted: SubmitResponse = response.json().await?;
            debug!(bill_number = %accepted.bill_number, "Order accepted");
            return Ok(SubmissionOutcome::Accepted {
                id: accepted.id,
                bill_number: accepted.bill_number,
            });
        }

        if status == reqwest::StatusCode::CONFLICT {
            let conflict: ErrorResponse = response.json().await?;
            warn!(
                existing = ?conflict.existing_bill_number,
                "Server reported duplicate order"
            );
            return Ok(SubmissionOutcome::Duplicate {
                message: conflict.message.unwrap_or(conflict.error),
                existing_bill_number: conflict.existing_bill_number,
            });
        }

        Err(Self::api_error(status, response).await)
    }

    /// Fetches the consolidated startup dataset.
    pub async fn bootstrap(&self) -> Result<BootstrapData, ClientError> {
        let response = self
            .http
            .get(format!("{}/api/data", self.base_url))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::api_error(status, response).await);
        }

        Ok(response.json().await?)
    }

    /// Updates a persisted order's status.
    pub async fn update_order_status(
        &self,
        order_id: i64,
        status: &str,
    ) -> Result<(), ClientError> {
        let response = self
            .http
            .put(format!("{}/api/orders/{order_id}/status", self.base_url))
            .json(&serde_json::json!({ "status": status }))
            .send()
            .await?;

        let http_status = response.status();
        if !http_status.is_success() {
            return Err(Self::api_error(http_status, response).await);
        }
        Ok(())
    }

    /// Deletes a persisted order (admin operation).
    pub async fn delete_order(&self, order_id: i64) -> Result<(), ClientError> {
        let response = self
            .http
            .delete(format!("{}/api/orders/{order_id}", self.base_url))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::api_error(status, response).await);
        }
        Ok(())
    }

    async fn api_error(status: reqwest::StatusCode, response: reqwest::Response) -> ClientError {
        let message = match response.json::<ErrorResponse>().await {
            Ok(body) => body.message.unwrap_or(body.error),
            Err(_) => status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string(),
        };
        ClientError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

/// Spawns the background guard sweep (default cadence 30 seconds),
/// clearing reservations whose requests never settled.
pub fn spawn_guard_sweeper(
    guard: Arc<SubmissionGuard>,
    interval: std::time::Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let evicted = guard.sweep();
            if evicted > 0 {
                debug!(evicted, "Swept expired submission reservations");
            }
        }
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use dhaba_core::{is_temp_bill_number, ManualClock, OrderItem};

    fn tea_payload() -> OrderPayload {
        OrderPayload {
            id: Some(1_723_456_789_012),
            bill_number: None,
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
            cashier_name: None,
            status: None,
            created_at: None,
            date: None,
            generated_by: Default::default(),
        }
    }

    #[test]
    fn test_temp_bill_numbers_carry_the_prefix() {
        let client = ApiClient::new("http://localhost:3001");
        let first = client.temp_bill_number();
        assert!(is_temp_bill_number(&first));
    }

    #[tokio::test]
    async fn test_reserved_fingerprint_short_circuits_without_network() {
        // Unroutable server: if the client tried the network this would
        // error instead of reporting AlreadyInFlight
        let client = ApiClient::new("http://127.0.0.1:9");
        let payload = tea_payload();

        let fp = fingerprint(&payload);
        assert!(client.guard().reserve(&fp));

        let outcome = client.submit_order(&payload).await.unwrap();
        assert!(matches!(outcome, SubmissionOutcome::AlreadyInFlight));

        // The pre-existing reservation is untouched
        assert!(client.guard().contains(&fp));
    }

    #[tokio::test]
    async fn test_transport_failure_releases_guard() {
        let client = ApiClient::new("http://127.0.0.1:9");
        let payload = tea_payload();
        let fp = fingerprint(&payload);

        let err = client.submit_order(&payload).await.unwrap_err();
        assert!(matches!(err, ClientError::Http(_)));

        // Release ran on the failure path: a legitimate retry can reserve
        assert!(!client.guard().contains(&fp));
        assert!(client.guard().reserve(&fp));
    }

    #[tokio::test]
    async fn test_guard_expiry_uses_injected_clock() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let client = ApiClient::with_clock("http://127.0.0.1:9", clock.clone());

        let fp = fingerprint(&tea_payload());
        assert!(client.guard().reserve(&fp));

        clock.advance(chrono::Duration::minutes(4));
        assert_eq!(client.guard().sweep(), 1);
        assert!(client.guard().reserve(&fp));
    }
}
