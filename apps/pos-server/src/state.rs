//! # Shared Application State
//!
//! One `AppState` per server, cloned cheaply into every handler. The lock
//! table and metrics are the only shared mutable state in the core; all
//! other data lives in the database and is read/written per-request.

use std::sync::Arc;

use chrono::Duration;

use dhaba_core::{Clock, LockConfig, RequestLockTable, SystemClock};
use dhaba_db::Database;

use crate::config::ServerConfig;
use crate::metrics::DetectionMetrics;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub locks: Arc<RequestLockTable>,
    pub metrics: Arc<DetectionMetrics>,
    pub clock: Arc<dyn Clock>,
    pub config: ServerConfig,
}

impl AppState {
    /// Builds state with the real system clock.
    pub fn new(db: Database, config: ServerConfig) -> Self {
        Self::with_clock(db, config, Arc::new(SystemClock))
    }

    /// Builds state with an injected clock (tests use a manual clock to
    /// drive lock expiry without real delays).
    pub fn with_clock(db: Database, config: ServerConfig, clock: Arc<dyn Clock>) -> Self {
        let locks = Arc::new(RequestLockTable::with_config(
            clock.clone(),
            LockConfig {
                timeout: Duration::seconds(config.lock_timeout_secs as i64),
                max_locks: config.max_request_locks,
            },
        ));

        AppState {
            db,
            locks,
            metrics: Arc::new(DetectionMetrics::new()),
            clock,
            config,
        }
    }
}
