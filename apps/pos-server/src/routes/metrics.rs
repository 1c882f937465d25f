//! # Metrics Routes
//!
//! Observability counters for the lock table and the duplicate detector.

use axum::extract::State;
use axum::Json;

use dhaba_core::LockStats;

use crate::metrics::DetectionMetricsSnapshot;
use crate::state::AppState;

/// `GET /api/metrics/locks`
pub async fn lock_stats(State(state): State<AppState>) -> Json<LockStats> {
    Json(state.locks.stats())
}

/// `GET /api/metrics/duplicate-detection`
pub async fn detection_stats(State(state): State<AppState>) -> Json<DetectionMetricsSnapshot> {
    Json(state.metrics.snapshot())
}
