//! # Duplicate Detection Metrics
//!
//! Counters for the `/api/metrics/duplicate-detection` endpoint. Lock-free
//! atomics: these are touched on every submission and must never contend
//! with the submission path itself.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Which detector layer produced a duplicate verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionKind {
    /// Request lock was already held for the fingerprint.
    LockActive,
    /// A persisted order with the same client id exists.
    IdMatch,
    /// A persisted order with the same content exists in the window.
    ContentMatch,
}

/// Counters for duplicate detection, shared across all request handlers.
#[derive(Debug, Default)]
pub struct DetectionMetrics {
    total_checks: AtomicU64,
    duplicates_found: AtomicU64,
    by_lock_active: AtomicU64,
    by_id_match: AtomicU64,
    by_content_match: AtomicU64,
}

impl DetectionMetrics {
    /// Creates zeroed metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one completed duplicate check.
    pub fn record_check(&self) {
        self.total_checks.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a duplicate verdict from the given layer.
    pub fn record_duplicate(&self, kind: DetectionKind) {
        self.duplicates_found.fetch_add(1, Ordering::Relaxed);
        let counter = match kind {
            DetectionKind::LockActive => &self.by_lock_active,
            DetectionKind::IdMatch => &self.by_id_match,
            DetectionKind::ContentMatch => &self.by_content_match,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot for the metrics endpoint.
    pub fn snapshot(&self) -> DetectionMetricsSnapshot {
        let total_checks = self.total_checks.load(Ordering::Relaxed);
        let duplicates_found = self.duplicates_found.load(Ordering::Relaxed);
        DetectionMetricsSnapshot {
            total_checks,
            duplicates_found,
            detection_rate: if total_checks > 0 {
                duplicates_found as f64 / total_checks as f64 * 100.0
            } else {
                0.0
            },
            by_type: DetectionByType {
                lock_active: self.by_lock_active.load(Ordering::Relaxed),
                id_match: self.by_id_match.load(Ordering::Relaxed),
                content_match: self.by_content_match.load(Ordering::Relaxed),
            },
        }
    }
}

/// Serialized metrics shape.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionMetricsSnapshot {
    pub total_checks: u64,
    pub duplicates_found: u64,
    /// Percentage of checks that found a duplicate.
    pub detection_rate: f64,
    pub by_type: DetectionByType,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionByType {
    pub lock_active: u64,
    pub id_match: u64,
    pub content_match: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_accumulate() {
        let metrics = DetectionMetrics::new();

        metrics.record_check();
        metrics.record_check();
        metrics.record_duplicate(DetectionKind::IdMatch);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_checks, 2);
        assert_eq!(snapshot.duplicates_found, 1);
        assert_eq!(snapshot.by_type.id_match, 1);
        assert_eq!(snapshot.by_type.content_match, 0);
        assert!((snapshot.detection_rate - 50.0).abs() < f64::EPSILON);
    }
}
