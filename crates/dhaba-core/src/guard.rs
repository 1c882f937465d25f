//! # Client Submission Guard
//!
//! In-memory set of order fingerprints that are currently in flight from
//! this client. Reserving a fingerprint that is already reserved fails, and
//! the caller must surface "submission already in progress" instead of
//! transmitting a second copy of the same bill.
//!
//! ## Lifecycle of a Reservation
//! ```text
//! reserve(fp) ──► POST /api/orders ──► release(fp)     (success or failure)
//!      │
//!      └── never released? sweep() evicts it after the expiration window,
//!          so a crashed tab or a lost response cannot lock the order out
//!          forever
//! ```
//!
//! The guard is one half of a deliberate defense-in-depth pair with the
//! server-side [`crate::lock::RequestLockTable`]; neither layer replaces
//! the other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

use crate::clock::Clock;

// =============================================================================
// Configuration
// =============================================================================

/// Tuning knobs for the submission guard.
#[derive(Debug, Clone)]
pub struct GuardConfig {
    /// Maximum reservations held at once; the oldest are evicted first
    /// when a new reservation would exceed this.
    pub max_pending: usize,

    /// Age past which a reservation is considered abandoned.
    pub expiration: Duration,

    /// Maximum evictions per sweep, so a sweep never causes a long pause.
    pub sweep_batch: usize,
}

impl Default for GuardConfig {
    fn default() -> Self {
        GuardConfig {
            max_pending: 50,
            expiration: Duration::minutes(3),
            sweep_batch: 20,
        }
    }
}

// =============================================================================
// Guard
// =============================================================================

#[derive(Debug, Clone)]
struct Reservation {
    reserved_at: DateTime<Utc>,
    /// Free-form context (e.g., originating screen) for diagnostics.
    metadata: Option<String>,
}

/// Client-side in-flight fingerprint set.
///
/// Explicitly owned by its caller and safe to share behind an `Arc`; tests
/// construct isolated instances with a [`crate::clock::ManualClock`].
pub struct SubmissionGuard {
    clock: Arc<dyn Clock>,
    config: GuardConfig,
    entries: Mutex<HashMap<String, Reservation>>,
}

impl SubmissionGuard {
    /// Creates a guard with default configuration.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_config(clock, GuardConfig::default())
    }

    /// Creates a guard with explicit configuration.
    pub fn with_config(clock: Arc<dyn Clock>, config: GuardConfig) -> Self {
        SubmissionGuard {
            clock,
            config,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Reserves a fingerprint for submission.
    ///
    /// Returns `false` without mutating anything when the fingerprint is
    /// already reserved — the caller must NOT proceed with the submission.
    pub fn reserve(&self, fingerprint: &str) -> bool {
        self.reserve_with_metadata(fingerprint, None)
    }

    /// Reserves a fingerprint, attaching diagnostic metadata.
    pub fn reserve_with_metadata(&self, fingerprint: &str, metadata: Option<String>) -> bool {
        let now = self.clock.now();
        let mut entries = self.entries.lock().expect("submission guard mutex poisoned");

        if entries.contains_key(fingerprint) {
            return false;
        }

        // Overflow policy: evict oldest-first rather than refusing new
        // submissions outright
        while entries.len() >= self.config.max_pending {
            let oldest = entries
                .iter()
                .min_by_key(|(_, r)| r.reserved_at)
                .map(|(fp, _)| fp.clone());
            match oldest {
                Some(fp) => {
                    entries.remove(&fp);
                }
                None => break,
            }
        }

        entries.insert(
            fingerprint.to_string(),
            Reservation {
                reserved_at: now,
                metadata,
            },
        );
        true
    }

    /// Releases a reservation.
    ///
    /// Called on BOTH success and failure paths once the request settles;
    /// returns `false` if the reservation was already gone (e.g., swept).
    pub fn release(&self, fingerprint: &str) -> bool {
        let mut entries = self.entries.lock().expect("submission guard mutex poisoned");
        entries.remove(fingerprint).is_some()
    }

    /// Evicts reservations older than the expiration window.
    ///
    /// Covers tab crashes, navigation away, and unresolved requests where
    /// `release` never ran. At most `sweep_batch` entries are evicted per
    /// call; returns the number evicted.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.lock().expect("submission guard mutex poisoned");

        let mut expired: Vec<(String, DateTime<Utc>)> = entries
            .iter()
            .filter(|(_, r)| now - r.reserved_at > self.config.expiration)
            .map(|(fp, r)| (fp.clone(), r.reserved_at))
            .collect();

        // Oldest first so a capped batch always clears the worst offenders
        expired.sort_by_key(|(_, reserved_at)| *reserved_at);
        expired.truncate(self.config.sweep_batch);

        for (fp, _) in &expired {
            entries.remove(fp);
        }
        expired.len()
    }

    /// Number of live reservations.
    pub fn len(&self) -> usize {
        self.entries.lock().expect("submission guard mutex poisoned").len()
    }

    /// True when no reservations are held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when the fingerprint is currently reserved.
    pub fn contains(&self, fingerprint: &str) -> bool {
        self.entries
            .lock()
            .expect("submission guard mutex poisoned")
            .contains_key(fingerprint)
    }

    /// Diagnostic metadata attached to a reservation, if any.
    pub fn metadata(&self, fingerprint: &str) -> Option<String> {
        self.entries
            .lock()
            .expect("submission guard mutex poisoned")
            .get(fingerprint)
            .and_then(|r| r.metadata.clone())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
