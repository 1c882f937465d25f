//! # Server Request Lock Table
//!
//! Short-lived, fingerprint-scoped mutual exclusion shared across all
//! request handlers. Holding the lock for a fingerprint means one
//! submission is currently walking the detect → allocate → persist
//! sequence; a concurrent submission of the same fingerprint is reported
//! as a duplicate ("request in progress") without touching the database.
//!
//! The lock is ADVISORY: it narrows the race window between the duplicate
//! check and the insert, but the UNIQUE constraint on `bill_number` in the
//! persistence layer remains the final authority. Entries self-expire so a
//! hung request can never block future legitimate submissions — a
//! deliberate availability-over-strictness trade-off.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::clock::Clock;

// =============================================================================
// Configuration
// =============================================================================

/// Tuning knobs for the request lock table.
#[derive(Debug, Clone)]
pub struct LockConfig {
    /// Age past which a held lock no longer blocks acquisition.
    pub timeout: Duration,

    /// Hard cap on concurrently tracked locks, to bound memory under
    /// pathological load.
    pub max_locks: usize,
}

impl Default for LockConfig {
    fn default() -> Self {
        LockConfig {
            timeout: Duration::seconds(30),
            max_locks: 1000,
        }
    }
}

// =============================================================================
// Statistics
// =============================================================================

/// Counters for the lock metrics endpoint.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LockStats {
    /// Locks handed out since startup.
    pub total_created: u64,
    /// Locks released explicitly by their holder.
    pub total_released: u64,
    /// Locks evicted after expiring (sweep or lazy eviction on acquire).
    pub total_expired: u64,
    /// Currently held locks.
    pub active: usize,
    /// When the last periodic sweep ran.
    pub last_sweep: Option<DateTime<Utc>>,
}

// =============================================================================
// Lock Table
// =============================================================================

struct Inner {
    locks: HashMap<String, DateTime<Utc>>,
    stats: LockStats,
}

/// Advisory fingerprint lock table shared by all connections.
///
/// Construct one per server and share it behind an `Arc`; tests construct
/// isolated instances and drive time with a manual clock.
pub struct RequestLockTable {
    clock: Arc<dyn Clock>,
    config: LockConfig,
    inner: Mutex<Inner>,
}

impl RequestLockTable {
    /// Creates a lock table with default configuration.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_config(clock, LockConfig::default())
    }

    /// Creates a lock table with explicit configuration.
    pub fn with_config(clock: Arc<dyn Clock>, config: LockConfig) -> Self {
        RequestLockTable {
            clock,
            config,
            inner: Mutex::new(Inner {
                locks: HashMap::new(),
                stats: LockStats::default(),
            }),
        }
    }

    /// Attempts to acquire the lock for a fingerprint.
    ///
    /// - held and fresh → `false` (caller reports "request in progress"
    ///   and must NOT release a lock it never acquired)
    /// - held but expired → stale entry evicted, acquisition succeeds
    /// - absent → acquisition succeeds
    pub fn acquire(&self, fingerprint: &str) -> bool {
        let now = self.clock.now();
        let mut inner = self.inner.lock().expect("lock table mutex poisoned");

        if let Some(&acquired_at) = inner.locks.get(fingerprint) {
            if now - acquired_at < self.config.timeout {
                return false;
            }
            // Expired holder: evict and fall through to take the lock
            inner.locks.remove(fingerprint);
            inner.stats.total_expired += 1;
        }

        // Emergency bound: clear expired entries, then shed the oldest if
        // the table is still full, so new submissions are never refused
        if inner.locks.len() >= self.config.max_locks {
            Self::evict_expired(&mut inner, now, self.config.timeout);
            while inner.locks.len() >= self.config.max_locks {
                let oldest = inner
                    .locks
                    .iter()
                    .min_by_key(|(_, &at)| at)
                    .map(|(fp, _)| fp.clone());
                match oldest {
                    Some(fp) => {
                        inner.locks.remove(&fp);
                        inner.stats.total_expired += 1;
                    }
                    None => break,
                }
            }
        }

        inner.locks.insert(fingerprint.to_string(), now);
        inner.stats.total_created += 1;
        inner.stats.active = inner.locks.len();
        true
    }

    /// Releases a held lock.
    ///
    /// Called exactly once, after the duplicate-check-and-insert sequence
    /// for the fingerprint settles (success, duplicate, or error). Returns
    /// `false` if the lock had already expired away.
    pub fn release(&self, fingerprint: &str) -> bool {
        let mut inner = self.inner.lock().expect("lock table mutex poisoned");
        let removed = inner.locks.remove(fingerprint).is_some();
        if removed {
            inner.stats.total_released += 1;
        }
        inner.stats.active = inner.locks.len();
        removed
    }

    /// Removes every entry older than the timeout. Returns the number
    /// evicted. Run periodically (default every 5 seconds).
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let mut inner = self.inner.lock().expect("lock table mutex poisoned");
        let evicted = Self::evict_expired(&mut inner, now, self.config.timeout);
        inner.stats.active = inner.locks.len();
        inner.stats.last_sweep = Some(now);
        evicted
    }

    fn evict_expired(inner: &mut Inner, now: DateTime<Utc>, timeout: Duration) -> usize {
        let expired: Vec<String> = inner
            .locks
            .iter()
            .filter(|(_, &acquired_at)| now - acquired_at > timeout)
            .map(|(fp, _)| fp.clone())
            .collect();
        for fp in &expired {
            inner.locks.remove(fp);
        }
        inner.stats.total_expired += expired.len() as u64;
        expired.len()
    }

    /// Number of currently held locks.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("lock table mutex poisoned").locks.len()
    }

    /// True when no locks are held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the lock counters.
    pub fn stats(&self) -> LockStats {
        let mut inner = self.inner.lock().expect("lock table mutex poisoned");
        inner.stats.active = inner.locks.len();
        inner.stats.clone()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn table_with_clock() -> (RequestLockTable, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let table = RequestLockTable::new(clock.clone());
        (table, clock)
    }

    #[test]
    fn test_acquire_blocks_concurrent_holder() {
        let (table, _clock) = table_with_clock();

        assert!(table.acquire("fp-1"));
        assert!(!table.acquire("fp-1"));
        // Different fingerprints proceed fully in parallel
        assert!(table.acquire("fp-2"));
    }

    #[test]
    fn test_release_reopens_fingerprint() {
        let (table, _clock) = table_with_clock();

        assert!(table.acquire("fp-1"));
        assert!(table.release("fp-1"));
        assert!(table.acquire("fp-1"));
    }

    #[test]
    fn test_expired_lock_is_acquirable() {
        let (table, clock) = table_with_clock();

        assert!(table.acquire("fp-1"));
        clock.advance(Duration::seconds(31));
        // Lazy eviction on acquire, even without a sweep in between
        assert!(table.acquire("fp-1"));
    }

    #[test]
    fn test_sweep_evicts_expired_entries() {
        let (table, clock) = table_with_clock();

        assert!(table.acquire("fp-old"));
        clock.advance(Duration::seconds(20));
        assert!(table.acquire("fp-new"));
        clock.advance(Duration::seconds(15));

        // fp-old is 35s old, fp-new 15s
        assert_eq!(table.sweep(), 1);
        assert!(table.acquire("fp-old"));
        assert!(!table.acquire("fp-new"));
    }

    #[test]
    fn test_capacity_is_bounded() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let table = RequestLockTable::with_config(
            clock.clone(),
            LockConfig {
                timeout: Duration::seconds(30),
                max_locks: 4,
            },
        );

        for i in 0..4 {
            clock.advance(Duration::seconds(1));
            assert!(table.acquire(&format!("fp-{i}")));
        }

        // Table full of fresh locks: the oldest is shed, the new one enters
        assert!(table.acquire("fp-extra"));
        assert_eq!(table.len(), 4);
        assert!(table.acquire("fp-0"));
    }

    #[test]
    fn test_stats_track_lifecycle() {
        let (table, clock) = table_with_clock();

        assert!(table.acquire("fp-1"));
        assert!(table.acquire("fp-2"));
        assert!(table.release("fp-1"));
        clock.advance(Duration::seconds(31));
        table.sweep();

        let stats = table.stats();
        assert_eq!(stats.total_created, 2);
        assert_eq!(stats.total_released, 1);
        assert_eq!(stats.total_expired, 1);
        assert_eq!(stats.active, 0);
        assert!(stats.last_sweep.is_some());
    }
}
