//! Metrics for IPSec key and endpoint operations
//!
//! Provides counters for monitoring key loads and endpoint programming.
//! All metrics use atomic operations for thread-safe updates.
//!
//! # Example
//!
//! ```
//! use podsec_datapath::ipsec::metrics::IpsecMetrics;
//!
//! let metrics = IpsecMetrics::new();
//!
//! metrics.record_key_load(2);
//! metrics.record_upsert();
//!
//! let snapshot = metrics.snapshot();
//! println!("Keys installed: {}", snapshot.keys_installed);
//! println!("States programmed: {}", snapshot.states_programmed);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// IPSec metrics for monitoring
///
/// Cloning shares the underlying counters.
#[derive(Debug, Clone, Default)]
pub struct IpsecMetrics {
    /// Successful key file loads
    pub key_loads_total: Arc<AtomicU64>,

    /// Key file loads that failed
    pub key_load_failures: Arc<AtomicU64>,

    /// Key records installed across all loads
    pub keys_installed: Arc<AtomicU64>,

    /// Successful endpoint upserts
    pub endpoint_upserts: Arc<AtomicU64>,

    /// Endpoint upserts that failed
    pub endpoint_upsert_failures: Arc<AtomicU64>,

    /// Upserts that failed because no key resolved
    pub key_missing: Arc<AtomicU64>,

    /// XFRM states handed to the programmer
    pub states_programmed: Arc<AtomicU64>,

    /// XFRM policies handed to the programmer
    pub policies_programmed: Arc<AtomicU64>,

    /// Successful endpoint deletes
    pub endpoint_deletes: Arc<AtomicU64>,

    /// Endpoint deletes that failed
    pub endpoint_delete_failures: Arc<AtomicU64>,
}

impl IpsecMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful key load
    ///
    /// # Arguments
    ///
    /// * `installed` - Number of records installed
    pub fn record_key_load(&self, installed: usize) {
        self.key_loads_total.fetch_add(1, Ordering::Relaxed);
        self.keys_installed
            .fetch_add(installed as u64, Ordering::Relaxed);
    }

    /// Record a failed key load
    pub fn record_key_load_failed(&self) {
        self.key_load_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a state accepted by the programmer
    pub fn record_state_programmed(&self) {
        self.states_programmed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a policy accepted by the programmer
    pub fn record_policy_programmed(&self) {
        self.policies_programmed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful upsert
    pub fn record_upsert(&self) {
        self.endpoint_upserts.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed upsert
    ///
    /// # Arguments
    ///
    /// * `key_missing` - Whether the failure was a missing key
    pub fn record_upsert_failed(&self, key_missing: bool) {
        self.endpoint_upsert_failures
            .fetch_add(1, Ordering::Relaxed);
        if key_missing {
            self.key_missing.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record an endpoint delete
    ///
    /// # Arguments
    ///
    /// * `success` - Whether every delete succeeded or found nothing
    pub fn record_delete(&self, success: bool) {
        if success {
            self.endpoint_deletes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.endpoint_delete_failures
                .fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Take a point-in-time copy of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            key_loads_total: self.key_loads_total.load(Ordering::Relaxed),
            key_load_failures: self.key_load_failures.load(Ordering::Relaxed),
            keys_installed: self.keys_installed.load(Ordering::Relaxed),
            endpoint_upserts: self.endpoint_upserts.load(Ordering::Relaxed),
            endpoint_upsert_failures: self.endpoint_upsert_failures.load(Ordering::Relaxed),
            key_missing: self.key_missing.load(Ordering::Relaxed),
            states_programmed: self.states_programmed.load(Ordering::Relaxed),
            policies_programmed: self.policies_programmed.load(Ordering::Relaxed),
            endpoint_deletes: self.endpoint_deletes.load(Ordering::Relaxed),
            endpoint_delete_failures: self.endpoint_delete_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`IpsecMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Successful key file loads
    pub key_loads_total: u64,
    /// Key file loads that failed
    pub key_load_failures: u64,
    /// Key records installed across all loads
    pub keys_installed: u64,
    /// Successful endpoint upserts
    pub endpoint_upserts: u64,
    /// Endpoint upserts that failed
    pub endpoint_upsert_failures: u64,
    /// Upserts that failed because no key resolved
    pub key_missing: u64,
    /// XFRM states handed to the programmer
    pub states_programmed: u64,
    /// XFRM policies handed to the programmer
    pub policies_programmed: u64,
    /// Successful endpoint deletes
    pub endpoint_deletes: u64,
    /// Endpoint deletes that failed
    pub endpoint_delete_failures: u64,
}
