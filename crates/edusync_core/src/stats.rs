//! Synchronizer statistics.
//!
//! [`SyncStats`] is a point-in-time snapshot of queue and cache state.
//! [`SyncMetrics`] holds monotonically increasing counters that can be
//! read while updates are in flight.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot returned by [`Synchronizer::get_stats`](crate::Synchronizer::get_stats).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStats {
    /// Entries currently in the cache, expired-but-unread included.
    pub cache_size: usize,
    /// Debounce timers waiting to fire.
    pub pending_updates: usize,
    /// Events waiting in the update queue.
    pub queue_length: usize,
    /// Whether a drain task is running.
    pub is_processing: bool,
}

/// Counters for synchronizer activity.
#[derive(Debug, Default)]
pub struct SyncMetrics {
    /// Calls to `update_data` that were accepted.
    updates_received: AtomicU64,
    /// Calls to `update_data` after shutdown.
    updates_rejected: AtomicU64,
    /// Queue events processed successfully.
    events_processed: AtomicU64,
    /// Queue events whose rule failed.
    processing_failures: AtomicU64,
    /// Cache entries dropped by invalidation rules.
    invalidations: AtomicU64,
    /// Settled signals fired.
    settled_signals: AtomicU64,
    /// Drain tasks started.
    drain_runs: AtomicU64,
    /// Reads that found a live entry.
    cache_hits: AtomicU64,
    /// Reads that found nothing or an expired entry.
    cache_misses: AtomicU64,
}

impl SyncMetrics {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    // === Increment methods (internal use) ===

    pub(crate) fn record_update(&self) {
        self.updates_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.updates_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_processed(&self) {
        self.events_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.processing_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_invalidation(&self) {
        self.invalidations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_settled(&self) {
        self.settled_signals.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_drain_run(&self) {
        self.drain_runs.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_read(&self, hit: bool) {
        if hit {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.cache_misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    // === Getter methods (public API) ===

    /// Accepted updates.
    pub fn updates_received(&self) -> u64 {
        self.updates_received.load(Ordering::Relaxed)
    }

    /// Updates dropped because the synchronizer was shut down.
    pub fn updates_rejected(&self) -> u64 {
        self.updates_rejected.load(Ordering::Relaxed)
    }

    /// Queue events processed without error.
    pub fn events_processed(&self) -> u64 {
        self.events_processed.load(Ordering::Relaxed)
    }

    /// Queue events whose processing failed and was skipped.
    pub fn processing_failures(&self) -> u64 {
        self.processing_failures.load(Ordering::Relaxed)
    }

    /// Cache entries dropped by invalidation rules.
    ///
    /// Counts attempted drops, whether or not the entry existed.
    pub fn invalidations(&self) -> u64 {
        self.invalidations.load(Ordering::Relaxed)
    }

    /// Settled signals fired.
    pub fn settled_signals(&self) -> u64 {
        self.settled_signals.load(Ordering::Relaxed)
    }

    /// Drain tasks started. One per non-empty batch of queued events.
    pub fn drain_runs(&self) -> u64 {
        self.drain_runs.load(Ordering::Relaxed)
    }

    /// Cache reads that returned a value.
    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    /// Cache reads that returned nothing.
    pub fn cache_misses(&self) -> u64 {
        self.cache_misses.load(Ordering::Relaxed)
    }

    /// Fraction of reads that hit, or `None` before the first read.
    pub fn hit_ratio(&self) -> Option<f64> {
        let hits = self.cache_hits();
        let total = hits + self.cache_misses();
        if total == 0 {
            None
        } else {
            Some(hits as f64 / total as f64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let metrics = SyncMetrics::new();
        assert_eq!(metrics.updates_received(), 0);
        assert_eq!(metrics.events_processed(), 0);
        assert_eq!(metrics.hit_ratio(), None);
    }

    #[test]
    fn hit_ratio() {
        let metrics = SyncMetrics::new();
        metrics.record_read(true);
        metrics.record_read(true);
        metrics.record_read(true);
        metrics.record_read(false);
        assert_eq!(metrics.hit_ratio(), Some(0.75));
    }

    #[test]
    fn stats_serialize_camel_case() {
        let stats = SyncStats {
            cache_size: 2,
            pending_updates: 1,
            queue_length: 0,
            is_processing: false,
        };
        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["cacheSize"], 2);
        assert_eq!(json["pendingUpdates"], 1);
        assert_eq!(json["isProcessing"], false);
    }
}
