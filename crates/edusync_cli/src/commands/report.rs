//! Synchronizer state shared by the command outputs.

use edusync_core::{SyncStats, Synchronizer};
use serde::Serialize;

/// Point-in-time view of a synchronizer.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// Queue and cache statistics.
    pub stats: SyncStats,
    /// Updates accepted.
    pub updates_received: u64,
    /// Updates processed by the queue.
    pub events_processed: u64,
    /// Updates whose processing failed.
    pub processing_failures: u64,
    /// Cache entries removed by rules.
    pub invalidations: u64,
    /// Settled signals emitted.
    pub settled_signals: u64,
    /// Cached keys, sorted.
    pub cached_keys: Vec<String>,
}

impl SyncReport {
    /// Captures the current state of `sync`.
    pub fn capture(sync: &Synchronizer) -> Self {
        let metrics = sync.metrics();
        Self {
            stats: sync.get_stats(),
            updates_received: metrics.updates_received(),
            events_processed: metrics.events_processed(),
            processing_failures: metrics.processing_failures(),
            invalidations: metrics.invalidations(),
            settled_signals: metrics.settled_signals(),
            cached_keys: sync.cache().keys_matching(""),
        }
    }

    /// Prints the report as indented text.
    pub fn print_text(&self) {
        println!("Cache entries: {}", self.stats.cache_size);
        for key in &self.cached_keys {
            println!("  {}", key);
        }
        println!("Pending debounce timers: {}", self.stats.pending_updates);
        println!("Queue length: {}", self.stats.queue_length);
        println!("Updates received: {}", self.updates_received);
        println!("Events processed: {}", self.events_processed);
        println!("Processing failures: {}", self.processing_failures);
        println!("Invalidations: {}", self.invalidations);
        println!("Settled signals: {}", self.settled_signals);
    }
}
