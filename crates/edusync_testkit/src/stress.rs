//! Stress helpers for the synchronizer.
//!
//! These drive a synchronizer with many updates and report how many were
//! processed once the queue drained.

use edusync_core::{Category, EntityId, Payload, Synchronizer};
use std::time::{Duration, Instant};

/// Result of a stress run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Updates published.
    pub published: usize,
    /// Updates the drain processed successfully.
    pub processed: u64,
    /// Updates whose processing failed.
    pub failed: u64,
    /// Time from the first publish until the queue was idle.
    pub duration: Duration,
    /// Processed updates per second.
    pub updates_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(published: usize, processed: u64, failed: u64, duration: Duration) -> Self {
        let updates_per_second = if duration.as_secs_f64() > 0.0 {
            processed as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            published,
            processed,
            failed,
            duration,
            updates_per_second,
        }
    }

    /// Prints a summary of the run.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Published: {}", self.published);
        println!("Processed: {}", self.processed);
        println!("Failed: {}", self.failed);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} updates/sec", self.updates_per_second);
    }
}

/// Configuration for stress runs.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Updates published per producer.
    pub updates: usize,
    /// Number of concurrent producers.
    pub producers: usize,
    /// Number of distinct entities updates are spread over.
    pub entity_count: usize,
    /// Category updates are published under.
    pub category: Category,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            updates: 1_000,
            producers: 4,
            entity_count: 100,
            category: Category::StudentProgress,
        }
    }
}

fn entity(i: usize, entity_count: usize) -> EntityId {
    EntityId::new(format!("student-{}", i % entity_count.max(1)))
}

async fn finish(sync: &Synchronizer, published: usize, start: Instant, before: (u64, u64)) -> StressTestResult {
    sync.flush().await;
    let metrics = sync.metrics();
    StressTestResult::new(
        published,
        metrics.events_processed() - before.0,
        metrics.processing_failures() - before.1,
        start.elapsed(),
    )
}

fn snapshot(sync: &Synchronizer) -> (u64, u64) {
    (sync.metrics().events_processed(), sync.metrics().processing_failures())
}

/// Publishes `config.updates` updates from one producer.
pub async fn stress_sequential_updates(sync: &Synchronizer, config: &StressConfig) -> StressTestResult {
    let before = snapshot(sync);
    let start = Instant::now();

    for i in 0..config.updates {
        let payload = Payload::new().with("seq", i);
        sync.update_data(config.category, payload, Some(entity(i, config.entity_count)), "stress");
    }

    finish(sync, config.updates, start, before).await
}

/// Publishes from `config.producers` tasks at once.
///
/// Each payload carries its producer and sequence number so callers can
/// check per-producer ordering with a global recorder.
pub async fn stress_concurrent_producers(sync: &Synchronizer, config: &StressConfig) -> StressTestResult {
    let before = snapshot(sync);
    let start = Instant::now();

    let handles: Vec<_> = (0..config.producers)
        .map(|producer| {
            let sync = sync.clone();
            let config = config.clone();
            tokio::spawn(async move {
                for i in 0..config.updates {
                    let payload = Payload::new().with("producer", producer).with("seq", i);
                    sync.update_data(config.category, payload, Some(entity(i, config.entity_count)), "stress");
                    if i % 64 == 0 {
                        tokio::task::yield_now().await;
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.await.expect("producer task panicked");
    }

    finish(sync, config.producers * config.updates, start, before).await
}

/// Interleaves updates with reads and cache clears.
pub async fn stress_mixed_operations(sync: &Synchronizer, config: &StressConfig) -> StressTestResult {
    let before = snapshot(sync);
    let start = Instant::now();
    let mut published = 0usize;

    for i in 0..config.updates {
        let id = entity(i, config.entity_count);
        match i % 3 {
            0 => {
                sync.update_data(config.category, Payload::new().with("seq", i), Some(id), "stress");
                published += 1;
            }
            1 => {
                let _ = sync.get_cached_data(config.category, Some(&id));
            }
            _ => {
                sync.clear_cache(config.category, Some(&id));
            }
        }
    }

    finish(sync, published, start, before).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test_synchronizer;

    fn small() -> StressConfig {
        StressConfig {
            updates: 200,
            producers: 3,
            entity_count: 10,
            ..StressConfig::default()
        }
    }

    #[tokio::test]
    async fn sequential_processes_everything() {
        let sync = test_synchronizer();
        let result = stress_sequential_updates(&sync, &small()).await;
        assert_eq!(result.published, 200);
        assert_eq!(result.processed, 200);
        assert_eq!(result.failed, 0);
        assert_eq!(sync.get_stats().cache_size, 10);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_processes_everything() {
        let sync = test_synchronizer();
        let result = stress_concurrent_producers(&sync, &small()).await;
        assert_eq!(result.published, 600);
        assert_eq!(result.processed, 600);
        assert_eq!(sync.get_stats().queue_length, 0);
    }

    #[tokio::test]
    async fn mixed_counts_only_updates() {
        let sync = test_synchronizer();
        let result = stress_mixed_operations(&sync, &small()).await;
        assert_eq!(result.published, 67);
        assert_eq!(result.processed, 67);
    }
}
