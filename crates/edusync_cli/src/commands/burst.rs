//! Burst command implementation.

use super::report::SyncReport;
use edusync_core::{CacheKey, Category, EntityId, Payload, SyncConfig, Synchronizer};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Outcome of a burst.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BurstResult {
    /// Key the burst targeted.
    pub key: String,
    /// Updates published.
    pub published: usize,
    /// Updates seen by the category subscriber.
    pub immediate_notifications: usize,
    /// Settled signals seen.
    pub settled_signals: usize,
    /// Time from the last update until the settled signal.
    pub settle_latency_ms: Option<u128>,
    /// Final synchronizer state.
    pub report: SyncReport,
}

/// Runs the burst command.
pub async fn run(
    config: SyncConfig,
    category: Category,
    entity: Option<String>,
    count: usize,
    interval: Duration,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let window = config.debounce_window;
    let sync = Synchronizer::new(config)?;
    let entity_id = entity.map(EntityId::new);

    let immediate = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&immediate);
    let _updates = sync.subscribe(category, entity_id.as_ref(), move |n| {
        if n.as_update().is_some() {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    });

    let settled_at = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&settled_at);
    let _settled = sync.subscribe_settled(category, move |_| recorder.lock().push(Instant::now()));

    info!(%category, count, interval_ms = interval.as_millis() as u64, "publishing burst");
    let mut last = Instant::now();
    for i in 0..count {
        let payload = Payload::new().with("seq", i);
        sync.update_data(category, payload, entity_id.clone(), "burst");
        last = Instant::now();
        debug!(seq = i, "published");
        if i + 1 < count {
            tokio::time::sleep(interval).await;
        }
    }

    sync.flush().await;
    tokio::time::sleep(window + Duration::from_millis(100)).await;

    let settled = settled_at.lock().clone();
    let result = BurstResult {
        key: CacheKey::for_entity(category, entity_id.as_ref()).to_string(),
        published: count,
        immediate_notifications: immediate.load(Ordering::Relaxed),
        settled_signals: settled.len(),
        settle_latency_ms: settled.last().map(|t| t.duration_since(last).as_millis()),
        report: SyncReport::capture(&sync),
    };
    sync.shutdown();

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => print_text_output(&result),
    }

    Ok(())
}

fn print_text_output(result: &BurstResult) {
    println!("Burst on {}", result.key);
    println!("Published: {}", result.published);
    println!("Immediate notifications: {}", result.immediate_notifications);
    println!("Settled signals: {}", result.settled_signals);
    match result.settle_latency_ms {
        Some(ms) => println!("Settled {} ms after the last update", ms),
        None => println!("Never settled"),
    }
    println!();
    result.report.print_text();
}
