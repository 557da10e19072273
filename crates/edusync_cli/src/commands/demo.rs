//! Demo command implementation.

use super::report::SyncReport;
use edusync_bindings::SyncProvider;
use edusync_core::{Category, EntityId, Notification, Payload, SyncConfig};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// What the demo observed.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DemoResult {
    /// Student the lesson belonged to.
    pub student: String,
    /// Notifications in the order subscribers saw them.
    pub timeline: Vec<String>,
    /// Cached progress after processing.
    pub progress: Option<Payload>,
    /// Whether the dashboard entry survived.
    pub dashboard_cached: bool,
    /// Final synchronizer state.
    pub report: SyncReport,
}

/// Runs the demo command.
pub async fn run(config: SyncConfig, student: &str, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let provider = SyncProvider::new(config)?;
    let sync = provider.synchronizer().clone();
    let student_id = EntityId::from(student);

    let timeline = Timeline::default();
    let _progress_sub = sync.subscribe(Category::Progress, Some(&student_id), timeline.recorder("progress"));
    let _global_sub = sync.subscribe_to_global(timeline.recorder("global"));

    sync.update_data(
        Category::Dashboard,
        Payload::new().with("widgets", 4),
        Some(student_id.clone()),
        "demo-seed",
    );
    sync.flush().await;

    let progress = provider.bind(Category::Progress, Some(student_id.clone()));
    info!(student, "completing lesson");
    sync.update_data(
        Category::Progress,
        Payload::new().with("completed", true).with("role", "student"),
        Some(student_id.clone()),
        "demo",
    );
    provider.shutdown().await;

    let result = DemoResult {
        student: student.to_string(),
        timeline: timeline.entries(),
        progress: progress.data(),
        dashboard_cached: sync.get_cached_data(Category::Dashboard, Some(&student_id)).is_some(),
        report: SyncReport::capture(&sync),
    };

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => print_text_output(&result),
    }

    Ok(())
}

fn print_text_output(result: &DemoResult) {
    println!("Lesson completed by {}", result.student);
    println!();
    println!("Timeline:");
    for (i, entry) in result.timeline.iter().enumerate() {
        println!("  {:>2}. {}", i + 1, entry);
    }
    println!();
    match &result.progress {
        Some(progress) => println!("Progress binding: {}", progress.clone().into_value()),
        None => println!("Progress binding: <empty>"),
    }
    println!(
        "Dashboard cache entry: {}",
        if result.dashboard_cached { "present" } else { "invalidated" }
    );
    println!();
    result.report.print_text();
}

/// Collects update lines from several subscriptions in delivery order.
#[derive(Default, Clone)]
struct Timeline(Arc<Mutex<Vec<String>>>);

impl Timeline {
    fn recorder(&self, label: &'static str) -> impl Fn(&Notification) + Send + Sync + 'static {
        let entries = Arc::clone(&self.0);
        move |n| {
            if let Some(event) = n.as_update() {
                entries
                    .lock()
                    .push(format!("[{label}] {} from {}", event.key(), event.source));
            }
        }
    }

    fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}
