//! A student dashboard wired through the provider.

use edusync_bindings::{fetcher, BindingError, SyncProvider};
use edusync_testkit::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn dashboard_follows_progress_and_refetches_when_invalidated() {
    let provider = SyncProvider::new(test_config()).unwrap();
    let sync = provider.synchronizer().clone();
    let student = EntityId::from("student-42");

    let fetches = Arc::new(AtomicUsize::new(0));
    let f = Arc::clone(&fetches);
    let dashboard = provider
        .bind_realtime(
            Category::Dashboard,
            Some(student.clone()),
            fetcher(move || {
                let n = f.fetch_add(1, Ordering::SeqCst) + 1;
                async move { Ok(Payload::new().with("widgets", 3).with("build", n)) }
            }),
            None,
        )
        .unwrap();
    let progress = provider.bind(Category::Progress, Some(student.clone()));
    let parents = EventRecorder::category(&sync, Category::ParentDashboard, Some(&student));

    dashboard.load().await.unwrap();
    assert_eq!(fetches.load(Ordering::SeqCst), 1);

    sync.update_data(Category::Progress, lesson_completed("fractions-3"), Some(student.clone()), "lesson-player");
    sync.flush().await;

    assert_eq!(progress.data(), Some(lesson_completed("fractions-3")));
    assert!(sync.get_cached_data(Category::Dashboard, Some(&student)).is_none());

    let cascaded = parents.updates();
    assert_eq!(cascaded.len(), 1);
    assert_eq!(
        cascaded[0].payload.get("studentId").and_then(|v| v.as_str()),
        Some("student-42")
    );
    assert!(sync
        .get_cached_data(Category::ParentDashboard, Some(&student))
        .is_some());

    // The dashboard still shows its last value until someone asks for a refresh.
    assert!(dashboard.data().is_some());
    dashboard.refresh().await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(fetches.load(Ordering::SeqCst), 2);
    assert_eq!(
        sync.get_cached_data(Category::Dashboard, Some(&student)),
        Some(Payload::new().with("widgets", 3).with("build", 2))
    );

    provider.shutdown().await;
}

#[tokio::test]
async fn multi_binding_loads_a_screen() {
    let provider = SyncProvider::new(test_config()).unwrap();
    let student = EntityId::from("student-7");

    let screen = provider
        .bind_many(
            Some(student.clone()),
            [("progress", Category::Progress), ("assessments", Category::Assessment)],
        )
        .with_fetcher("progress", fetcher(|| async { Ok(student_progress(4, 40)) }))
        .with_fetcher("assessments", fetcher(|| async { Ok(assessment_result("quiz-1", 8)) }));

    screen.load_all().await.unwrap();
    assert_eq!(screen.snapshot().len(), 2);
    assert!(screen.errors().is_empty());

    provider.synchronizer().update_data(
        Category::Progress,
        student_progress(5, 50),
        Some(student),
        "lesson-player",
    );
    assert_eq!(screen.data("progress"), Some(student_progress(5, 50)));
}

#[tokio::test]
async fn optimistic_write_rolls_back_offline() {
    let provider = SyncProvider::new(test_config()).unwrap();
    let student = EntityId::from("student-9");
    provider.synchronizer().update_data(
        Category::Progress,
        student_progress(2, 20),
        Some(student.clone()),
        "seed",
    );
    let progress = provider.bind_optimistic(Category::Progress, Some(student));

    provider.set_online(false);
    let offline = !provider.connectivity().is_online();
    let result = progress
        .optimistic_update(student_progress(3, 30), || async move {
            if offline {
                Err(BindingError::fetch("offline"))
            } else {
                Ok(student_progress(3, 30))
            }
        })
        .await;

    assert!(result.is_err());
    assert_eq!(progress.data(), Some(student_progress(2, 20)));
    assert_eq!(progress.error().as_deref(), Some("fetch failed: offline"));
}

#[tokio::test]
async fn settled_signal_follows_a_burst() {
    let provider = SyncProvider::new(test_config()).unwrap();
    let sync = provider.synchronizer();
    let settled = EventRecorder::settled(sync, Category::StudentProgress);

    for pct in 0..10u8 {
        sync.update_data(Category::StudentProgress, student_progress(pct.into(), pct), None, "burst");
    }
    assert!(settled.is_empty());
    assert_eq!(sync.get_stats().pending_updates, 1);

    tokio::time::sleep(TEST_DEBOUNCE * 3).await;
    assert_eq!(settled.len(), 1);
    assert_eq!(sync.get_stats().pending_updates, 0);
}
