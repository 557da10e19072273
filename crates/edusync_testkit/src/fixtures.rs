//! Test fixtures and synchronizer helpers.
//!
//! Provides a recorder that captures bus notifications and builders for
//! the payloads learner-facing screens publish.

use edusync_core::{
    Category, EntityId, Notification, Payload, Role, Subscription, SyncConfig, SyncEvent, Synchronizer,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Debounce window used by [`test_config`].
pub const TEST_DEBOUNCE: Duration = Duration::from_millis(50);

/// A configuration with a short debounce window, for tests that wait on
/// settled signals in real time.
pub fn test_config() -> SyncConfig {
    SyncConfig::new().debounce_window(TEST_DEBOUNCE)
}

/// Creates a synchronizer on the current tokio runtime.
///
/// # Panics
///
/// Panics when called outside a runtime.
pub fn test_synchronizer() -> Synchronizer {
    Synchronizer::new(test_config()).expect("test synchronizer needs a tokio runtime")
}

/// Captures every notification delivered on one channel.
///
/// Stops recording when dropped.
pub struct EventRecorder {
    seen: Arc<Mutex<Vec<Notification>>>,
    _subscription: Subscription,
}

impl EventRecorder {
    fn attach(subscribe: impl FnOnce(Box<dyn Fn(&Notification) + Send + Sync>) -> Subscription) -> Self {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let subscription = subscribe(Box::new(move |n: &Notification| sink.lock().push(n.clone())));
        Self {
            seen,
            _subscription: subscription,
        }
    }

    /// Records the global channel.
    pub fn global(sync: &Synchronizer) -> Self {
        Self::attach(|handler| sync.subscribe_to_global(handler))
    }

    /// Records updates of a category, narrowed to one entity when given.
    pub fn category(sync: &Synchronizer, category: Category, entity_id: Option<&EntityId>) -> Self {
        Self::attach(|handler| sync.subscribe(category, entity_id, handler))
    }

    /// Records settled signals of a category.
    pub fn settled(sync: &Synchronizer, category: Category) -> Self {
        Self::attach(|handler| sync.subscribe_settled(category, handler))
    }

    /// Records refresh requests of a category.
    pub fn refresh(sync: &Synchronizer, category: Category) -> Self {
        Self::attach(|handler| sync.subscribe_refresh(category, handler))
    }

    /// Everything recorded so far, in delivery order.
    pub fn notifications(&self) -> Vec<Notification> {
        self.seen.lock().clone()
    }

    /// The recorded updates, skipping signals.
    pub fn updates(&self) -> Vec<Arc<SyncEvent>> {
        self.seen
            .lock()
            .iter()
            .filter_map(|n| n.as_update().cloned())
            .collect()
    }

    /// Categories of the recorded notifications, in order.
    pub fn categories(&self) -> Vec<Category> {
        self.seen.lock().iter().map(Notification::category).collect()
    }

    /// Source labels of the recorded updates, in order.
    pub fn sources(&self) -> Vec<String> {
        self.updates().iter().map(|e| e.source.clone()).collect()
    }

    /// Number of recorded notifications.
    pub fn len(&self) -> usize {
        self.seen.lock().len()
    }

    /// Returns true if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.seen.lock().is_empty()
    }

    /// Forgets everything recorded so far.
    pub fn clear(&self) {
        self.seen.lock().clear();
    }
}

impl std::fmt::Debug for EventRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRecorder")
            .field("recorded", &self.len())
            .finish()
    }
}

/// Payload builders for common learner records.
pub mod payloads {
    use super::*;

    /// A lesson completion reported by a student.
    pub fn lesson_completed(lesson_id: &str) -> Payload {
        Payload::new()
            .with("completed", true)
            .with("lessonId", lesson_id)
            .with("role", "student")
    }

    /// Overall progress of a student.
    pub fn student_progress(completed_lessons: u32, percent: u8) -> Payload {
        Payload::new()
            .with("completedLessons", completed_lessons)
            .with("percent", percent)
            .with("role", "student")
    }

    /// Progress recorded by someone other than the student.
    pub fn progress_as(role: Role, percent: u8) -> Payload {
        Payload::new()
            .with("percent", percent)
            .with("role", role.as_str())
    }

    /// A module change.
    pub fn module_update(module_id: &str, title: &str) -> Payload {
        Payload::new().with("moduleId", module_id).with("title", title)
    }

    /// A graded assessment.
    pub fn assessment_result(assessment_id: &str, score: u32) -> Payload {
        Payload::new()
            .with("assessmentId", assessment_id)
            .with("score", score)
    }

    /// A user profile.
    pub fn student_profile(name: &str) -> Payload {
        Payload::new().with("name", name).with("role", "student")
    }
}

pub use payloads::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_builders_carry_roles() {
        assert_eq!(lesson_completed("l1").role(), Some(Role::Student));
        assert_eq!(progress_as(Role::Teacher, 10).role(), Some(Role::Teacher));
        assert_eq!(module_update("m1", "Fractions").module_id(), Some("m1"));
        assert_eq!(assessment_result("a1", 90).role(), None);
    }

    #[tokio::test]
    async fn recorder_captures_and_detaches() {
        let sync = test_synchronizer();
        let recorder = EventRecorder::global(&sync);
        assert!(recorder.is_empty());

        sync.update_data(Category::User, student_profile("Ada"), None, "fixture");
        sync.flush().await;
        assert_eq!(recorder.len(), 1);
        assert_eq!(recorder.sources(), ["fixture"]);

        recorder.clear();
        drop(recorder);
        assert_eq!(sync.bus().subscriber_count(&edusync_core::Channel::Global), 0);
    }
}
