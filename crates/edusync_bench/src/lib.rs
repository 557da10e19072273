//! Benchmark utilities.

use edusync_core::{Category, EntityId, Payload};

/// Generate a payload with `fields` integer fields.
pub fn payload(fields: usize) -> Payload {
    (0..fields).fold(Payload::new(), |p, i| p.with(format!("field_{}", i), i))
}

/// Generate a batch of entity IDs.
pub fn generate_ids(count: usize) -> Vec<EntityId> {
    (0..count).map(|i| EntityId::new(format!("student-{}", i))).collect()
}

/// Categories whose updates only touch their own cache entry.
pub const PASSIVE: [Category; 3] = [
    Category::StudentProgress,
    Category::TeacherDashboard,
    Category::LearningPath,
];
