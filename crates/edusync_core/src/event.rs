//! Synchronization events.

use crate::key::{CacheKey, Category, EntityId};
use crate::payload::Payload;
use serde::Serialize;
use std::time::SystemTime;
use uuid::Uuid;

/// One update flowing through the synchronizer.
///
/// Created when [`Synchronizer::update_data`](crate::Synchronizer::update_data)
/// is called and never modified afterwards. Events are memory-resident only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncEvent {
    /// Unique id, for diagnostics.
    pub id: Uuid,
    /// Category of the update.
    pub category: Category,
    /// Owning entity; `None` means category-wide.
    pub entity_id: Option<EntityId>,
    /// The updated value.
    pub payload: Payload,
    /// Wall-clock creation time.
    pub timestamp: SystemTime,
    /// Free-text origin label. Never used for decisions.
    pub source: String,
}

impl SyncEvent {
    /// Creates an event stamped with the current time.
    pub fn new(
        category: Category,
        payload: Payload,
        entity_id: Option<EntityId>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            category,
            entity_id,
            payload,
            timestamp: SystemTime::now(),
            source: source.into(),
        }
    }

    /// Cache and debounce key of the event.
    pub fn key(&self) -> CacheKey {
        CacheKey::for_entity(self.category, self.entity_id.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_uses_entity_or_global() {
        let event = SyncEvent::new(
            Category::Progress,
            Payload::new(),
            Some(EntityId::from("s1")),
            "test",
        );
        assert_eq!(event.key().to_string(), "progress:s1");

        let event = SyncEvent::new(Category::Module, Payload::new(), None, "test");
        assert_eq!(event.key().to_string(), "module:global");
    }

    #[test]
    fn events_get_distinct_ids() {
        let a = SyncEvent::new(Category::User, Payload::new(), None, "a");
        let b = SyncEvent::new(Category::User, Payload::new(), None, "b");
        assert_ne!(a.id, b.id);
    }
}
