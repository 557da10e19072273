//! Cross-category invalidation rules.
//!
//! A student's dashboard is an aggregate of progress, profile and
//! assessment data, so a change to any of those must stale the aggregate.
//! The dependency graph is encoded here as a static table, applied by the
//! drain loop for every processed event.

use crate::key::{CacheKey, Category, EntityId};

/// How an invalidated key is derived from the triggering update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Derive {
    /// Same entity as the update (or global, if the update has none).
    SameEntity,
    /// A fixed aggregate, stored under the entity id of the same name.
    Named(&'static str),
}

/// One cache entry dropped by a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Invalidation {
    /// Category of the dropped entry.
    pub category: Category,
    /// How to derive its scope.
    pub derive: Derive,
}

impl Invalidation {
    const fn same_entity(category: Category) -> Self {
        Self {
            category,
            derive: Derive::SameEntity,
        }
    }

    const fn named(category: Category, name: &'static str) -> Self {
        Self {
            category,
            derive: Derive::Named(name),
        }
    }

    /// The concrete key to drop for an update owned by `entity_id`.
    pub fn key(&self, entity_id: Option<&EntityId>) -> CacheKey {
        match self.derive {
            Derive::SameEntity => CacheKey::for_entity(self.category, entity_id),
            Derive::Named(name) => CacheKey::named(self.category, name),
        }
    }
}

/// Follow-up notification sent after a rule's invalidations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emit {
    /// Nothing beyond the global emission.
    Nothing,
    /// Re-emit on the update's own `category:entity` channel.
    Entity,
    /// Emit on `module:<moduleId>`, read from the payload.
    Module,
}

/// Processing rule of one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    /// Entries dropped from the cache.
    pub invalidates: &'static [Invalidation],
    /// Follow-up notification.
    pub emit: Emit,
    /// Whether a student's update is forwarded to the parent dashboard.
    pub parent_cascade: bool,
}

const USER: &[Invalidation] = &[
    Invalidation::same_entity(Category::Dashboard),
    Invalidation::same_entity(Category::Progress),
];

const PROGRESS: &[Invalidation] = &[
    Invalidation::same_entity(Category::Dashboard),
    Invalidation::same_entity(Category::StudentProgress),
];

const MODULE: &[Invalidation] = &[
    Invalidation::named(Category::Module, "recommended"),
    Invalidation::named(Category::LearningPath, "all"),
];

const ASSESSMENT: &[Invalidation] = &[
    Invalidation::same_entity(Category::Dashboard),
    Invalidation::named(Category::Module, "recommended"),
];

const PASSIVE: Rule = Rule {
    invalidates: &[],
    emit: Emit::Nothing,
    parent_cascade: false,
};

/// Returns the processing rule of `category`.
pub fn rule_for(category: Category) -> Rule {
    match category {
        Category::User => Rule {
            invalidates: USER,
            emit: Emit::Entity,
            parent_cascade: false,
        },
        Category::Progress => Rule {
            invalidates: PROGRESS,
            emit: Emit::Entity,
            parent_cascade: true,
        },
        Category::Module => Rule {
            invalidates: MODULE,
            emit: Emit::Module,
            parent_cascade: false,
        },
        Category::Assessment => Rule {
            invalidates: ASSESSMENT,
            emit: Emit::Entity,
            parent_cascade: false,
        },
        Category::Dashboard => Rule {
            invalidates: &[],
            emit: Emit::Entity,
            parent_cascade: false,
        },
        Category::LearningPath
        | Category::StudentProgress
        | Category::ParentDashboard
        | Category::TeacherDashboard
        | Category::AdminDashboard
        | Category::Global => PASSIVE,
    }
}

/// Keys an update of `category` for `entity_id` invalidates.
pub fn invalidations_for(category: Category, entity_id: Option<&EntityId>) -> Vec<CacheKey> {
    rule_for(category)
        .invalidates
        .iter()
        .map(|invalidation| invalidation.key(entity_id))
        .collect()
}
