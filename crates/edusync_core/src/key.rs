//! Categories, entity ids and cache keys.

use crate::error::SyncError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A fixed domain tag for a kind of synchronized data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    /// User profile data.
    User,
    /// Learning progress of a single user.
    Progress,
    /// Course modules.
    Module,
    /// Assessment results.
    Assessment,
    /// Student dashboard aggregate.
    Dashboard,
    /// Learning paths.
    LearningPath,
    /// Per-student progress as seen by teachers.
    StudentProgress,
    /// Parent dashboard aggregate.
    ParentDashboard,
    /// Teacher dashboard aggregate.
    TeacherDashboard,
    /// Admin dashboard aggregate.
    AdminDashboard,
    /// Application-wide state.
    Global,
}

impl Category {
    /// Every category, in declaration order.
    pub const ALL: [Category; 11] = [
        Category::User,
        Category::Progress,
        Category::Module,
        Category::Assessment,
        Category::Dashboard,
        Category::LearningPath,
        Category::StudentProgress,
        Category::ParentDashboard,
        Category::TeacherDashboard,
        Category::AdminDashboard,
        Category::Global,
    ];

    /// Returns the wire name of the category.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Category::User => "user",
            Category::Progress => "progress",
            Category::Module => "module",
            Category::Assessment => "assessment",
            Category::Dashboard => "dashboard",
            Category::LearningPath => "learning-path",
            Category::StudentProgress => "student-progress",
            Category::ParentDashboard => "parent-dashboard",
            Category::TeacherDashboard => "teacher-dashboard",
            Category::AdminDashboard => "admin-dashboard",
            Category::Global => "global",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| SyncError::UnknownCategory(s.to_string()))
    }
}

/// Identifier of the entity (usually a user or student) owning a value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Creates an entity id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// The second half of a cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Owned by one entity.
    Entity(EntityId),
    /// Category-wide value with no owning entity.
    Global,
}

/// Rendered name of [`Scope::Global`].
pub const GLOBAL_SCOPE: &str = "global";

impl Scope {
    /// Scope for an optional entity id; `None` is global.
    ///
    /// An entity id spelled `global` renders the same as the global scope,
    /// so it maps to [`Scope::Global`] and shares its cache entry.
    pub fn from_entity(entity_id: Option<&EntityId>) -> Self {
        match entity_id {
            Some(id) if id.as_str() != GLOBAL_SCOPE => Scope::Entity(id.clone()),
            _ => Scope::Global,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Entity(id) => f.write_str(id.as_str()),
            Scope::Global => f.write_str(GLOBAL_SCOPE),
        }
    }
}

/// Composite key `<category>:<scope>` for cache entries and debounce timers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Category of the cached value.
    pub category: Category,
    /// Owner of the cached value.
    pub scope: Scope,
}

impl CacheKey {
    /// Creates a key from its parts.
    pub fn new(category: Category, scope: Scope) -> Self {
        Self { category, scope }
    }

    /// Key for a category and an optional entity id.
    pub fn for_entity(category: Category, entity_id: Option<&EntityId>) -> Self {
        Self::new(category, Scope::from_entity(entity_id))
    }

    /// Key for a well-known aggregate of a category, such as
    /// `module:recommended`.
    ///
    /// Aggregates are stored like any entity, so this is the key
    /// `update_data(category, .., Some(name))` writes.
    pub fn named(category: Category, name: &str) -> Self {
        Self::for_entity(category, Some(&EntityId::from(name)))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.category, self.scope)
    }
}
