//! Error types for the synchronization layer.

use crate::key::Category;
use thiserror::Error;

/// Result type for synchronization operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in the synchronization layer.
///
/// Cache misses are not errors; they are `None`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    /// The synchronizer was created outside a tokio runtime.
    #[error("no tokio runtime available to drive the update queue")]
    NoRuntime,

    /// A string did not name a known category.
    #[error("unknown category: {0}")]
    UnknownCategory(String),

    /// A payload was not a JSON object.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// A field required by an invalidation rule was absent.
    #[error("{category} update is missing required field `{field}`")]
    MissingField {
        /// Category of the offending update.
        category: Category,
        /// Name of the missing payload field.
        field: &'static str,
    },

    /// An invalidation rule required an entity id and none was given.
    #[error("{0} update requires an entity id")]
    MissingEntity(Category),

    /// The synchronizer has been shut down.
    #[error("synchronizer is shut down")]
    ShutDown,
}

impl SyncError {
    /// Creates a missing-field error.
    pub fn missing_field(category: Category, field: &'static str) -> Self {
        Self::MissingField { category, field }
    }

    /// Returns true if the error is caused by the shape of an update rather
    /// than by the state of the synchronizer.
    pub fn is_payload_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidPayload(_)
                | SyncError::MissingField { .. }
                | SyncError::MissingEntity(_)
        )
    }
}
