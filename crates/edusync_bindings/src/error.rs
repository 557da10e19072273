//! Error types for bindings.

use edusync_core::{Category, SyncError};
use thiserror::Error;

/// Result type for binding operations.
pub type BindingResult<T> = Result<T, BindingError>;

/// Errors surfaced by bindings.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BindingError {
    /// Error from the synchronizer.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// A caller-supplied fetcher failed.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// A fetch was requested but the binding has no fetcher.
    #[error("no fetcher configured for {0}")]
    NoFetcher(Category),
}

impl BindingError {
    /// Creates a fetch error from any displayable cause.
    pub fn fetch(cause: impl std::fmt::Display) -> Self {
        Self::Fetch(cause.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        assert_eq!(
            BindingError::fetch("HTTP 503").to_string(),
            "fetch failed: HTTP 503"
        );
        assert_eq!(
            BindingError::NoFetcher(Category::Dashboard).to_string(),
            "no fetcher configured for dashboard"
        );
        assert_eq!(
            BindingError::from(SyncError::NoRuntime).to_string(),
            SyncError::NoRuntime.to_string()
        );
    }
}
