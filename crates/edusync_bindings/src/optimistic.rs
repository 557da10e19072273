//! Optimistic binding.
//!
//! A tentative value is shown as soon as the caller proposes it. The last
//! committed value is kept aside; if the commit fails, the binding rolls
//! back to it and the caller gets the original error.

use crate::binding::Binding;
use crate::state::BindingState;
use edusync_core::{Category, EntityId, Payload, Synchronizer};
use std::fmt::Display;
use std::future::Future;
use std::ops::Deref;
use tracing::{debug, warn};

/// Source label of updates published after a successful optimistic commit.
pub const COMMIT_SOURCE: &str = "optimistic-commit";

/// A [`Binding`] that supports optimistic writes.
#[derive(Debug)]
pub struct OptimisticBinding {
    binding: Binding,
}

impl OptimisticBinding {
    /// Binds to `category` for `entity_id`.
    pub fn new(sync: &Synchronizer, category: Category, entity_id: Option<EntityId>) -> Self {
        Self {
            binding: Binding::new(sync, category, entity_id),
        }
    }

    /// Wraps an existing binding.
    pub fn from_binding(binding: Binding) -> Self {
        Self { binding }
    }

    /// Shows `tentative` right away, then runs `commit`.
    ///
    /// On `Ok(value)` the committed value is published through the
    /// synchronizer and replaces the tentative one. On `Err(e)` the binding
    /// shows the last committed value again, records the error text, and
    /// returns `e` unchanged. Retrying is up to the caller.
    pub async fn optimistic_update<F, Fut, E>(&self, tentative: Payload, commit: F) -> Result<Payload, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Payload, E>>,
        E: Display,
    {
        let shared = self.binding.shared();
        shared.set_tentative(tentative);
        debug!(category = %self.binding.category(), "optimistic value shown");

        match commit().await {
            Ok(committed) => {
                self.binding.synchronizer().update_data(
                    self.binding.category(),
                    committed.clone(),
                    self.binding.entity_id().cloned(),
                    COMMIT_SOURCE,
                );
                shared.clear_tentative(None);
                Ok(committed)
            }
            Err(e) => {
                warn!(
                    category = %self.binding.category(),
                    error = %e,
                    "optimistic commit failed, rolling back"
                );
                shared.clear_tentative(Some(e.to_string()));
                Err(e)
            }
        }
    }

    /// The last value confirmed by the synchronizer, ignoring any tentative
    /// value on display.
    pub fn committed(&self) -> Option<Payload> {
        self.binding.shared().committed()
    }

    /// Snapshot of the visible state.
    pub fn state(&self) -> BindingState {
        self.binding.state()
    }

    /// Unwraps the inner binding.
    pub fn into_inner(self) -> Binding {
        self.binding
    }
}

impl Deref for OptimisticBinding {
    type Target = Binding;

    fn deref(&self) -> &Self::Target {
        &self.binding
    }
}
