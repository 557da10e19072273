//! Observable binding state.

use edusync_core::Payload;
use tokio::time::Instant;

/// What a UI component renders from a binding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindingState {
    /// Visible value: the tentative value while an optimistic commit is in
    /// flight, otherwise the latest committed value.
    pub data: Option<Payload>,
    /// A fetch is in progress.
    pub loading: bool,
    /// Text of the last fetch or commit failure, cleared by the next success.
    pub error: Option<String>,
    /// When `data` last changed.
    pub last_updated: Option<Instant>,
}

impl BindingState {
    /// Returns true if there is something to render.
    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }
}
