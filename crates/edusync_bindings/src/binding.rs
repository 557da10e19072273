//! Plain subscription binding.

use crate::error::{BindingError, BindingResult};
use crate::state::BindingState;
use edusync_core::{Category, EntityId, Notification, Payload, Subscription, Synchronizer};
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Source label of updates published after a successful fetch.
pub const FETCH_SOURCE: &str = "binding-fetch";

/// Future returned by a [`Fetcher`].
pub type FetchFuture = Pin<Box<dyn Future<Output = BindingResult<Payload>> + Send>>;

/// Loads the authoritative value of a key, typically over HTTP.
pub type Fetcher = Arc<dyn Fn() -> FetchFuture + Send + Sync>;

/// Wraps an async closure as a [`Fetcher`].
pub fn fetcher<F, Fut>(f: F) -> Fetcher
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = BindingResult<Payload>> + Send + 'static,
{
    Arc::new(move || Box::pin(f()))
}

#[derive(Default)]
struct Slots {
    committed: Option<Payload>,
    tentative: Option<Payload>,
}

impl Slots {
    fn visible(&self) -> Option<Payload> {
        self.tentative.clone().or_else(|| self.committed.clone())
    }
}

/// State shared between a binding and its bus handler.
pub(crate) struct Shared {
    slots: Mutex<Slots>,
    tx: watch::Sender<BindingState>,
}

impl Shared {
    fn new(initial: Option<Payload>) -> Arc<Self> {
        let state = BindingState {
            last_updated: initial.as_ref().map(|_| Instant::now()),
            data: initial.clone(),
            ..BindingState::default()
        };
        let (tx, _rx) = watch::channel(state);
        Arc::new(Self {
            slots: Mutex::new(Slots {
                committed: initial,
                tentative: None,
            }),
            tx,
        })
    }

    /// Records a committed value from the synchronizer.
    pub(crate) fn commit(&self, payload: Payload) {
        let mut slots = self.slots.lock();
        slots.committed = Some(payload);
        let visible = slots.visible();
        self.tx.send_modify(|state| {
            state.data = visible;
            state.error = None;
            state.last_updated = Some(Instant::now());
        });
    }

    /// Shows `payload` until the tentative slot is cleared.
    pub(crate) fn set_tentative(&self, payload: Payload) {
        let mut slots = self.slots.lock();
        slots.tentative = Some(payload);
        let visible = slots.visible();
        self.tx.send_modify(|state| {
            state.data = visible;
            state.last_updated = Some(Instant::now());
        });
    }

    /// Drops the tentative value, showing the committed one again.
    ///
    /// `error` replaces the error slot.
    pub(crate) fn clear_tentative(&self, error: Option<String>) {
        let mut slots = self.slots.lock();
        slots.tentative = None;
        let visible = slots.visible();
        self.tx.send_modify(|state| {
            if state.data != visible {
                state.last_updated = Some(Instant::now());
            }
            state.data = visible;
            state.error = error;
        });
    }

    pub(crate) fn committed(&self) -> Option<Payload> {
        self.slots.lock().committed.clone()
    }

    fn set_loading(&self, loading: bool) {
        self.tx.send_modify(|state| state.loading = loading);
    }

    fn fail(&self, error: &BindingError) {
        self.tx.send_modify(|state| {
            state.loading = false;
            state.error = Some(error.to_string());
        });
    }
}

/// Live view of one (category, entity) key.
///
/// Starts from the cached value, then follows every update published on
/// the key's channel. Dropping the binding unsubscribes.
pub struct Binding {
    sync: Synchronizer,
    category: Category,
    entity_id: Option<EntityId>,
    shared: Arc<Shared>,
    fetcher: Option<Fetcher>,
    _subscription: Subscription,
}

impl Binding {
    /// Binds to `category` for `entity_id` (or category-wide when `None`).
    pub fn new(sync: &Synchronizer, category: Category, entity_id: Option<EntityId>) -> Self {
        let shared = Shared::new(sync.get_cached_data(category, entity_id.as_ref()));

        let handler_state = Arc::clone(&shared);
        let subscription = sync.subscribe(category, entity_id.as_ref(), move |notification| {
            if let Notification::Update(event) = notification {
                handler_state.commit(event.payload.clone());
            }
        });

        Self {
            sync: sync.clone(),
            category,
            entity_id,
            shared,
            fetcher: None,
            _subscription: subscription,
        }
    }

    /// Attaches a fetcher used by [`load`](Self::load),
    /// [`fetch`](Self::fetch) and [`refresh`](Self::refresh).
    #[must_use]
    pub fn with_fetcher(mut self, fetcher: Fetcher) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Category of the bound key.
    pub fn category(&self) -> Category {
        self.category
    }

    /// Entity of the bound key.
    pub fn entity_id(&self) -> Option<&EntityId> {
        self.entity_id.as_ref()
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> BindingState {
        self.shared.tx.borrow().clone()
    }

    /// The visible value.
    pub fn data(&self) -> Option<Payload> {
        self.shared.tx.borrow().data.clone()
    }

    /// Whether a fetch is in progress.
    pub fn is_loading(&self) -> bool {
        self.shared.tx.borrow().loading
    }

    /// Text of the last failure, if not yet cleared.
    pub fn error(&self) -> Option<String> {
        self.shared.tx.borrow().error.clone()
    }

    /// A receiver that observes every state change.
    pub fn watch(&self) -> watch::Receiver<BindingState> {
        self.shared.tx.subscribe()
    }

    /// Waits for the next state change and returns the new state.
    pub async fn changed(&self) -> BindingState {
        let mut rx = self.shared.tx.subscribe();
        // The sender lives in `self`, so this only returns on a change.
        let _ = rx.changed().await;
        let state = rx.borrow_and_update().clone();
        state
    }

    /// Loads the value if nothing is cached yet.
    ///
    /// Returns the visible value. Without a fetcher, a miss is `Ok(None)`.
    pub async fn load(&self) -> BindingResult<Option<Payload>> {
        if let Some(data) = self.data() {
            return Ok(Some(data));
        }
        if let Some(cached) = self.sync.get_cached_data(self.category, self.entity_id.as_ref()) {
            self.shared.commit(cached.clone());
            return Ok(Some(cached));
        }
        if self.fetcher.is_none() {
            return Ok(None);
        }
        self.fetch().await.map(Some)
    }

    /// Fetches the authoritative value and publishes it.
    ///
    /// The result goes through [`Synchronizer::update_data`], so every other
    /// binding on the key and the invalidation rules see it too. A failure
    /// is stored in the error slot and returned.
    pub async fn fetch(&self) -> BindingResult<Payload> {
        let fetcher = self
            .fetcher
            .as_ref()
            .ok_or(BindingError::NoFetcher(self.category))?;

        self.shared.set_loading(true);
        debug!(category = %self.category, entity = ?self.entity_id, "fetching");
        match fetcher().await {
            Ok(payload) => {
                self.sync.update_data(
                    self.category,
                    payload.clone(),
                    self.entity_id.clone(),
                    FETCH_SOURCE,
                );
                self.shared.set_loading(false);
                Ok(payload)
            }
            Err(e) => {
                warn!(category = %self.category, entity = ?self.entity_id, error = %e, "fetch failed");
                self.shared.fail(&e);
                Err(e)
            }
        }
    }

    /// Drops the cached value, signals a refresh, and refetches if a
    /// fetcher is attached.
    pub async fn refresh(&self) -> BindingResult<Option<Payload>> {
        self.sync
            .refresh_data(self.category, self.entity_id.clone())
            .await;
        if self.fetcher.is_none() {
            return Ok(None);
        }
        self.fetch().await.map(Some)
    }

    pub(crate) fn shared(&self) -> &Arc<Shared> {
        &self.shared
    }

    pub(crate) fn synchronizer(&self) -> &Synchronizer {
        &self.sync
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("category", &self.category)
            .field("entity_id", &self.entity_id)
            .field("state", &self.state())
            .field("has_fetcher", &self.fetcher.is_some())
            .finish()
    }
}
