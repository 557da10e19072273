//! Application-wide synchronization context.

use crate::binding::{Binding, Fetcher};
use crate::error::BindingResult;
use crate::multi::MultiBinding;
use crate::optimistic::OptimisticBinding;
use crate::realtime::RealtimeBinding;
use edusync_core::{Category, EntityId, SyncConfig, SyncError, Synchronizer};
use std::fmt;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;

/// Whether the application can currently reach its backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connectivity {
    /// The backend is reachable.
    #[default]
    Online,
    /// The backend is unreachable.
    Offline,
}

impl Connectivity {
    /// Returns true when online.
    pub fn is_online(self) -> bool {
        self == Connectivity::Online
    }
}

impl fmt::Display for Connectivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Connectivity::Online => f.write_str("online"),
            Connectivity::Offline => f.write_str("offline"),
        }
    }
}

/// Owns the synchronizer for an application and hands out bindings.
///
/// Connectivity is tracked here so UI code can observe it, but it does not
/// pause or queue anything.
pub struct SyncProvider {
    sync: Synchronizer,
    connectivity: watch::Sender<Connectivity>,
}

impl SyncProvider {
    /// Creates a provider with a new synchronizer on the current runtime.
    pub fn new(config: SyncConfig) -> BindingResult<Self> {
        Ok(Self::with_synchronizer(Synchronizer::new(config)?))
    }

    /// Creates a provider around an existing synchronizer.
    pub fn with_synchronizer(sync: Synchronizer) -> Self {
        let (connectivity, _rx) = watch::channel(Connectivity::Online);
        Self { sync, connectivity }
    }

    /// The synchronizer handle.
    pub fn synchronizer(&self) -> &Synchronizer {
        &self.sync
    }

    /// Binds to a key.
    pub fn bind(&self, category: Category, entity_id: Option<EntityId>) -> Binding {
        Binding::new(&self.sync, category, entity_id)
    }

    /// Binds to a key with optimistic writes.
    pub fn bind_optimistic(&self, category: Category, entity_id: Option<EntityId>) -> OptimisticBinding {
        OptimisticBinding::new(&self.sync, category, entity_id)
    }

    /// Binds to a key that refetches itself on refresh requests and, when
    /// `poll_interval` is set, periodically.
    pub fn bind_realtime(
        &self,
        category: Category,
        entity_id: Option<EntityId>,
        fetcher: Fetcher,
        poll_interval: Option<Duration>,
    ) -> BindingResult<RealtimeBinding> {
        if self.sync.is_shut_down() {
            return Err(SyncError::ShutDown.into());
        }
        RealtimeBinding::new(&self.sync, category, entity_id, fetcher, poll_interval)
    }

    /// Binds several named sources for one entity.
    pub fn bind_many<I, S>(&self, entity_id: Option<EntityId>, sources: I) -> MultiBinding
    where
        I: IntoIterator<Item = (S, Category)>,
        S: Into<String>,
    {
        MultiBinding::new(&self.sync, entity_id, sources)
    }

    /// Records a connectivity change.
    pub fn set_online(&self, online: bool) {
        let next = if online {
            Connectivity::Online
        } else {
            Connectivity::Offline
        };
        let changed = self.connectivity.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
        if changed {
            info!(connectivity = %next, "connectivity changed");
        }
    }

    /// Current connectivity.
    pub fn connectivity(&self) -> Connectivity {
        *self.connectivity.borrow()
    }

    /// A receiver that observes connectivity changes.
    pub fn watch_connectivity(&self) -> watch::Receiver<Connectivity> {
        self.connectivity.subscribe()
    }

    /// Processes everything already queued, then shuts the synchronizer down.
    pub async fn shutdown(&self) {
        self.sync.flush().await;
        self.sync.shutdown();
        info!("sync provider shut down");
    }
}

impl fmt::Debug for SyncProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncProvider")
            .field("sync", &self.sync)
            .field("connectivity", &self.connectivity())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::fetcher;
    use crate::error::BindingError;
    use edusync_core::Payload;

    #[tokio::test]
    async fn bindings_share_one_synchronizer() {
        let provider = SyncProvider::new(SyncConfig::default()).unwrap();
        let id = EntityId::from("s1");
        let a = provider.bind(Category::Progress, Some(id.clone()));
        let b = provider.bind_optimistic(Category::Progress, Some(id.clone()));

        provider.synchronizer().update_data(
            Category::Progress,
            Payload::new().with("pct", 80),
            Some(id),
            "test",
        );
        assert_eq!(a.data(), b.data());
        assert!(a.data().is_some());
    }

    #[test]
    fn new_outside_runtime_fails() {
        let err = SyncProvider::new(SyncConfig::default()).unwrap_err();
        assert_eq!(err, BindingError::Sync(SyncError::NoRuntime));
    }

    #[tokio::test]
    async fn connectivity_transitions() {
        let provider = SyncProvider::new(SyncConfig::default()).unwrap();
        let mut rx = provider.watch_connectivity();
        assert!(provider.connectivity().is_online());

        provider.set_online(true);
        assert!(!rx.has_changed().unwrap());

        provider.set_online(false);
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), Connectivity::Offline);
        assert_eq!(provider.connectivity().to_string(), "offline");
    }

    #[tokio::test]
    async fn shutdown_drains_then_closes() {
        let provider = SyncProvider::new(SyncConfig::default()).unwrap();
        let sync = provider.synchronizer().clone();
        sync.update_data(Category::User, Payload::new(), None, "test");

        provider.shutdown().await;
        assert!(sync.is_shut_down());
        assert_eq!(sync.get_stats().queue_length, 0);
        assert_eq!(sync.metrics().events_processed(), 1);

        let err = provider
            .bind_realtime(
                Category::User,
                None,
                fetcher(|| async { Ok(Payload::new()) }),
                None,
            )
            .unwrap_err();
        assert_eq!(err, BindingError::Sync(SyncError::ShutDown));
    }
}
