//! Self-refreshing binding.
//!
//! [`Synchronizer::refresh_data`] only drops a cache entry and signals; it
//! never fetches. A [`RealtimeBinding`] is the listener that closes the
//! loop: it refetches whenever a refresh is signalled for its key, and
//! optionally on a fixed polling interval.

use crate::binding::{Binding, Fetcher};
use crate::error::BindingResult;
use edusync_core::{Category, EntityId, Notification, Subscription, SyncError, Synchronizer};
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A [`Binding`] kept fresh by a background task.
///
/// Dropping it stops the task and unsubscribes.
#[derive(Debug)]
pub struct RealtimeBinding {
    binding: Arc<Binding>,
    task: JoinHandle<()>,
    _refresh: Subscription,
}

impl RealtimeBinding {
    /// Binds to `category` for `entity_id`, refetching with `fetcher` on
    /// refresh signals and, when `poll_interval` is set, periodically.
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(
        sync: &Synchronizer,
        category: Category,
        entity_id: Option<EntityId>,
        fetcher: Fetcher,
        poll_interval: Option<Duration>,
    ) -> BindingResult<Self> {
        let runtime = Handle::try_current().map_err(|_| SyncError::NoRuntime)?;
        let binding = Arc::new(Binding::new(sync, category, entity_id.clone()).with_fetcher(fetcher));

        let (tx, rx) = mpsc::unbounded_channel();
        let refresh = sync.subscribe_refresh(category, move |notification| {
            if let Notification::Refresh { entity_id: target, .. } = notification {
                if *target == entity_id {
                    // The receiver only goes away when the binding is dropped.
                    let _ = tx.send(());
                }
            }
        });

        let task = runtime.spawn(refetch_loop(Arc::clone(&binding), rx, poll_interval));

        Ok(Self {
            binding,
            task,
            _refresh: refresh,
        })
    }

    /// Drops the cached value and signals a refresh.
    ///
    /// The background task performs the refetch, so this issues exactly one
    /// fetch where [`Binding::refresh`] would add a second.
    pub async fn refresh(&self) {
        self.binding
            .synchronizer()
            .refresh_data(self.binding.category(), self.binding.entity_id().cloned())
            .await;
    }

    /// Stops background refetching. The binding keeps following updates.
    pub fn stop(&self) {
        self.task.abort();
    }
}

async fn refetch_loop(
    binding: Arc<Binding>,
    mut signals: mpsc::UnboundedReceiver<()>,
    poll_interval: Option<Duration>,
) {
    let mut ticker = poll_interval.map(|period| {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker
    });

    loop {
        let reason = match ticker.as_mut() {
            Some(ticker) => tokio::select! {
                signal = signals.recv() => match signal {
                    Some(()) => "refresh",
                    None => break,
                },
                _ = ticker.tick() => "poll",
            },
            None => match signals.recv().await {
                Some(()) => "refresh",
                None => break,
            },
        };

        // Collapse signals that piled up while the previous fetch ran.
        while signals.try_recv().is_ok() {}

        debug!(category = %binding.category(), reason, "realtime refetch");
        if let Err(e) = binding.fetch().await {
            warn!(category = %binding.category(), error = %e, "realtime refetch failed");
        }
    }
}

impl Deref for RealtimeBinding {
    type Target = Binding;

    fn deref(&self) -> &Self::Target {
        &self.binding
    }
}

impl Drop for RealtimeBinding {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::fetcher;
    use edusync_core::{Payload, SyncConfig};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_fetcher() -> (Arc<AtomicUsize>, Fetcher) {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        let f = fetcher(move || {
            let n = c.fetch_add(1, Ordering::SeqCst) + 1;
            async move { Ok(Payload::new().with("fetches", n)) }
        });
        (calls, f)
    }

    #[tokio::test(start_paused = true)]
    async fn refetches_on_refresh_signal() {
        let sync = Synchronizer::new(SyncConfig::default()).unwrap();
        let (calls, f) = counting_fetcher();
        let id = EntityId::from("s1");
        let binding = RealtimeBinding::new(&sync, Category::Dashboard, Some(id.clone()), f, None).unwrap();

        sync.refresh_data(Category::Dashboard, Some(id.clone())).await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(binding.data(), Some(Payload::new().with("fetches", 1)));
        assert_eq!(
            sync.get_cached_data(Category::Dashboard, Some(&id)),
            Some(Payload::new().with("fetches", 1))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_fetches_once() {
        let sync = Synchronizer::new(SyncConfig::default()).unwrap();
        let (calls, f) = counting_fetcher();
        let id = EntityId::from("s1");
        let binding = RealtimeBinding::new(&sync, Category::Dashboard, Some(id.clone()), f, None).unwrap();

        binding.refresh().await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(binding.data(), Some(Payload::new().with("fetches", 1)));

        binding.refresh().await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn ignores_refresh_of_other_entities() {
        let sync = Synchronizer::new(SyncConfig::default()).unwrap();
        let (calls, f) = counting_fetcher();
        let _binding =
            RealtimeBinding::new(&sync, Category::Dashboard, Some(EntityId::from("s1")), f, None).unwrap();

        sync.refresh_data(Category::Dashboard, Some(EntityId::from("s2"))).await;
        sync.refresh_data(Category::Dashboard, None).await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn polls_on_interval() {
        let sync = Synchronizer::new(SyncConfig::default()).unwrap();
        let (calls, f) = counting_fetcher();
        let _binding = RealtimeBinding::new(
            &sync,
            Category::TeacherDashboard,
            None,
            f,
            Some(Duration::from_secs(30)),
        )
        .unwrap();

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(62)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn drop_stops_refetching() {
        let sync = Synchronizer::new(SyncConfig::default()).unwrap();
        let (calls, f) = counting_fetcher();
        let binding = RealtimeBinding::new(&sync, Category::User, None, f, None).unwrap();
        drop(binding);

        sync.refresh_data(Category::User, None).await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(sync.bus().subscriber_count(&edusync_core::Channel::Refresh(Category::User)), 0);
    }
}
