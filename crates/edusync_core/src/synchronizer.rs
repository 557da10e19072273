//! The synchronizer: update queue, debounce and invalidation cascade.
//!
//! [`Synchronizer::update_data`] returns to the caller right away. Before
//! it returns, the update has been emitted on its category channel, written
//! to the cache, given a fresh debounce timer and appended to the pending
//! queue. A single drain task works through the queue in arrival order,
//! emitting each event on the global channel and applying the invalidation
//! rules of its category.
//!
//! The cache, the queue and the debounce table are each behind their own
//! lock, and no lock is held while handlers run, so handlers may call back
//! into the synchronizer.

use crate::bus::{Channel, EventBus, Notification, Subscription};
use crate::cache::Cache;
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::event::SyncEvent;
use crate::key::{CacheKey, Category, EntityId};
use crate::payload::{Payload, Role, MODULE_ID_FIELD, STUDENT_ID_FIELD};
use crate::rules::{rule_for, Emit};
use crate::stats::{SyncMetrics, SyncStats};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Source label of parent-dashboard updates derived from student progress.
pub const PROGRESS_CASCADE_SOURCE: &str = "progress-cascade";

#[derive(Default)]
struct QueueState {
    pending: VecDeque<Arc<SyncEvent>>,
    is_processing: bool,
}

struct Timer {
    generation: u64,
    handle: JoinHandle<()>,
}

struct Inner {
    config: SyncConfig,
    cache: Cache,
    bus: EventBus,
    queue: Mutex<QueueState>,
    timers: Mutex<HashMap<CacheKey, Timer>>,
    next_generation: AtomicU64,
    idle: Notify,
    metrics: SyncMetrics,
    runtime: Handle,
    closed: AtomicBool,
}

/// Orchestrates cache writes, the update queue, debouncing and
/// cross-category invalidation.
///
/// Cloning yields another handle to the same synchronizer.
///
/// # Example
///
/// ```rust,ignore
/// use edusync_core::{Category, EntityId, Payload, SyncConfig, Synchronizer};
///
/// let sync = Synchronizer::new(SyncConfig::default())?;
/// let student = EntityId::from("student-42");
///
/// let _global = sync.subscribe_to_global(|n| println!("processed {:?}", n.category()));
/// sync.update_data(
///     Category::Progress,
///     Payload::new().with("completed", true).with("role", "student"),
///     Some(student.clone()),
///     "lesson-player",
/// );
/// sync.flush().await;
///
/// assert!(sync.get_cached_data(Category::Dashboard, Some(&student)).is_none());
/// ```
#[derive(Clone)]
pub struct Synchronizer {
    inner: Arc<Inner>,
}

impl Synchronizer {
    /// Creates a synchronizer driven by the current tokio runtime.
    ///
    /// Fails with [`SyncError::NoRuntime`] when called outside a runtime.
    pub fn new(config: SyncConfig) -> SyncResult<Self> {
        let runtime = Handle::try_current().map_err(|_| SyncError::NoRuntime)?;
        Ok(Self::with_handle(config, runtime))
    }

    /// Creates a synchronizer whose queue and timers run on `runtime`.
    pub fn with_handle(config: SyncConfig, runtime: Handle) -> Self {
        let cache = Cache::with_default_ttl(config.default_ttl);
        Self {
            inner: Arc::new(Inner {
                config,
                cache,
                bus: EventBus::new(),
                queue: Mutex::new(QueueState::default()),
                timers: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(0),
                idle: Notify::new(),
                metrics: SyncMetrics::new(),
                runtime,
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Publishes an update.
    ///
    /// Returns once the update has been emitted on its category channel,
    /// cached and queued. Global emission and invalidation happen later on
    /// the drain task. Updates published after [`shutdown`](Self::shutdown)
    /// are logged and dropped.
    pub fn update_data(
        &self,
        category: Category,
        payload: Payload,
        entity_id: Option<EntityId>,
        source: &str,
    ) {
        self.inner.update_data(category, payload, entity_id, source);
    }

    /// Returns the cached value of a key, if present and not expired.
    pub fn get_cached_data(&self, category: Category, entity_id: Option<&EntityId>) -> Option<Payload> {
        let value = self
            .inner
            .cache
            .get(&CacheKey::for_entity(category, entity_id));
        self.inner.metrics.record_read(value.is_some());
        value
    }

    /// Drops the cached value of a key. Returns true if one existed.
    pub fn clear_cache(&self, category: Category, entity_id: Option<&EntityId>) -> bool {
        self.inner
            .cache
            .delete(&CacheKey::for_entity(category, entity_id))
    }

    /// Drops every cached value.
    pub fn clear_all(&self) {
        self.inner.cache.clear();
    }

    /// Drops the cached value of a key and asks its owner to refetch.
    ///
    /// Emits [`Notification::Refresh`] on [`Channel::Refresh`]. Fetching is
    /// left to whoever listens for the signal.
    pub async fn refresh_data(&self, category: Category, entity_id: Option<EntityId>) {
        let key = CacheKey::for_entity(category, entity_id.as_ref());
        self.inner.cache.delete(&key);
        debug!(key = %key, "refresh requested");
        self.inner.bus.emit(
            &Channel::Refresh(category),
            &Notification::Refresh {
                category,
                entity_id,
            },
        );
    }

    /// Subscribes to updates of a category, narrowed to one entity when
    /// `entity_id` is given.
    ///
    /// Handlers here see an update as soon as it is published, before it
    /// reaches the global channel.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe<F>(&self, category: Category, entity_id: Option<&EntityId>, handler: F) -> Subscription
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        self.inner
            .bus
            .subscribe(Channel::entity(category, entity_id), handler)
    }

    /// Subscribes to every event processed by the update queue.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe_to_global<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        self.inner.bus.subscribe(Channel::Global, handler)
    }

    /// Subscribes to the debounced settled signals of a category.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe_settled<F>(&self, category: Category, handler: F) -> Subscription
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        self.inner.bus.subscribe(Channel::Settled(category), handler)
    }

    /// Subscribes to refresh requests of a category.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe_refresh<F>(&self, category: Category, handler: F) -> Subscription
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        self.inner.bus.subscribe(Channel::Refresh(category), handler)
    }

    /// Point-in-time queue and cache statistics.
    pub fn get_stats(&self) -> SyncStats {
        let (queue_length, is_processing) = {
            let queue = self.inner.queue.lock();
            (queue.pending.len(), queue.is_processing)
        };
        SyncStats {
            cache_size: self.inner.cache.len(),
            pending_updates: self.inner.timers.lock().len(),
            queue_length,
            is_processing,
        }
    }

    /// Activity counters.
    pub fn metrics(&self) -> &SyncMetrics {
        &self.inner.metrics
    }

    /// The configuration in use.
    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    /// The underlying cache.
    pub fn cache(&self) -> &Cache {
        &self.inner.cache
    }

    /// The underlying event bus.
    pub fn bus(&self) -> &EventBus {
        &self.inner.bus
    }

    /// Waits until the queue is empty and no drain task is running.
    pub async fn flush(&self) {
        loop {
            let notified = self.inner.idle.notified();
            if self.inner.is_idle() {
                return;
            }
            notified.await;
        }
    }

    /// Stops accepting updates and cancels pending debounce timers.
    ///
    /// Events already queued are still processed; call
    /// [`flush`](Self::flush) to wait for them.
    pub fn shutdown(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let timers: Vec<Timer> = self.inner.timers.lock().drain().map(|(_, t)| t).collect();
        for timer in &timers {
            timer.handle.abort();
        }
        debug!(cancelled_timers = timers.len(), "synchronizer shut down");
    }

    /// Returns true after [`shutdown`](Self::shutdown).
    pub fn is_shut_down(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for Synchronizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Synchronizer")
            .field("stats", &self.get_stats())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

impl Inner {
    fn update_data(
        self: &Arc<Self>,
        category: Category,
        payload: Payload,
        entity_id: Option<EntityId>,
        source: &str,
    ) {
        if self.closed.load(Ordering::SeqCst) {
            self.metrics.record_rejected();
            warn!(%category, source, "update dropped, synchronizer is shut down");
            return;
        }

        let event = Arc::new(SyncEvent::new(category, payload, entity_id, source));
        let key = event.key();
        self.metrics.record_update();
        debug!(event_id = %event.id, key = %key, source, "update received");

        // Category subscribers must see the update before the drain task can
        // put it on the global channel, so emit before enqueueing.
        self.bus.emit(
            &Channel::entity(category, event.entity_id.as_ref()),
            &Notification::Update(Arc::clone(&event)),
        );
        self.cache.set(key.clone(), event.payload.clone());
        self.schedule_settled(key, category, event.entity_id.clone());
        self.enqueue(event);
    }

    fn enqueue(self: &Arc<Self>, event: Arc<SyncEvent>) {
        let start_drain = {
            let mut queue = self.queue.lock();
            queue.pending.push_back(event);

            let threshold = self.config.queue_warn_threshold;
            if threshold > 0 && queue.pending.len() == threshold + 1 {
                warn!(queue_length = queue.pending.len(), "update queue backlog");
            }

            if queue.is_processing {
                false
            } else {
                queue.is_processing = true;
                true
            }
        };

        if start_drain {
            self.metrics.record_drain_run();
            let inner = Arc::clone(self);
            self.runtime.spawn(async move { inner.drain().await });
        }
    }

    async fn drain(self: Arc<Self>) {
        loop {
            let next = {
                let mut queue = self.queue.lock();
                match queue.pending.pop_front() {
                    Some(event) => event,
                    None => {
                        queue.is_processing = false;
                        break;
                    }
                }
            };

            match self.process(&next) {
                Ok(()) => self.metrics.record_processed(),
                Err(e) => {
                    self.metrics.record_failure();
                    error!(
                        event_id = %next.id,
                        category = %next.category,
                        error = %e,
                        "failed to process queued update"
                    );
                }
            }

            tokio::task::yield_now().await;
        }
        self.idle.notify_waiters();
    }

    fn process(self: &Arc<Self>, event: &Arc<SyncEvent>) -> SyncResult<()> {
        let own_key = event.key();
        self.cache.set(own_key.clone(), event.payload.clone());
        self.bus
            .emit(&Channel::Global, &Notification::Update(Arc::clone(event)));

        let rule = rule_for(event.category);
        for invalidation in rule.invalidates {
            let key = invalidation.key(event.entity_id.as_ref());
            // An update never stales the entry it just wrote.
            if key == own_key {
                continue;
            }
            let existed = self.cache.delete(&key);
            self.metrics.record_invalidation();
            debug!(key = %key, existed, trigger = %event.category, "cache entry invalidated");
        }

        match rule.emit {
            Emit::Nothing => {}
            Emit::Entity => {
                self.bus.emit(
                    &Channel::entity(event.category, event.entity_id.as_ref()),
                    &Notification::Update(Arc::clone(event)),
                );
            }
            Emit::Module => {
                let module_id = event
                    .payload
                    .module_id()
                    .ok_or_else(|| SyncError::missing_field(event.category, MODULE_ID_FIELD))?;
                self.bus.emit(
                    &Channel::entity(Category::Module, Some(&EntityId::from(module_id))),
                    &Notification::Update(Arc::clone(event)),
                );
            }
        }

        if rule.parent_cascade && event.payload.role() == Some(Role::Student) {
            let student = event
                .entity_id
                .as_ref()
                .ok_or(SyncError::MissingEntity(event.category))?;
            let payload = event
                .payload
                .clone()
                .with(STUDENT_ID_FIELD, student.as_str());
            self.update_data(
                Category::ParentDashboard,
                payload,
                Some(student.clone()),
                PROGRESS_CASCADE_SOURCE,
            );
        }

        Ok(())
    }

    fn schedule_settled(self: &Arc<Self>, key: CacheKey, category: Category, entity_id: Option<EntityId>) {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let window = self.config.debounce_window;
        let weak: Weak<Self> = Arc::downgrade(self);
        let timer_key = key.clone();

        // Hold the table lock across spawn so the timer cannot fire before
        // it is registered.
        let mut timers = self.timers.lock();
        let handle = self.runtime.spawn(async move {
            tokio::time::sleep(window).await;
            if let Some(inner) = weak.upgrade() {
                inner.fire_settled(&timer_key, generation, category, entity_id);
            }
        });
        if let Some(previous) = timers.insert(key, Timer { generation, handle }) {
            previous.handle.abort();
        }
    }

    fn fire_settled(&self, key: &CacheKey, generation: u64, category: Category, entity_id: Option<EntityId>) {
        {
            let mut timers = self.timers.lock();
            match timers.get(key) {
                Some(timer) if timer.generation == generation => {
                    timers.remove(key);
                }
                _ => return,
            }
        }

        self.metrics.record_settled();
        debug!(key = %key, "updates settled");
        self.bus.emit(
            &Channel::Settled(category),
            &Notification::Settled {
                category,
                entity_id,
            },
        );
    }

    fn is_idle(&self) -> bool {
        let queue = self.queue.lock();
        queue.pending.is_empty() && !queue.is_processing
    }
}
