//! Typed publish/subscribe event bus.
//!
//! Handlers are registered per [`Channel`] and invoked synchronously, in
//! subscription order, by [`EventBus::emit`]. The handler list is
//! snapshotted before dispatch so handlers may subscribe or unsubscribe
//! while being called. A panicking handler is logged and skipped; the
//! remaining handlers still run.

use crate::event::SyncEvent;
use crate::key::{Category, EntityId};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::error;

/// A subscription target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Updates of one category, optionally narrowed to one entity.
    ///
    /// An update for entity `E` is emitted on `Entity { category, entity: Some(E) }`;
    /// a category-wide update on `Entity { category, entity: None }`.
    Entity {
        /// Category of the updates.
        category: Category,
        /// Owning entity, if any.
        entity: Option<EntityId>,
    },
    /// Trailing-edge "things have settled" signals of a category.
    Settled(Category),
    /// Refresh requests of a category.
    Refresh(Category),
    /// Every event processed by the update queue.
    Global,
}

impl Channel {
    /// Channel for a category and an optional entity.
    pub fn entity(category: Category, entity: Option<&EntityId>) -> Self {
        Channel::Entity {
            category,
            entity: entity.cloned(),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Entity {
                category,
                entity: Some(id),
            } => write!(f, "{category}:{id}"),
            Channel::Entity {
                category,
                entity: None,
            } => write!(f, "{category}"),
            Channel::Settled(category) => write!(f, "{category}:debounced"),
            Channel::Refresh(category) => write!(f, "{category}:refresh"),
            Channel::Global => f.write_str("*"),
        }
    }
}

/// What a handler receives.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// An update, carrying the full event.
    Update(Arc<SyncEvent>),
    /// The debounce window for a key elapsed. Carries no payload.
    Settled {
        /// Category of the settled key.
        category: Category,
        /// Entity of the settled key.
        entity_id: Option<EntityId>,
    },
    /// A cached value was dropped and should be refetched by its owner.
    Refresh {
        /// Category to refetch.
        category: Category,
        /// Entity to refetch.
        entity_id: Option<EntityId>,
    },
}

impl Notification {
    /// Category the notification is about.
    pub fn category(&self) -> Category {
        match self {
            Notification::Update(event) => event.category,
            Notification::Settled { category, .. } | Notification::Refresh { category, .. } => {
                *category
            }
        }
    }

    /// Entity the notification is about.
    pub fn entity_id(&self) -> Option<&EntityId> {
        match self {
            Notification::Update(event) => event.entity_id.as_ref(),
            Notification::Settled { entity_id, .. } | Notification::Refresh { entity_id, .. } => {
                entity_id.as_ref()
            }
        }
    }

    /// The event, for update notifications.
    pub fn as_update(&self) -> Option<&Arc<SyncEvent>> {
        match self {
            Notification::Update(event) => Some(event),
            _ => None,
        }
    }
}

/// A registered callback.
pub type Handler = Arc<dyn Fn(&Notification) + Send + Sync>;

struct BusInner {
    channels: RwLock<HashMap<Channel, Vec<(u64, Handler)>>>,
    next_id: AtomicU64,
    panics: AtomicU64,
}

impl BusInner {
    fn remove(&self, channel: &Channel, id: u64) -> bool {
        let mut channels = self.channels.write();
        let Some(handlers) = channels.get_mut(channel) else {
            return false;
        };
        let before = handlers.len();
        handlers.retain(|(handler_id, _)| *handler_id != id);
        let removed = handlers.len() != before;
        if handlers.is_empty() {
            channels.remove(channel);
        }
        removed
    }
}

/// Publish/subscribe dispatcher keyed by [`Channel`].
///
/// Cloning yields another handle to the same bus.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                channels: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                panics: AtomicU64::new(0),
            }),
        }
    }

    /// Registers `handler` on `channel`.
    ///
    /// The handler stays registered until the returned [`Subscription`] is
    /// dropped or explicitly unsubscribed.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe<F>(&self, channel: Channel, handler: F) -> Subscription
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .channels
            .write()
            .entry(channel.clone())
            .or_default()
            .push((id, Arc::new(handler)));

        Subscription {
            bus: Arc::downgrade(&self.inner),
            channel,
            id,
            active: true,
        }
    }

    /// Invokes every handler of `channel` with `notification`.
    ///
    /// Returns the number of handlers that completed without panicking.
    pub fn emit(&self, channel: &Channel, notification: &Notification) -> usize {
        let handlers: Vec<Handler> = match self.inner.channels.read().get(channel) {
            Some(handlers) => handlers.iter().map(|(_, h)| Arc::clone(h)).collect(),
            None => return 0,
        };

        let mut delivered = 0;
        for handler in handlers {
            match catch_unwind(AssertUnwindSafe(|| handler(notification))) {
                Ok(()) => delivered += 1,
                Err(panic) => {
                    self.inner.panics.fetch_add(1, Ordering::Relaxed);
                    error!(
                        channel = %channel,
                        reason = panic_message(panic.as_ref()),
                        "subscriber panicked while handling notification"
                    );
                }
            }
        }
        delivered
    }

    /// Number of handlers registered on `channel`.
    pub fn subscriber_count(&self, channel: &Channel) -> usize {
        self.inner
            .channels
            .read()
            .get(channel)
            .map_or(0, |handlers| handlers.len())
    }

    /// Number of channels with at least one handler.
    pub fn channel_count(&self) -> usize {
        self.inner.channels.read().len()
    }

    /// Total number of handler panics caught so far.
    pub fn handler_panics(&self) -> u64 {
        self.inner.panics.load(Ordering::Relaxed)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("channels", &self.channel_count())
            .field("handler_panics", &self.handler_panics())
            .finish()
    }
}

/// Handle to a registered handler. Unsubscribes on drop.
pub struct Subscription {
    bus: Weak<BusInner>,
    channel: Channel,
    id: u64,
    active: bool,
}

impl Subscription {
    /// The channel this subscription listens on.
    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    /// Removes the handler now.
    pub fn unsubscribe(mut self) {
        self.detach();
    }

    fn detach(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Some(bus) = self.bus.upgrade() {
            bus.remove(&self.channel, self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("channel", &self.channel)
            .field("id", &self.id)
            .finish()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::Payload;
    use parking_lot::Mutex;

    fn update(category: Category, id: &str) -> Notification {
        Notification::Update(Arc::new(SyncEvent::new(
            category,
            Payload::new(),
            Some(EntityId::from(id)),
            "test",
        )))
    }

    #[test]
    fn handlers_run_in_subscription_order() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let channel = Channel::entity(Category::Progress, Some(&EntityId::from("s1")));

        let subs: Vec<_> = (0..3)
            .map(|i| {
                let seen = Arc::clone(&seen);
                bus.subscribe(channel.clone(), move |_| seen.lock().push(i))
            })
            .collect();

        assert_eq!(bus.emit(&channel, &update(Category::Progress, "s1")), 3);
        assert_eq!(*seen.lock(), vec![0, 1, 2]);
        drop(subs);
    }

    #[test]
    fn exact_channel_match_only() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicU64::new(0));
        let h = Arc::clone(&hits);
        let _sub = bus.subscribe(
            Channel::entity(Category::Progress, Some(&EntityId::from("s1"))),
            move |_| {
                h.fetch_add(1, Ordering::SeqCst);
            },
        );

        bus.emit(
            &Channel::entity(Category::Progress, Some(&EntityId::from("s2"))),
            &update(Category::Progress, "s2"),
        );
        bus.emit(
            &Channel::entity(Category::Progress, None),
            &update(Category::Progress, "s1"),
        );
        bus.emit(&Channel::Global, &update(Category::Progress, "s1"));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn drop_unsubscribes() {
        let bus = EventBus::new();
        let sub = bus.subscribe(Channel::Global, |_| {});
        assert_eq!(bus.subscriber_count(&Channel::Global), 1);

        drop(sub);
        assert_eq!(bus.subscriber_count(&Channel::Global), 0);
        assert_eq!(bus.channel_count(), 0);

        let sub = bus.subscribe(Channel::Global, |_| {});
        sub.unsubscribe();
        assert_eq!(bus.subscriber_count(&Channel::Global), 0);
    }

    #[test]
    fn panicking_handler_does_not_stop_others() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicU64::new(0));

        let _bad = bus.subscribe(Channel::Global, |_| panic!("bad subscriber"));
        let h = Arc::clone(&hits);
        let _good = bus.subscribe(Channel::Global, move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });

        let delivered = bus.emit(&Channel::Global, &update(Category::User, "u1"));
        assert_eq!(delivered, 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(bus.handler_panics(), 1);
    }

    #[test]
    fn handler_may_unsubscribe_during_emit() {
        let bus = EventBus::new();
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let s = Arc::clone(&slot);
        let sub = bus.subscribe(Channel::Global, move |_| {
            s.lock().take();
        });
        *slot.lock() = Some(sub);

        assert_eq!(bus.emit(&Channel::Global, &update(Category::User, "u1")), 1);
        assert_eq!(bus.subscriber_count(&Channel::Global), 0);
    }

    #[test]
    fn channel_display() {
        let id = EntityId::from("s1");
        assert_eq!(Channel::entity(Category::Progress, Some(&id)).to_string(), "progress:s1");
        assert_eq!(Channel::entity(Category::Module, None).to_string(), "module");
        assert_eq!(Channel::Settled(Category::User).to_string(), "user:debounced");
        assert_eq!(Channel::Refresh(Category::User).to_string(), "user:refresh");
    }
}
