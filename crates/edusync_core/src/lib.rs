//! # EduSync Core
//!
//! Client-side data synchronization for the EduSync dashboards.
//!
//! This crate provides:
//! - A TTL cache keyed by (category, entity)
//! - A typed publish/subscribe event bus
//! - The [`Synchronizer`]: ordered update queue, trailing-edge debounce and
//!   cascading cache invalidation across related data categories
//! - Counters and snapshots for diagnostics
//!
//! ## Data flow
//!
//! A producer calls [`Synchronizer::update_data`]. The update is emitted
//! immediately on its category channel, written to the cache, debounced
//! per key, and appended to the pending queue. A single drain task then
//! processes queued events in arrival order: it re-applies the cache write,
//! emits on the global channel and applies the invalidation rules of the
//! event's category.
//!
//! ## Key Invariants
//!
//! - Expiry is lazy: an expired entry is evicted by the read that finds it
//! - Queued events are processed strictly FIFO, one at a time
//! - At most one drain task runs at any moment
//! - A category subscriber sees an update before a global subscriber does
//! - Failures while draining are logged and never reach the producer

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod bus;
mod cache;
mod config;
mod error;
mod event;
mod key;
mod payload;
mod rules;
mod stats;
mod synchronizer;

pub use bus::{Channel, EventBus, Handler, Notification, Subscription};
pub use cache::{Cache, CacheEntry};
pub use config::SyncConfig;
pub use error::{SyncError, SyncResult};
pub use event::SyncEvent;
pub use key::{CacheKey, Category, EntityId, Scope, GLOBAL_SCOPE};
pub use payload::{Payload, Role};
pub use rules::{invalidations_for, rule_for, Derive, Emit, Invalidation, Rule};
pub use stats::{SyncMetrics, SyncStats};
pub use synchronizer::Synchronizer;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
