//! # EduSync Bindings
//!
//! Reactive read layer over [`edusync_core::Synchronizer`].
//!
//! This crate provides:
//! - [`Binding`]: the latest value of one (category, entity) key, pushed
//!   through a `watch` channel, with optional fetch-on-miss
//! - [`RealtimeBinding`]: a binding that refetches on refresh requests and
//!   on a polling interval
//! - [`OptimisticBinding`]: shows a tentative value while a commit is in
//!   flight and rolls back if the commit fails
//! - [`MultiBinding`]: several named bindings for one entity
//! - [`SyncProvider`]: the application context that owns the synchronizer
//!   and tracks connectivity
//!
//! Every binding unsubscribes from the synchronizer when dropped.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod binding;
mod error;
mod multi;
mod optimistic;
mod provider;
mod realtime;
mod state;

pub use binding::{fetcher, Binding, FetchFuture, Fetcher, FETCH_SOURCE};
pub use error::{BindingError, BindingResult};
pub use multi::MultiBinding;
pub use optimistic::{OptimisticBinding, COMMIT_SOURCE};
pub use provider::{Connectivity, SyncProvider};
pub use realtime::RealtimeBinding;
pub use state::BindingState;
