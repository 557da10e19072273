//! # EduSync Testkit
//!
//! Test utilities for EduSync.
//!
//! This crate provides:
//! - Fixtures: a recorder for bus notifications and payload builders for
//!   the common learner records
//! - Property-based test generators using proptest
//! - Stress helpers that hammer a synchronizer from many producers
//!
//! ## Usage
//!
//! ```rust,ignore
//! use edusync_testkit::prelude::*;
//!
//! #[tokio::test]
//! async fn records_global_updates() {
//!     let sync = test_synchronizer();
//!     let recorder = EventRecorder::global(&sync);
//!     sync.update_data(Category::User, student_profile("s1"), None, "test");
//!     sync.flush().await;
//!     assert_eq!(recorder.len(), 1);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
    pub use edusync_core::{Category, EntityId, Payload, Role, SyncConfig, Synchronizer};
}

pub use fixtures::*;
pub use generators::*;
pub use stress::*;
