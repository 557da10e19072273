//! Synchronizer configuration.

use crate::cache::DEFAULT_TTL;
use std::time::Duration;

/// Configuration for a [`Synchronizer`](crate::Synchronizer).
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    /// Lifetime of cache entries written by updates.
    pub default_ttl: Duration,

    /// Quiet period after the last update of a key before its settled
    /// signal fires.
    pub debounce_window: Duration,

    /// Queue length above which a warning is logged on enqueue
    /// (0 = never warn).
    pub queue_warn_threshold: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_TTL,                    // 5 minutes
            debounce_window: Duration::from_secs(1),     // trailing edge
            queue_warn_threshold: 1000,
        }
    }
}

impl SyncConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the cache entry lifetime.
    #[must_use]
    pub const fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Sets the debounce window.
    #[must_use]
    pub const fn debounce_window(mut self, window: Duration) -> Self {
        self.debounce_window = window;
        self
    }

    /// Sets the queue length that triggers a backlog warning.
    #[must_use]
    pub const fn queue_warn_threshold(mut self, threshold: usize) -> Self {
        self.queue_warn_threshold = threshold;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = SyncConfig::default();
        assert_eq!(config.default_ttl, Duration::from_secs(300));
        assert_eq!(config.debounce_window, Duration::from_secs(1));
        assert_eq!(config.queue_warn_threshold, 1000);
    }

    #[test]
    fn builder_pattern() {
        let config = SyncConfig::new()
            .default_ttl(Duration::from_secs(10))
            .debounce_window(Duration::from_millis(250))
            .queue_warn_threshold(0);

        assert_eq!(config.default_ttl, Duration::from_secs(10));
        assert_eq!(config.debounce_window, Duration::from_millis(250));
        assert_eq!(config.queue_warn_threshold, 0);
    }
}
