//! TTL cache for the latest known value per key.
//!
//! Expiry is lazy: entries are only checked, and evicted, when read.
//! Nothing sweeps the map in the background.

use crate::key::CacheKey;
use crate::payload::Payload;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Default time-to-live of a cache entry.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// A stored value with its write time and lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// The cached payload.
    pub value: Payload,
    /// When the entry was written.
    pub stored_at: Instant,
    /// How long the entry stays readable.
    pub ttl: Duration,
}

impl CacheEntry {
    /// Returns true once more than `ttl` has elapsed since the write.
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) > self.ttl
    }
}

/// Thread-safe key-value store with per-entry expiry.
#[derive(Debug)]
pub struct Cache {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
    default_ttl: Duration,
}

impl Cache {
    /// Creates a cache using [`DEFAULT_TTL`].
    pub fn new() -> Self {
        Self::with_default_ttl(DEFAULT_TTL)
    }

    /// Creates a cache with a specific default TTL.
    pub fn with_default_ttl(default_ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            default_ttl,
        }
    }

    /// Returns the TTL applied by [`Cache::set`].
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Stores a value with the default TTL, replacing any previous entry.
    pub fn set(&self, key: CacheKey, value: Payload) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    /// Stores a value with an explicit TTL, replacing any previous entry.
    pub fn set_with_ttl(&self, key: CacheKey, value: Payload, ttl: Duration) {
        let entry = CacheEntry {
            value,
            stored_at: Instant::now(),
            ttl,
        };
        self.entries.lock().insert(key, entry);
    }

    /// Returns the value for `key` if it has not expired.
    ///
    /// An expired entry is removed as a side effect.
    pub fn get(&self, key: &CacheKey) -> Option<Payload> {
        let mut entries = self.entries.lock();
        let expired = entries.get(key)?.is_expired(Instant::now());
        if expired {
            entries.remove(key);
            return None;
        }
        entries.get(key).map(|entry| entry.value.clone())
    }

    /// Removes the entry for `key`. Returns true if one existed.
    pub fn delete(&self, key: &CacheKey) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Rendered keys containing `pattern`, sorted.
    ///
    /// Meant for statistics; expired entries that were never read back are
    /// still listed.
    pub fn keys_matching(&self, pattern: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .lock()
            .keys()
            .map(ToString::to_string)
            .filter(|key| key.contains(pattern))
            .collect();
        keys.sort();
        keys
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}
