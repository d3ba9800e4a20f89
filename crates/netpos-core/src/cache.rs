// # TTL Cache
//
// In-memory, process-lifetime memoization keyed by string.
//
// ## Expiry
//
// - Entries carry their own TTL and the instant they were stored
// - Expired entries are evicted lazily, by the lookup that finds them
// - There is no background sweeper
//
// ## Clock
//
// Timestamps come from `tokio::time::Instant`, so tests can pause and advance
// the runtime clock instead of sleeping.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

/// A cached value with its storage instant and lifetime
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) > self.ttl
    }
}

/// Thread-safe TTL cache
///
/// All operations are synchronous and hold a single mutex for their duration,
/// so concurrent resolutions never observe a half-written entry. Cloning the
/// cache yields another handle to the same entries.
///
/// # Example
///
/// ```rust
/// use netpos_core::cache::TtlCache;
/// use std::time::Duration;
///
/// let cache = TtlCache::new(Duration::from_secs(60), true);
/// cache.set("public-ip", "203.0.113.7".to_string());
/// assert_eq!(cache.get("public-ip").as_deref(), Some("203.0.113.7"));
///
/// cache.invalidate(Some("public-ip"));
/// assert!(cache.get("public-ip").is_none());
/// ```
#[derive(Debug, Clone)]
pub struct TtlCache<V> {
    inner: Arc<Mutex<HashMap<String, CacheEntry<V>>>>,
    default_ttl: Duration,
    enabled: bool,
}

impl<V: Clone> TtlCache<V> {
    /// Create an empty cache
    ///
    /// When `enabled` is false every `set` is a no-op, so every `get` misses.
    pub fn new(default_ttl: Duration, enabled: bool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            default_ttl,
            enabled,
        }
    }

    /// Create a cache that never stores anything
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO, false)
    }

    /// Look up a live entry
    ///
    /// An entry older than its TTL is removed and reported as absent.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut entries = self.entries();

        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                trace!("Cache entry {} expired, evicting", key);
                entries.remove(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }

    /// Store a value with the default TTL
    pub fn set(&self, key: impl Into<String>, value: V) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    /// Store a value with an explicit TTL, replacing any existing entry
    pub fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        if !self.enabled {
            return;
        }

        let entry = CacheEntry {
            value,
            stored_at: Instant::now(),
            ttl,
        };
        self.entries().insert(key.into(), entry);
    }

    /// Remove one entry, or every entry when `key` is `None`
    ///
    /// Removing a missing key is not an error.
    pub fn invalidate(&self, key: Option<&str>) {
        let mut entries = self.entries();
        match key {
            Some(key) => {
                entries.remove(key);
            }
            None => entries.clear(),
        }
    }

    /// Number of stored entries, including expired ones not yet evicted
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Check if the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Whether `set` stores values
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// TTL applied by [`TtlCache::set`]
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<V>>> {
        // A panic while holding the lock cannot leave an entry half-written
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
