//! Key/value store with a sliding expiry.
//!
//! Every successful [`UsageAwareCache::get`] pushes the entry's expiry to
//! `now + ttl`, even when that expiry had already passed. Nothing is evicted
//! until a caller runs [`UsageAwareCache::clean`]; [`UsageAwareCache::has`]
//! does not look at expiry at all.

use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::DashMap;

/// Seconds an entry lives after its last `set` or `get`.
pub const DEFAULT_TTL: u64 = 180;

/// Source of the current time, in whole seconds since the unix epoch.
pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_secs())
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    #[must_use]
    pub fn new(now: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(now)),
        }
    }

    pub fn set(&self, now: u64) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: u64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    expires_at: u64,
}

pub struct UsageAwareCache<K, V, C = SystemClock> {
    entries: DashMap<K, Entry<V>>,
    ttl: u64,
    clock: C,
}

impl<K, V> UsageAwareCache<K, V, SystemClock>
where
    K: Eq + Hash,
    V: Clone,
{
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl<K, V> Default for UsageAwareCache<K, V, SystemClock>
where
    K: Eq + Hash,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, C> UsageAwareCache<K, V, C>
where
    K: Eq + Hash,
    V: Clone,
    C: Clock,
{
    #[must_use]
    pub fn with_clock(clock: C) -> Self {
        Self {
            entries: DashMap::new(),
            ttl: DEFAULT_TTL,
            clock,
        }
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: u64) -> Self {
        self.ttl = ttl;
        self
    }

    #[must_use]
    pub fn ttl(&self) -> u64 {
        self.ttl
    }

    fn deadline(&self) -> u64 {
        self.clock.now().saturating_add(self.ttl)
    }

    pub fn set(&self, key: K, value: V) {
        let expires_at = self.deadline();
        self.entries.insert(key, Entry { value, expires_at });
    }

    pub fn set_multiple(&self, values: impl IntoIterator<Item = (K, V)>) {
        for (key, value) in values {
            self.set(key, value);
        }
    }

    /// Look up `key` and extend its expiry.
    ///
    /// The entry is returned even if its expiry is in the past. The read and
    /// the extension happen under the same shard lock.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<V> {
        let expires_at = self.deadline();
        let mut entry = self.entries.get_mut(key)?;
        entry.expires_at = expires_at;
        Some(entry.value.clone())
    }

    /// Like [`get`](Self::get), returning `default` for a missing key.
    #[must_use]
    pub fn get_or(&self, key: &K, default: V) -> V {
        self.get(key).unwrap_or(default)
    }

    /// Values for `keys`, in the same order, `None` where a key is missing.
    #[must_use]
    pub fn get_multiple<'k>(&self, keys: impl IntoIterator<Item = &'k K>) -> Vec<Option<V>>
    where
        K: 'k,
    {
        keys.into_iter().map(|key| self.get(key)).collect()
    }

    #[must_use]
    pub fn has(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Remove `key`. Returns whether an entry was present.
    pub fn delete(&self, key: &K) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn delete_multiple<'k>(&self, keys: impl IntoIterator<Item = &'k K>)
    where
        K: 'k,
    {
        for key in keys {
            self.entries.remove(key);
        }
    }

    /// Drop every entry whose expiry is already in the past.
    ///
    /// Returns the number of entries removed.
    pub fn clean(&self) -> usize {
        let now = self.clock.now();
        let mut purged = 0;
        self.entries.retain(|_, entry| {
            let keep = entry.expires_at >= now;
            if !keep {
                purged += 1;
            }
            keep
        });
        if purged > 0 {
            tracing::debug!(purged, remaining = self.entries.len(), "cleaned cache");
        }
        purged
    }

    pub fn clear(&self) -> bool {
        self.entries.clear();
        true
    }

    /// When `key` expires, in clock seconds.
    #[must_use]
    pub fn expires_at(&self, key: &K) -> Option<u64> {
        self.entries.get(key).map(|entry| entry.expires_at)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    fn set_expires_at(&self, key: &K, expires_at: u64) {
        if let Some(mut entry) = self.entries.get_mut(key) {
            entry.expires_at = expires_at;
        }
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const START: u64 = 1_700_000_000;

    fn cache() -> (UsageAwareCache<String, &'static str, ManualClock>, ManualClock) {
        let clock = ManualClock::new(START);
        (UsageAwareCache::with_clock(clock.clone()), clock)
    }

    #[test]
    fn get_extends_the_ttl() {
        let (cache, clock) = cache();
        cache.set("test".to_string(), "value");
        clock.advance(30);

        assert_eq!(cache.get(&"test".to_string()), Some("value"));
        assert_eq!(cache.expires_at(&"test".to_string()), Some(START + 30 + DEFAULT_TTL));
    }

    #[test]
    fn get_revives_an_entry_whose_expiry_was_moved_back() {
        let (cache, _clock) = cache();
        let key = "test".to_string();
        cache.set(key.clone(), "value");

        let original = START + DEFAULT_TTL - 100;
        cache.set_expires_at(&key, original);

        assert_eq!(cache.get(&key), Some("value"));
        assert_eq!(cache.expires_at(&key), Some(original + 100));
    }

    #[test]
    fn get_returns_entries_past_their_expiry() {
        let (cache, clock) = cache();
        let key = "stale".to_string();
        cache.set(key.clone(), "value");
        clock.advance(DEFAULT_TTL * 10);

        assert!(cache.has(&key));
        assert_eq!(cache.get(&key), Some("value"));
    }

    #[test]
    fn missing_key_returns_default_without_inserting() {
        let (cache, _clock) = cache();
        let key = "test".to_string();

        assert_eq!(cache.get_or(&key, "fallback"), "fallback");
        assert!(!cache.has(&key));
        assert!(cache.is_empty());
    }

    #[test]
    fn has_and_delete() {
        let (cache, _clock) = cache();
        cache.set("test".to_string(), "value");

        assert!(cache.has(&"test".to_string()));
        assert!(!cache.has(&"nonexistent".to_string()));
        assert!(cache.delete(&"test".to_string()));
        assert!(!cache.delete(&"test".to_string()));
        assert!(!cache.has(&"test".to_string()));
    }

    #[test]
    fn get_set_and_delete_multiple() {
        let (cache, _clock) = cache();
        let keys = ["a".to_string(), "b".to_string()];
        cache.set_multiple([(keys[0].clone(), "first"), (keys[1].clone(), "second")]);

        assert_eq!(cache.get_multiple(&keys), vec![Some("first"), Some("second")]);

        cache.delete_multiple(&keys);
        assert!(!cache.has(&keys[0]));
        assert!(!cache.has(&keys[1]));
    }

    #[test]
    fn clear_reports_success() {
        let (cache, _clock) = cache();
        cache.set("test".to_string(), "value");

        assert!(cache.clear());
        assert!(!cache.has(&"test".to_string()));
    }

    #[test]
    fn clean_purges_only_expired_entries() {
        let (cache, clock) = cache();
        cache.set("expired".to_string(), "old");
        clock.advance(DEFAULT_TTL - 10);
        cache.set("valid".to_string(), "new");
        clock.advance(20);

        assert_eq!(cache.clean(), 1);
        assert!(cache.has(&"valid".to_string()));
        assert!(!cache.has(&"expired".to_string()));
    }

    #[test]
    fn custom_ttl() {
        let clock = ManualClock::new(START);
        let cache: UsageAwareCache<u32, u32, _> = UsageAwareCache::with_clock(clock).with_ttl(5);
        cache.set(1, 2);

        assert_eq!(cache.ttl(), 5);
        assert_eq!(cache.expires_at(&1), Some(START + 5));
    }
}
