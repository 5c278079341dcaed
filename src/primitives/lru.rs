//! Thread-safe LRU cache with optional TTL.
//!
//! Used for hot in-memory caches that are rebuilt fresh each process (e.g.
//! a per-thread compiled-template cache the scout warms ahead of workers).

use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

struct Entry<V> {
    value: V,
    inserted_at: Instant,
}

struct Inner<K, V> {
    map: HashMap<K, Entry<V>>,
    /// MRU at the back, LRU at the front.
    order: Vec<K>,
    capacity: usize,
}

/// A thread-safe LRU cache with true LRU eviction order, optional TTL, and
/// hit/miss counters.
pub struct LruCache<K, V> {
    inner: Mutex<Inner<K, V>>,
    ttl: Option<Duration>,
    hits: AtomicU64,
    misses: AtomicU64,
    enabled: AtomicBool,
}

impl<K: Eq + Hash + Clone, V: Clone> LruCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        Self::with_ttl(capacity, None)
    }

    pub fn with_ttl(capacity: usize, ttl: Option<Duration>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                map: HashMap::with_capacity(capacity),
                order: Vec::with_capacity(capacity),
                capacity: capacity.max(1),
            }),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            enabled: AtomicBool::new(true),
        }
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn get(&self, key: &K) -> Option<V> {
        if !self.is_enabled() {
            return None;
        }
        let mut inner = self.inner.lock();
        let expired = match (&self.ttl, inner.map.get(key)) {
            (Some(ttl), Some(entry)) => entry.inserted_at.elapsed() > *ttl,
            _ => false,
        };
        if expired {
            inner.map.remove(key);
            inner.order.retain(|k| k != key);
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }
        if let Some(entry) = inner.map.get(key) {
            let value = entry.value.clone();
            inner.order.retain(|k| k != key);
            inner.order.push(key.clone());
            self.hits.fetch_add(1, Ordering::Relaxed);
            Some(value)
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            None
        }
    }

    pub fn set(&self, key: K, value: V) {
        if !self.is_enabled() {
            return;
        }
        let mut inner = self.inner.lock();
        inner.order.retain(|k| k != &key);
        inner.order.push(key.clone());
        inner.map.insert(
            key,
            Entry {
                value,
                inserted_at: Instant::now(),
            },
        );
        while inner.map.len() > inner.capacity {
            if inner.order.is_empty() {
                break;
            }
            let evict = inner.order.remove(0);
            inner.map.remove(&evict);
        }
    }

    /// Return the cached value, or compute and cache it via `factory`.
    /// If `factory` fails, the error is returned without caching anything.
    pub fn get_or_set<E>(&self, key: &K, factory: impl FnOnce() -> Result<V, E>) -> Result<V, E> {
        if let Some(v) = self.get(key) {
            return Ok(v);
        }
        let value = factory()?;
        self.set(key.clone(), value.clone());
        Ok(value)
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.map.clear();
        inner.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn basic_get_set() {
        let cache: LruCache<String, i32> = LruCache::new(4);
        cache.set("a".into(), 1);
        assert_eq!(cache.get(&"a".to_string()), Some(1));
        assert_eq!(cache.get(&"missing".to_string()), None);
    }

    #[test]
    fn evicts_true_lru_not_insertion_order() {
        let cache: LruCache<i32, i32> = LruCache::new(2);
        cache.set(1, 10);
        cache.set(2, 20);
        // touch 1, making 2 the LRU entry
        cache.get(&1);
        cache.set(3, 30);
        assert_eq!(cache.get(&2), None);
        assert_eq!(cache.get(&1), Some(10));
        assert_eq!(cache.get(&3), Some(30));
    }

    #[test]
    fn ttl_expires_entries() {
        let cache: LruCache<i32, i32> = LruCache::with_ttl(4, Some(Duration::from_millis(10)));
        cache.set(1, 100);
        assert_eq!(cache.get(&1), Some(100));
        sleep(Duration::from_millis(30));
        assert_eq!(cache.get(&1), None);
    }

    #[test]
    fn hit_miss_counters() {
        let cache: LruCache<i32, i32> = LruCache::new(4);
        cache.set(1, 1);
        cache.get(&1);
        cache.get(&2);
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);
    }

    #[test]
    fn get_or_set_does_not_cache_on_failure() {
        let cache: LruCache<i32, i32> = LruCache::new(4);
        let result: Result<i32, &str> = cache.get_or_set(&1, || Err("boom"));
        assert!(result.is_err());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn disable_skips_reads_and_writes() {
        let cache: LruCache<i32, i32> = LruCache::new(4);
        cache.set(1, 1);
        cache.disable();
        assert_eq!(cache.get(&1), None);
        cache.enable();
        assert_eq!(cache.get(&1), Some(1));
    }
}
