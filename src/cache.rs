// In-memory response cache shared by all API calls: bounded capacity with
// FIFO eviction, per-entry TTL expiry, keyed by url + serialized body.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde_json::Value;

#[derive(Debug, Default)]
struct CacheStats {
    hit_count: AtomicUsize,
    miss_count: AtomicUsize,
    eviction_count: AtomicUsize,
    expired_count: AtomicUsize,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct CacheStatsReport {
    pub items_count: usize,
    pub hit_count: usize,
    pub miss_count: usize,
    pub eviction_count: usize,
    pub expired_count: usize,
}

struct CacheEntry {
    data: Value,
    created_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.created_at.elapsed() > self.ttl
    }
}

struct Inner {
    entries: HashMap<String, CacheEntry>,
    // Insertion order; eviction is FIFO, never recency-based. Every removal
    // path drops the key from this queue as well, so queue and map agree.
    order: VecDeque<String>,
}

pub struct ApiCache {
    inner: Mutex<Inner>,
    capacity: usize,
    default_ttl: Duration,
    stats: CacheStats,
}

impl ApiCache {
    pub fn new(capacity: usize, default_ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
            capacity,
            default_ttl,
            stats: CacheStats::default(),
        }
    }

    pub fn generate_key(url: &str, body: Option<&str>) -> String {
        match body {
            Some(body) => format!("{url}:{body}"),
            None => url.to_string(),
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        let mut inner = self.inner.lock();
        match inner.entries.get(key) {
            Some(entry) if entry.is_expired() => {
                inner.entries.remove(key);
                // Purge the queue slot too, or a later re-insert of the same
                // key would leave a ghost ahead of younger live entries.
                inner.order.retain(|queued| queued != key);
                self.stats.expired_count.fetch_add(1, Ordering::SeqCst);
                self.stats.miss_count.fetch_add(1, Ordering::SeqCst);
                None
            }
            Some(entry) => {
                self.stats.hit_count.fetch_add(1, Ordering::SeqCst);
                Some(entry.data.clone())
            }
            None => {
                self.stats.miss_count.fetch_add(1, Ordering::SeqCst);
                None
            }
        }
    }

    pub fn insert(&self, key: String, data: Value) {
        let mut inner = self.inner.lock();

        // Overwriting an existing key keeps its original queue position.
        if let Some(entry) = inner.entries.get_mut(&key) {
            entry.data = data;
            entry.created_at = Instant::now();
            return;
        }

        if inner.entries.len() >= self.capacity {
            self.evict_oldest(&mut inner);
        }

        inner.order.push_back(key.clone());
        inner.entries.insert(
            key,
            CacheEntry {
                data,
                created_at: Instant::now(),
                ttl: self.default_ttl,
            },
        );
    }

    // Removes exactly one live entry, the least recently inserted one.
    fn evict_oldest(&self, inner: &mut Inner) {
        while let Some(oldest) = inner.order.pop_front() {
            if inner.entries.remove(&oldest).is_some() {
                self.stats.eviction_count.fetch_add(1, Ordering::SeqCst);
                return;
            }
        }
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.order.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStatsReport {
        CacheStatsReport {
            items_count: self.len(),
            hit_count: self.stats.hit_count.load(Ordering::SeqCst),
            miss_count: self.stats.miss_count.load(Ordering::SeqCst),
            eviction_count: self.stats.eviction_count.load(Ordering::SeqCst),
            expired_count: self.stats.expired_count.load(Ordering::SeqCst),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::thread;

    fn cache(capacity: usize, ttl_ms: u64) -> ApiCache {
        ApiCache::new(capacity, Duration::from_millis(ttl_ms))
    }

    #[test]
    fn round_trip() {
        let cache = cache(10, 60_000);
        cache.insert("k".into(), json!({"v": 1}));
        assert_eq!(cache.get("k"), Some(json!({"v": 1})));

        let stats = cache.stats();
        assert_eq!(stats.hit_count, 1);
        assert_eq!(stats.items_count, 1);
    }

    #[test]
    fn expired_entry_is_absent() {
        let cache = cache(10, 20);
        cache.insert("k".into(), json!(42));
        assert!(cache.get("k").is_some());

        thread::sleep(Duration::from_millis(40));

        assert!(cache.get("k").is_none());
        assert_eq!(cache.stats().expired_count, 1);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn eviction_is_fifo_not_lru() {
        let cache = cache(3, 60_000);
        cache.insert("a".into(), json!(1));
        cache.insert("b".into(), json!(2));
        cache.insert("c".into(), json!(3));

        // Touch "a" so an LRU policy would keep it around.
        assert!(cache.get("a").is_some());

        cache.insert("d".into(), json!(4));

        // FIFO evicts the least recently INSERTED key regardless of use.
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
        assert!(cache.get("d").is_some());
        assert_eq!(cache.stats().eviction_count, 1);
    }

    #[test]
    fn each_overflow_insert_evicts_exactly_one() {
        let cache = cache(2, 60_000);
        cache.insert("a".into(), json!(1));
        cache.insert("b".into(), json!(2));
        cache.insert("c".into(), json!(3));
        cache.insert("d".into(), json!(4));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().eviction_count, 2);
        assert!(cache.get("c").is_some());
        assert!(cache.get("d").is_some());
    }

    #[test]
    fn reinserting_an_expired_key_does_not_corrupt_eviction_order() {
        let cache = cache(3, 40);
        cache.insert("a".into(), json!(1));

        thread::sleep(Duration::from_millis(80));
        assert!(cache.get("a").is_none());

        cache.insert("b".into(), json!(2));
        cache.insert("a".into(), json!(10));
        cache.insert("c".into(), json!(3));
        // Overflow must evict "b", the least recently inserted LIVE entry,
        // not the freshly re-inserted "a".
        cache.insert("d".into(), json!(4));

        assert!(cache.get("b").is_none());
        assert_eq!(cache.get("a"), Some(json!(10)));
        assert_eq!(cache.get("c"), Some(json!(3)));
        assert_eq!(cache.get("d"), Some(json!(4)));
        assert_eq!(cache.stats().eviction_count, 1);
    }

    #[test]
    fn overwrite_keeps_queue_position() {
        let cache = cache(2, 60_000);
        cache.insert("a".into(), json!(1));
        cache.insert("b".into(), json!(2));
        cache.insert("a".into(), json!(10));
        cache.insert("c".into(), json!(3));

        // "a" kept its original (oldest) slot, so it goes first.
        assert!(cache.get("a").is_none());
        assert_eq!(cache.get("b"), Some(json!(2)));
        assert_eq!(cache.get("c"), Some(json!(3)));
    }

    #[test]
    fn key_includes_body_when_present() {
        let with = ApiCache::generate_key("https://x", Some("{\"a\":1}"));
        let without = ApiCache::generate_key("https://x", None);
        assert_ne!(with, without);
        assert_eq!(without, "https://x");
    }

    #[test]
    fn clear_empties_everything() {
        let cache = cache(10, 60_000);
        cache.insert("a".into(), json!(1));
        cache.insert("b".into(), json!(2));
        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get("a").is_none());
    }
}
