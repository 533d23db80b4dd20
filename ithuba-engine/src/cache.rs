use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// A plain key→value cache with a fixed time-to-live. Owned by its caller and
/// passed where needed; expired entries are dropped on read.
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: HashMap<K, (Instant, V)>,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn get(&mut self, key: &K) -> Option<V> {
        match self.entries.get(key) {
            Some((stored_at, value)) if stored_at.elapsed() < self.ttl => Some(value.clone()),
            Some(_) => {
                self.entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.entries.insert(key, (Instant::now(), value));
    }

    pub fn get_or_insert_with<F: FnOnce() -> V>(&mut self, key: K, build: F) -> V {
        if let Some(value) = self.get(&key) {
            return value;
        }
        let value = build();
        self.entries.insert(key, (Instant::now(), value.clone()));
        value
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_within_ttl() {
        let mut cache = TtlCache::new(Duration::from_secs(60));
        cache.insert("k", 1);
        assert_eq!(cache.get(&"k"), Some(1));
    }

    #[test]
    fn test_expiry() {
        let mut cache = TtlCache::new(Duration::from_millis(1));
        cache.insert("k", 1);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get(&"k"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_get_or_insert_with_builds_once() {
        let mut cache = TtlCache::new(Duration::from_secs(60));
        let mut builds = 0;
        for _ in 0..3 {
            let value = cache.get_or_insert_with("k", || {
                builds += 1;
                42
            });
            assert_eq!(value, 42);
        }
        assert_eq!(builds, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_clear() {
        let mut cache = TtlCache::new(Duration::from_secs(60));
        cache.insert(1, "a");
        cache.insert(2, "b");
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get(&1), None);
    }
}
